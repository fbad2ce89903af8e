//! Logos-based lexer for NED
//!
//! Fast tokenization using the logos crate. Trivia (whitespace, comments) is
//! produced by logos and dropped by [`Lexer`], so the parser only ever sees
//! significant tokens.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let kind = match self.inner.next()? {
                Ok(kind) => kind,
                Err(()) => TokenKind::Error,
            };
            if kind.is_trivia() {
                continue;
            }
            let span = self.inner.span();
            let range = TextRange::new(
                TextSize::from(span.start as u32),
                TextSize::from(span.end as u32),
            );
            return Some(Token {
                kind,
                text: self.inner.slice(),
                range,
            });
        }
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    Comment,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("property")]
    Property,
    #[token("simple")]
    Simple,
    #[token("module")]
    Module,
    #[token("network")]
    Network,
    #[token("channel")]
    Channel,
    #[token("moduleinterface")]
    ModuleInterface,
    #[token("channelinterface")]
    ChannelInterface,
    #[token("extends")]
    Extends,
    #[token("like")]
    Like,
    #[token("parameters")]
    Parameters,
    #[token("gates")]
    Gates,
    #[token("types")]
    Types,
    #[token("submodules")]
    Submodules,
    #[token("connections")]
    Connections,
    #[token("allowunconnected")]
    AllowUnconnected,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("inout")]
    Inout,
    #[token("volatile")]
    Volatile,
    #[token("bool")]
    Bool,
    #[token("int")]
    Int,
    #[token("double")]
    Double,
    #[token("string")]
    String,
    #[token("xml")]
    Xml,
    #[token("object")]
    Object,
    #[token("for")]
    For,
    #[token("if")]
    If,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// Identifiers, including gate-half suffixes such as `g$i`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(\$[io])?")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?")]
    Real,

    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLit,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("-->")]
    RightArrow,
    #[token("<--")]
    LeftArrow,
    #[token("<-->")]
    BiArrow,
    #[token("++")]
    PlusPlus,
    #[token("**")]
    StarStar,
    #[token("..")]
    DotDot,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("##")]
    HashHash,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("@")]
    At,
    #[token("#")]
    Hash,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token("!")]
    Bang,
    #[token("$")]
    Dollar,

    /// Produced for characters logos cannot match.
    Error,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_arrow(self) -> bool {
        matches!(
            self,
            TokenKind::RightArrow | TokenKind::LeftArrow | TokenKind::BiArrow
        )
    }

    /// Keywords that start a type declaration.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Simple
                | TokenKind::Module
                | TokenKind::Network
                | TokenKind::Channel
                | TokenKind::ModuleInterface
                | TokenKind::ChannelInterface
        )
    }

    pub fn is_param_type(self) -> bool {
        matches!(
            self,
            TokenKind::Bool
                | TokenKind::Int
                | TokenKind::Double
                | TokenKind::String
                | TokenKind::Xml
                | TokenKind::Object
        )
    }

    pub fn is_open_delim(self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace)
    }

    pub fn is_close_delim(self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace)
    }
}
