//! Recursive descent parser for NED
//!
//! Builds a [`NedFile`] from tokens. Expressions are not interpreted; they
//! are kept as opaque source slices, as are property values. Errors are
//! recorded and parsing resumes at the next statement boundary, so a single
//! mistake never hides the rest of the file.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::ast::*;
use super::errors::SyntaxError;
use super::lexer::{Token, TokenKind, tokenize};
use crate::base::{LineIndex, NodeId, Span};

/// Parse result containing the tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub file: NedFile,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse NED source text
pub fn parse(input: &str) -> Parse {
    let mut parser = Parser::new(input);
    let file = parser.parse_file();
    parser.finish(file)
}

/// Body section currently being parsed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Parameters,
    Gates,
    Types,
    Submodules,
    Connections,
}

/// The parser state
struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    line_index: LineIndex,
    last_end: TextSize,
    next_node: u32,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: tokenize(text),
            pos: 0,
            line_index: LineIndex::new(text),
            last_end: TextSize::from(0),
            next_node: 1,
            errors: Vec::new(),
        }
    }

    fn finish(self, mut file: NedFile) -> Parse {
        file.next_node = self.next_node;
        Parse {
            file,
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    fn nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn start_offset(&self) -> TextSize {
        self.current()
            .map(|t| t.range.start())
            .unwrap_or_else(|| TextSize::of(self.text))
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = *self.tokens.get(self.pos)?;
        self.pos += 1;
        self.last_end = token.range.end();
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(what);
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<Token<'a>> {
        if self.at(TokenKind::Ident) {
            self.bump()
        } else {
            self.error_expected(what);
            None
        }
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node);
        self.next_node += 1;
        id
    }

    fn span_from(&self, start: TextSize) -> Span {
        let end = self.last_end.max(start);
        self.line_index.span(TextRange::new(start, end))
    }

    fn slice(&self, range: TextRange) -> SmolStr {
        SmolStr::new(self.text[range].trim())
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .current()
            .map(|t| t.range)
            .unwrap_or_else(|| TextRange::empty(TextSize::of(self.text)));
        let span = self.line_index.span(range);
        self.errors.push(SyntaxError::new(message, range, span));
    }

    fn error_expected(&mut self, what: &str) {
        let found = match self.current() {
            Some(token) => format!("'{}'", token.text),
            None => "end of file".to_string(),
        };
        self.error(format!("expected {what}, found {found}"));
    }

    /// Skip to the end of the current statement: past the next `;` or up to
    /// an enclosing `}`, stepping over nested brackets.
    fn recover_statement(&mut self) {
        let mut depth = 0usize;
        while let Some(kind) = self.kind() {
            if depth == 0 {
                if kind == TokenKind::Semicolon {
                    self.bump();
                    return;
                }
                if kind == TokenKind::RBrace {
                    return;
                }
            }
            if kind.is_open_delim() {
                depth += 1;
            } else if kind.is_close_delim() {
                depth = depth.saturating_sub(1);
            }
            self.bump();
        }
    }

    /// Skip a bracketed group starting at the current opening delimiter.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(kind) = self.kind() {
            if kind.is_open_delim() {
                depth += 1;
            } else if kind.is_close_delim() {
                depth = depth.saturating_sub(1);
            }
            self.bump();
            if depth == 0 {
                return;
            }
        }
        self.error("unbalanced brackets at end of file");
    }

    /// Consume an opaque expression up to one of `stops` at nesting depth 0,
    /// returning its source text.
    fn skip_expr(&mut self, stops: &[TokenKind]) -> Option<SmolStr> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(kind) = self.kind() {
            if depth == 0 && stops.contains(&kind) {
                break;
            }
            if kind.is_open_delim() {
                depth += 1;
            } else if kind.is_close_delim() {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            self.bump();
        }
        if self.pos == start {
            return None;
        }
        let range = TextRange::new(
            self.tokens[start].range.start(),
            self.tokens[self.pos - 1].range.end(),
        );
        Some(self.slice(range))
    }

    /// `@name[index](...)`
    fn skip_property(&mut self) {
        self.bump();
        if !self.at_eof() {
            self.bump();
        }
        if self.at(TokenKind::LBracket) {
            self.skip_balanced();
        }
        if self.at(TokenKind::LParen) {
            self.skip_balanced();
        }
    }

    /// Property = '@' Name ('[' Index ']')? ('(' Entry (';' Entry)* ')')?
    /// Entry = (Name '=')? Value (',' Value)*
    fn parse_property(&mut self) -> Option<Property> {
        let start = self.start_offset();
        self.bump();
        let node = self.alloc();
        let Some(name) = self.current().filter(|t| is_name(t.text)).map(|t| t.text) else {
            self.error_expected("property name");
            return None;
        };
        self.bump();
        let index = if self.eat(TokenKind::LBracket) {
            let index = self.skip_expr(&[TokenKind::RBracket, TokenKind::Semicolon]);
            self.expect(TokenKind::RBracket, "']'");
            index
        } else {
            None
        };
        let mut entries = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.at_eof() {
                let key = match (self.current(), self.nth(1)) {
                    (Some(t), Some(TokenKind::Eq)) if is_name(t.text) => {
                        let key = SmolStr::new(t.text);
                        self.bump();
                        self.bump();
                        key
                    }
                    _ => SmolStr::default(),
                };
                let mut values = Vec::new();
                loop {
                    let value = self.skip_expr(&[TokenKind::Comma, TokenKind::Semicolon]);
                    values.push(value.map(unquote).unwrap_or_default());
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                entries.push(PropertyEntry { key, values });
                if !self.eat(TokenKind::Semicolon) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'");
        }
        Some(Property {
            node,
            name: SmolStr::new(name),
            index,
            entries,
            span: self.span_from(start),
        })
    }

    fn parse_properties(&mut self) -> Vec<Property> {
        let mut properties = Vec::new();
        while self.at(TokenKind::At) {
            let before = self.pos;
            if let Some(property) = self.parse_property() {
                properties.push(property);
            }
            if self.pos == before {
                break;
            }
        }
        properties
    }

    // =========================================================================
    // File level
    // =========================================================================

    /// NedFile = (Package | Import | Property | TypeDecl)*
    fn parse_file(&mut self) -> NedFile {
        let mut file = NedFile::default();
        while let Some(kind) = self.kind() {
            match kind {
                TokenKind::Package => {
                    let package = self.parse_package();
                    if file.package.is_some() {
                        self.errors.push(SyntaxError::new(
                            "duplicate package declaration",
                            TextRange::empty(self.last_end),
                            self.line_index.span(TextRange::empty(self.last_end)),
                        ));
                    } else {
                        file.package = package;
                    }
                }
                TokenKind::Import => {
                    if let Some(import) = self.parse_import() {
                        file.imports.push(import);
                    }
                }
                TokenKind::At => {
                    if let Some(property) = self.parse_property() {
                        file.properties.push(property);
                    }
                    self.eat(TokenKind::Semicolon);
                }
                TokenKind::Semicolon => {
                    self.bump();
                }
                k if k.is_type_keyword() => {
                    if let Some(decl) = self.parse_type_decl() {
                        file.types.push(decl);
                    }
                }
                _ => {
                    self.error_expected("a declaration");
                    self.recover_toplevel();
                }
            }
        }
        file
    }

    fn recover_toplevel(&mut self) {
        self.bump();
        while let Some(kind) = self.kind() {
            if kind.is_type_keyword()
                || matches!(kind, TokenKind::Package | TokenKind::Import | TokenKind::At)
            {
                return;
            }
            if kind.is_open_delim() {
                self.skip_balanced();
            } else {
                self.bump();
            }
        }
    }

    /// Package = 'package' QualifiedName ';'
    fn parse_package(&mut self) -> Option<PackageDecl> {
        let start = self.start_offset();
        self.bump();
        let node = self.alloc();
        let Some(name) = self.parse_qname("package name") else {
            self.recover_statement();
            return None;
        };
        self.expect(TokenKind::Semicolon, "';'");
        Some(PackageDecl {
            node,
            name,
            span: self.span_from(start),
        })
    }

    /// Import = 'import' ImportSpec ';'
    fn parse_import(&mut self) -> Option<Import> {
        let start = self.start_offset();
        self.bump();
        let node = self.alloc();
        let first = self.pos;
        while matches!(
            self.kind(),
            Some(TokenKind::Ident | TokenKind::Dot | TokenKind::Star | TokenKind::StarStar)
        ) {
            self.bump();
        }
        if self.pos == first {
            self.error_expected("import specification");
            self.recover_statement();
            return None;
        }
        let spec = self.slice(TextRange::new(
            self.tokens[first].range.start(),
            self.tokens[self.pos - 1].range.end(),
        ));
        self.expect(TokenKind::Semicolon, "';'");
        Some(Import {
            node,
            spec,
            span: self.span_from(start),
        })
    }

    /// QualifiedName = Ident ('.' Ident)*
    fn parse_qname(&mut self, what: &str) -> Option<SmolStr> {
        let first = self.expect_ident(what)?;
        while self.at(TokenKind::Dot) && self.nth(1) == Some(TokenKind::Ident) {
            self.bump();
            self.bump();
        }
        Some(self.slice(TextRange::new(first.range.start(), self.last_end)))
    }

    fn parse_type_ref(&mut self, what: &str) -> Option<TypeRef> {
        let start = self.start_offset();
        let node = self.alloc();
        let name = self.parse_qname(what)?;
        Some(TypeRef {
            node,
            name,
            span: self.span_from(start),
        })
    }

    fn parse_type_ref_list(&mut self) -> Vec<TypeRef> {
        let mut refs = Vec::new();
        loop {
            match self.parse_type_ref("type name") {
                Some(r) => refs.push(r),
                None => break,
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        refs
    }

    // =========================================================================
    // Type declarations
    // =========================================================================

    /// TypeDecl = Kind Ident ('extends' Refs)? ('like' Refs)? (Body | ';')
    fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        let start = self.start_offset();
        let kind = match self.bump()?.kind {
            TokenKind::Simple => TypeKind::SimpleModule,
            TokenKind::Module => TypeKind::CompoundModule,
            TokenKind::Network => TypeKind::Network,
            TokenKind::Channel => TypeKind::Channel,
            TokenKind::ModuleInterface => TypeKind::ModuleInterface,
            _ => TypeKind::ChannelInterface,
        };
        let node = self.alloc();
        let Some(name) = self.expect_ident("type name") else {
            self.recover_statement();
            return None;
        };
        let mut decl = TypeDecl {
            node,
            kind,
            name: SmolStr::new(name.text),
            extends: Vec::new(),
            interfaces: Vec::new(),
            params: Vec::new(),
            gates: Vec::new(),
            types: Vec::new(),
            submodules: Vec::new(),
            connections: Vec::new(),
            allow_unconnected: false,
            properties: Vec::new(),
            span: Span::default(),
        };
        if self.eat(TokenKind::Extends) {
            decl.extends = self.parse_type_ref_list();
        }
        if self.eat(TokenKind::Like) {
            decl.interfaces = self.parse_type_ref_list();
        }
        decl.properties = self.parse_properties();
        if self.eat(TokenKind::LBrace) {
            self.parse_type_body(&mut decl);
            self.expect(TokenKind::RBrace, "'}'");
            self.eat(TokenKind::Semicolon);
        } else if !self.eat(TokenKind::Semicolon) {
            self.error_expected("'{' or ';'");
            self.recover_statement();
        }
        decl.span = self.span_from(start);
        Some(decl)
    }

    /// Enters a section if the current tokens are a section header.
    fn parse_section_header(&mut self) -> Option<(Section, bool)> {
        let section = match self.kind()? {
            TokenKind::Parameters => Section::Parameters,
            TokenKind::Gates => Section::Gates,
            TokenKind::Types => Section::Types,
            TokenKind::Submodules => Section::Submodules,
            TokenKind::Connections => Section::Connections,
            _ => return None,
        };
        self.bump();
        let allow_unconnected =
            section == Section::Connections && self.eat(TokenKind::AllowUnconnected);
        self.expect(TokenKind::Colon, "':'");
        Some((section, allow_unconnected))
    }

    fn parse_type_body(&mut self, decl: &mut TypeDecl) {
        let mut section = Section::Parameters;
        while !self.at(TokenKind::RBrace) {
            if self.at_eof() {
                return;
            }
            if let Some((next, allow_unconnected)) = self.parse_section_header() {
                section = next;
                decl.allow_unconnected |= allow_unconnected;
                continue;
            }
            let before = self.pos;
            match section {
                Section::Parameters if self.at(TokenKind::At) => {
                    decl.properties.extend(self.parse_property());
                    self.eat(TokenKind::Semicolon);
                }
                Section::Parameters => {
                    if let Some(param) = self.parse_param() {
                        decl.params.push(param);
                    }
                }
                Section::Gates => {
                    if let Some(gate) = self.parse_gate() {
                        decl.gates.push(gate);
                    }
                }
                Section::Types => self.parse_inner_type(decl),
                Section::Submodules => {
                    if let Some(sub) = self.parse_submodule() {
                        decl.submodules.push(sub);
                    }
                }
                Section::Connections => self.parse_connection_item(&mut decl.connections),
            }
            if self.pos == before {
                self.error_expected("a member declaration");
                self.bump();
            }
        }
    }

    fn parse_inner_type(&mut self, decl: &mut TypeDecl) {
        match self.kind() {
            Some(TokenKind::At) => {
                decl.properties.extend(self.parse_property());
                self.eat(TokenKind::Semicolon);
            }
            Some(k) if k.is_type_keyword() => {
                if let Some(inner) = self.parse_type_decl() {
                    decl.types.push(inner);
                }
            }
            _ => {
                self.error_expected("a type declaration");
                self.recover_statement();
            }
        }
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Param = 'volatile'? Type? Ident Property* ('=' Expr)? Property* ';'
    fn parse_param(&mut self) -> Option<ParamDecl> {
        let start = self.start_offset();
        let volatile = self.eat(TokenKind::Volatile);
        let ty = match self.kind() {
            Some(TokenKind::Bool) => Some(ParamType::Bool),
            Some(TokenKind::Int) => Some(ParamType::Int),
            Some(TokenKind::Double) => Some(ParamType::Double),
            Some(TokenKind::String) => Some(ParamType::String),
            Some(TokenKind::Xml) => Some(ParamType::Xml),
            Some(TokenKind::Object) => Some(ParamType::Object),
            _ => None,
        };
        if ty.is_some() {
            self.bump();
        } else if !volatile {
            let simple_assignment = self.at(TokenKind::Ident)
                && matches!(
                    self.nth(1),
                    Some(TokenKind::Eq | TokenKind::Semicolon | TokenKind::At)
                );
            if !simple_assignment {
                // Pattern assignments such as `**.delay = 1s;` do not name
                // a member of this type.
                if matches!(
                    self.kind(),
                    Some(TokenKind::Ident | TokenKind::Star | TokenKind::StarStar)
                ) {
                    self.recover_statement();
                } else {
                    self.error_expected("parameter");
                    self.recover_statement();
                }
                return None;
            }
        }
        let node = self.alloc();
        let Some(name) = self.expect_ident("parameter name") else {
            self.recover_statement();
            return None;
        };
        let mut properties = self.parse_properties();
        let value = if self.eat(TokenKind::Eq) {
            let value = self.skip_expr(&[TokenKind::Semicolon, TokenKind::At]);
            if value.is_none() {
                self.error_expected("parameter value");
            }
            value
        } else {
            None
        };
        properties.extend(self.parse_properties());
        self.expect(TokenKind::Semicolon, "';'");
        Some(ParamDecl {
            node,
            name: SmolStr::new(name.text),
            ty,
            volatile,
            value,
            properties,
            span: self.span_from(start),
        })
    }

    /// Gate = Direction? Ident ('[' Expr? ']')? Property* ';'
    fn parse_gate(&mut self) -> Option<GateDecl> {
        if self.at(TokenKind::At) {
            self.skip_property();
            self.eat(TokenKind::Semicolon);
            return None;
        }
        let start = self.start_offset();
        let direction = match self.kind() {
            Some(TokenKind::Input) => Some(GateDirection::Input),
            Some(TokenKind::Output) => Some(GateDirection::Output),
            Some(TokenKind::Inout) => Some(GateDirection::Inout),
            _ => None,
        };
        if direction.is_some() {
            self.bump();
        }
        let node = self.alloc();
        let Some(name) = self.expect_ident("gate name") else {
            self.recover_statement();
            return None;
        };
        let (is_vector, size) = if self.eat(TokenKind::LBracket) {
            let size = self.skip_expr(&[TokenKind::RBracket, TokenKind::Semicolon]);
            self.expect(TokenKind::RBracket, "']'");
            (true, size)
        } else {
            (false, None)
        };
        let properties = self.parse_properties();
        self.expect(TokenKind::Semicolon, "';'");
        Some(GateDecl {
            node,
            name: SmolStr::new(name.text),
            direction,
            is_vector,
            size,
            properties,
            span: self.span_from(start),
        })
    }

    /// Submodule = Ident ('[' Expr ']')? ':' ('<' Expr? '>' 'like')? QualifiedName
    ///             ('if' Expr)? (SubmoduleBody | ';')
    fn parse_submodule(&mut self) -> Option<Submodule> {
        if self.at(TokenKind::At) {
            self.skip_property();
            self.eat(TokenKind::Semicolon);
            return None;
        }
        let start = self.start_offset();
        let node = self.alloc();
        let Some(name) = self.expect_ident("submodule name") else {
            self.recover_statement();
            return None;
        };
        let vector_size = if self.eat(TokenKind::LBracket) {
            let size = self
                .skip_expr(&[TokenKind::RBracket, TokenKind::Semicolon])
                .unwrap_or_default();
            self.expect(TokenKind::RBracket, "']'");
            Some(size)
        } else {
            None
        };
        if !self.expect(TokenKind::Colon, "':'") {
            self.recover_statement();
            return None;
        }
        let like_expr = if self.eat(TokenKind::Lt) {
            let expr = self
                .skip_expr(&[TokenKind::Gt, TokenKind::Semicolon])
                .unwrap_or_default();
            self.expect(TokenKind::Gt, "'>'");
            self.expect(TokenKind::Like, "'like'");
            Some(expr)
        } else {
            None
        };
        let Some(type_ref) = self.parse_type_ref("submodule type") else {
            self.recover_statement();
            return None;
        };
        if self.eat(TokenKind::If) {
            self.skip_expr(&[TokenKind::LBrace, TokenKind::Semicolon]);
        }
        let mut sub = Submodule {
            node,
            name: SmolStr::new(name.text),
            vector_size,
            type_ref,
            like_expr,
            params: Vec::new(),
            gates: Vec::new(),
            properties: Vec::new(),
            span: Span::default(),
        };
        if self.eat(TokenKind::LBrace) {
            self.parse_submodule_body(&mut sub);
            self.expect(TokenKind::RBrace, "'}'");
            self.eat(TokenKind::Semicolon);
        } else {
            self.expect(TokenKind::Semicolon, "';'");
        }
        sub.span = self.span_from(start);
        Some(sub)
    }

    fn parse_submodule_body(&mut self, sub: &mut Submodule) {
        let mut section = Section::Parameters;
        while !self.at(TokenKind::RBrace) {
            if self.at_eof() {
                return;
            }
            if let Some((next, _)) = self.parse_section_header() {
                if !matches!(next, Section::Parameters | Section::Gates) {
                    self.error("only 'parameters:' and 'gates:' are allowed in a submodule body");
                }
                section = next;
                continue;
            }
            let before = self.pos;
            match section {
                Section::Gates => {
                    if let Some(gate) = self.parse_gate() {
                        sub.gates.push(gate);
                    }
                }
                Section::Parameters if self.at(TokenKind::At) => {
                    sub.properties.extend(self.parse_property());
                    self.eat(TokenKind::Semicolon);
                }
                Section::Parameters => {
                    if let Some(param) = self.parse_param() {
                        sub.params.push(param);
                    }
                }
                _ => self.recover_statement(),
            }
            if self.pos == before {
                self.error_expected("a member");
                self.bump();
            }
        }
    }

    // =========================================================================
    // Connections
    // =========================================================================

    fn parse_connection_item(&mut self, out: &mut Vec<Connection>) {
        match self.kind() {
            Some(TokenKind::At) => {
                self.skip_property();
                self.eat(TokenKind::Semicolon);
            }
            Some(TokenKind::For) => self.parse_connection_loop(out),
            Some(TokenKind::Ident) => {
                if let Some(conn) = self.parse_connection() {
                    out.push(conn);
                }
            }
            _ => {
                self.error_expected("connection");
                self.recover_statement();
            }
        }
    }

    /// Loop = 'for' LoopHeader '{' Connection* '}'
    fn parse_connection_loop(&mut self, out: &mut Vec<Connection>) {
        self.bump();
        self.skip_expr(&[TokenKind::LBrace, TokenKind::Semicolon]);
        if !self.expect(TokenKind::LBrace, "'{'") {
            self.recover_statement();
            return;
        }
        while !self.at(TokenKind::RBrace) && !self.at_eof() {
            let before = self.pos;
            self.parse_connection_item(out);
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        self.eat(TokenKind::Semicolon);
    }

    /// Connection = GateRef Arrow (ChannelSpec Arrow)? GateRef ('if' Expr)? ';'
    fn parse_connection(&mut self) -> Option<Connection> {
        let start = self.start_offset();
        let node = self.alloc();
        let Some(left) = self.parse_gate_ref() else {
            self.recover_statement();
            return None;
        };
        let Some(arrow) = self.parse_arrow() else {
            self.recover_statement();
            return None;
        };
        let channel = if self.arrow_ahead() {
            let channel = self.parse_channel_spec();
            self.parse_arrow()?;
            channel
        } else {
            None
        };
        let Some(right) = self.parse_gate_ref() else {
            self.recover_statement();
            return None;
        };
        if self.eat(TokenKind::If) {
            self.skip_expr(&[TokenKind::Semicolon, TokenKind::Comma]);
        }
        if !self.eat(TokenKind::Comma) {
            self.expect(TokenKind::Semicolon, "';'");
        }
        let (src, dest, arrow) = match arrow {
            TokenKind::LeftArrow => (right, left, ConnectionArrow::Unidirectional),
            TokenKind::BiArrow => (left, right, ConnectionArrow::Bidirectional),
            _ => (left, right, ConnectionArrow::Unidirectional),
        };
        Some(Connection {
            node,
            src,
            dest,
            arrow,
            channel,
            span: self.span_from(start),
        })
    }

    fn parse_arrow(&mut self) -> Option<TokenKind> {
        match self.kind() {
            Some(kind) if kind.is_arrow() => {
                self.bump();
                Some(kind)
            }
            _ => {
                self.error_expected("'-->', '<--' or '<-->'");
                None
            }
        }
    }

    /// Whether another arrow follows before the end of the connection, i.e.
    /// the next tokens are a channel specification.
    fn arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            let kind = token.kind;
            if depth == 0 {
                if kind.is_arrow() {
                    return true;
                }
                if matches!(
                    kind,
                    TokenKind::Semicolon | TokenKind::Comma | TokenKind::If | TokenKind::RBrace
                ) {
                    return false;
                }
            }
            if kind.is_open_delim() {
                depth += 1;
            } else if kind.is_close_delim() {
                depth = depth.saturating_sub(1);
            }
        }
        false
    }

    /// ChannelSpec = (Ident ':')? ('<' Expr? '>' 'like')? QualifiedName? ('{' ... '}')?
    fn parse_channel_spec(&mut self) -> Option<ChannelSpec> {
        let start = self.start_offset();
        let node = self.alloc();
        if self.at(TokenKind::Ident) && self.nth(1) == Some(TokenKind::Colon) {
            self.bump();
            self.bump();
        }
        let like_expr = if self.eat(TokenKind::Lt) {
            let expr = self
                .skip_expr(&[TokenKind::Gt, TokenKind::Semicolon])
                .unwrap_or_default();
            self.expect(TokenKind::Gt, "'>'");
            self.expect(TokenKind::Like, "'like'");
            Some(expr)
        } else {
            None
        };
        let type_ref = if self.at(TokenKind::Ident) {
            self.parse_type_ref("channel type")
        } else {
            None
        };
        if self.at(TokenKind::LBrace) {
            self.skip_balanced();
        }
        if type_ref.is_none() && like_expr.is_some() {
            self.error_expected("channel interface name");
        }
        Some(ChannelSpec {
            node,
            type_ref,
            like_expr,
            span: self.span_from(start),
        })
    }

    /// GateRef = Ident Index? ('.' Ident (Index | '++')?)? | Ident '++'
    fn parse_gate_ref(&mut self) -> Option<GateRef> {
        let first = self.expect_ident("gate or submodule name")?;
        let first_indexed = if self.at(TokenKind::LBracket) {
            self.skip_balanced();
            true
        } else {
            false
        };
        if self.eat(TokenKind::Dot) {
            let gate = self.expect_ident("gate name")?;
            let index = self.parse_gate_index();
            return Some(GateRef {
                module: Some(SmolStr::new(first.text)),
                module_indexed: first_indexed,
                gate: SmolStr::new(gate.text),
                index,
            });
        }
        let index = if first_indexed {
            GateIndex::Index
        } else {
            self.parse_gate_index()
        };
        Some(GateRef {
            module: None,
            module_indexed: false,
            gate: SmolStr::new(first.text),
            index,
        })
    }

    fn parse_gate_index(&mut self) -> GateIndex {
        if self.at(TokenKind::LBracket) {
            self.skip_balanced();
            GateIndex::Index
        } else if self.eat(TokenKind::PlusPlus) {
            GateIndex::PlusPlus
        } else {
            GateIndex::None
        }
    }
}

/// Identifiers and keywords both work as property names and keys.
fn is_name(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

/// Strip the quotes of a string literal value.
fn unquote(value: SmolStr) -> SmolStr {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => SmolStr::new(inner),
        None => value,
    }
}
