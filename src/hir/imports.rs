//! Import specifications.
//!
//! `import a.b.C;` names one type. Wildcard imports match qualified names:
//! `*` matches any run of characters within one segment, `**` any run
//! including dots.

use regex::Regex;
use smol_str::SmolStr;

/// A compiled import specification
#[derive(Clone, Debug)]
pub struct ImportPattern {
    spec: SmolStr,
    regex: Option<Regex>,
}

impl ImportPattern {
    pub fn new(spec: impl Into<SmolStr>) -> Self {
        let spec = spec.into();
        let regex = if spec.contains('*') {
            Regex::new(&wildcard_to_regex(&spec)).ok()
        } else {
            None
        };
        Self { spec, regex }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn is_wildcard(&self) -> bool {
        self.spec.contains('*')
    }

    /// Whether a non-wildcard import names the simple `name`.
    pub fn names(&self, name: &str) -> bool {
        !self.is_wildcard()
            && (self.spec == name
                || self
                    .spec
                    .strip_suffix(name)
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }

    /// Whether `qualified_name` is matched by this import.
    pub fn matches(&self, qualified_name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(qualified_name),
            None => self.spec == qualified_name,
        }
    }
}

fn wildcard_to_regex(spec: &str) -> String {
    let mut out = String::with_capacity(spec.len() + 8);
    out.push('^');
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^.]*"),
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }
    out.push('$');
    out
}
