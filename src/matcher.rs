use regex::Regex;

/// A search signature applied to response bodies.
///
/// The pattern is compiled as a regular expression when possible; anything
/// that does not compile is searched for as a literal substring instead.
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Literal(String),
}

impl Pattern {
    pub fn compile(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => Pattern::Regex(re),
            Err(_) => Pattern::Literal(pattern.to_owned()),
        }
    }

    /// Unanchored search anywhere in `body`.
    pub fn is_match(&self, body: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(body),
            Pattern::Literal(s) => body.contains(s.as_str()),
        }
    }
}

/// One-shot convenience over [`Pattern::compile`] + [`Pattern::is_match`].
pub fn matches(body: &str, pattern: &str) -> bool {
    Pattern::compile(pattern).is_match(body)
}
