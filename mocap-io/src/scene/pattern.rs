//! Name matching for scene lookups.
//!
//! Lookups by name accept regular expressions that must match the whole name
//! (`"Hand.*"` matches `"HandLeft"`, `"Hand"` does not match `"HandLeft"`).
//! A pattern that does not compile is compared literally instead.

use regex::Regex;

/// Compiled name pattern
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Full-match regular expression
    Regex(Regex),
    /// Exact string comparison
    Literal(String),
}

impl NamePattern {
    /// Compile a full-match regular expression
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(NamePattern::Regex)
    }

    /// Match a name exactly, regex metacharacters included
    pub fn literal(name: impl Into<String>) -> Self {
        NamePattern::Literal(name.into())
    }

    /// Regular expression if it compiles, literal otherwise
    pub fn lenient(pattern: &str) -> Self {
        match Self::regex(pattern) {
            Ok(p) => p,
            Err(e) => {
                log::debug!(
                    "Pattern {:?} is not a valid regex ({}), matching literally",
                    pattern,
                    e
                );
                Self::literal(pattern)
            }
        }
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Regex(re) => re.is_match(name),
            NamePattern::Literal(s) => s == name,
        }
    }
}

impl From<&str> for NamePattern {
    fn from(pattern: &str) -> Self {
        NamePattern::lenient(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_match_only() {
        let p = NamePattern::lenient("Hand");
        assert!(p.matches("Hand"));
        assert!(!p.matches("HandLeft"));
        assert!(!p.matches("LeftHand"));
    }

    #[test]
    fn test_regex_match() {
        let p = NamePattern::lenient("Hand.*");
        assert!(p.matches("HandLeft"));
        assert!(p.matches("Hand"));
        assert!(!p.matches("LeftHand"));
    }

    #[test]
    fn test_alternation_is_anchored() {
        let p = NamePattern::lenient("Head|Hip");
        assert!(p.matches("Head"));
        assert!(p.matches("Hip"));
        assert!(!p.matches("HeadTop"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let p = NamePattern::lenient("Wand[1");
        assert!(matches!(p, NamePattern::Literal(_)));
        assert!(p.matches("Wand[1"));
        assert!(!p.matches("Wand1"));
    }

    #[test]
    fn test_literal_ignores_metacharacters() {
        let p = NamePattern::literal("Body.1");
        assert!(p.matches("Body.1"));
        assert!(!p.matches("BodyX1"));
    }
}
