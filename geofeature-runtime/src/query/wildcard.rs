//! Case-insensitive `%` wildcard matching for name, provider and type
//! filters.

use geofeature_core::WILDCARD;
use regex::Regex;

/// One compiled filter value.
#[derive(Debug, Clone)]
pub(crate) enum WildcardPattern {
    /// No wildcard: whole-string match.
    Literal(String),
    /// Trailing wildcard only.
    Prefix(String),
    /// Leading wildcard only.
    Suffix(String),
    /// Wildcards elsewhere.
    Pattern(Regex),
}

impl WildcardPattern {
    pub(crate) fn new(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        let count = lowered.matches(WILDCARD).count();
        if count == 0 {
            return Self::Literal(lowered);
        }
        if count == 1 {
            if let Some(prefix) = lowered.strip_suffix(WILDCARD) {
                return Self::Prefix(prefix.to_owned());
            }
            if let Some(suffix) = lowered.strip_prefix(WILDCARD) {
                return Self::Suffix(suffix.to_owned());
            }
        }
        let body = lowered
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        match Regex::new(&format!("(?s)^{body}$")) {
            Ok(regex) => Self::Pattern(regex),
            Err(err) => {
                log::warn!("wildcard pattern {raw:?} did not compile, matching literally: {err}");
                Self::Literal(lowered)
            }
        }
    }

    /// Match against an already lowercased candidate.
    pub(crate) fn matches_lowered(&self, candidate: &str) -> bool {
        match self {
            Self::Literal(literal) => candidate == literal,
            Self::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => candidate.ends_with(suffix.as_str()),
            Self::Pattern(regex) => regex.is_match(candidate),
        }
    }
}

/// Any-of set of patterns.
#[derive(Debug, Clone)]
pub(crate) struct WildcardSet {
    patterns: Vec<WildcardPattern>,
}

impl WildcardSet {
    pub(crate) fn new(values: &[String]) -> Self {
        Self {
            patterns: values.iter().map(|value| WildcardPattern::new(value)).collect(),
        }
    }

    pub(crate) fn matches(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_lowered(&lowered))
    }
}

/// Whether any value carries a wildcard.
pub(crate) fn has_wildcard(values: &[String]) -> bool {
    values.iter().any(|value| value.contains(WILDCARD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc%", "abcdef", true)]
    #[case("abc%", "abc", true)]
    #[case("abc%", "xabc", false)]
    #[case("%abc", "xabc", true)]
    #[case("%abc", "abcx", false)]
    #[case("a%c", "abbbc", true)]
    #[case("a%c", "abcd", false)]
    #[case("%b%", "abc", true)]
    #[case("%", "anything", true)]
    #[case("ABC", "abc", true)]
    #[case("abc", "abcd", false)]
    #[case("a.c%", "abcd", false)]
    #[case("a.c%", "a.cd", true)]
    #[case("Ä%", "äb", true)]
    #[case("a%c", "a\nc", true)]
    #[case("%b%", "a\nb\nc", true)]
    #[case("a%", "a\nb", true)]
    fn wildcard_matching(#[case] pattern: &str, #[case] candidate: &str, #[case] expected: bool) {
        let set = WildcardSet::new(&[pattern.to_owned()]);
        assert_eq!(set.matches(candidate), expected);
    }

    #[rstest]
    fn any_pattern_in_a_set_matches() {
        let set = WildcardSet::new(&["x".to_owned(), "y%".to_owned()]);
        assert!(set.matches("yes"));
        assert!(set.matches("X"));
        assert!(!set.matches("no"));
    }

    #[rstest]
    #[case(&["abc"], false)]
    #[case(&["abc", "d%"], true)]
    fn detects_wildcards(#[case] values: &[&str], #[case] expected: bool) {
        let owned: Vec<String> = values.iter().map(|value| (*value).to_owned()).collect();
        assert_eq!(has_wildcard(&owned), expected);
    }
}
