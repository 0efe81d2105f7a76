use once_cell::sync::Lazy;
use regex::RegexSet;

/// Language-agnostic "near me" detector. New languages are added by extending this list, not
/// by changing the detection mechanism.
static NEAR_ME_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bnear\s*me\b",
        r"(?i)\bnearby\b",
        r"(?i)\bclose\s+to\s+(me|here)\b",
        r"(?i)\baround\s+(me|here)\b",
        r"(?i)cerca\s+de\s+m[ií]",
        r"(?i)pr[eè]s\s+de\s+(moi|chez\s+moi)",
        r"קרוב\s+אלי",
    ])
    .expect("near-me pattern set is a fixed, reviewed literal")
});

pub fn matches_near_me(query: &str) -> bool {
    NEAR_ME_PATTERNS.is_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english_near_me_variants() {
        assert!(matches_near_me("restaurants near me"));
        assert!(matches_near_me("pizza nearby"));
        assert!(matches_near_me("sushi close to here"));
    }

    #[test]
    fn detects_spanish_and_french_variants() {
        assert!(matches_near_me("restaurantes cerca de mi"));
        assert!(matches_near_me("pizza pres de moi"));
    }

    #[test]
    fn does_not_match_ordinary_queries() {
        assert!(!matches_near_me("pizza in Ashkelon"));
        assert!(!matches_near_me("best vegan food downtown"));
    }
}
