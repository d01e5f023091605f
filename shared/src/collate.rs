//! Locale-aware string ordering and case-insensitive matching.
//!
//! Comparison is tiered the way a collator compares: base letters first
//! (accents and case ignored), then accents, then case with lowercase
//! first, then raw code points as the final tiebreak so the order is total
//! and reproducible.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Precomputed sort key; build once per string and compare many times.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: String,
    secondary: String,
    tertiary: Vec<u8>,
    raw: String,
}

impl CollationKey {
    #[must_use]
    pub fn new(s: &str) -> Self {
        let decomposed: String = s.nfd().collect();

        let primary = decomposed
            .chars()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();

        let secondary = decomposed.chars().flat_map(char::to_lowercase).collect();

        let tertiary = decomposed
            .chars()
            .filter(|c| !is_combining_mark(*c))
            .map(|c| u8::from(c.is_uppercase()))
            .collect();

        Self {
            primary,
            secondary,
            tertiary,
            raw: s.to_string(),
        }
    }
}

#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}

/// Case-insensitive form used for search matching (NFKC + lowercase).
#[must_use]
pub fn fold(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || fold(a) == fold(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_case_at_primary_level() {
        assert_eq!(locale_cmp("alfa romeo", "Audi"), Ordering::Less);
        assert_eq!(locale_cmp("BMW", "audi"), Ordering::Greater);
    }

    #[test]
    fn accents_sort_with_base_letter() {
        let mut names = vec!["Zastava", "Škoda", "Seat", "Smart"];
        names.sort_by(|a, b| locale_cmp(a, b));
        assert_eq!(names, ["Seat", "Škoda", "Smart", "Zastava"]);
    }

    #[test]
    fn lowercase_precedes_uppercase_on_tie() {
        assert_eq!(locale_cmp("mini", "Mini"), Ordering::Less);
        assert_eq!(locale_cmp("Mini", "Mini"), Ordering::Equal);
    }

    #[test]
    fn unaccented_precedes_accented_on_tie() {
        assert_eq!(locale_cmp("Citroen", "Citroën"), Ordering::Less);
    }

    #[test]
    fn fold_handles_compatibility_forms() {
        assert!(eq_ignore_case("ＢＭＷ", "bmw"));
        assert!(eq_ignore_case("Diesel", "DIESEL"));
        assert!(!eq_ignore_case("Diesel", "Petrol"));
    }
}
