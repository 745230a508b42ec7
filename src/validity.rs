//! Prose vs. noise check for cleaned highlight text

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest text, in characters, accepted as a highlight
pub const MIN_TEXT_CHARS: usize = 3;

/// Letters must make up more than this share of the non-whitespace characters
pub const MIN_LETTER_RATIO: f32 = 0.4;

static LETTER_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]{2,}").unwrap());

/// One letter of any script (general category L); excludes letter numbers and
/// combining marks
static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").unwrap());

/// Whether cleaned text looks like real prose, using the default thresholds
pub fn is_valid(text: &str) -> bool {
    is_valid_with(text, MIN_TEXT_CHARS, MIN_LETTER_RATIO)
}

/// Whether cleaned text looks like real prose
///
/// Requires at least `min_chars` characters, a run of two or more ASCII
/// letters, and a letter share of the non-whitespace characters strictly
/// above `min_letter_ratio`.
pub fn is_valid_with(text: &str, min_chars: usize, min_letter_ratio: f32) -> bool {
    if text.chars().count() < min_chars {
        return false;
    }

    if !LETTER_RUN_RE.is_match(text) {
        return false;
    }

    let non_space = text.chars().filter(|c| !c.is_whitespace()).count();
    let letters = LETTER_RE.find_iter(text).count();
    if non_space == 0 {
        return false;
    }

    letters as f32 / non_space as f32 > min_letter_ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        assert!(!is_valid(""));
        assert!(!is_valid("ab"));
        assert!(is_valid("abc"));
    }

    #[test]
    fn test_requires_letter_run() {
        assert!(!is_valid("12345"));
        assert!(!is_valid("a1b2c3d4"));
        assert!(!is_valid("x y z"));
    }

    #[test]
    fn test_letter_ratio() {
        // 2 letters out of 5 non-whitespace characters is exactly 0.4
        assert!(!is_valid("ab 123"));
        // 2 of 4 clears it
        assert!(is_valid("ab 12"));
        assert!(!is_valid("Fig 2019-2020 12.5%"));
    }

    #[test]
    fn test_prose() {
        assert!(is_valid("The cat sat."));
        assert!(is_valid("Überraschung im Café"));
    }

    #[test]
    fn test_letter_numbers_are_not_letters() {
        // "Ⅻ" is a letter number: 2 letters of 5 non-whitespace characters
        assert!(!is_valid("aa-?Ⅻ"));
        assert!(is_valid("aab-Ⅻ"));
        // Devanagari vowel signs are combining marks
        assert!(!is_valid("ab \u{093E}\u{093F}\u{0940}"));
    }

    #[test]
    fn test_custom_thresholds() {
        assert!(!is_valid_with("The cat sat.", 20, MIN_LETTER_RATIO));
        assert!(is_valid_with("ab 123", MIN_TEXT_CHARS, 0.3));
    }
}
