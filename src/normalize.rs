//! Cleanup of raw highlight text
//!
//! Highlight clipping leaves typographic debris behind: ligature code points,
//! hard line breaks, words hyphenated across lines, stray glyph fragments cut
//! at the highlight boundary. [`clean`] removes it in a fixed sequence of
//! passes; later passes rely on the output of earlier ones, so the order is
//! part of the contract.

use once_cell::sync::Lazy;
use regex::Regex;

/// Presentation-form ligatures and their letter sequences
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Ligature halves left over when a highlight edge cuts through a word
const LIGATURE_FRAGMENTS: &[&str] = &["ff", "fi", "fl", "ffi", "ffl"];

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());
static MULTI_PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

/// Ordered substitutions for line-break hyphens, punctuation spacing and
/// Latin abbreviations
static PUNCTUATION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(\w)-\s+(\w)", "${1}${2}"),
        (r"\s+([,.:;!?)])", "${1}"),
        (r"\(\s+", "("),
        (r"\bi\s*\.\s*e\s*\.", "i.e."),
        (r"\be\s*\.\s*g\s*\.", "e.g."),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

/// Edge artifacts: a stray letter or ligature fragment at the start, a stray
/// letter at the end
static EDGE_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^[bcdefghijklmnopqrstuvwxyz]\s+",
        r"^(ff|fi|fl|ffi|ffl)\s+",
        r"(?i)\s+[bcdefghijklmnopqrstuvwxyz]$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Normalize raw highlight text into a clean single-line string
///
/// The result may be empty when the input is empty or consists only of
/// artifacts.
pub fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = expand_ligatures(raw);
    text = strip_control_chars(&text);
    text = text
        .replace('\t', " ")
        .replace("\r\n", " ")
        .replace('\r', " ")
        .replace('\n', " ");
    text = collapse_spaces(&text);

    for (re, replacement) in PUNCTUATION_RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    text = drop_inner_tokens(&text, |token| {
        let mut chars = token.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if is_stray_letter(c))
    });
    text = drop_inner_tokens(&text, |token| LIGATURE_FRAGMENTS.contains(&token));

    for re in EDGE_RULES.iter() {
        text = re.replace(&text, "").into_owned();
    }

    text = collapse_spaces(&text);
    text = MULTI_PERIOD_RE.replace_all(&text, ".").into_owned();

    text.trim().to_string()
}

fn expand_ligatures(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, expanded)) => out.push_str(expanded),
            None => out.push(c),
        }
    }
    out
}

/// Drop C0 control characters other than tab and newline
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| (c as u32) >= 32 || c == '\n' || c == '\t')
        .collect()
}

fn collapse_spaces(text: &str) -> String {
    MULTI_SPACE_RE.replace_all(text, " ").into_owned()
}

/// Single letters that are clipping residue rather than words. `a`, `A` and
/// `I` are real words and survive.
fn is_stray_letter(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'A' | 'I')
}

/// Remove whitespace-delimited tokens matching `pred`, leaving the
/// surrounding whitespace in place
///
/// Only tokens with whitespace on both sides qualify; a token touching either
/// end of the text is kept.
fn drop_inner_tokens(text: &str, pred: impl Fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for token in TOKEN_RE.find_iter(text) {
        let inner = token.start() > 0 && token.end() < text.len();
        if inner && pred(token.as_str()) {
            out.push_str(&text[last_end..token.start()]);
            last_end = token.end();
        }
    }

    out.push_str(&text[last_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ligature_expansion() {
        assert_eq!(clean("\u{FB01}le"), "file");
        assert_eq!(clean("sta\u{FB00}"), "staff");
        assert_eq!(clean("\u{FB03}cient e\u{FB04}uent"), "fficient effluent");
        assert_eq!(clean("\u{FB06}art"), "start");
    }

    #[test]
    fn test_control_chars_and_whitespace() {
        assert_eq!(clean("bell\u{0007}ring"), "bellring");
        assert_eq!(clean("one\ttwo\r\nthree\nfour"), "one two three four");
        assert_eq!(clean("wide    gap"), "wide gap");
    }

    #[test]
    fn test_dehyphenation() {
        assert_eq!(clean("hyphen- ated"), "hyphenated");
        assert_eq!(clean("some- \n thing"), "something");
        // A hyphen without following whitespace is a real compound
        assert_eq!(clean("well-known"), "well-known");
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(clean("word , word"), "word, word");
        assert_eq!(clean("( word"), "(word");
        assert_eq!(clean("really ? yes !"), "really? yes!");
        assert_eq!(clean("(see above )"), "(see above)");
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(clean("that is, i . e . the rest"), "that is, i.e. the rest");
        assert_eq!(clean("fruit, e. g. apples"), "fruit, e.g. apples");
    }

    #[test]
    fn test_stray_letters() {
        assert_eq!(clean("the f cat"), "the cat");
        assert_eq!(clean("a dog"), "a dog");
        assert_eq!(clean("I think I can"), "think I can");
        assert_eq!(clean("one B two"), "one two");
        assert_eq!(clean("keep A here"), "keep A here");
        assert_eq!(clean("stop i go"), "stop go");
    }

    #[test]
    fn test_ligature_fragments() {
        assert_eq!(clean("the ff effect"), "the effect");
        assert_eq!(clean("an ffi office"), "an office");
        assert_eq!(clean("fi the start"), "the start");
        // Fragments inside words are untouched
        assert_eq!(clean("offline"), "offline");
    }

    #[test]
    fn test_edge_letters() {
        assert_eq!(clean("b Something here"), "Something here");
        assert_eq!(clean("the end x"), "the end");
        assert_eq!(clean("the end A"), "the end A");
    }

    #[test]
    fn test_periods() {
        assert_eq!(clean("end.. Next"), "end. Next");
        assert_eq!(clean("wait..."), "wait.");
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   "), "");
        assert_eq!(clean("\u{0001}\u{0002}"), "");
    }

    #[test]
    fn test_idempotent_on_prose() {
        let samples = [
            "The quick brown fox jumps over the lazy dog.",
            "  Data ﬂows through the sys- tem , e . g . via queues ..  ",
            "hyphen- ated words ( and parentheses ) stay tidy",
            "Results were signi\u{FB01}cant; see Table 2 .",
            "a dog, a cat and I",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
