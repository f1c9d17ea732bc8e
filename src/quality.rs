//! Quality gate: output sanitization and defect detection.
//!
//! The backend occasionally returns the English source unchanged ("echo"),
//! leaves Latin fragments inside a non-Latin translation ("script leakage"),
//! or wraps its answer in quotes, meta annotations and decorative arrows.
//! Sanitization is always applied; echo and leak findings are flagged for
//! human review but the translation is still accepted and cached — a model
//! call is expensive, so the gate reports rather than blocks.

use crate::glossary::EchoExclusions;
use crate::locale::Locale;
use regex::Regex;

/// Positional similarity above which a translation counts as an echo.
const ECHO_THRESHOLD: f64 = 0.9;

/// Zero-width and BOM characters the model sprinkles into Lao/Thai output.
const INVISIBLES: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Quote and whitespace characters trimmed from both ends of the output.
const TRIM_SET: [char; 11] = [
    ' ', '"', '\'', '„', '“', '”', '「', '」', '\n', '\r', '\t',
];

/// Clean raw backend output: invisible characters, single-bracket meta
/// annotations, decorative arrows, and wrapping quotes.
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut cleaned: String = raw.chars().filter(|c| !INVISIBLES.contains(c)).collect();
    cleaned = strip_meta_brackets(&cleaned);
    cleaned = cleaned.replace("➡️", "").replace("->", "");
    cleaned.trim_matches(&TRIM_SET[..]).to_string()
}

/// Remove single, non-nested `[...]` spans while leaving `[[...]]`
/// placeholder tokens intact.
fn strip_meta_brackets(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '['
            && (i == 0 || chars[i - 1] != '[')
            && chars.get(i + 1).is_some_and(|&c| c != '[')
        {
            // Find a closing bracket with no nesting in between.
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '[' && chars[j] != ']' {
                j += 1;
            }
            let closes = j > i + 1
                && chars.get(j) == Some(&']')
                && chars.get(j + 1) != Some(&']');
            if closes {
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// If the source is a single line but the model dumped several, keep only
/// the first non-empty line.
pub fn reduce_list_dump(source: &str, translated: &str) -> String {
    if source.contains('\n') || !translated.contains('\n') {
        return translated.to_string();
    }
    translated
        .split(['\r', '\n'])
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

/// UI labels rarely end in sentence punctuation; strip any the model added
/// when the source had none.
pub fn trim_terminal_punct(source: &str, translated: &str) -> String {
    if source.ends_with('.') || source.ends_with('!') || source.ends_with('?') {
        return translated.to_string();
    }
    translated.trim_end_matches(['.', '!', '?']).to_string()
}

/// Lowercase and collapse internal whitespace to single spaces.
fn normalize_ws(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Detect a backend output that is the English source unchanged or nearly so.
///
/// Exact match after whitespace normalization is an echo; otherwise the
/// positional character-overlap ratio (identical characters at the same
/// index over the longer length) is compared against 0.9. Deliberately not
/// edit distance: the dominant failure mode is the source coming back with
/// only casing or punctuation drift, which positional overlap catches
/// cheaply.
pub fn is_echo(source: &str, translated: &str) -> bool {
    let s = normalize_ws(source);
    let t = normalize_ws(translated);

    if s == t {
        return true;
    }

    let same = s
        .chars()
        .zip(t.chars())
        .filter(|(a, b)| a == b)
        .count();
    let longer = s.chars().count().max(t.chars().count());
    if longer == 0 {
        return false;
    }
    same as f64 / longer as f64 > ECHO_THRESHOLD
}

/// Detect residual Latin script in an output expected to be fully non-Latin.
///
/// Only evaluated for non-Latin-script locales. Excluded words are removed
/// by literal substring match rather than word boundaries, intentionally, so
/// a borrowed word glued to local-script punctuation is still scrubbed.
pub fn is_leak(locale: Locale, translated: &str, exclusions: &EchoExclusions) -> bool {
    if !locale.is_non_latin() {
        return false;
    }

    let mut scrubbed: String = translated
        .chars()
        .filter(|c| !INVISIBLES.contains(c))
        .collect();

    for word in exclusions.scrub_words(locale.code()) {
        if word.is_empty() {
            continue;
        }
        // Literal, case-insensitive removal.
        if let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(word))) {
            scrubbed = re.replace_all(&scrubbed, "").into_owned();
        }
    }

    scrubbed
        .chars()
        .any(|c| c.is_ascii_alphabetic() || c == '&')
}

/// An exact source/target match that the exclusion config accepts as a
/// legitimate borrowed word or name. Lets intentional echoes through the
/// echo flag without triggering review.
pub fn is_excluded(locale: Locale, source: &str, translated: &str, exclusions: &EchoExclusions) -> bool {
    let src = source.trim();
    let trg = translated.trim();

    if src.to_lowercase() != trg.to_lowercase() {
        return false;
    }
    exclusions.contains(locale.code(), src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).expect("test locale should exist")
    }

    fn exclusions(global: &[&str], locale_code: &str, local: &[&str]) -> EchoExclusions {
        let mut locales = HashMap::new();
        if !local.is_empty() {
            locales.insert(
                locale_code.to_string(),
                local.iter().map(|s| s.to_lowercase()).collect::<HashSet<_>>(),
            );
        }
        EchoExclusions {
            global: global.iter().map(|s| s.to_lowercase()).collect(),
            locales,
        }
    }

    // ==================== Sanitize Tests ====================

    #[test]
    fn test_sanitize_strips_meta_annotation() {
        assert_eq!(sanitize("Bonjour [New fr meta]"), "Bonjour");
    }

    #[test]
    fn test_sanitize_keeps_placeholder_tokens() {
        assert_eq!(sanitize("ປີ [[NUM0]] ແລ້ວ"), "ປີ [[NUM0]] ແລ້ວ");
    }

    #[test]
    fn test_sanitize_strips_invisible_characters() {
        assert_eq!(sanitize("ສະ\u{200B}ບາຍ\u{FEFF}ດີ"), "ສະບາຍດີ");
    }

    #[test]
    fn test_sanitize_strips_arrows() {
        assert_eq!(sanitize("➡️ Xin chào ->"), "Xin chào");
    }

    #[test]
    fn test_sanitize_trims_quotes() {
        assert_eq!(sanitize("\"Guten Tag\""), "Guten Tag");
        assert_eq!(sanitize("„Hallo“"), "Hallo");
        assert_eq!(sanitize("「こんにちは」"), "こんにちは");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_strip_meta_brackets_unclosed_left_alone() {
        assert_eq!(strip_meta_brackets("open [bracket"), "open [bracket");
    }

    #[test]
    fn test_strip_meta_brackets_multiple_spans() {
        assert_eq!(strip_meta_brackets("[a] mid [b] end"), " mid  end");
    }

    // ==================== List Dump Tests ====================

    #[test]
    fn test_reduce_list_dump_single_line_source() {
        let out = reduce_list_dump("Questions", "\nCâu hỏi\nCâu trả lời\n");
        assert_eq!(out, "Câu hỏi");
    }

    #[test]
    fn test_reduce_list_dump_multiline_source_untouched() {
        let out = reduce_list_dump("Q\nA", "Câu hỏi\nCâu trả lời");
        assert_eq!(out, "Câu hỏi\nCâu trả lời");
    }

    #[test]
    fn test_reduce_list_dump_no_newline_in_output() {
        assert_eq!(reduce_list_dump("Questions", "Câu hỏi"), "Câu hỏi");
    }

    // ==================== Terminal Punctuation Tests ====================

    #[test]
    fn test_trim_terminal_punct_strips_when_source_has_none() {
        assert_eq!(trim_terminal_punct("Save", "Speichern."), "Speichern");
        assert_eq!(trim_terminal_punct("Save", "Speichern!?."), "Speichern");
    }

    #[test]
    fn test_trim_terminal_punct_kept_when_source_ends_with_one() {
        assert_eq!(trim_terminal_punct("Done.", "Fertig."), "Fertig.");
        assert_eq!(trim_terminal_punct("Really?", "Wirklich?"), "Wirklich?");
    }

    // ==================== Echo Tests ====================

    #[test]
    fn test_is_echo_exact_case_insensitive() {
        assert!(is_echo("Help", "help"));
    }

    #[test]
    fn test_is_echo_whitespace_collapsed() {
        assert!(is_echo("Help  me", "help me"));
    }

    #[test]
    fn test_is_echo_translated_text() {
        assert!(!is_echo("Settings", "Einstellungen"));
    }

    #[test]
    fn test_is_echo_near_identical_drift() {
        // Only the final character differs across 40 characters.
        let source = "The quick brown fox jumps over the dogs";
        let drifted = "The quick brown fox jumps over the dogz";
        assert!(is_echo(source, drifted));
    }

    #[test]
    fn test_is_echo_empty_translation() {
        assert!(!is_echo("Hello", ""));
    }

    // ==================== Leak Tests ====================

    #[test]
    fn test_is_leak_latin_residue() {
        let excl = EchoExclusions::default();
        assert!(is_leak(locale("zh"), "您好World", &excl));
    }

    #[test]
    fn test_is_leak_clean_output() {
        let excl = EchoExclusions::default();
        assert!(!is_leak(locale("zh"), "您好", &excl));
    }

    #[test]
    fn test_is_leak_latin_locale_never_checked() {
        let excl = EchoExclusions::default();
        assert!(!is_leak(locale("en"), "Hello", &excl));
        assert!(!is_leak(locale("fr"), "Bonjour", &excl));
    }

    #[test]
    fn test_is_leak_ampersand_counts() {
        let excl = EchoExclusions::default();
        assert!(is_leak(locale("km"), "ជំនួយ & ការគាំទ្រ", &excl));
    }

    #[test]
    fn test_is_leak_excluded_word_scrubbed() {
        let excl = exclusions(&["BOINC"], "zh", &[]);
        assert!(!is_leak(locale("zh"), "您好BOINC", &excl));
    }

    #[test]
    fn test_is_leak_scrub_glued_to_punctuation() {
        // Not word-boundary-aware on purpose: the word touches local-script
        // punctuation and must still be scrubbed.
        let excl = exclusions(&[], "lo", &["Kampot"]);
        assert!(!is_leak(locale("lo"), "ກຳປອດ(kampot)ແມ່ນ", &excl));
    }

    #[test]
    fn test_is_leak_invisibles_scrubbed_first() {
        let excl = exclusions(&["AI"], "th", &[]);
        assert!(!is_leak(locale("th"), "ระบบ A\u{200B}I", &excl));
    }

    // ==================== Exclusion Tests ====================

    #[test]
    fn test_is_excluded_exact_match_in_set() {
        let excl = exclusions(&["Kampot"], "km", &[]);
        assert!(is_excluded(locale("km"), "Kampot", "kampot", &excl));
    }

    #[test]
    fn test_is_excluded_requires_exact_match() {
        let excl = exclusions(&["Kampot"], "km", &[]);
        assert!(!is_excluded(locale("km"), "Kampot", "Kampot city", &excl));
    }

    #[test]
    fn test_is_excluded_requires_membership() {
        let excl = EchoExclusions::default();
        assert!(!is_excluded(locale("km"), "Kampot", "Kampot", &excl));
    }

    #[test]
    fn test_is_excluded_locale_specific() {
        let excl = exclusions(&[], "km", &["Durian"]);
        assert!(is_excluded(locale("km"), "Durian", "durian", &excl));
        assert!(!is_excluded(locale("zh"), "Durian", "durian", &excl));
    }
}
