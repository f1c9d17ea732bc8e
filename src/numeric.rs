//! Numeric placeholder codec.
//!
//! Numbers are the part of a UI string the model is most likely to mangle:
//! it may recompute them, reformat them, or convert calendar systems on its
//! own. Before a backend call every numeric literal is replaced by a
//! positional `[[NUMn]]` token; after the call the tokens are substituted
//! back and, for locales with a native digit alphabet, remapped to native
//! glyphs. Calendar adjustment (Thai Buddhist era) happens here, at
//! preprocess time, so the prompt can tell the model the value is already
//! final.

use crate::locale::Locale;
use regex::Regex;
use std::sync::OnceLock;

static NUM_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches decade forms (`1990s`/`1990S`), grouped integers (`1,234`) and
/// decimals (`1.5`).
fn num_regex() -> &'static Regex {
    NUM_REGEX.get_or_init(|| Regex::new(r"\d{4}[sS]|\d+(?:,\d{3})*(?:\.\d+)?").unwrap())
}

/// Matches `[[NUMn]]` tokens, tolerating model casing drift.
fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"(?i)\[\[NUM(\d+)\]\]").unwrap())
}

/// Unit vocabulary used to decide whether an integer is a quantity rather
/// than a calendar year. Compared as whole words, case-insensitively.
const UNITS: &[&str] = &[
    "MB", "GB", "KB", "TB", "PB", "BYTE", "BYTES", "BIT", "BITS", "M", "KM", "CM", "MM", "NM",
    "METER", "METERS", "HECTARE", "HECTARES", "INCH", "INCHES", "FT", "FEET", "MILE", "MILES",
    "KG", "G", "MG", "LB", "OZ", "L", "ML", "MS", "S", "SEC", "MIN", "HR", "HOUR", "HOURS", "DAY",
    "DAYS", "WEEK", "WEEKS", "MONTH", "MONTHS", "HZ", "KHZ", "GHZ", "FPS", "PX", "PT", "DPI",
    "PPI", "VH", "VW", "REM", "EM", "DP", "SP", "PERCENT",
];

/// Currency signs and the percent sign, which may be glued directly to the
/// number (`฿1500`, `50%`).
const UNIT_SYMBOLS: &[char] = &['$', '€', '£', '¥', '฿', '%'];

/// Thai Buddhist-era offset applied to plausible Gregorian years.
const THAI_BE_OFFSET: i64 = 543;

/// Ordered mapping from `[[NUMn]]` tokens to the original numeric values.
///
/// Created fresh per translation call and discarded after postprocessing.
/// Values are stored post locale-adjustment and pre digit-translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMap {
    values: Vec<String>,
}

impl PlaceholderMap {
    /// The token text for position `index`.
    pub fn token(index: usize) -> String {
        format!("[[NUM{}]]", index)
    }

    /// The stored value for position `index`, if any.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// True when no numeric literal was masked.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of masked values.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Mask every numeric literal in `text` with a positional token.
///
/// Matched values are normalized before storage: thousands separators are
/// stripped and a trailing decade `s` is removed. For Thai, an integer in
/// `[1000, 2099]` is shifted to the Buddhist era unless it directly neighbors
/// a recognized unit-of-measure or currency token, in which case that number
/// is a quantity and must not be reinterpreted as a year. The check is
/// per match: a unit elsewhere in the text leaves other numbers unaffected.
pub fn preprocess(text: &str, locale: Locale) -> (String, PlaceholderMap) {
    let mut values = Vec::new();
    let mut masked = String::with_capacity(text.len());
    let mut last = 0;

    for m in num_regex().find_iter(text) {
        masked.push_str(&text[last..m.start()]);

        let mut val = m.as_str().to_string();
        if val.ends_with(['s', 'S']) {
            val.pop();
        }
        val = val.replace(',', "");

        if locale.code() == "th" && !adjacent_to_unit(text, m.start(), m.end()) {
            if let Ok(number) = val.parse::<i64>() {
                if (1000..=2099).contains(&number) {
                    val = (number + THAI_BE_OFFSET).to_string();
                }
            }
        }

        masked.push_str(&PlaceholderMap::token(values.len()));
        values.push(val);
        last = m.end();
    }
    masked.push_str(&text[last..]);

    (masked, PlaceholderMap { values })
}

/// Restore masked numeric values in the model output.
///
/// Token matching is case-insensitive. For locales with a native digit
/// alphabet the restored value is digit-remapped; remapping is applied to the
/// substituted value only, strictly after token substitution, so the token
/// text itself is never corrupted. Tokens the model failed to reproduce are
/// simply absent and the output is left as-is; the quality gate surfaces
/// that defect, it is not repaired here.
pub fn postprocess(translated: &str, map: &PlaceholderMap, locale: Locale) -> String {
    if map.is_empty() {
        return translated.to_string();
    }

    placeholder_regex()
        .replace_all(translated, |caps: &regex::Captures<'_>| {
            let index: usize = match caps[1].parse() {
                Ok(i) => i,
                Err(_) => return caps[0].to_string(),
            };
            match map.value(index) {
                Some(val) => match locale.native_digits() {
                    Some(digits) => remap_digits(val, digits),
                    None => val.to_string(),
                },
                // Unknown position: leave the token in place.
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// True when the numeric match at `start..end` directly neighbors a unit or
/// currency token. Currency signs and `%` count even when glued to the
/// number; alphabetic units are compared as whole words, so "Cambodia" next
/// to a number does not register as a metre.
fn adjacent_to_unit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].trim_end();
    let after = text[end..].trim_start();

    if before
        .chars()
        .next_back()
        .is_some_and(|c| UNIT_SYMBOLS.contains(&c))
        || after.chars().next().is_some_and(|c| UNIT_SYMBOLS.contains(&c))
    {
        return true;
    }

    let prev_word: String = before
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let next_word: String = after.chars().take_while(|c| c.is_alphanumeric()).collect();

    is_unit_word(&prev_word) || is_unit_word(&next_word)
}

fn is_unit_word(word: &str) -> bool {
    !word.is_empty() && UNITS.iter().any(|unit| unit.eq_ignore_ascii_case(word))
}

/// Remap each Arabic digit character to the given native glyph alphabet.
fn remap_digits(input: &str, native_digits: &str) -> String {
    let glyphs: Vec<char> = native_digits.chars().collect();
    input
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => glyphs[d as usize],
            None => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).expect("test locale should exist")
    }

    // ==================== Preprocess Tests ====================

    #[test]
    fn test_preprocess_masks_in_order() {
        let (masked, map) = preprocess("From 1990 to 2005", locale("de"));
        assert_eq!(masked, "From [[NUM0]] to [[NUM1]]");
        assert_eq!(map.value(0), Some("1990"));
        assert_eq!(map.value(1), Some("2005"));
    }

    #[test]
    fn test_preprocess_strips_thousands_separators() {
        let (masked, map) = preprocess("Population: 1,234,567", locale("fr"));
        assert_eq!(masked, "Population: [[NUM0]]");
        assert_eq!(map.value(0), Some("1234567"));
    }

    #[test]
    fn test_preprocess_decade_form() {
        let (masked, map) = preprocess("Built in the 1990s", locale("fr"));
        assert_eq!(masked, "Built in the [[NUM0]]");
        assert_eq!(map.value(0), Some("1990"));
    }

    #[test]
    fn test_preprocess_decade_uppercase() {
        let (masked, map) = preprocess("Built in the 1990S", locale("fr"));
        assert_eq!(masked, "Built in the [[NUM0]]");
        assert_eq!(map.value(0), Some("1990"));
    }

    #[test]
    fn test_preprocess_decimal() {
        let (_, map) = preprocess("about 1.5 of them", locale("es"));
        assert_eq!(map.value(0), Some("1.5"));
    }

    #[test]
    fn test_preprocess_no_numbers() {
        let (masked, map) = preprocess("No digits here", locale("km"));
        assert_eq!(masked, "No digits here");
        assert!(map.is_empty());
    }

    // ==================== Thai Buddhist Era Tests ====================

    #[test]
    fn test_thai_year_shifted_to_buddhist_era() {
        let (_, map) = preprocess("Founded in 1990", locale("th"));
        assert_eq!(map.value(0), Some("2533"));
    }

    #[test]
    fn test_thai_year_with_unit_left_alone() {
        let (_, map) = preprocess("Download 1990 MB now", locale("th"));
        assert_eq!(map.value(0), Some("1990"));
    }

    #[test]
    fn test_thai_currency_sign_suppresses_shift() {
        let (_, map) = preprocess("Price: ฿1500", locale("th"));
        assert_eq!(map.value(0), Some("1500"));
    }

    #[test]
    fn test_thai_small_number_not_shifted() {
        let (_, map) = preprocess("Page 42", locale("th"));
        assert_eq!(map.value(0), Some("42"));
    }

    #[test]
    fn test_thai_out_of_range_year_not_shifted() {
        let (_, map) = preprocess("In 2150 we will know", locale("th"));
        assert_eq!(map.value(0), Some("2150"));
    }

    #[test]
    fn test_non_thai_year_not_shifted() {
        let (_, map) = preprocess("Founded in 1990", locale("lo"));
        assert_eq!(map.value(0), Some("1990"));
    }

    #[test]
    fn test_thai_neighbor_words_compared_whole() {
        // "Kampot" and "Cambodia" contain unit letters only inside words;
        // neither neighbor is a unit token.
        let (_, map) = preprocess("Kampot 1990 Cambodia", locale("th"));
        assert_eq!(map.value(0), Some("2533"));
    }

    #[test]
    fn test_thai_capital_letters_elsewhere_do_not_suppress() {
        let (_, map) = preprocess("Settings changed in 1990", locale("th"));
        assert_eq!(map.value(0), Some("2533"));
        let (_, map) = preprocess("Member since 1990", locale("th"));
        assert_eq!(map.value(0), Some("2533"));
    }

    #[test]
    fn test_thai_unit_only_suppresses_adjacent_number() {
        let (_, map) = preprocess("Since 2019, limit 1500 MB", locale("th"));
        assert_eq!(map.value(0), Some("2562"));
        assert_eq!(map.value(1), Some("1500"));
    }

    #[test]
    fn test_thai_glued_unit_suppresses_shift() {
        let (_, map) = preprocess("Quota 1500MB reached", locale("th"));
        assert_eq!(map.value(0), Some("1500"));
    }

    // ==================== Postprocess Tests ====================

    #[test]
    fn test_postprocess_restores_values() {
        let (masked, map) = preprocess("From 1990 to 2005", locale("de"));
        let restored = postprocess(&masked, &map, locale("de"));
        assert_eq!(restored, "From 1990 to 2005");
    }

    #[test]
    fn test_postprocess_case_insensitive_tokens() {
        let (_, map) = preprocess("Year 1990", locale("de"));
        let restored = postprocess("Jahr [[num0]]", &map, locale("de"));
        assert_eq!(restored, "Jahr 1990");
    }

    #[test]
    fn test_postprocess_khmer_digits() {
        let (_, map) = preprocess("in 2024", locale("km"));
        let restored = postprocess("ក្នុង [[NUM0]]", &map, locale("km"));
        assert_eq!(restored, "ក្នុង ២០២៤");
    }

    #[test]
    fn test_postprocess_thai_digits_after_era_shift() {
        let (_, map) = preprocess("in 1990", locale("th"));
        let restored = postprocess("ในปี [[NUM0]]", &map, locale("th"));
        assert_eq!(restored, "ในปี ๒๕๓๓");
    }

    #[test]
    fn test_postprocess_lao_digits() {
        let (_, map) = preprocess("room 304", locale("lo"));
        let restored = postprocess("ຫ້ອງ [[NUM0]]", &map, locale("lo"));
        assert_eq!(restored, "ຫ້ອງ ໓໐໔");
    }

    #[test]
    fn test_postprocess_missing_token_leaves_output_untouched() {
        let (_, map) = preprocess("Year 1990", locale("de"));
        // Model reworded and dropped the token entirely.
        let restored = postprocess("Jahr neunzehnhundertneunzig", &map, locale("de"));
        assert_eq!(restored, "Jahr neunzehnhundertneunzig");
    }

    #[test]
    fn test_postprocess_unknown_index_kept_verbatim() {
        let (_, map) = preprocess("Year 1990", locale("de"));
        let restored = postprocess("[[NUM7]]", &map, locale("de"));
        assert_eq!(restored, "[[NUM7]]");
    }

    #[test]
    fn test_postprocess_no_arabic_digit_remains_in_numeric_spans() {
        for code in ["km", "lo", "th"] {
            let (_, map) = preprocess("From 1,234 to 99", locale(code));
            let restored = postprocess("[[NUM0]] - [[NUM1]]", &map, locale(code));
            assert!(
                !restored.chars().any(|c| c.is_ascii_digit()),
                "{}: {}",
                code,
                restored
            );
        }
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_adjacent_to_unit() {
        // "10" in "10 km away"
        assert!(adjacent_to_unit("10 km away", 0, 2));
        // "1990" in "Kampot 1990 city"
        assert!(!adjacent_to_unit("Kampot 1990 city", 7, 11));
        // "50" in "at 50% off"
        assert!(adjacent_to_unit("at 50% off", 3, 5));
    }

    #[test]
    fn test_remap_digits_preserves_non_digits() {
        assert_eq!(remap_digits("1.5%", "๐๑๒๓๔๕๖๗๘๙"), "๑.๕%");
    }
}
