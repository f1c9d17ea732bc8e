//! Prompt assembly.
//!
//! Builds the single instruction block sent to the backend for one entry.
//! Pure functions of their inputs: the pipeline resolves glossary hits,
//! no-translate hits and history examples against its snapshots first, so a
//! concurrent config reload can never produce a half-updated prompt.
//!
//! Section order is fixed: role statement, mandatory term mapping,
//! no-translate terms, previous style examples, numeric rule, style rule,
//! placeholder-preservation rule, closing constraints, and finally the
//! masked source text.

use crate::locale::Locale;

/// Build the full prompt for one masked source text.
pub fn build(
    masked_text: &str,
    locale: Locale,
    glossary_hits: &[(String, String)],
    no_translate_hits: &[String],
    history: &[(String, String)],
) -> String {
    let lang_name = locale.name();

    let glossary_part = format_glossary(glossary_hits);
    let nt_part = format_no_translate(no_translate_hits);
    let history_part = format_history(history);
    let number_line = format!("- {}\n", number_instruction(locale));
    let style_part = style_instruction(locale);
    let style_line = if style_part.is_empty() {
        String::new()
    } else {
        format!("- {}\n", style_part)
    };
    let placeholder_line = if masked_text.contains("[[NUM") || masked_text.contains("[[TERM") {
        "- CRITICAL: Do NOT translate text inside [[brackets]].\n- Keep [[NUM0]] exactly as it is.\n"
    } else {
        ""
    };

    format!(
        r#"[INST]
You are a professional English to {lang_name} translator for .resx software files.

RULES:
1. GLOSSARY: {glossary}{nt}
2. CONTEXT: {history}

CONSTRAINTS:
{number_line}{style_line}{placeholder_line}- Keep translation length similar to source.
- NO explanations, NO quotes, NO [meta] tags.
- The output MUST be written in {lang_name}.
[/INST]


{masked_text}"#,
        lang_name = lang_name,
        glossary = if glossary_part.is_empty() {
            "None provided."
        } else {
            &glossary_part
        },
        nt = nt_part,
        history = if history_part.is_empty() {
            "No previous examples."
        } else {
            &history_part
        },
        number_line = number_line,
        style_line = style_line,
        placeholder_line = placeholder_line,
        masked_text = masked_text,
    )
}

/// Mandatory term-mapping section; empty when nothing matched.
fn format_glossary(hits: &[(String, String)]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let terms: Vec<String> = hits
        .iter()
        .map(|(term, value)| format!("* {} == {}", term, value))
        .collect();
    format!(
        "CRITICAL TERM MAPPING (Mandatory):\n{}\n- You MUST use these values.",
        terms.join("\n")
    )
}

/// STRICT no-translate section; empty when nothing matched.
fn format_no_translate(hits: &[String]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    format!(
        "\nSTRICT: Do NOT translate or modify these terms: {}",
        hits.join(", ")
    )
}

/// Previous style examples; empty when the cache had nothing relevant.
fn format_history(history: &[(String, String)]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let examples: Vec<String> = history
        .iter()
        .map(|(source, translation)| format!("- {} => {}", source, translation))
        .collect();
    format!("PREVIOUS STYLE EXAMPLES:\n{}", examples.join("\n"))
}

/// Per-locale numeric formatting rule.
///
/// Thai, Lao and Khmer numbers were already adjusted and masked by the
/// numeric codec, so their rules tell the model to keep placeholders
/// untouched rather than to recompute anything.
pub fn number_instruction(locale: Locale) -> String {
    let lang_name = locale.name();
    match locale.code() {
        "km" => "Use Khmer numerals (០-៩) ONLY for dates and years (e.g., '២០២៦'). For all other technical values, prices, and IDs, maintain Arabic numerals (0-9). Do NOT perform arithmetic or convert calendar systems.".to_string(),
        "zh" => "For Chinese: Use Arabic numerals for years (e.g., '2026年'). Use standard Arabic numerals for most technical contexts. Maintain original formatting for measurements.".to_string(),
        "th" => "The year/number in [[NUM0]] is already formatted for Thai context. Keep it exactly as provided. Display digits using Thai numerals (๐-๙).".to_string(),
        "ja" => "For Japanese: Use Arabic numerals for years and centuries (e.g., '2026年', '21世紀'). Use Arabic numerals for all technical values, counts, and measurements (e.g., '5MB', '12人'). Only use Kanji numerals (一, 二, 三) if they are part of a fixed formal name or idiom.".to_string(),
        "lo" => "Preserve all numeric values exactly. Do NOT perform arithmetic or convert calendar systems. Display digits using Lao numerals (໐-໙).".to_string(),
        "sv" => format!(
            "For {}: Use Arabic numerals. Use a space for thousands and a comma for decimals (e.g., 1 234,56).",
            lang_name
        ),
        "fr" | "de" | "it" | "es" | "pt" | "ru" | "nl" | "cs" => format!(
            "For {}: Use Arabic numerals. Use a dot (.) for thousands and a comma (,) for decimals (e.g., 1.234,56).",
            lang_name
        ),
        "vi" => "Use Arabic numerals: use a dot (.) for thousands and a comma (,) for decimals. For years, always include the word 'năm' (e.g., 'năm 2024').".to_string(),
        "hi" => "Use standard Arabic numerals (0-9). Devanagari numerals are not required for this modern UI context.".to_string(),
        _ => "Maintain standard Arabic numerals and original numeric formatting.".to_string(),
    }
}

/// Per-locale script/spacing style rule; empty for locales without one.
pub fn style_instruction(locale: Locale) -> String {
    let lang_name = locale.name();
    match locale.code() {
        "de" | "nl" | "sv" => format!(
            "CRITICAL: Do NOT use hyphens (-) to join nouns. {} prefers compound words. \
             Examples of WRONG: 'Bus-Station', 'Durian-Frucht'. \
             Examples of CORRECT: 'Bus Station', 'Durianfrucht'. \
             If unsure, use a single space, NEVER a hyphen.",
            lang_name
        ),
        "ja" => "STYLE: Use a half-width space (standard space) between Japanese characters and English words or Arabic numerals (e.g., '20 世紀' or 'Windows 11').\n\
                 - TERMINOLOGY: Use Katakana for technical loanwords.\n\
                 - PUNCTUATION: Use Japanese full-width punctuation (。 and 、) instead of (. and ,)."
            .to_string(),
        "zh" => "STYLE: Do NOT use spaces between Chinese characters and English/Numbers. \
                 \n- PUNCTUATION: Use Chinese full-width punctuation (。，？！)."
            .to_string(),
        _ => String::new(),
    }
}
