//! Command-line arguments.
//!
//! Flags take space-separated value lists terminated by the next flag:
//! `-l km zh -p seahorse durian -f`.

use crate::locale::Locale;
use tracing::warn;

pub const HELP_TEXT: &str = "\
==============================
TRANSLATION TOOL - HELP
==============================
-l  | restrict target languages      | -l zh or -l km zh
-p  | restrict resource files (stem) | -p seahorse or -p seahorse durian
-d  | restrict Resources subfolders  | -d city or -d city offices
-f  | force overwrite cache
-hl | leakage scan: re-translate cached entries with Latin characters in non-Latin languages
-h  | this help
==============================";

#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    pub langs: Vec<String>,
    pub resources: Vec<String>,
    pub dirs: Vec<String>,
    pub force: bool,
    pub leak_scan: bool,
    pub help: bool,
}

/// Collect values following the flag at `index`, stopping at the next flag.
fn values_after(args: &[String], index: usize) -> Vec<String> {
    args[index + 1..]
        .iter()
        .take_while(|a| !a.starts_with('-'))
        .cloned()
        .collect()
}

pub fn parse(args: &[String]) -> CliArgs {
    let mut parsed = CliArgs {
        force: args.iter().any(|a| a == "-f"),
        leak_scan: args.iter().any(|a| a == "-hl"),
        help: args.iter().any(|a| a == "-h"),
        ..CliArgs::default()
    };

    if let Some(i) = args.iter().position(|a| a == "-l") {
        parsed.langs = values_after(args, i);
    }
    if let Some(i) = args.iter().position(|a| a == "-p") {
        parsed.resources = values_after(args, i);
    }
    if let Some(i) = args.iter().position(|a| a == "-d") {
        parsed.dirs = values_after(args, i);
    }

    parsed
}

/// Map requested language codes to known target locales.
///
/// Unknown codes are warned about and skipped; an empty (or fully invalid)
/// selection falls back to all target locales.
pub fn resolve_langs(requested: &[String]) -> Vec<Locale> {
    let mut selected = Vec::new();
    for code in requested {
        let lower = code.to_lowercase();
        match Locale::from_code(&lower) {
            Ok(locale) if !locale.is_canonical() => selected.push(locale),
            _ => warn!("Unknown language '{}', skipping", code),
        }
    }
    if selected.is_empty() {
        if !requested.is_empty() {
            warn!("No valid languages selected, using all target languages");
        }
        return Locale::all_targets();
    }
    selected
}
