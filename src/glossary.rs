//! Glossary and term stores.
//!
//! Four JSON-backed tables feed the pipeline:
//!
//! - `GlossaryStore` — per-locale mandatory term substitutions
//!   (`glossary.json`)
//! - `NoTranslateStore` — terms that must pass through every locale verbatim
//!   (`no_translate.json`)
//! - `ExclusionStore` — global + per-locale accepted-echo strings
//!   (`echo.json`)
//! - `KeyOverrides` — permanently pinned `(locale, key)` translations
//!   (`overrides.json`)
//!
//! The first three are hot-reloadable: a reload parses the file and replaces
//! the in-memory table wholesale by swapping an `Arc`, so in-flight
//! translations keep whichever snapshot they observed at prompt-build time
//! and a transient read failure never leaves the table empty.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Mapping `locale -> (term -> mandatory translation)`.
pub type GlossaryTable = HashMap<String, HashMap<String, String>>;

/// Case-insensitive substring containment.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Swap in a freshly parsed table, or keep the previous one on failure.
fn replace_or_keep<T>(slot: &RwLock<Arc<T>>, label: &str, loaded: Result<T>) -> Result<()> {
    match loaded {
        Ok(table) => {
            *slot.write().expect("store lock poisoned") = Arc::new(table);
            info!("{} loaded", label);
            Ok(())
        }
        Err(e) => {
            warn!("{} load failed, keeping previous table: {:#}", label, e);
            Err(e)
        }
    }
}

// ======================
// GLOSSARY
// ======================

/// Hot-reloadable glossary of mandatory term translations.
pub struct GlossaryStore {
    path: PathBuf,
    table: RwLock<Arc<GlossaryTable>>,
}

impl GlossaryStore {
    /// Create an empty store bound to `path` and attempt an initial load.
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        let store = Arc::new(Self {
            path: path.into(),
            table: RwLock::new(Arc::new(GlossaryTable::new())),
        });
        let _ = store.reload();
        store
    }

    /// Re-read the backing file, replacing the table atomically.
    ///
    /// On any read or parse failure the previous table is kept.
    pub fn reload(&self) -> Result<()> {
        replace_or_keep(&self.table, "glossary.json", read_table(&self.path))
    }

    /// The current table snapshot.
    pub fn snapshot(&self) -> Arc<GlossaryTable> {
        Arc::clone(&self.table.read().expect("store lock poisoned"))
    }

    /// Path of the backing file, for the reload watcher.
    pub fn path(&self) -> &Path {
        &self.path
    }

}

fn read_table(path: &Path) -> Result<GlossaryTable> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Every glossary term occurring in `text` as a case-insensitive substring,
/// ordered longest-term-first so overlapping terms resolve to the most
/// specific match when rendered into the prompt.
pub fn lookup_terms(table: &GlossaryTable, locale: &str, text: &str) -> Vec<(String, String)> {
    let Some(terms) = table.get(locale) else {
        return Vec::new();
    };
    let mut hits: Vec<(String, String)> = terms
        .iter()
        .filter(|(term, _)| contains_ci(text, term))
        .map(|(term, value)| (term.clone(), value.clone()))
        .collect();
    hits.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    hits
}

/// Exact-key glossary hit. Takes precedence over the cache and the backend.
pub fn exact_term(table: &GlossaryTable, locale: &str, key: &str) -> Option<String> {
    table.get(locale).and_then(|terms| terms.get(key)).cloned()
}

// ======================
// NO-TRANSLATE
// ======================

#[derive(Debug, Deserialize)]
struct NoTranslateFile {
    no_translate: Option<Vec<String>>,
}

/// Hot-reloadable set of terms preserved verbatim in every locale.
pub struct NoTranslateStore {
    path: PathBuf,
    terms: RwLock<Arc<Vec<String>>>,
}

impl NoTranslateStore {
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        let store = Arc::new(Self {
            path: path.into(),
            terms: RwLock::new(Arc::new(Vec::new())),
        });
        let _ = store.reload();
        store
    }

    pub fn reload(&self) -> Result<()> {
        let loaded = (|| -> Result<Vec<String>> {
            let json = std::fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            let file: NoTranslateFile = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", self.path.display()))?;
            Ok(file.no_translate.unwrap_or_default())
        })();
        replace_or_keep(&self.terms, "no_translate.json", loaded)
    }

    pub fn snapshot(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.terms.read().expect("store lock poisoned"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

}

/// No-translate terms literally present in `text` (case-insensitive).
pub fn no_translate_hits(terms: &[String], text: &str) -> Vec<String> {
    terms
        .iter()
        .filter(|t| contains_ci(text, t))
        .cloned()
        .collect()
}

// ======================
// ECHO EXCLUSIONS
// ======================

/// Accepted-echo strings: exact source/target matches that are legitimate
/// borrowed words or names rather than failed translations.
#[derive(Debug, Default)]
pub struct EchoExclusions {
    pub global: HashSet<String>,
    pub locales: HashMap<String, HashSet<String>>,
}

impl EchoExclusions {
    /// True when `term` is excluded globally or for `locale`
    /// (case-insensitive membership).
    pub fn contains(&self, locale: &str, term: &str) -> bool {
        let lower = term.to_lowercase();
        if self.global.contains(&lower) {
            return true;
        }
        self.locales
            .get(locale)
            .is_some_and(|set| set.contains(&lower))
    }

    /// All words to scrub before the leak check for `locale`: the global set
    /// followed by the locale-specific set.
    pub fn scrub_words(&self, locale: &str) -> impl Iterator<Item = &String> {
        self.global
            .iter()
            .chain(self.locales.get(locale).into_iter().flatten())
    }
}

#[derive(Debug, Deserialize)]
struct EchoFile {
    #[serde(default)]
    global: Vec<String>,
    #[serde(default)]
    languages: HashMap<String, Vec<String>>,
}

/// Hot-reloadable echo-exclusion configuration.
pub struct ExclusionStore {
    path: PathBuf,
    exclusions: RwLock<Arc<EchoExclusions>>,
}

impl ExclusionStore {
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        let store = Arc::new(Self {
            path: path.into(),
            exclusions: RwLock::new(Arc::new(EchoExclusions::default())),
        });
        let _ = store.reload();
        store
    }

    pub fn reload(&self) -> Result<()> {
        let loaded = (|| -> Result<EchoExclusions> {
            let json = std::fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            let file: EchoFile = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", self.path.display()))?;
            Ok(EchoExclusions {
                global: file.global.into_iter().map(|s| s.to_lowercase()).collect(),
                locales: file
                    .languages
                    .into_iter()
                    .map(|(lang, words)| {
                        (
                            lang,
                            words.into_iter().map(|s| s.to_lowercase()).collect(),
                        )
                    })
                    .collect(),
            })
        })();
        replace_or_keep(&self.exclusions, "echo.json", loaded)
    }

    pub fn snapshot(&self) -> Arc<EchoExclusions> {
        Arc::clone(&self.exclusions.read().expect("store lock poisoned"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

}

// ======================
// KEY OVERRIDES
// ======================

/// Permanently pinned `(locale, key) -> translation` entries.
///
/// Highest-precedence layer of the lookup chain; independent of source text
/// content, so neither the cache nor the backend is ever consulted for a
/// pinned key. Loaded once at startup; missing file means no overrides.
#[derive(Debug, Default)]
pub struct KeyOverrides {
    table: HashMap<String, HashMap<String, String>>,
}

impl KeyOverrides {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(table) => {
                    info!("overrides.json loaded");
                    Self { table }
                }
                Err(e) => {
                    warn!("overrides.json parse failed, ignoring: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        self.table
            .get(locale)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

}
