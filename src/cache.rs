//! Persistent per-locale translation cache.
//!
//! Deduplicates identical source strings (the same label appears in dozens
//! of resource files) and doubles as the source of few-shot style examples
//! for the prompt assembler. One JSON document per locale; keys are
//! `locale||normalized-text`, values are accepted translations. Lookup is
//! case-insensitive; writes persist the whole table immediately so an
//! interrupted run loses at most the in-flight entry.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Clip for history example text; keeps the prompt bounded.
const HISTORY_CLIP: usize = 200;

/// Maximum number of style examples fed to the prompt assembler.
const HISTORY_LIMIT: usize = 5;

/// Strip CR, collapse LF to space, trim. All cache keys derive from this
/// form so entries differing only by line-break style share a slot.
pub fn normalize(text: &str) -> String {
    text.replace('\r', "").replace('\n', " ").trim().to_string()
}

/// Build the cache key for a locale/source pair.
pub fn cache_key(locale: &str, text: &str) -> String {
    format!("{}||{}", locale, normalize(text))
}

struct Slot {
    /// Key as written to storage (original casing preserved).
    key: String,
    value: String,
}

/// In-memory cache for one locale, backed by `cache_<locale>.json`.
pub struct TranslationCache {
    locale: String,
    path: PathBuf,
    /// Keyed by the lowercased storage key for case-insensitive lookup.
    entries: HashMap<String, Slot>,
}

impl TranslationCache {
    /// Load the cache for `locale` from `dir`, starting fresh when the file
    /// is absent or unreadable. Keys are re-normalized while loading so a
    /// hand-edited file cannot introduce raw line breaks.
    pub fn load(dir: &Path, locale: &str) -> Self {
        let path = dir.join(format!("cache_{}.json", locale));
        let mut entries = HashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<HashMap<String, String>>(&json) {
                Ok(loaded) => {
                    for (raw_key, value) in loaded {
                        let key = normalize(&raw_key);
                        entries.insert(key.to_lowercase(), Slot { key, value });
                    }
                    info!(
                        "Loaded cache [{}] with {} entries",
                        path.display(),
                        entries.len()
                    );
                }
                Err(_) => {
                    warn!("Failed to read cache [{}], starting fresh", path.display());
                }
            },
            Err(_) => {
                info!("No existing cache [{}], starting fresh", path.display());
            }
        }

        Self {
            locale: locale.to_string(),
            path,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the accepted translation for `text`, case-insensitively.
    pub fn get(&self, text: &str) -> Option<&str> {
        let key = cache_key(&self.locale, text).to_lowercase();
        self.entries.get(&key).map(|slot| slot.value.as_str())
    }

    /// Insert or overwrite the translation for `text` and persist the whole
    /// table. A persistence failure is logged and does not abort the
    /// in-memory update; the next successful write retries it.
    pub fn put(&mut self, text: &str, translation: &str) {
        let key = cache_key(&self.locale, text);
        self.entries.insert(
            key.to_lowercase(),
            Slot {
                key,
                value: translation.to_string(),
            },
        );
        if let Err(e) = self.persist() {
            warn!("Cache save error [{}]: {:#}", self.path.display(), e);
        }
    }

    /// Write the table to storage as pretty JSON. Non-Latin scripts must
    /// round-trip exactly; serde_json leaves non-ASCII text unescaped.
    fn persist(&self) -> Result<()> {
        let mut map = serde_json::Map::new();
        let mut slots: Vec<&Slot> = self.entries.values().collect();
        slots.sort_by(|a, b| a.key.cmp(&b.key));
        for slot in slots {
            map.insert(
                slot.key.clone(),
                serde_json::Value::String(slot.value.clone()),
            );
        }
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Remove every entry whose value fails `keep`, returning the removed
    /// `(display_key, value)` pairs. Used by the leak-scan mode to force
    /// contaminated entries back through the backend. The purge is persisted
    /// immediately when anything was removed.
    pub fn purge_where<F>(&mut self, offending: F) -> Vec<(String, String)>
    where
        F: Fn(&str) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| offending(&slot.value))
            .map(|(lower, _)| lower.clone())
            .collect();

        let mut removed = Vec::new();
        for lower in doomed {
            if let Some(slot) = self.entries.remove(&lower) {
                let display = slot
                    .key
                    .rsplit("||")
                    .next()
                    .unwrap_or(&slot.key)
                    .to_string();
                removed.push((display, slot.value));
            }
        }

        if !removed.is_empty() {
            if let Err(e) = self.persist() {
                warn!("Cache save error [{}]: {:#}", self.path.display(), e);
            }
        }
        removed
    }

    /// Up to five prior `(source, translation)` pairs ranked for style
    /// relevance to `text`: shared glossary terms weigh heaviest, then shared
    /// word tokens longer than three characters, then substring containment
    /// in either direction; longer prior sources break ties. Long examples
    /// are clipped to keep the prompt bounded.
    pub fn history_examples(
        &self,
        text: &str,
        glossary_hits: &[(String, String)],
    ) -> Vec<(String, String)> {
        let prefix_len = self.locale.len() + 2; // "lang||"
        let text_lower = text.to_lowercase();
        let current_words: Vec<String> = text
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(str::to_lowercase)
            .collect();
        let glossary_lower: Vec<String> = glossary_hits
            .iter()
            .map(|(term, _)| term.to_lowercase())
            .collect();

        let mut scored: Vec<(i64, String, String)> = self
            .entries
            .values()
            .filter_map(|slot| {
                let original = slot.key.get(prefix_len..)?;
                let original_lower = original.to_lowercase();

                let glossary_score = glossary_lower
                    .iter()
                    .filter(|g| original_lower.contains(g.as_str()))
                    .count() as i64;
                let word_score = current_words
                    .iter()
                    .filter(|w| original_lower.contains(w.as_str()))
                    .count() as i64;
                let is_substring = text_lower.contains(&original_lower)
                    || original_lower.contains(&text_lower);

                if glossary_score == 0 && word_score == 0 && !is_substring {
                    return None;
                }

                let score = glossary_score * 10_000 + word_score * 1_000 + original.len() as i64;
                Some((score, original.to_string(), slot.value.clone()))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(HISTORY_LIMIT)
            .map(|(_, source, translation)| (clip(&source), clip(&translation)))
            .collect()
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() > HISTORY_CLIP + 3 {
        let clipped: String = text.chars().take(HISTORY_CLIP).collect();
        format!("{}...", clipped)
    } else {
        text.to_string()
    }
}
