//! Run orchestration.
//!
//! Walks the selected resource files and target locales, driving each entry
//! through the lookup chain: key override, exact glossary hit, cache, and
//! finally the backend. The chain order is load-bearing: later layers write
//! the cache, earlier layers must win without touching it.

use crate::cache::TranslationCache;
use crate::config::Config;
use crate::glossary::{
    self, ExclusionStore, GlossaryStore, GlossaryTable, KeyOverrides, NoTranslateStore,
};
use crate::locale::{Locale, ModelGroup};
use crate::metrics::RunMetrics;
use crate::numeric;
use crate::ollama::OllamaClient;
use crate::prompt;
use crate::quality;
use crate::report::{FinalLog, ReviewLog};
use crate::resx;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What to translate in this invocation.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub langs: Vec<Locale>,
    pub resources: Vec<String>,
    pub dirs: Vec<String>,
    pub force: bool,
    pub leak_scan: bool,
}

pub struct Pipeline {
    config: Config,
    client: OllamaClient,
    overrides: KeyOverrides,
    glossary: Arc<GlossaryStore>,
    no_translate: Arc<NoTranslateStore>,
    exclusions: Arc<ExclusionStore>,
    review: ReviewLog,
    metrics: Arc<RunMetrics>,
}

fn model_for(config: &Config, locale: Locale) -> &str {
    match locale.model_group() {
        ModelGroup::SeaLion => &config.sea_model,
        ModelGroup::TranslateGemma => &config.european_model,
    }
}

/// Resolve `-d` selections against the subdirectories of the resources
/// folder, case-insensitively. Unknown names are skipped; an empty result
/// falls back to the whole resources folder.
fn resolve_folders(resources_dir: &Path, dirs: &[String]) -> Result<Vec<PathBuf>> {
    if dirs.is_empty() {
        return Ok(vec![resources_dir.to_path_buf()]);
    }

    let subdirs: Vec<PathBuf> = std::fs::read_dir(resources_dir)
        .with_context(|| format!("Failed to list {}", resources_dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();

    let mut selected = Vec::new();
    for requested in dirs {
        let found = subdirs.iter().find(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(requested))
        });
        match found {
            Some(path) => {
                info!("Using subdirectory: {}", path.display());
                selected.push(path.clone());
            }
            None => warn!("Subdirectory '{}' not found inside Resources, skipping", requested),
        }
    }

    if selected.is_empty() {
        selected.push(resources_dir.to_path_buf());
    }
    Ok(selected)
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        client: OllamaClient,
        overrides: KeyOverrides,
        glossary: Arc<GlossaryStore>,
        no_translate: Arc<NoTranslateStore>,
        exclusions: Arc<ExclusionStore>,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        let review = ReviewLog::new(&config.review_log_path, &config.review_excluded_pages);
        Self {
            config,
            client,
            overrides,
            glossary,
            no_translate,
            exclusions,
            review,
            metrics,
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<()> {
        let folders = resolve_folders(&self.config.resources_dir, &options.dirs)?;
        let target_codes: Vec<&str> = Locale::all_targets().iter().map(|l| l.code()).collect();

        let mut base_files = Vec::new();
        for folder in &folders {
            base_files.extend(resx::find_base_resources(
                folder,
                &options.resources,
                &target_codes,
            )?);
        }
        if base_files.is_empty() {
            warn!("No base resource files found under the selected folders");
            return Ok(());
        }

        let mut final_log = FinalLog::new();
        let mut last_model = String::new();

        for base_file in &base_files {
            info!("Translating {}", base_file.display());
            let entries = resx::read_entries(base_file)?;
            let page = base_file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            for &locale in &options.langs {
                let model = model_for(&self.config, locale).to_string();
                if !last_model.is_empty() && model != last_model {
                    info!("Model switch: unloading {} for {}", last_model, model);
                    if let Err(e) = self.client.unload(&last_model).await {
                        warn!("Could not unload {}: {}", last_model, e);
                    }
                }
                last_model = model.clone();

                let mut cache = TranslationCache::load(&self.config.cache_dir, locale.code());

                if options.leak_scan {
                    let exclusions = self.exclusions.snapshot();
                    let purged =
                        cache.purge_where(|value| quality::is_leak(locale, value, &exclusions));
                    if purged.is_empty() {
                        info!("[Audit {}] cache is clean", locale.code());
                    } else {
                        for (key, value) in &purged {
                            info!("[Audit {}] purged '{}' (was \"{}\")", locale.code(), key, value);
                        }
                    }
                }

                info!("{} (using {})", locale.code(), model);
                let mut translations = HashMap::new();
                for entry in &entries {
                    let translated = self
                        .translate_entry(
                            entry,
                            &page,
                            locale,
                            &model,
                            &mut cache,
                            &mut final_log,
                            options.force,
                        )
                        .await;
                    if let Some(translated) = translated {
                        translations.insert(entry.key.clone(), translated);
                    }
                }

                let out_path = resx::output_path(base_file, locale.code());
                resx::translate_document(base_file, &out_path, &translations)?;
                info!("Written {}", out_path.display());
            }
        }

        if !last_model.is_empty() {
            if let Err(e) = self.client.unload(&last_model).await {
                warn!("Could not unload {}: {}", last_model, e);
            }
        }

        final_log.write(&self.config.project_root, &folders, &options.resources);
        info!("Run summary: {}", self.metrics.summary());
        Ok(())
    }

    /// Resolve one entry through the lookup chain. Returns `None` when the
    /// backend fails; the entry is then left untranslated for this pass.
    async fn translate_entry(
        &self,
        entry: &resx::Entry,
        page: &str,
        locale: Locale,
        model: &str,
        cache: &mut TranslationCache,
        final_log: &mut FinalLog,
        force: bool,
    ) -> Option<String> {
        let code = locale.code();
        let source = entry.value.as_str();
        let glossary_table: Arc<GlossaryTable> = self.glossary.snapshot();

        // 1. Pinned key overrides beat everything, including the cache.
        if let Some(fixed) = self.overrides.get(code, &entry.key) {
            self.metrics.record_override_hit();
            return Some(fixed.to_string());
        }

        // 2. Exact glossary hit by key; writes through so content lookups hit.
        if let Some(fixed) = glossary::exact_term(&glossary_table, code, &entry.key) {
            info!("[Glossary hit {} {}] {}", code, entry.key, source);
            self.metrics.record_glossary_hit();
            cache.put(source, &fixed);
            return Some(fixed);
        }

        // 3. Cache, unless force-overwrite mode is recomputing everything.
        if !force {
            if let Some(cached) = cache.get(source) {
                self.metrics.record_cache_hit();
                final_log.accepted(code, &entry.key, cached);
                return Some(cached.to_string());
            }
        }
        self.metrics.record_cache_miss();

        // 4. Backend.
        let (masked, placeholders) = numeric::preprocess(source, locale);
        let glossary_hits = glossary::lookup_terms(&glossary_table, code, &masked);
        let nt_terms = self.no_translate.snapshot();
        let nt_hits = glossary::no_translate_hits(&nt_terms, &masked);
        let history = cache.history_examples(source, &glossary_hits);
        let prompt = prompt::build(&masked, locale, &glossary_hits, &nt_hits, &history);

        self.metrics.record_backend_call();
        let raw = match self.client.generate(model, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Translation failed [{} {}]: {}", code, entry.key, e);
                self.metrics.record_backend_failure();
                return None;
            }
        };

        let restored = numeric::postprocess(&raw, &placeholders, locale);
        let cleaned = quality::sanitize(&restored);
        let cleaned = quality::reduce_list_dump(source, &cleaned);
        let translated = quality::trim_terminal_punct(source, &cleaned);

        let exclusions = self.exclusions.snapshot();
        let echo = quality::is_echo(source, &translated);
        let leak = quality::is_leak(locale, &translated, &exclusions);
        if (echo && !quality::is_excluded(locale, source, &translated, &exclusions)) || leak {
            self.metrics.record_flagged();
            if self.review.reports_page(page) {
                self.review.record(page, code, &entry.key, source, &translated);
                final_log.flagged(page, code, &entry.key, source, &translated);
            }
        }

        cache.put(source, &translated);
        final_log.accepted(code, &entry.key, &translated);
        info!(
            "[{} {} {}] {} -> {}",
            if force { "Rewrite" } else { "New" },
            code,
            entry.key,
            source,
            translated
        );
        Some(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Folder Resolution Tests ====================

    #[test]
    fn test_resolve_folders_default_is_resources_root() {
        let dir = TempDir::new().unwrap();
        let folders = resolve_folders(dir.path(), &[]).unwrap();
        assert_eq!(folders, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_resolve_folders_case_insensitive_match() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("City")).unwrap();
        std::fs::create_dir(dir.path().join("Offices")).unwrap();

        let folders = resolve_folders(dir.path(), &["city".to_string()]).unwrap();
        assert_eq!(folders, vec![dir.path().join("City")]);
    }

    #[test]
    fn test_resolve_folders_unknown_falls_back() {
        let dir = TempDir::new().unwrap();
        let folders = resolve_folders(dir.path(), &["missing".to_string()]).unwrap();
        assert_eq!(folders, vec![dir.path().to_path_buf()]);
    }

    // ==================== Model Selection Tests ====================

    #[test]
    fn test_model_for_groups() {
        let config = Config::for_tests("http://127.0.0.1:1/api/generate");
        let km = Locale::from_code("km").unwrap();
        let de = Locale::from_code("de").unwrap();
        assert_eq!(model_for(&config, km), "sea-test");
        assert_eq!(model_for(&config, de), "euro-test");
    }
}
