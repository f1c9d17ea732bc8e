//! Locale registry: single source of truth for all supported target languages.
//!
//! Every locale the tool can translate into is declared here, together with
//! the metadata the pipeline needs: display name, native digit alphabet,
//! script class and which backend model serves it. The set is fixed at
//! startup; codes outside the registry are rejected.

use anyhow::{bail, Result};
use std::sync::OnceLock;

/// Which backend model a locale is served by.
///
/// The two model groups cannot be resident in memory at the same time on
/// typical hardware, so the pipeline processes locales group by group and
/// unloads the previous model when the group changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelGroup {
    /// Southeast Asian & East Asian focus (SEA-LION family)
    SeaLion,
    /// European & Western focus (TranslateGemma family)
    TranslateGemma,
}

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// ISO 639-1 language code (e.g., "km", "zh")
    pub code: &'static str,

    /// English display name used in prompts (e.g., "Khmer")
    pub name: &'static str,

    /// Native digit glyphs, ten characters from 0 to 9, for locales that
    /// render numerals in their own script. `None` means Arabic digits.
    pub native_digits: Option<&'static str>,

    /// Whether the locale's script is non-Latin. Only these locales are
    /// checked for Latin script leakage.
    pub non_latin: bool,

    /// Which backend model serves this locale.
    pub model_group: ModelGroup,

    /// Whether this is the canonical/source language (only one should be true)
    pub is_canonical: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Get a locale configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// All translation targets, i.e. every locale except the canonical one.
    pub fn list_targets(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|l| !l.is_canonical).collect()
    }

    /// Check if a locale code is in the registry.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}

/// A validated locale.
///
/// Can only be constructed through the registry, so holding a `Locale`
/// guarantees the code is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    code: &'static str,
}

impl Locale {
    /// Create a Locale from a language code string.
    ///
    /// # Returns
    /// * `Ok(Locale)` if the code is in the registry
    /// * `Err` otherwise
    pub fn from_code(code: &str) -> Result<Locale> {
        match LocaleRegistry::get().get_by_code(code) {
            Some(config) => Ok(Locale { code: config.code }),
            None => bail!("Unknown locale code: '{}'", code),
        }
    }

    /// Every translation target in registry order.
    pub fn all_targets() -> Vec<Locale> {
        LocaleRegistry::get()
            .list_targets()
            .into_iter()
            .map(|c| Locale { code: c.code })
            .collect()
    }

    /// Get the full locale configuration from the registry.
    pub fn config(&self) -> &'static LocaleConfig {
        LocaleRegistry::get()
            .get_by_code(self.code)
            .expect("Locale code should always be valid")
    }

    /// ISO 639-1 language code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// English display name used in prompts.
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    /// Native digit glyphs, when the locale renders numerals in its own script.
    pub fn native_digits(&self) -> Option<&'static str> {
        self.config().native_digits
    }

    /// Whether the locale's script is non-Latin.
    pub fn is_non_latin(&self) -> bool {
        self.config().non_latin
    }

    /// Which backend model serves this locale.
    pub fn model_group(&self) -> ModelGroup {
        self.config().model_group
    }

    /// Whether this is the canonical (source) language.
    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

/// The full locale set.
///
/// Group 1 is served by the SEA-LION model, group 2 by TranslateGemma.
fn default_locales() -> Vec<LocaleConfig> {
    use ModelGroup::{SeaLion, TranslateGemma};

    fn locale(
        code: &'static str,
        name: &'static str,
        native_digits: Option<&'static str>,
        non_latin: bool,
        model_group: ModelGroup,
    ) -> LocaleConfig {
        LocaleConfig {
            code,
            name,
            native_digits,
            non_latin,
            model_group,
            is_canonical: false,
        }
    }

    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_digits: None,
            non_latin: false,
            model_group: SeaLion,
            is_canonical: true,
        },
        // === GROUP 1: SEA-LION ===
        locale("km", "Khmer", Some("០១២៣៤៥៦៧៨៩"), true, SeaLion),
        locale("zh", "Simplified Chinese", None, true, SeaLion),
        locale("vi", "Vietnamese", None, false, SeaLion),
        locale("th", "Thai", Some("๐๑๒๓๔๕๖๗๘๙"), true, SeaLion),
        locale("ja", "Japanese", None, true, SeaLion),
        locale("lo", "Lao", Some("໐໑໒໓໔໕໖໗໘໙"), true, SeaLion),
        locale("ko", "Korean", None, true, SeaLion),
        locale("id", "Indonesian", None, false, SeaLion),
        locale("ms", "Malay", None, false, SeaLion),
        // === GROUP 2: TranslateGemma ===
        locale("fr", "French", None, false, TranslateGemma),
        locale("de", "German", None, false, TranslateGemma),
        locale("es", "Spanish", None, false, TranslateGemma),
        locale("nl", "Dutch", None, false, TranslateGemma),
        locale("it", "Italian", None, false, TranslateGemma),
        locale("pt", "Portuguese", None, false, TranslateGemma),
        locale("cs", "Czech", None, false, TranslateGemma),
        locale("sv", "Swedish", None, false, TranslateGemma),
        locale("ru", "Russian", None, true, TranslateGemma),
        locale("hi", "Hindi", None, true, TranslateGemma),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Registry Tests ====================

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LocaleRegistry::get();
        let registry2 = LocaleRegistry::get();
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_khmer() {
        let config = LocaleRegistry::get().get_by_code("km").unwrap();
        assert_eq!(config.code, "km");
        assert_eq!(config.name, "Khmer");
        assert_eq!(config.native_digits, Some("០១២៣៤៥៦៧៨៩"));
        assert!(config.non_latin);
        assert_eq!(config.model_group, ModelGroup::SeaLion);
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LocaleRegistry::get().get_by_code("xx").is_none());
    }

    #[test]
    fn test_list_targets_excludes_english() {
        let targets = LocaleRegistry::get().list_targets();
        assert_eq!(targets.len(), 18);
        assert!(!targets.iter().any(|l| l.code == "en"));
    }

    #[test]
    fn test_is_supported() {
        let registry = LocaleRegistry::get();
        assert!(registry.is_supported("th"));
        assert!(registry.is_supported("en"));
        assert!(!registry.is_supported("eo"));
    }

    // ==================== Locale Tests ====================

    #[test]
    fn test_from_code_valid() {
        let locale = Locale::from_code("vi").expect("Should succeed");
        assert_eq!(locale.code(), "vi");
        assert_eq!(locale.name(), "Vietnamese");
        assert!(!locale.is_non_latin());
    }

    #[test]
    fn test_from_code_invalid() {
        let result = Locale::from_code("eo");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown"));
    }

    #[test]
    fn test_from_code_empty() {
        assert!(Locale::from_code("").is_err());
    }

    #[test]
    fn test_locale_equality_and_copy() {
        let lang1 = Locale::from_code("de").unwrap();
        let lang2 = lang1;
        assert_eq!(lang1, lang2);
        assert_ne!(lang1, Locale::from_code("fr").unwrap());
    }

    #[test]
    fn test_model_groups() {
        assert_eq!(
            Locale::from_code("ja").unwrap().model_group(),
            ModelGroup::SeaLion
        );
        assert_eq!(
            Locale::from_code("de").unwrap().model_group(),
            ModelGroup::TranslateGemma
        );
    }

    #[test]
    fn test_non_latin_flags() {
        for code in ["km", "lo", "th", "ru", "hi", "zh", "ja", "ko"] {
            assert!(
                Locale::from_code(code).unwrap().is_non_latin(),
                "{} should be non-Latin",
                code
            );
        }
        for code in ["vi", "id", "ms", "fr", "de", "sv", "en"] {
            assert!(
                !Locale::from_code(code).unwrap().is_non_latin(),
                "{} should be Latin-script",
                code
            );
        }
    }

    #[test]
    fn test_native_digit_alphabets_have_ten_glyphs() {
        for target in Locale::all_targets() {
            if let Some(digits) = target.native_digits() {
                assert_eq!(
                    digits.chars().count(),
                    10,
                    "{} digit alphabet must cover 0-9",
                    target.code()
                );
            }
        }
    }

    #[test]
    fn test_all_targets_count() {
        assert_eq!(Locale::all_targets().len(), 18);
    }

    #[test]
    fn test_english_is_canonical() {
        assert!(Locale::from_code("en").unwrap().is_canonical());
        assert!(!Locale::from_code("km").unwrap().is_canonical());
    }
}
