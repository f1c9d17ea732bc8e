use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub ollama_url: String,
    pub sea_model: String,
    pub european_model: String,
    pub request_timeout_secs: u64,
    pub num_thread: u32,
    pub num_ctx: u32,

    // Layout
    pub project_root: PathBuf,
    pub resources_dir: PathBuf,
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,

    // Review log
    pub review_log_path: PathBuf,
    pub review_excluded_pages: Vec<String>,
}

/// Walk up from `start` to the first directory containing `config/`.
///
/// The tool is normally run from somewhere inside the project tree; refusing
/// to guess beats writing caches into a random working directory.
fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    while let Some(d) = dir {
        if d.join("config").is_dir() {
            return Ok(d);
        }
        dir = d.parent().map(Path::to_path_buf);
    }
    bail!(
        "Project root not found: no 'config' directory above {}",
        start.display()
    )
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let project_root = match std::env::var("PROJECT_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => {
                let cwd = std::env::current_dir().context("Failed to read working directory")?;
                find_project_root(&cwd)?
            }
        };

        Ok(Self {
            // Backend
            ollama_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434/api/generate".to_string()),
            sea_model: std::env::var("SEA_MODEL")
                .unwrap_or_else(|_| "aisingapore/Gemma-SEA-LION-v4-27B-IT:latest".to_string()),
            european_model: std::env::var("EUROPEAN_MODEL")
                .unwrap_or_else(|_| "translategemma:27b".to_string()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            num_thread: std::env::var("NUM_THREAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            num_ctx: std::env::var("NUM_CTX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),

            // Layout
            resources_dir: project_root.join("Resources"),
            config_dir: project_root.join("config"),
            cache_dir: project_root.join("cache"),

            // Review log
            review_log_path: std::env::var("REVIEW_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| project_root.join("review.log")),
            review_excluded_pages: std::env::var("REVIEW_EXCLUDED_PAGES")
                .unwrap_or_else(|_| "boinc".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),

            project_root,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(ollama_url: &str) -> Self {
        Self {
            ollama_url: ollama_url.to_string(),
            sea_model: "sea-test".to_string(),
            european_model: "euro-test".to_string(),
            request_timeout_secs: 5,
            num_thread: 8,
            num_ctx: 4096,
            project_root: PathBuf::new(),
            resources_dir: PathBuf::new(),
            config_dir: PathBuf::new(),
            cache_dir: PathBuf::new(),
            review_log_path: PathBuf::new(),
            review_excluded_pages: vec!["boinc".to_string()],
        }
    }
}
