use anyhow::Result;
use resx_translate::cli;
use resx_translate::config::Config;
use resx_translate::glossary::{ExclusionStore, GlossaryStore, KeyOverrides, NoTranslateStore};
use resx_translate::metrics::RunMetrics;
use resx_translate::ollama::OllamaClient;
use resx_translate::pipeline::{Pipeline, RunOptions};
use resx_translate::reload;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (absent in normal use)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("resx_translate=info".parse()?),
        )
        .init();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = cli::parse(&raw_args);
    if args.help {
        println!("{}", cli::HELP_TEXT);
        return Ok(());
    }

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.cache_dir)?;
    std::fs::create_dir_all(&config.config_dir)?;

    // Hot-reloadable config stores plus their file watchers
    let glossary = GlossaryStore::open(config.config_dir.join("glossary.json"));
    let no_translate = NoTranslateStore::open(config.config_dir.join("no_translate.json"));
    let exclusions = ExclusionStore::open(config.config_dir.join("echo.json"));
    let overrides = KeyOverrides::load(&config.config_dir.join("overrides.json"));

    reload::spawn_watcher(Arc::clone(&glossary));
    reload::spawn_watcher(Arc::clone(&no_translate));
    reload::spawn_watcher(Arc::clone(&exclusions));

    let client = OllamaClient::new(&config)?;
    if !client.is_running(&config.sea_model).await {
        warn!(
            "Translation backend not reachable at {}; start it before running",
            config.ollama_url
        );
    }

    if args.leak_scan {
        info!("Script leakage scan mode enabled");
    }

    let options = RunOptions {
        langs: cli::resolve_langs(&args.langs),
        resources: args.resources,
        dirs: args.dirs,
        force: args.force,
        leak_scan: args.leak_scan,
    };

    info!("Starting translation run");
    let metrics = Arc::new(RunMetrics::new());
    let pipeline = Pipeline::new(
        config,
        client,
        overrides,
        glossary,
        no_translate,
        exclusions,
        Arc::clone(&metrics),
    );
    pipeline.run(&options).await?;

    info!("Done");
    Ok(())
}
