//! Batch translation of .resx UI resource files through a local Ollama
//! backend, with numeric placeholder masking, glossary enforcement, a
//! per-locale persistent cache, and quality gates for echoed or
//! script-contaminated output.

pub mod cache;
pub mod cli;
pub mod config;
pub mod glossary;
pub mod locale;
pub mod metrics;
pub mod numeric;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod quality;
pub mod reload;
pub mod report;
pub mod resx;
