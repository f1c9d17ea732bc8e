//! .resx document I/O.
//!
//! Reads translatable entries out of a base resource file and writes the
//! translated sibling (`Strings.resx` -> `Strings.km.resx`). Writing streams
//! the original document event-by-event and swaps only the text inside
//! `<value>` elements, so comments, schema headers, and formatting survive
//! untouched.

use anyhow::{Context, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One translatable string from a resource file.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

fn name_attribute(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == b"name" {
            attr.unescape_value().ok().map(|v| v.to_string())
        } else {
            None
        }
    })
}

/// Extract all `<data name="...">` entries with a non-empty `<value>`.
///
/// Entries with a missing or whitespace-only value are skipped; there is
/// nothing to translate and the output document keeps them as-is.
pub fn read_entries(path: &Path) -> Result<Vec<Entry>> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource file {}", path.display()))?;

    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current_key: Option<String> = None;
    let mut in_value = false;
    let mut value_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"data" => {
                    current_key = name_attribute(e);
                }
                b"value" if current_key.is_some() => {
                    in_value = true;
                    value_text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_value => {
                value_text.push_str(
                    &e.unescape()
                        .with_context(|| format!("Malformed text in {}", path.display()))?,
                );
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"value" if in_value => {
                    in_value = false;
                    if let Some(key) = current_key.take() {
                        if value_text.trim().is_empty() {
                            debug!("Skipping empty entry '{}'", key);
                        } else {
                            entries.push(Entry {
                                key,
                                value: value_text.clone(),
                            });
                        }
                    }
                }
                b"data" => {
                    current_key = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to parse {}", path.display()));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Write a translated copy of `base` to `out`, replacing the text of each
/// `<value>` whose `data/@name` appears in `translations`.
pub fn translate_document(
    base: &Path,
    out: &Path,
    translations: &HashMap<String, String>,
) -> Result<()> {
    let xml = fs::read_to_string(base)
        .with_context(|| format!("Failed to read resource file {}", base.display()))?;

    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut current_key: Option<String> = None;
    let mut replacing = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"data" => current_key = name_attribute(e),
                    b"value" => {
                        replacing = current_key
                            .as_deref()
                            .is_some_and(|k| translations.contains_key(k));
                    }
                    _ => {}
                }
                writer.write_event(Event::Start(e.clone()))?;
                if replacing && e.name().as_ref() == b"value" {
                    if let Some(translated) =
                        current_key.as_deref().and_then(|k| translations.get(k))
                    {
                        writer.write_event(Event::Text(BytesText::new(translated)))?;
                    }
                }
            }
            // Original value text dropped; the translation is already out.
            Ok(Event::Text(_)) if replacing => {}
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"value" => replacing = false,
                    b"data" => current_key = None,
                    _ => {}
                }
                writer.write_event(Event::End(e.clone()))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to parse {}", base.display()));
            }
        }
        buf.clear();
    }

    let bytes = writer.into_inner().into_inner();
    fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(())
}

/// Output path for a base file translated into `locale`:
/// `Strings.resx` -> `Strings.km.resx`.
pub fn output_path(base: &Path, locale: &str) -> PathBuf {
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let translated = match name.strip_suffix(".resx") {
        Some(stem) => format!("{}.{}.resx", stem, locale),
        None => format!("{}.{}", name, locale),
    };
    base.with_file_name(translated)
}

/// True when `path` is itself a translated output (`*.{lang}.resx` for any
/// known target locale) rather than a base resource file.
pub fn is_translated_output(path: &Path, locales: &[&str]) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase());
    let Some(name) = name else {
        return false;
    };
    locales
        .iter()
        .any(|l| name.ends_with(&format!(".{}.resx", l.to_lowercase())))
}

fn walk_resx(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let iter = fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;
    for entry in iter {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_resx(&path, found)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("resx"))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Enumerate base resource files under `folder`, recursively.
///
/// Translated outputs for any target locale are excluded. When `stems` is
/// non-empty, only files whose stem matches one of them (case-insensitive)
/// are kept.
pub fn find_base_resources(
    folder: &Path,
    stems: &[String],
    locales: &[&str],
) -> Result<Vec<PathBuf>> {
    let mut all = Vec::new();
    walk_resx(folder, &mut all)?;

    let mut bases: Vec<PathBuf> = all
        .into_iter()
        .filter(|p| !is_translated_output(p, locales))
        .filter(|p| {
            if stems.is_empty() {
                return true;
            }
            let stem = p
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            stems.iter().any(|s| s.eq_ignore_ascii_case(&stem))
        })
        .collect();
    bases.sort();
    Ok(bases)
}
