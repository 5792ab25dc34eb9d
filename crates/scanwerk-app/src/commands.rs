// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CLI command handlers. Each one is a thin layer over `AppServices`; all
// output goes to stdout, notes and errors to stderr.

use std::path::PathBuf;

use chrono::Local;
use scanwerk_bridge::{FolderShare, ImageFileSource};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::human_errors::humanize_degradation;
use scanwerk_core::types::{AdjustmentState, Degradation, DocumentId, Rotation, StoredDocument};
use scanwerk_core::{AppConfig, Point, Quad, format_file_size};
use scanwerk_document::SignaturePlacement;
use scanwerk_store::DocumentQuery;

use crate::ScanArgs;
use crate::services::app_services::AppServices;

// -- Argument parsers ----------------------------------------------------------

fn parse_pair(text: &str) -> std::result::Result<(f32, f32), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected 'X,Y', got '{text}'"))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("invalid X '{x}': {e}"))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("invalid Y '{y}': {e}"))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("'{text}' is not a finite point"));
    }
    Ok((x, y))
}

/// Four `X,Y` pairs separated by spaces or `;`, put into corner order.
pub fn parse_corners(text: &str) -> std::result::Result<Quad, String> {
    let points = text
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|s| !s.is_empty())
        .map(|pair| parse_pair(pair).map(|(x, y)| Point::new(x, y)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let points: [Point; 4] = points
        .try_into()
        .map_err(|found: Vec<Point>| format!("expected 4 corners, got {}", found.len()))?;
    Ok(Quad::canonicalize(points))
}

/// `X,Y` percentages, each within 0..=100.
pub fn parse_anchor(text: &str) -> std::result::Result<(f32, f32), String> {
    let (x, y) = parse_pair(text)?;
    if !(0.0..=100.0).contains(&x) || !(0.0..=100.0).contains(&y) {
        return Err(format!("'{text}' must be percentages between 0 and 100"));
    }
    Ok((x, y))
}

// -- Scan ----------------------------------------------------------------------

pub async fn scan(svc: &AppServices, args: ScanArgs) -> Result<()> {
    let captured = match &args.photo {
        Some(path) => svc.capture_photo(Some(&ImageFileSource::new(path)))?,
        None => svc.capture_photo(None)?,
    };
    let Some(photo) = captured else {
        println!("Capture cancelled.");
        return Ok(());
    };

    let mut session = svc.new_session(&photo).await?;
    if let Some(corners) = args.corners {
        session.set_corners(corners);
    }
    session.set_adjustments(AdjustmentState::new(
        args.filter,
        Rotation::from_degrees(args.rotate),
        args.brightness,
        args.contrast,
    ));
    if let Some(path) = &args.signature {
        let ink = image::open(path).map_err(|e| {
            ScanwerkError::InvalidInput(format!("signature {}: {e}", path.display()))
        })?;
        let (x, y) = args.signature_at;
        session.set_signature(Some(SignaturePlacement::new(ink, x, y)));
    }
    if args.no_ocr {
        session.set_ocr(false);
    }
    if let Some(name) = args.name {
        session.set_name(name);
    }
    session.set_tags(args.tags);
    session.set_folder(args.folder);

    if let Some(path) = &args.preview {
        let jpeg = session.preview_jpeg().await?;
        std::fs::write(path, jpeg)?;
        println!("Preview written to {}", path.display());
    }
    if args.dry_run {
        print_notes(session.degradations());
        session.abort();
        println!("Nothing saved.");
        return Ok(());
    }

    let saved = session.save().await?;
    print_notes(&saved.degradations);

    let doc = &saved.document;
    println!(
        "Saved {} ({}, {} page{}): {}",
        doc.name,
        format_file_size(doc.byte_size),
        doc.page_count,
        if doc.page_count == 1 { "" } else { "s" },
        doc.file_path.display()
    );
    println!("id {}", doc.id);
    if let Some(text) = &doc.ocr_text {
        println!("{} characters of searchable text", text.chars().count());
    }
    Ok(())
}

fn print_notes(degradations: &[Degradation]) {
    for degradation in degradations {
        let human = humanize_degradation(degradation);
        eprintln!("note: {} {}", human.message, human.suggestion);
    }
}

// -- Library -------------------------------------------------------------------

fn summary_line(doc: &StoredDocument) -> String {
    let short_id: String = doc.id.to_string().chars().take(8).collect();
    let created = doc.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let star = if doc.favorite { "*" } else { " " };
    let mut line = format!(
        "{short_id}  {created}  {star} {:>9}  {}",
        format_file_size(doc.byte_size),
        doc.name
    );
    if let Some(folder) = &doc.folder {
        line.push_str(&format!("  [{folder}]"));
    }
    if !doc.tags.is_empty() {
        let tags: Vec<&str> = doc.tags.iter().map(String::as_str).collect();
        line.push_str(&format!("  #{}", tags.join(" #")));
    }
    line
}

pub fn list(
    svc: &AppServices,
    tag: Option<String>,
    search: Option<String>,
    favorites: bool,
    json: bool,
) -> Result<()> {
    let query = DocumentQuery {
        tag,
        name_contains: search,
        favorites_only: favorites,
    };
    let docs = svc.documents(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
    } else if docs.is_empty() {
        println!("No documents.");
    } else {
        for doc in &docs {
            println!("{}", summary_line(doc));
        }
    }
    Ok(())
}

pub fn favorite(svc: &AppServices, id: &DocumentId) -> Result<()> {
    let now = svc.toggle_favorite(id)?;
    println!("{}", if now { "Marked as favourite." } else { "No longer a favourite." });
    Ok(())
}

pub fn tag(svc: &AppServices, id: &DocumentId, tags: &[String]) -> Result<()> {
    svc.set_tags(id, tags)?;
    println!("{}", summary_line(&svc.document(id)?));
    Ok(())
}

pub fn folder(svc: &AppServices, id: &DocumentId, folder: Option<&str>) -> Result<()> {
    svc.set_folder(id, folder)?;
    println!("{}", summary_line(&svc.document(id)?));
    Ok(())
}

pub fn rename(svc: &AppServices, id: &DocumentId, name: &str) -> Result<()> {
    svc.rename_document(id, name)?;
    println!("{}", summary_line(&svc.document(id)?));
    Ok(())
}

pub fn delete(svc: &AppServices, id: &DocumentId) -> Result<()> {
    let removed = svc.delete_document(id)?;
    println!("Deleted {}", removed.display());
    Ok(())
}

pub fn share(svc: &AppServices, id: &DocumentId, to: Option<PathBuf>) -> Result<()> {
    let doc = match to {
        Some(dir) => {
            let doc = svc.share_document(id, Some(&FolderShare::new(&dir)))?;
            println!("Copied {} to {}", doc.name, dir.display());
            doc
        }
        None => {
            let doc = svc.share_document(id, None)?;
            println!("Shared {} via {}", doc.name, svc.platform_name());
            doc
        }
    };
    tracing::debug!(doc_id = %doc.id, "share finished");
    Ok(())
}

// -- Config --------------------------------------------------------------------

pub fn config_show(svc: &AppServices) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&svc.config())?);
    println!("# {}", svc.data_dir().join("config.json").display());
    Ok(())
}

/// Set one field by name. The value is read as JSON when it parses as JSON,
/// otherwise as a plain string.
pub fn with_setting(config: &AppConfig, key: &str, value: &str) -> Result<AppConfig> {
    let mut fields = match serde_json::to_value(config)? {
        serde_json::Value::Object(fields) => fields,
        _ => return Err(ScanwerkError::InvalidInput("config is not an object".into())),
    };
    if !fields.contains_key(key) {
        let known: Vec<&str> = fields.keys().map(String::as_str).collect();
        return Err(ScanwerkError::InvalidInput(format!(
            "unknown setting '{key}' (known: {})",
            known.join(", ")
        )));
    }
    let parsed = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    fields.insert(key.to_string(), parsed);
    serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| {
        ScanwerkError::InvalidInput(format!("'{value}' is not valid for {key}: {e}"))
    })
}

pub fn config_set(svc: &AppServices, key: &str, value: &str) -> Result<()> {
    let updated = with_setting(&svc.config(), key, value)?;
    svc.save_config(&updated)?;
    println!("{key} updated");
    Ok(())
}

pub fn config_reset(svc: &AppServices) -> Result<()> {
    svc.reset_config()?;
    println!("Settings restored to defaults.");
    Ok(())
}
