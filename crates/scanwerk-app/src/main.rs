// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: photographed page to clean, searchable PDF.
//
// Entry point. Initialises logging, opens the backend services, and runs
// one CLI command against them.

mod commands;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use scanwerk_core::Quad;
use scanwerk_core::human_errors::humanize_error;
use scanwerk_core::types::{ColorFilter, DocumentId};

use services::app_services::AppServices;

#[derive(Parser)]
#[command(name = "scanwerk")]
#[command(about = "Turn photographed pages into rectified, filtered, searchable PDFs")]
#[command(version)]
struct Cli {
    /// Data directory holding the library and config.json
    /// (default: $SCANWERK_DATA_DIR, else the platform data directory).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a photographed page and save it as a PDF.
    Scan(ScanArgs),

    /// List saved documents, newest first.
    List {
        /// Only documents carrying this tag.
        #[arg(long)]
        tag: Option<String>,

        /// Case-insensitive substring of the document name.
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,

        /// Only favourites.
        #[arg(long)]
        favorites: bool,

        /// Print full records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Toggle the favourite flag of a document.
    Favorite {
        /// Document id or unique id prefix.
        id: String,
    },

    /// Replace the tags of a document (none clears them).
    Tag {
        /// Document id or unique id prefix.
        id: String,
        tags: Vec<String>,
    },

    /// Move a document into a folder, or out of any folder.
    Folder {
        /// Document id or unique id prefix.
        id: String,
        folder: Option<String>,
    },

    /// Rename a document.
    Rename {
        /// Document id or unique id prefix.
        id: String,
        name: String,
    },

    /// Delete a document and its PDF.
    Delete {
        /// Document id or unique id prefix.
        id: String,
    },

    /// Share a document's PDF.
    Share {
        /// Document id or unique id prefix.
        id: String,

        /// Copy the PDF into this folder instead of the platform share sheet.
        #[arg(long, value_name = "DIR")]
        to: Option<PathBuf>,
    },

    /// Show or change settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct ScanArgs {
    /// Photo of the page (JPEG or PNG). Without it the platform camera is used.
    photo: Option<PathBuf>,

    /// Document name; defaults to Scan_YYYY-MM-DD_HH-MM.
    #[arg(long)]
    name: Option<String>,

    /// color, grayscale, or bw.
    #[arg(long, default_value = "color")]
    filter: ColorFilter,

    /// Clockwise rotation in degrees, snapped to quarter turns.
    #[arg(long, value_name = "DEG", default_value_t = 0, allow_negative_numbers = true)]
    rotate: i32,

    /// Brightness offset, -100 to 100.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    brightness: i32,

    /// Contrast, -100 to 100.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    contrast: i32,

    /// Page corners as four "X,Y" pixel pairs in any order, e.g.
    /// "100,100 900,120 880,900 80,880". Skips automatic detection.
    #[arg(long, value_name = "POINTS", value_parser = commands::parse_corners)]
    corners: Option<Quad>,

    /// Signature image to stamp onto the page.
    #[arg(long, value_name = "IMAGE")]
    signature: Option<PathBuf>,

    /// Centre of the signature as "X,Y" percentages of the page.
    #[arg(long, value_name = "X,Y", default_value = "70,85", value_parser = commands::parse_anchor)]
    signature_at: (f32, f32),

    /// Skip text recognition for this scan.
    #[arg(long)]
    no_ocr: bool,

    /// Write the adjusted page as a JPEG to this file.
    #[arg(long, value_name = "FILE")]
    preview: Option<PathBuf>,

    /// Stop after the preview; nothing is saved.
    #[arg(long, requires = "preview")]
    dry_run: bool,

    /// Tag to attach; repeat for several.
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Folder to file the document under.
    #[arg(long)]
    folder: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current settings as JSON.
    Show,
    /// Change one setting, e.g. `config set default_author "Jane Doe"`.
    Set { key: String, value: String },
    /// Restore the default settings.
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Scanwerk starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> scanwerk_core::error::Result<()> {
    let svc = match cli.data_dir {
        Some(dir) => AppServices::open(dir)?,
        None => AppServices::init()?,
    };
    let id = |text: &str| -> scanwerk_core::error::Result<DocumentId> { svc.resolve_id(text) };

    match cli.command {
        Commands::Scan(args) => commands::scan(&svc, args).await,
        Commands::List {
            tag,
            search,
            favorites,
            json,
        } => commands::list(&svc, tag, search, favorites, json),
        Commands::Favorite { id: text } => commands::favorite(&svc, &id(&text)?),
        Commands::Tag { id: text, tags } => commands::tag(&svc, &id(&text)?, &tags),
        Commands::Folder { id: text, folder } => {
            commands::folder(&svc, &id(&text)?, folder.as_deref())
        }
        Commands::Rename { id: text, name } => commands::rename(&svc, &id(&text)?, &name),
        Commands::Delete { id: text } => commands::delete(&svc, &id(&text)?),
        Commands::Share { id: text, to } => commands::share(&svc, &id(&text)?, to),
        Commands::Config(ConfigCommand::Show) => commands::config_show(&svc),
        Commands::Config(ConfigCommand::Set { key, value }) => {
            commands::config_set(&svc, &key, &value)
        }
        Commands::Config(ConfigCommand::Reset) => commands::config_reset(&svc),
    }
}
