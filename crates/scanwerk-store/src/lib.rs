// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-store: local document library.
//
// Metadata lives in SQLite; exported PDFs live as files next to it. Saving
// writes the file atomically first and only then records it, removing the
// file again if the record cannot be written.

pub mod files;
pub mod integrity;
pub mod library;
pub mod metadata;

pub use files::ArtifactStore;
pub use library::{DocumentLibrary, NewDocument};
pub use metadata::{DocumentQuery, DocumentStore};
