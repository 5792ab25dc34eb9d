// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document metadata backed by SQLite.
//
// One row per stored document plus a tag table. The PDF bytes themselves are
// not stored here; `file_path` points at the artifact on disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{DocumentId, StoredDocument};

const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        page_count INTEGER NOT NULL,
        byte_size INTEGER NOT NULL,
        folder TEXT,
        favorite INTEGER NOT NULL DEFAULT 0,
        ocr_text TEXT,
        file_path TEXT NOT NULL,
        thumbnail_path TEXT
    );
    CREATE TABLE IF NOT EXISTS document_tags (
        document_id TEXT NOT NULL,
        tag TEXT NOT NULL,
        PRIMARY KEY (document_id, tag)
    );
    CREATE INDEX IF NOT EXISTS documents_created_at ON documents (created_at);
"#;

const SELECT_COLUMNS: &str = "SELECT id, name, created_at, updated_at, page_count, byte_size,
        folder, favorite, ocr_text, file_path, thumbnail_path FROM documents";

/// Filter for [`DocumentStore::list`]. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Exact tag the document must carry.
    pub tag: Option<String>,
    /// Case-insensitive substring of the document name.
    pub name_contains: Option<String>,
    pub favorites_only: bool,
}

impl DocumentQuery {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn named(fragment: impl Into<String>) -> Self {
        Self {
            name_contains: Some(fragment.into()),
            ..Default::default()
        }
    }
}

/// Document records in a SQLite database.
///
/// All methods are synchronous; async callers go through `spawn_blocking`.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ScanwerkError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| ScanwerkError::Database(format!("WAL pragma: {e}")))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| ScanwerkError::Database(format!("create tables: {e}")))?;

        info!("document database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ScanwerkError::Database(format!("open in-memory: {e}")))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| ScanwerkError::Database(format!("create tables: {e}")))?;

        debug!("in-memory document database opened");
        Ok(Self { conn })
    }

    /// Record a new document and its tags in one transaction.
    #[instrument(skip(self, doc), fields(doc_id = %doc.id))]
    pub fn insert(&self, doc: &StoredDocument) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ScanwerkError::Database(format!("begin: {e}")))?;

        tx.execute(
            "INSERT INTO documents (id, name, created_at, updated_at, page_count, byte_size,
             folder, favorite, ocr_text, file_path, thumbnail_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id.to_string(),
                doc.name,
                timestamp(&doc.created_at),
                timestamp(&doc.updated_at),
                doc.page_count as i64,
                doc.byte_size as i64,
                doc.folder,
                doc.favorite,
                doc.ocr_text,
                doc.file_path.to_string_lossy().into_owned(),
                doc.thumbnail_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            ],
        )
        .map_err(|e| ScanwerkError::Database(format!("insert document: {e}")))?;
        write_tags(&tx, &doc.id, &doc.tags)?;

        tx.commit()
            .map_err(|e| ScanwerkError::Database(format!("commit insert: {e}")))?;
        info!(name = %doc.name, pages = doc.page_count, "document recorded");
        Ok(())
    }

    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let doc = self
            .conn
            .query_row(&sql, params![id.to_string()], row_to_document)
            .optional()
            .map_err(|e| ScanwerkError::Database(format!("get document: {e}")))?;

        match doc {
            Some(mut doc) => {
                doc.tags = self.tags_of(&doc.id)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Matching documents, newest first.
    #[instrument(skip(self))]
    pub fn list(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>> {
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR EXISTS (
                 SELECT 1 FROM document_tags t WHERE t.document_id = documents.id AND t.tag = ?1))
               AND (?2 = 0 OR favorite = 1)
             ORDER BY created_at DESC, rowid DESC"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| ScanwerkError::Database(format!("prepare list: {e}")))?;
        let rows = stmt
            .query_map(params![query.tag, query.favorites_only], row_to_document)
            .map_err(|e| ScanwerkError::Database(format!("query list: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ScanwerkError::Database(format!("collect rows: {e}")))?;

        // SQLite's lower() only folds ASCII, so the name filter runs here.
        let needle = query.name_contains.as_deref().map(str::to_lowercase);
        let mut docs = Vec::with_capacity(rows.len());
        for mut doc in rows {
            if let Some(needle) = &needle
                && !doc.name.to_lowercase().contains(needle.as_str())
            {
                continue;
            }
            doc.tags = self.tags_of(&doc.id)?;
            docs.push(doc);
        }

        debug!(count = docs.len(), "documents listed");
        Ok(docs)
    }

    /// Flip the favorite flag and return the new value.
    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn toggle_favorite(&self, id: &DocumentId) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE documents SET favorite = 1 - favorite, updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), timestamp(&Utc::now())],
            )
            .map_err(|e| ScanwerkError::Database(format!("toggle favorite: {e}")))?;
        found(rows, id)?;

        let favorite: bool = self
            .conn
            .query_row(
                "SELECT favorite FROM documents WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| ScanwerkError::Database(format!("read favorite: {e}")))?;
        info!(favorite, "favorite toggled");
        Ok(favorite)
    }

    /// Replace the tag set. Tags are trimmed; empty ones are dropped.
    #[instrument(skip(self, tags), fields(doc_id = %id, count = tags.len()))]
    pub fn set_tags(&self, id: &DocumentId, tags: &BTreeSet<String>) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ScanwerkError::Database(format!("begin: {e}")))?;

        let rows = tx
            .execute(
                "UPDATE documents SET updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), timestamp(&Utc::now())],
            )
            .map_err(|e| ScanwerkError::Database(format!("touch document: {e}")))?;
        found(rows, id)?;
        tx.execute(
            "DELETE FROM document_tags WHERE document_id = ?1",
            params![id.to_string()],
        )
        .map_err(|e| ScanwerkError::Database(format!("clear tags: {e}")))?;
        write_tags(&tx, id, tags)?;

        tx.commit()
            .map_err(|e| ScanwerkError::Database(format!("commit tags: {e}")))?;
        debug!("tags replaced");
        Ok(())
    }

    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn set_folder(&self, id: &DocumentId, folder: Option<&str>) -> Result<()> {
        let folder = folder.map(str::trim).filter(|f| !f.is_empty());
        self.set_column(id, "folder", folder)
    }

    /// Attach (or clear) recognised text.
    #[instrument(skip(self, text), fields(doc_id = %id))]
    pub fn set_ocr_text(&self, id: &DocumentId, text: Option<&str>) -> Result<()> {
        self.set_column(id, "ocr_text", text)
    }

    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn rename(&self, id: &DocumentId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScanwerkError::InvalidInput("document name is empty".into()));
        }
        self.set_column(id, "name", Some(name))
    }

    /// Remove a record and its tags in one transaction, returning what was
    /// removed. Deleting an unknown id returns `None`.
    #[instrument(skip(self), fields(doc_id = %id))]
    pub fn delete(&self, id: &DocumentId) -> Result<Option<StoredDocument>> {
        let Some(doc) = self.get(id)? else {
            return Ok(None);
        };

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ScanwerkError::Database(format!("begin: {e}")))?;
        tx.execute(
            "DELETE FROM document_tags WHERE document_id = ?1",
            params![id.to_string()],
        )
        .map_err(|e| ScanwerkError::Database(format!("delete tags: {e}")))?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
            .map_err(|e| ScanwerkError::Database(format!("delete document: {e}")))?;
        tx.commit()
            .map_err(|e| ScanwerkError::Database(format!("commit delete: {e}")))?;

        info!("document record deleted");
        Ok(Some(doc))
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| ScanwerkError::Database(format!("count: {e}")))?;
        Ok(n as usize)
    }

    /// Set one text column and bump `updated_at`.
    fn set_column(&self, id: &DocumentId, column: &'static str, value: Option<&str>) -> Result<()> {
        let sql = format!("UPDATE documents SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
        let rows = self
            .conn
            .execute(&sql, params![value, timestamp(&Utc::now()), id.to_string()])
            .map_err(|e| ScanwerkError::Database(format!("update {column}: {e}")))?;
        found(rows, id)?;
        debug!(column, "document updated");
        Ok(())
    }

    fn tags_of(&self, id: &DocumentId) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM document_tags WHERE document_id = ?1")
            .map_err(|e| ScanwerkError::Database(format!("prepare tags: {e}")))?;
        stmt.query_map(params![id.to_string()], |row| row.get::<_, String>(0))
            .map_err(|e| ScanwerkError::Database(format!("query tags: {e}")))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(|e| ScanwerkError::Database(format!("collect tags: {e}")))
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn found(rows: usize, id: &DocumentId) -> Result<()> {
    if rows == 0 {
        return Err(ScanwerkError::DocumentNotFound(id.to_string()));
    }
    Ok(())
}

fn write_tags(conn: &Connection, id: &DocumentId, tags: &BTreeSet<String>) -> Result<()> {
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        conn.execute(
            "INSERT OR IGNORE INTO document_tags (document_id, tag) VALUES (?1, ?2)",
            params![id.to_string(), tag],
        )
        .map_err(|e| ScanwerkError::Database(format!("insert tag: {e}")))?;
    }
    Ok(())
}

/// Fixed-width UTC timestamps so text order is time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(index: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Column indices follow `SELECT_COLUMNS`. Tags are filled in separately.
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
    let id_str: String = row.get(0)?;
    let created_at: String = row.get(2)?;
    let updated_at: String = row.get(3)?;
    let file_path: String = row.get(9)?;
    let thumbnail_path: Option<String> = row.get(10)?;

    let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StoredDocument {
        id: DocumentId(uuid),
        name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
        updated_at: parse_timestamp(3, &updated_at)?,
        page_count: row.get::<_, i64>(4)? as u32,
        byte_size: row.get::<_, i64>(5)? as u64,
        tags: BTreeSet::new(),
        folder: row.get(6)?,
        favorite: row.get(7)?,
        ocr_text: row.get(8)?,
        file_path: PathBuf::from(file_path),
        thumbnail_path: thumbnail_path.map(PathBuf::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn doc(name: &str) -> StoredDocument {
        StoredDocument::new(name.into(), PathBuf::from(format!("/docs/{name}.pdf")), 2, 4096)
    }

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_and_get_round_trips_fields() {
        let store = DocumentStore::open_in_memory().expect("open");
        let mut original = doc("Invoice");
        original.tags = tags(&["tax", "2026"]);
        original.folder = Some("Receipts".into());
        original.ocr_text = Some("Total 42".into());
        store.insert(&original).expect("insert");

        let found = store.get(&original.id).expect("get").expect("present");
        assert_eq!(found, original);
    }

    #[test]
    fn list_is_newest_first() {
        let store = DocumentStore::open_in_memory().expect("open");
        let mut older = doc("older");
        older.created_at -= Duration::hours(1);
        let newer = doc("newer");
        store.insert(&older).expect("insert older");
        store.insert(&newer).expect("insert newer");

        let names: Vec<String> = store
            .list(&DocumentQuery::default())
            .expect("list")
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }

    #[test]
    fn list_filters_by_tag_and_name() {
        let store = DocumentStore::open_in_memory().expect("open");
        let mut lease = doc("Lease Agreement");
        lease.tags = tags(&["home"]);
        let mut receipt = doc("Hardware receipt");
        receipt.tags = tags(&["home", "tax"]);
        store.insert(&lease).expect("insert");
        store.insert(&receipt).expect("insert");

        let tax = store.list(&DocumentQuery::tagged("tax")).expect("list");
        assert_eq!(tax.len(), 1);
        assert_eq!(tax[0].id, receipt.id);

        let named = store.list(&DocumentQuery::named("LEASE")).expect("list");
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].id, lease.id);

        let both = DocumentQuery {
            tag: Some("home".into()),
            name_contains: Some("receipt".into()),
            favorites_only: false,
        };
        assert_eq!(store.list(&both).expect("list").len(), 1);
    }

    #[test]
    fn toggle_favorite_flips_and_filters() {
        let store = DocumentStore::open_in_memory().expect("open");
        let d = doc("contract");
        store.insert(&d).expect("insert");
        store.insert(&doc("other")).expect("insert");

        assert!(store.toggle_favorite(&d.id).expect("toggle"));
        let favorites = DocumentQuery {
            favorites_only: true,
            ..Default::default()
        };
        assert_eq!(store.list(&favorites).expect("list").len(), 1);

        assert!(!store.toggle_favorite(&d.id).expect("toggle"));
        assert!(store.list(&favorites).expect("list").is_empty());
    }

    #[test]
    fn set_tags_replaces_and_trims() {
        let store = DocumentStore::open_in_memory().expect("open");
        let mut d = doc("letter");
        d.tags = tags(&["old"]);
        store.insert(&d).expect("insert");

        store
            .set_tags(&d.id, &tags(&[" work ", "", "urgent"]))
            .expect("set tags");
        let found = store.get(&d.id).expect("get").expect("present");
        assert_eq!(found.tags, tags(&["urgent", "work"]));
        assert!(found.updated_at >= d.updated_at);
    }

    #[test]
    fn folder_ocr_text_and_rename() {
        let store = DocumentStore::open_in_memory().expect("open");
        let d = doc("scan");
        store.insert(&d).expect("insert");

        store.set_folder(&d.id, Some("Bills")).expect("folder");
        store.set_ocr_text(&d.id, Some("Amount due")).expect("ocr");
        store.rename(&d.id, "Electricity bill").expect("rename");

        let found = store.get(&d.id).expect("get").expect("present");
        assert_eq!(found.folder.as_deref(), Some("Bills"));
        assert_eq!(found.ocr_text.as_deref(), Some("Amount due"));
        assert_eq!(found.name, "Electricity bill");

        store.set_folder(&d.id, Some("   ")).expect("clear folder");
        assert_eq!(store.get(&d.id).expect("get").expect("present").folder, None);
        assert!(matches!(
            store.rename(&d.id, " "),
            Err(ScanwerkError::InvalidInput(_))
        ));
    }

    #[test]
    fn updates_on_unknown_id_are_not_found() {
        let store = DocumentStore::open_in_memory().expect("open");
        let id = DocumentId::new();
        assert!(matches!(
            store.toggle_favorite(&id),
            Err(ScanwerkError::DocumentNotFound(_))
        ));
        assert!(matches!(
            store.set_tags(&id, &tags(&["x"])),
            Err(ScanwerkError::DocumentNotFound(_))
        ));
        assert!(matches!(
            store.set_ocr_text(&id, Some("x")),
            Err(ScanwerkError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn delete_removes_record_and_tags() {
        let store = DocumentStore::open_in_memory().expect("open");
        let mut d = doc("gone");
        d.tags = tags(&["a", "b"]);
        store.insert(&d).expect("insert");

        let removed = store.delete(&d.id).expect("delete").expect("was present");
        assert_eq!(removed.id, d.id);
        assert!(store.get(&d.id).expect("get").is_none());
        assert_eq!(store.count().expect("count"), 0);

        let orphan_tags: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM document_tags", [], |row| row.get(0))
            .expect("count tags");
        assert_eq!(orphan_tags, 0);

        assert!(store.delete(&d.id).expect("second delete").is_none());
    }

    #[test]
    fn duplicate_id_is_rejected_atomically() {
        let store = DocumentStore::open_in_memory().expect("open");
        let d = doc("once");
        store.insert(&d).expect("insert");

        let mut again = d.clone();
        again.tags = tags(&["extra"]);
        assert!(matches!(store.insert(&again), Err(ScanwerkError::Database(_))));
        assert!(store.get(&d.id).expect("get").expect("present").tags.is_empty());
    }

    #[test]
    fn open_on_disk_persists_between_connections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("library.db");
        let d = doc("durable");
        {
            let store = DocumentStore::open(&path).expect("open");
            store.insert(&d).expect("insert");
        }
        let store = DocumentStore::open(&path).expect("reopen");
        assert!(store.get(&d.id).expect("get").is_some());
    }
}
