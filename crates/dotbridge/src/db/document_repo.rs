//! Document repository: CRUD and lifecycle queries for the `documents` table.
//!
//! The conditional status update in [`try_begin_processing`] is the
//! pipeline's only concurrency-control primitive: exactly one caller can
//! move a document into `processing`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::document::{
    AudioFile, BrailleGrade, BrailleTranslation, Document, DocumentMetadata, DocumentStatus,
    LanguageCode, OriginalFile, ProcessingSteps, Translation,
};

use super::{translation_repo, Database, DatabaseError};

/// Sort order for document listings. All orders are total (id tie-break).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Name,
}

/// Query parameters for document listing.
#[derive(Debug, Default, Clone)]
pub struct DocumentQuery {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: SortOrder,
    /// Case-insensitive substring match against title or extracted text.
    pub search_term: Option<String>,
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, message.into())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            log::warn!("Invalid timestamp in documents table: {}", value);
            Utc::now()
        }
    }
}

fn parse_json_column<T: Default + serde::de::DeserializeOwned>(value: &str, column: &str) -> T {
    serde_json::from_str(value).unwrap_or_else(|e| {
        log::warn!("Invalid JSON in documents.{}: {}", column, e);
        T::default()
    })
}

fn steps_json(steps: &ProcessingSteps) -> String {
    serde_json::to_string(steps).unwrap_or_else(|_| "{}".to_string())
}

fn metadata_json(metadata: &DocumentMetadata) -> String {
    serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
}

fn from_row(row: &Row<'_>) -> Result<Document, rusqlite::Error> {
    let status_str: String = row.get("status")?;
    let status = DocumentStatus::parse(&status_str)
        .ok_or_else(|| conversion_error(format!("unknown document status: {}", status_str)))?;

    let braille_content: Option<String> = row.get("braille_content")?;
    let braille_grade: Option<String> = row.get("braille_grade")?;
    let braille_language: Option<String> = row.get("braille_language")?;
    let braille = match (braille_content, braille_grade, braille_language) {
        (Some(content), Some(grade), Some(language)) => {
            let grade = BrailleGrade::parse(&grade)
                .ok_or_else(|| conversion_error(format!("unknown braille grade: {}", grade)))?;
            let language = LanguageCode::parse(&language)
                .ok_or_else(|| conversion_error(format!("unknown language: {}", language)))?;
            Some(BrailleTranslation {
                content,
                grade,
                language,
            })
        }
        _ => None,
    };

    let audio_filename: Option<String> = row.get("audio_filename")?;
    let audio_path: Option<String> = row.get("audio_path")?;
    let audio_duration: Option<f64> = row.get("audio_duration")?;
    let audio_file = match (audio_filename, audio_path) {
        (Some(filename), Some(path)) => Some(AudioFile {
            filename,
            storage_path: PathBuf::from(path),
            duration_seconds: audio_duration.unwrap_or(0.0),
        }),
        _ => None,
    };

    let steps_raw: String = row.get("steps")?;
    let metadata_raw: String = row.get("metadata")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Document {
        id: row.get("id")?,
        owner: row.get("owner")?,
        title: row.get("title")?,
        original_file: OriginalFile {
            filename: row.get("original_filename")?,
            storage_path: PathBuf::from(row.get::<_, String>("original_path")?),
            mime_type: row.get("original_mime_type")?,
            size_bytes: row.get::<_, i64>("original_size")? as u64,
        },
        extracted_text: row.get("extracted_text")?,
        braille,
        audio_file,
        status,
        steps: parse_json_column(&steps_raw, "steps"),
        metadata: parse_json_column(&metadata_raw, "metadata"),
        attempt_count: row.get::<_, i64>("attempt_count")? as u32,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &Document) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, owner, title, original_filename, original_path,
             original_mime_type, original_size, extracted_text, braille_content,
             braille_grade, braille_language, audio_filename, audio_path, audio_duration,
             status, steps, metadata, attempt_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
             ?16, ?17, ?18, ?19, ?20)",
            params![
                doc.id,
                doc.owner,
                doc.title,
                doc.original_file.filename,
                doc.original_file.storage_path.to_string_lossy().into_owned(),
                doc.original_file.mime_type,
                doc.original_file.size_bytes as i64,
                doc.extracted_text,
                doc.braille.as_ref().map(|b| b.content.clone()),
                doc.braille.as_ref().map(|b| b.grade.as_str()),
                doc.braille.as_ref().map(|b| b.language.code()),
                doc.audio_file.as_ref().map(|a| a.filename.clone()),
                doc.audio_file
                    .as_ref()
                    .map(|a| a.storage_path.to_string_lossy().into_owned()),
                doc.audio_file.as_ref().map(|a| a.duration_seconds),
                doc.status.as_str(),
                steps_json(&doc.steps),
                metadata_json(&doc.metadata),
                doc.attempt_count as i64,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

fn update_with_conn(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE documents SET title=?2, extracted_text=?3, braille_content=?4,
         braille_grade=?5, braille_language=?6, audio_filename=?7, audio_path=?8,
         audio_duration=?9, status=?10, steps=?11, metadata=?12, attempt_count=?13,
         updated_at=?14
         WHERE id=?1",
        params![
            doc.id,
            doc.title,
            doc.extracted_text,
            doc.braille.as_ref().map(|b| b.content.clone()),
            doc.braille.as_ref().map(|b| b.grade.as_str()),
            doc.braille.as_ref().map(|b| b.language.code()),
            doc.audio_file.as_ref().map(|a| a.filename.clone()),
            doc.audio_file
                .as_ref()
                .map(|a| a.storage_path.to_string_lossy().into_owned()),
            doc.audio_file.as_ref().map(|a| a.duration_seconds),
            doc.status.as_str(),
            steps_json(&doc.steps),
            metadata_json(&doc.metadata),
            doc.attempt_count as i64,
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Updates an existing document row. `id`, `owner`, and `created_at` are
/// never overwritten.
pub fn update(db: &Database, doc: &Document) -> Result<(), DatabaseError> {
    db.with_conn(|conn| update_with_conn(conn, doc))
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds a document by ID, scoped to its owner.
pub fn find_for_owner(
    db: &Database,
    id: &str,
    owner: &str,
) -> Result<Option<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1 AND owner = ?2")?;
        let mut rows = stmt.query_map(params![id, owner], from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Atomically moves a document into `processing`, accepting only documents
/// currently `uploaded` or `failed`. Returns whether this caller won the
/// transition; a false return means another attempt holds (or held) it.
pub fn try_begin_processing(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE documents SET status = 'processing',
             attempt_count = attempt_count + 1, updated_at = ?2
             WHERE id = ?1 AND status IN ('uploaded', 'failed')",
            params![id, now.to_rfc3339()],
        )?;
        Ok(affected == 1)
    })
}

/// Writes a failed document state only if the row is still `processing`,
/// so a concurrently finishing attempt is never clobbered. Used by the
/// reconciliation sweep. Writes the same columns as `update`.
pub fn fail_if_processing(db: &Database, doc: &Document) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE documents SET extracted_text=?2, braille_content=?3,
             braille_grade=?4, braille_language=?5, audio_filename=?6, audio_path=?7,
             audio_duration=?8, status='failed', steps=?9, updated_at=?10
             WHERE id=?1 AND status='processing'",
            params![
                doc.id,
                doc.extracted_text,
                doc.braille.as_ref().map(|b| b.content.clone()),
                doc.braille.as_ref().map(|b| b.grade.as_str()),
                doc.braille.as_ref().map(|b| b.language.code()),
                doc.audio_file.as_ref().map(|a| a.filename.clone()),
                doc.audio_file
                    .as_ref()
                    .map(|a| a.storage_path.to_string_lossy().into_owned()),
                doc.audio_file.as_ref().map(|a| a.duration_seconds),
                steps_json(&doc.steps),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(affected == 1)
    })
}

/// Persists the completed document and its translation audit record in one
/// transaction. Either both land or neither does.
pub fn complete_with_translation(
    db: &Database,
    doc: &Document,
    translation: &Translation,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        update_with_conn(&tx, doc)?;
        translation_repo::insert_with_conn(&tx, translation)?;
        tx.commit()?;
        Ok(())
    })
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Queries an owner's documents, returning (rows, total_count). The total
/// is counted after filtering, before pagination.
pub fn query(
    db: &Database,
    owner: &str,
    query: &DocumentQuery,
) -> Result<(Vec<Document>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = vec!["owner = ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(owner.to_string())];

        if let Some(term) = query.search_term.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            conditions.push(format!(
                "(title LIKE ?{} ESCAPE '\\' OR extracted_text LIKE ?{} ESCAPE '\\')",
                param_values.len() + 1,
                param_values.len() + 2
            ));
            param_values.push(Box::new(pattern.clone()));
            param_values.push(Box::new(pattern));
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM documents {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let order_clause = match query.sort {
            SortOrder::Newest => "ORDER BY created_at DESC, id DESC",
            SortOrder::Oldest => "ORDER BY created_at ASC, id ASC",
            SortOrder::Name => "ORDER BY title COLLATE NOCASE ASC, id ASC",
        };

        // Fetch paginated results.
        let limit = query.limit.unwrap_or(100) as i64;
        let offset = query.skip as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM documents {} {} LIMIT ?{} OFFSET ?{}",
            where_clause,
            order_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<Document> = stmt
            .query_map(params_ref.as_slice(), from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// The owner's most recent documents, newest first.
pub fn recent(db: &Database, owner: &str, limit: u64) -> Result<Vec<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE owner = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows: Vec<Document> = stmt
            .query_map(params![owner, limit as i64], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts an owner's documents with the given status.
pub fn count_by_status(
    db: &Database,
    owner: &str,
    status: DocumentStatus,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE owner = ?1 AND status = ?2",
            params![owner, status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Documents stuck in `processing` whose last update is older than the
/// cutoff. Candidates for the reconciliation sweep.
pub fn find_stale_processing(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE status = 'processing' AND updated_at < ?1",
        )?;
        let rows: Vec<Document> = stmt
            .query_map(params![cutoff.to_rfc3339()], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a document row. Translation records cascade.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(affected == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StageKind;
    use chrono::TimeZone;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_document(owner: &str, title: &str) -> Document {
        Document::new(
            owner,
            title,
            OriginalFile {
                filename: "test.txt".to_string(),
                storage_path: PathBuf::from("/tmp/test.txt"),
                mime_type: "text/plain".to_string(),
                size_bytes: 64,
            },
        )
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let doc = sample_document("user-1", "First document");
        insert(&db, &doc).unwrap();

        let found = find_by_id(&db, &doc.id).unwrap();
        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.title, "First document");
        assert_eq!(found.status, DocumentStatus::Uploaded);
        assert_eq!(found.original_file.mime_type, "text/plain");
        assert_eq!(found.original_file.size_bytes, 64);
        assert!(found.braille.is_none());
        assert!(found.audio_file.is_none());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        let found = find_by_id(&db, "nonexistent").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_find_for_owner_scopes_by_owner() {
        let db = test_db();
        let doc = sample_document("user-1", "Mine");
        insert(&db, &doc).unwrap();

        assert!(find_for_owner(&db, &doc.id, "user-1").unwrap().is_some());
        assert!(find_for_owner(&db, &doc.id, "user-2").unwrap().is_none());
    }

    #[test]
    fn test_update_persists_stage_output() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        insert(&db, &doc).unwrap();

        let now = Utc::now();
        doc.apply_extracted("hello world".to_string(), now);
        doc.apply_braille(
            BrailleTranslation {
                content: "⠓⠑⠇⠇⠕ ⠺⠕⠗⠇⠙".to_string(),
                grade: BrailleGrade::Grade2,
                language: LanguageCode::Hi,
            },
            now,
        );
        doc.status = DocumentStatus::Processing;
        update(&db, &doc).unwrap();

        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.extracted_text, "hello world");
        let braille = found.braille.unwrap();
        assert_eq!(braille.grade, BrailleGrade::Grade2);
        assert_eq!(braille.language, LanguageCode::Hi);
        assert!(found.steps.ocr.completed);
        assert!(found.steps.braille.completed);
        assert_eq!(found.status, DocumentStatus::Processing);
    }

    #[test]
    fn test_try_begin_processing_cas() {
        let db = test_db();
        let doc = sample_document("user-1", "Doc");
        insert(&db, &doc).unwrap();

        // First caller wins the transition.
        assert!(try_begin_processing(&db, &doc.id, Utc::now()).unwrap());
        // Second caller loses: the document is already processing.
        assert!(!try_begin_processing(&db, &doc.id, Utc::now()).unwrap());

        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.status, DocumentStatus::Processing);
        assert_eq!(found.attempt_count, 1);
    }

    #[test]
    fn test_try_begin_processing_accepts_failed() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        insert(&db, &doc).unwrap();

        doc.record_stage_failure(
            crate::document::StageKind::Ocr,
            "OCR extraction failed",
            Utc::now(),
        );
        update(&db, &doc).unwrap();

        assert!(try_begin_processing(&db, &doc.id, Utc::now()).unwrap());
        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.attempt_count, 1);
    }

    #[test]
    fn test_try_begin_processing_rejects_completed() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        doc.status = DocumentStatus::Completed;
        insert(&db, &doc).unwrap();

        assert!(!try_begin_processing(&db, &doc.id, Utc::now()).unwrap());
    }

    #[test]
    fn test_fail_if_processing_guards_on_status() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        doc.status = DocumentStatus::Processing;
        insert(&db, &doc).unwrap();

        doc.record_stage_failure(StageKind::Ocr, "processing abandoned", Utc::now());
        assert!(fail_if_processing(&db, &doc).unwrap());

        // Already failed: a second sweep is a no-op.
        assert!(!fail_if_processing(&db, &doc).unwrap());

        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.status, DocumentStatus::Failed);
        assert!(found.steps.ocr.error.is_some());
    }

    #[test]
    fn test_fail_if_processing_withdraws_outputs() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        let now = Utc::now();
        doc.apply_extracted("hello".to_string(), now);
        doc.apply_braille(
            BrailleTranslation {
                content: "⠓⠑⠇⠇⠕".to_string(),
                grade: BrailleGrade::Grade1,
                language: LanguageCode::En,
            },
            now,
        );
        doc.status = DocumentStatus::Processing;
        insert(&db, &doc).unwrap();

        doc.record_stage_failure(StageKind::Ocr, "processing abandoned", Utc::now());
        assert!(fail_if_processing(&db, &doc).unwrap());

        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.status, DocumentStatus::Failed);
        assert!(found.braille.is_none());
        assert!(!found.steps.braille.completed);
    }

    #[test]
    fn test_complete_with_translation_commits_both() {
        let db = test_db();
        let mut doc = sample_document("user-1", "Doc");
        insert(&db, &doc).unwrap();

        let now = Utc::now();
        doc.apply_extracted("hello".to_string(), now);
        let braille = BrailleTranslation {
            content: "⠓⠑⠇⠇⠕".to_string(),
            grade: BrailleGrade::Grade1,
            language: LanguageCode::En,
        };
        doc.apply_braille(braille.clone(), now);
        let translation = Translation::for_document(&doc, &braille, 0.8);
        doc.complete(DocumentMetadata::default(), now);

        complete_with_translation(&db, &doc, &translation).unwrap();

        let found = find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.status, DocumentStatus::Completed);
        let stored = translation_repo::find_by_document(&db, &doc.id).unwrap();
        assert!(stored.is_some());
        assert_eq!(stored.unwrap().braille_text, "⠓⠑⠇⠇⠕");
    }

    #[test]
    fn test_query_scoped_to_owner() {
        let db = test_db();
        insert(&db, &sample_document("user-1", "A")).unwrap();
        insert(&db, &sample_document("user-1", "B")).unwrap();
        insert(&db, &sample_document("user-2", "C")).unwrap();

        let (rows, total) = query(&db, "user-1", &DocumentQuery::default()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|d| d.owner == "user-1"));
    }

    #[test]
    fn test_query_search_matches_title_and_text() {
        let db = test_db();
        let mut by_title = sample_document("user-1", "Invoice March");
        by_title.created_at = at(1);
        insert(&db, &by_title).unwrap();

        let mut by_text = sample_document("user-1", "Untitled");
        by_text.extracted_text = "the invoice total is due".to_string();
        by_text.created_at = at(2);
        insert(&db, &by_text).unwrap();

        let mut neither = sample_document("user-1", "Recipe");
        neither.created_at = at(3);
        insert(&db, &neither).unwrap();

        let (rows, total) = query(
            &db,
            "user-1",
            &DocumentQuery {
                search_term: Some("INVOICE".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 2);
        let titles: Vec<&str> = rows.iter().map(|d| d.title.as_str()).collect();
        assert!(titles.contains(&"Invoice March"));
        assert!(titles.contains(&"Untitled"));
    }

    #[test]
    fn test_query_search_escapes_like_wildcards() {
        let db = test_db();
        let mut literal = sample_document("user-1", "100% complete");
        literal.created_at = at(1);
        insert(&db, &literal).unwrap();

        let mut other = sample_document("user-1", "100 pages");
        other.created_at = at(2);
        insert(&db, &other).unwrap();

        let (rows, total) = query(
            &db,
            "user-1",
            &DocumentQuery {
                search_term: Some("100%".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "100% complete");
    }

    #[test]
    fn test_query_sort_newest_and_oldest() {
        let db = test_db();
        for (i, title) in ["first", "second", "third"].iter().enumerate() {
            let mut doc = sample_document("user-1", title);
            doc.created_at = at(i as i64);
            insert(&db, &doc).unwrap();
        }

        let (rows, _) = query(
            &db,
            "user-1",
            &DocumentQuery {
                sort: SortOrder::Newest,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows[0].title, "third");
        assert_eq!(rows[2].title, "first");

        let (rows, _) = query(
            &db,
            "user-1",
            &DocumentQuery {
                sort: SortOrder::Oldest,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows[0].title, "first");
        assert_eq!(rows[2].title, "third");
    }

    #[test]
    fn test_query_sort_name_case_insensitive_and_stable() {
        let db = test_db();
        for title in ["banana", "Apple", "apple"] {
            insert(&db, &sample_document("user-1", title)).unwrap();
        }

        let by_name = DocumentQuery {
            sort: SortOrder::Name,
            ..Default::default()
        };
        let (first, _) = query(&db, "user-1", &by_name).unwrap();
        assert_eq!(first[2].title, "banana");
        assert!(first[0].title.eq_ignore_ascii_case("apple"));
        assert!(first[1].title.eq_ignore_ascii_case("apple"));

        // Equal titles keep a stable relative order across repeated calls.
        let (second, _) = query(&db, "user-1", &by_name).unwrap();
        let first_ids: Vec<&str> = first.iter().map(|d| d.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_query_pagination_pages() {
        let db = test_db();
        for i in 0..45 {
            let mut doc = sample_document("user-1", &format!("doc {:02}", i));
            doc.created_at = at(i);
            insert(&db, &doc).unwrap();
        }

        let page = |skip: u64| {
            query(
                &db,
                "user-1",
                &DocumentQuery {
                    skip,
                    limit: Some(20),
                    sort: SortOrder::Oldest,
                    ..Default::default()
                },
            )
            .unwrap()
        };

        let (page1, total) = page(0);
        assert_eq!(total, 45);
        assert_eq!(page1.len(), 20);
        assert_eq!(page1[0].title, "doc 00");
        assert_eq!(page1[19].title, "doc 19");

        let (page3, total) = page(40);
        assert_eq!(total, 45);
        assert_eq!(page3.len(), 5);
        assert_eq!(page3[0].title, "doc 40");
        assert_eq!(page3[4].title, "doc 44");

        let pages = (total + 19) / 20;
        assert_eq!(pages, 3);
    }

    #[test]
    fn test_recent_limits_and_orders() {
        let db = test_db();
        for i in 0..12 {
            let mut doc = sample_document("user-1", &format!("doc {:02}", i));
            doc.created_at = at(i);
            insert(&db, &doc).unwrap();
        }

        let rows = recent(&db, "user-1", 10).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].title, "doc 11");
        assert_eq!(rows[9].title, "doc 02");
    }

    #[test]
    fn test_count_by_status() {
        let db = test_db();
        insert(&db, &sample_document("user-1", "A")).unwrap();
        insert(&db, &sample_document("user-1", "B")).unwrap();

        let mut failed = sample_document("user-1", "C");
        failed.status = DocumentStatus::Failed;
        insert(&db, &failed).unwrap();

        // Another owner's documents are not counted.
        insert(&db, &sample_document("user-2", "D")).unwrap();

        assert_eq!(
            count_by_status(&db, "user-1", DocumentStatus::Uploaded).unwrap(),
            2
        );
        assert_eq!(
            count_by_status(&db, "user-1", DocumentStatus::Failed).unwrap(),
            1
        );
        assert_eq!(
            count_by_status(&db, "user-1", DocumentStatus::Completed).unwrap(),
            0
        );
    }

    #[test]
    fn test_find_stale_processing() {
        let db = test_db();
        let mut stale = sample_document("user-1", "Stale");
        stale.status = DocumentStatus::Processing;
        stale.updated_at = at(0);
        insert(&db, &stale).unwrap();

        let mut fresh = sample_document("user-1", "Fresh");
        fresh.status = DocumentStatus::Processing;
        fresh.updated_at = at(600);
        insert(&db, &fresh).unwrap();

        let mut done = sample_document("user-1", "Done");
        done.status = DocumentStatus::Completed;
        done.updated_at = at(0);
        insert(&db, &done).unwrap();

        let found = find_stale_processing(&db, at(300)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Stale");
    }

    #[test]
    fn test_delete_removes_row() {
        let db = test_db();
        let doc = sample_document("user-1", "Doc");
        insert(&db, &doc).unwrap();

        assert!(delete(&db, &doc.id).unwrap());
        assert!(!delete(&db, &doc.id).unwrap());
        assert!(find_by_id(&db, &doc.id).unwrap().is_none());
    }
}
