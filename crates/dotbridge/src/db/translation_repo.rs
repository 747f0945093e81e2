//! Translation repository: audit records for completed conversions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::document::{BrailleGrade, Feedback, LanguageCode, Translation};

use super::{Database, DatabaseError};

/// Query parameters for translation listing.
#[derive(Debug, Default, Clone)]
pub struct TranslationQuery {
    pub language: Option<LanguageCode>,
    pub grade: Option<BrailleGrade>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Per-language translation count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStat {
    pub language: String,
    pub count: u64,
}

/// Per-grade translation count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStat {
    pub grade: String,
    pub count: u64,
}

/// Aggregate overview of an owner's translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationStats {
    pub total: u64,
    pub verified: u64,
    pub verification_rate: f64,
    pub by_language: Vec<LanguageStat>,
    pub by_grade: Vec<GradeStat>,
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, message.into())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            log::warn!("Invalid timestamp in translations table: {}", value);
            Utc::now()
        }
    }
}

fn from_row(row: &Row<'_>) -> Result<Translation, rusqlite::Error> {
    let language_str: String = row.get("language")?;
    let language = LanguageCode::parse(&language_str)
        .ok_or_else(|| conversion_error(format!("unknown language: {}", language_str)))?;
    let grade_str: String = row.get("grade")?;
    let grade = BrailleGrade::parse(&grade_str)
        .ok_or_else(|| conversion_error(format!("unknown braille grade: {}", grade_str)))?;

    let feedback: Option<Feedback> = match row.get::<_, Option<String>>("feedback")? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Invalid JSON in translations.feedback: {}", e);
                None
            }
        },
        None => None,
    };

    let verified_at: Option<String> = row.get("verified_at")?;
    let created_at: String = row.get("created_at")?;

    Ok(Translation {
        id: row.get("id")?,
        owner: row.get("owner")?,
        document_id: row.get("document_id")?,
        original_text: row.get("original_text")?,
        braille_text: row.get("braille_text")?,
        language,
        grade,
        confidence: row.get("confidence")?,
        is_verified: row.get::<_, i64>("is_verified")? != 0,
        verified_by: row.get("verified_by")?,
        verified_at: verified_at.as_deref().map(parse_timestamp),
        feedback,
        created_at: parse_timestamp(&created_at),
    })
}

pub(crate) fn insert_with_conn(
    conn: &Connection,
    translation: &Translation,
) -> Result<(), DatabaseError> {
    let feedback_json = match &translation.feedback {
        Some(feedback) => Some(serde_json::to_string(feedback).unwrap_or_default()),
        None => None,
    };
    conn.execute(
        "INSERT INTO translations (id, owner, document_id, original_text, braille_text,
         language, grade, confidence, is_verified, verified_by, verified_at, feedback,
         created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            translation.id,
            translation.owner,
            translation.document_id,
            translation.original_text,
            translation.braille_text,
            translation.language.code(),
            translation.grade.as_str(),
            translation.confidence,
            translation.is_verified as i64,
            translation.verified_by,
            translation.verified_at.map(|t| t.to_rfc3339()),
            feedback_json,
            translation.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Inserts a new translation record.
pub fn insert(db: &Database, translation: &Translation) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with_conn(conn, translation))
}

/// Finds a translation by ID, scoped to its owner.
pub fn find_for_owner(
    db: &Database,
    id: &str,
    owner: &str,
) -> Result<Option<Translation>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM translations WHERE id = ?1 AND owner = ?2")?;
        let mut rows = stmt.query_map(params![id, owner], from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// The translation produced for a document, if any.
pub fn find_by_document(
    db: &Database,
    document_id: &str,
) -> Result<Option<Translation>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM translations WHERE document_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![document_id], from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Queries an owner's translations, returning (rows, total_count).
pub fn query(
    db: &Database,
    owner: &str,
    query: &TranslationQuery,
) -> Result<(Vec<Translation>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = vec!["owner = ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(owner.to_string())];

        if let Some(language) = query.language {
            conditions.push(format!("language = ?{}", param_values.len() + 1));
            param_values.push(Box::new(language.code().to_string()));
        }
        if let Some(grade) = query.grade {
            conditions.push(format!("grade = ?{}", param_values.len() + 1));
            param_values.push(Box::new(grade.as_str().to_string()));
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        let count_sql = format!("SELECT COUNT(*) FROM translations {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = query.limit.unwrap_or(100) as i64;
        let offset = query.skip as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM translations {} ORDER BY created_at DESC, id DESC
             LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<Translation> = stmt
            .query_map(params_ref.as_slice(), from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Marks a translation verified by the given reviewer, or withdraws the
/// verification. Returns whether a matching row existed.
pub fn mark_verified(
    db: &Database,
    id: &str,
    owner: &str,
    verified: bool,
    verified_by: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = if verified {
            conn.execute(
                "UPDATE translations SET is_verified = 1, verified_by = ?3, verified_at = ?4
                 WHERE id = ?1 AND owner = ?2",
                params![id, owner, verified_by, now.to_rfc3339()],
            )?
        } else {
            conn.execute(
                "UPDATE translations SET is_verified = 0, verified_by = NULL, verified_at = NULL
                 WHERE id = ?1 AND owner = ?2",
                params![id, owner],
            )?
        };
        Ok(affected == 1)
    })
}

/// Attaches reviewer feedback to a translation. Returns whether a matching
/// row existed.
pub fn set_feedback(
    db: &Database,
    id: &str,
    owner: &str,
    feedback: &Feedback,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let feedback_json = serde_json::to_string(feedback).unwrap_or_default();
        let affected = conn.execute(
            "UPDATE translations SET feedback = ?3 WHERE id = ?1 AND owner = ?2",
            params![id, owner, feedback_json],
        )?;
        Ok(affected == 1)
    })
}

/// Aggregate counts over an owner's translations.
pub fn stats_overview(db: &Database, owner: &str) -> Result<TranslationStats, DatabaseError> {
    db.with_conn(|conn| {
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM translations WHERE owner = ?1",
            params![owner],
            |r| r.get(0),
        )?;
        let verified: u64 = conn.query_row(
            "SELECT COUNT(*) FROM translations WHERE owner = ?1 AND is_verified = 1",
            params![owner],
            |r| r.get(0),
        )?;
        let verification_rate = if total > 0 {
            verified as f64 / total as f64
        } else {
            0.0
        };

        let mut stmt = conn.prepare(
            "SELECT language, COUNT(*) as count FROM translations
             WHERE owner = ?1 GROUP BY language ORDER BY count DESC",
        )?;
        let by_language: Vec<LanguageStat> = stmt
            .query_map(params![owner], |row| {
                Ok(LanguageStat {
                    language: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT grade, COUNT(*) as count FROM translations
             WHERE owner = ?1 GROUP BY grade ORDER BY count DESC",
        )?;
        let by_grade: Vec<GradeStat> = stmt
            .query_map(params![owner], |row| {
                Ok(GradeStat {
                    grade: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TranslationStats {
            total,
            verified,
            verification_rate,
            by_language,
            by_grade,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn insert_document(db: &Database, owner: &str) -> String {
        let doc = crate::document::Document::new(
            owner,
            "Source",
            crate::document::OriginalFile {
                filename: "source.txt".to_string(),
                storage_path: std::path::PathBuf::from("/tmp/source.txt"),
                mime_type: "text/plain".to_string(),
                size_bytes: 10,
            },
        );
        super::super::document_repo::insert(db, &doc).unwrap();
        doc.id
    }

    fn sample_translation(owner: &str, document_id: &str) -> Translation {
        Translation {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            document_id: document_id.to_string(),
            original_text: "hello".to_string(),
            braille_text: "⠓⠑⠇⠇⠕".to_string(),
            language: LanguageCode::En,
            grade: BrailleGrade::Grade1,
            confidence: 0.8,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        let translation = sample_translation("user-1", &doc_id);
        insert(&db, &translation).unwrap();

        let found = find_for_owner(&db, &translation.id, "user-1").unwrap();
        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.braille_text, "⠓⠑⠇⠇⠕");
        assert_eq!(found.language, LanguageCode::En);
        assert!(!found.is_verified);
    }

    #[test]
    fn test_find_for_owner_scopes_by_owner() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        let translation = sample_translation("user-1", &doc_id);
        insert(&db, &translation).unwrap();

        assert!(find_for_owner(&db, &translation.id, "user-2")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_query_filters_language_and_grade() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");

        let mut hindi = sample_translation("user-1", &doc_id);
        hindi.language = LanguageCode::Hi;
        insert(&db, &hindi).unwrap();

        let mut grade2 = sample_translation("user-1", &doc_id);
        grade2.grade = BrailleGrade::Grade2;
        insert(&db, &grade2).unwrap();

        insert(&db, &sample_translation("user-1", &doc_id)).unwrap();

        let (rows, total) = query(
            &db,
            "user-1",
            &TranslationQuery {
                language: Some(LanguageCode::Hi),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].language, LanguageCode::Hi);

        let (rows, total) = query(
            &db,
            "user-1",
            &TranslationQuery {
                grade: Some(BrailleGrade::Grade2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].grade, BrailleGrade::Grade2);
    }

    #[test]
    fn test_query_pagination() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        for _ in 0..5 {
            insert(&db, &sample_translation("user-1", &doc_id)).unwrap();
        }

        let (rows, total) = query(
            &db,
            "user-1",
            &TranslationQuery {
                skip: 3,
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_mark_verified() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        let translation = sample_translation("user-1", &doc_id);
        insert(&db, &translation).unwrap();

        assert!(
            mark_verified(&db, &translation.id, "user-1", true, "reviewer-1", Utc::now()).unwrap()
        );
        let found = find_for_owner(&db, &translation.id, "user-1")
            .unwrap()
            .unwrap();
        assert!(found.is_verified);
        assert_eq!(found.verified_by.as_deref(), Some("reviewer-1"));
        assert!(found.verified_at.is_some());

        // Wrong owner never verifies.
        assert!(!mark_verified(&db, &translation.id, "user-2", true, "x", Utc::now()).unwrap());
    }

    #[test]
    fn test_unverify_clears_reviewer() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        let translation = sample_translation("user-1", &doc_id);
        insert(&db, &translation).unwrap();

        assert!(
            mark_verified(&db, &translation.id, "user-1", true, "reviewer-1", Utc::now()).unwrap()
        );
        assert!(
            mark_verified(&db, &translation.id, "user-1", false, "reviewer-1", Utc::now())
                .unwrap()
        );

        let found = find_for_owner(&db, &translation.id, "user-1")
            .unwrap()
            .unwrap();
        assert!(!found.is_verified);
        assert!(found.verified_by.is_none());
        assert!(found.verified_at.is_none());
    }

    #[test]
    fn test_set_feedback_round_trips() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");
        let translation = sample_translation("user-1", &doc_id);
        insert(&db, &translation).unwrap();

        let feedback = Feedback {
            rating: 4,
            comment: Some("dots 3 and 6 swapped in line 2".to_string()),
        };
        assert!(set_feedback(&db, &translation.id, "user-1", &feedback).unwrap());

        let found = find_for_owner(&db, &translation.id, "user-1")
            .unwrap()
            .unwrap();
        let stored = found.feedback.unwrap();
        assert_eq!(stored.rating, 4);
        assert_eq!(
            stored.comment.as_deref(),
            Some("dots 3 and 6 swapped in line 2")
        );
    }

    #[test]
    fn test_stats_overview() {
        let db = test_db();
        let doc_id = insert_document(&db, "user-1");

        let mut verified = sample_translation("user-1", &doc_id);
        verified.is_verified = true;
        verified.verified_by = Some("reviewer-1".to_string());
        verified.verified_at = Some(Utc::now());
        insert(&db, &verified).unwrap();

        let mut hindi = sample_translation("user-1", &doc_id);
        hindi.language = LanguageCode::Hi;
        hindi.grade = BrailleGrade::Grade2;
        insert(&db, &hindi).unwrap();

        insert(&db, &sample_translation("user-1", &doc_id)).unwrap();

        let stats = stats_overview(&db, "user-1").unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.verified, 1);
        assert!((stats.verification_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.by_language.len(), 2);
        assert_eq!(stats.by_language[0].language, "en");
        assert_eq!(stats.by_language[0].count, 2);
        assert_eq!(stats.by_grade.len(), 2);
    }

    #[test]
    fn test_stats_overview_empty() {
        let db = test_db();
        let stats = stats_overview(&db, "user-1").unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.verification_rate, 0.0);
        assert!(stats.by_language.is_empty());
    }
}
