//! Translation audit records.
//!
//! One record per successfully Braille-converted document, created in the
//! same transaction that marks the document completed. Review fields
//! (`is_verified`, `feedback`) are the only mutable parts afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BrailleGrade, BrailleTranslation, Document, LanguageCode};

/// Reviewer feedback on a translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    /// 1 to 5.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Audit record of a successful Braille conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Translation {
    pub id: String,
    pub owner: String,
    pub document_id: String,
    pub original_text: String,
    pub braille_text: String,
    pub language: LanguageCode,
    pub grade: BrailleGrade,
    /// Conversion confidence in [0, 1].
    pub confidence: f64,
    pub is_verified: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

impl Translation {
    /// Builds the audit record for a document whose Braille stage succeeded.
    pub fn for_document(doc: &Document, braille: &BrailleTranslation, confidence: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: doc.owner.clone(),
            document_id: doc.id.clone(),
            original_text: doc.extracted_text.clone(),
            braille_text: braille.content.clone(),
            language: braille.language,
            grade: braille.grade,
            confidence,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            feedback: None,
            created_at: Utc::now(),
        }
    }
}
