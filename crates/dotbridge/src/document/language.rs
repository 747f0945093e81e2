//! Supported transliteration and synthesis languages.

use serde::{Deserialize, Serialize};

/// Closed set of language codes the conversion services accept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    En,
    Hi,
    Ta,
    Te,
    Bn,
    Gu,
    Kn,
    Ml,
    Mr,
    Or,
    Pa,
    Ur,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 12] = [
        LanguageCode::En,
        LanguageCode::Hi,
        LanguageCode::Ta,
        LanguageCode::Te,
        LanguageCode::Bn,
        LanguageCode::Gu,
        LanguageCode::Kn,
        LanguageCode::Ml,
        LanguageCode::Mr,
        LanguageCode::Or,
        LanguageCode::Pa,
        LanguageCode::Ur,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Hi => "hi",
            LanguageCode::Ta => "ta",
            LanguageCode::Te => "te",
            LanguageCode::Bn => "bn",
            LanguageCode::Gu => "gu",
            LanguageCode::Kn => "kn",
            LanguageCode::Ml => "ml",
            LanguageCode::Mr => "mr",
            LanguageCode::Or => "or",
            LanguageCode::Pa => "pa",
            LanguageCode::Ur => "ur",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LanguageCode::En => "English",
            LanguageCode::Hi => "Hindi",
            LanguageCode::Ta => "Tamil",
            LanguageCode::Te => "Telugu",
            LanguageCode::Bn => "Bengali",
            LanguageCode::Gu => "Gujarati",
            LanguageCode::Kn => "Kannada",
            LanguageCode::Ml => "Malayalam",
            LanguageCode::Mr => "Marathi",
            LanguageCode::Or => "Odia",
            LanguageCode::Pa => "Punjabi",
            LanguageCode::Ur => "Urdu",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
