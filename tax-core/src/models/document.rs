use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of uploaded financial document.
///
/// Unknown kinds are kept verbatim in [`DocumentType::Other`] so that
/// storing and reading them back is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    W2,
    Form1099,
    Form1099B,
    Form1099Misc,
    Form1098,
    Charity,
    Medical,
    Other(String),
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::W2 => "w2",
            Self::Form1099 => "1099",
            Self::Form1099B => "1099-B",
            Self::Form1099Misc => "1099-MISC",
            Self::Form1098 => "1098",
            Self::Charity => "charity",
            Self::Medical => "medical",
            Self::Other(s) => s,
        }
    }

    /// Case-insensitive; `W-2` and `1099-NEC` are accepted as aliases.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        [
            ("w2", Self::W2),
            ("w-2", Self::W2),
            ("1099", Self::Form1099),
            ("1099-nec", Self::Form1099),
            ("1099-b", Self::Form1099B),
            ("1099-misc", Self::Form1099Misc),
            ("1098", Self::Form1098),
            ("charity", Self::Charity),
            ("medical", Self::Medical),
        ]
        .into_iter()
        .find(|(name, _)| s.eq_ignore_ascii_case(name))
        .map_or_else(|| Self::Other(s.to_string()), |(_, kind)| kind)
    }
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<DocumentType> for String {
    fn from(doc_type: DocumentType) -> Self {
        doc_type.as_str().to_string()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value in a document's content map.
///
/// Text is tried before numbers so identifiers such as ZIP codes keep
/// their leading zeros. Numbers are written as JSON numbers so a stored
/// map reads back with the same variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
}

impl FieldValue {
    /// Numeric reading of the value.
    ///
    /// Text is accepted with thousands separators and a leading `$`
    /// (e.g. `"$1,234.56"`). Flags and unparseable text yield `None`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let normalized = s.trim().trim_start_matches('$').replace(',', "");
                if normalized.is_empty() {
                    None
                } else {
                    normalized.parse().ok()
                }
            }
            Self::Flag(_) => None,
        }
    }

    /// Whether the value counts as filled in: non-empty text, a non-zero
    /// number, or a set flag.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Number(n) => !n.is_zero(),
            Self::Text(s) => !s.trim().is_empty(),
            Self::Flag(b) => *b,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl From<Decimal> for FieldValue {
    fn from(n: Decimal) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// A stored financial document for one user and tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: String,
    pub doc_type: DocumentType,
    pub year: i32,
    pub content: FieldMap,
    /// Name of the uploaded file the fields were extracted from.
    #[serde(default)]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// For inserting new documents (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub user_id: String,
    pub doc_type: DocumentType,
    pub year: i32,
    pub content: FieldMap,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Fields extracted from an uploaded form, before they are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFormData {
    pub form_type: String,
    pub year: i32,
    pub fields: FieldMap,
}

impl ExtractedFormData {
    pub fn into_new_document(
        self,
        user_id: impl Into<String>,
    ) -> NewDocument {
        NewDocument {
            user_id: user_id.into(),
            doc_type: DocumentType::parse(&self.form_type),
            year: self.year,
            content: self.fields,
            file_name: None,
        }
    }
}
