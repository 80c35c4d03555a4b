use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// One glossary entry as it appears in the dataset.
///
/// `related_terms` holds display *names*, not IDs; resolution back to IDs
/// happens in the store at render time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: String,
    pub term: String,
    #[serde(default)]
    pub full_form: Option<String>,
    pub definition: String,
    pub category: String,
    #[serde(default)]
    pub related_terms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryDataset {
    pub terms: Vec<Term>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Why a dataset could not be loaded.
///
/// `Load` covers the transport (the source was unreachable or unreadable);
/// `Format` covers payloads that arrived but do not match the schema. The
/// split exists so startup diagnostics can tell the user which side failed.
#[derive(Debug)]
pub enum DatasetError {
    Load(io::Error),
    Format(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Load(err) => write!(f, "failed to load glossary data: {err}"),
            DatasetError::Format(msg) => write!(f, "invalid glossary data: {msg}"),
        }
    }
}

impl std::error::Error for DatasetError {}

impl From<io::Error> for DatasetError {
    fn from(value: io::Error) -> Self {
        DatasetError::Load(value)
    }
}

impl GlossaryDataset {
    /// Reads and validates a dataset from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses a JSON payload into a dataset.
    ///
    /// A payload that is not JSON, or that parses but lacks a `terms` array,
    /// is a format error rather than a load error.
    pub fn parse(raw: &str) -> Result<Self, DatasetError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|err| DatasetError::Format(format!("payload is not valid JSON: {err}")))?;
        if !value.get("terms").is_some_and(|terms| terms.is_array()) {
            return Err(DatasetError::Format(
                "payload has no `terms` array".to_string(),
            ));
        }
        let mut dataset: GlossaryDataset = serde_json::from_value(value)
            .map_err(|err| DatasetError::Format(err.to_string()))?;
        dataset.sort_terms();
        Ok(dataset)
    }

    /// Sorts terms by display name ascending, case-folded with a stable
    /// tiebreak on the raw name. Every later rendering pass relies on this
    /// order, so it happens exactly once, here.
    fn sort_terms(&mut self) {
        self.terms.sort_by(|a, b| {
            a.term
                .to_lowercase()
                .cmp(&b.term.to_lowercase())
                .then_with(|| a.term.cmp(&b.term))
        });
    }
}
