use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::errors::SimilarityError;

/// Separator used when flattening nested descriptor names into column names
pub const COLUMN_SEPARATOR: char = '_';

/// One analysed recording: its identifier and flattened descriptor values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Unique identifier (the audio file path relative to the analysis root)
    pub id: String,
    /// Flattened descriptor name and value, in source order. `None` is a null
    /// or non-numeric value.
    pub features: Vec<(String, Option<f64>)>,
}

impl ItemRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            features: Vec::new(),
        }
    }

    /// Builder-style helper for a numeric feature
    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.push((name.into(), Some(value)));
        self
    }

    /// Builder-style helper for a null feature
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.features.push((name.into(), None));
        self
    }
}

/// A named group of descriptor columns, taken from the first token of a
/// flattened column name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Stats,
    Classifications,
    Metadata,
    Other(String),
}

impl Namespace {
    pub fn from_token(token: &str) -> Self {
        match token {
            "stats" => Namespace::Stats,
            "classifications" => Namespace::Classifications,
            "metadata" => Namespace::Metadata,
            other => Namespace::Other(other.to_string()),
        }
    }

    /// Namespace owning a flattened column name
    pub fn of_column(column: &str) -> Self {
        let token = column
            .split(COLUMN_SEPARATOR)
            .next()
            .unwrap_or(column);
        Self::from_token(token)
    }

    pub fn token(&self) -> &str {
        match self {
            Namespace::Stats => "stats",
            Namespace::Classifications => "classifications",
            Namespace::Metadata => "metadata",
            Namespace::Other(token) => token,
        }
    }

    /// Full column name for a metric inside this namespace
    pub fn column_for(&self, metric: &str) -> String {
        format!("{}{}{}", self.token(), COLUMN_SEPARATOR, metric)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Namespace {
    type Err = SimilarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validation::validate_class_token(s)?;
        Ok(Self::from_token(s.trim()))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::Stats
    }
}
