//! Base implementation of records.
use crate::error::AuditError;
use std::{
    collections::{hash_map::Keys, HashMap},
    fmt::Display,
};

/// Possible types of values stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A floating-point value, like an average utilization or a duration.
    Scalar(f64),

    /// A text value.
    String(String),
}

impl Display for RecordValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for RecordValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<String> for RecordValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RecordValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A sparse row of the report, mapping column names to values.
///
/// Absent values are represented by the absence of the column, never by a placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: impl Into<RecordValue>) {
        self.0.insert(k.into(), v.into());
    }

    /// Inserts the value if it is present, leaving the column absent otherwise.
    pub fn insert_opt(&mut self, k: impl Into<String>, v: Option<impl Into<RecordValue>>) {
        if let Some(v) = v {
            self.insert(k, v);
        }
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns `true` if the column is present.
    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    /// Merges another record into this one in place.
    ///
    /// If both records contain the same key, the value from `record` wins.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f64, AuditError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(AuditError::RecordValueTypeError("Scalar".to_string())),
            None => Err(AuditError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, AuditError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(AuditError::RecordValueTypeError("String".to_string())),
            None => Err(AuditError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the number of columns present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
