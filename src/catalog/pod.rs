//! Partition key index ("pod")
//!
//! A pod holds one partition key per column with a valid partition
//! descriptor. It is built once when a table is constructed and never
//! changes afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Kind;

/// Typed partition value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PartitionValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for PartitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionValue::Int(i) => write!(f, "{}", i),
            PartitionValue::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Partition key of one column.
///
/// Declared values are grouped into chunks of `chunk` consecutive values;
/// a chunk is the unit the storage layer lays out and skips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PK {
    column: String,
    kind: Kind,
    values: Vec<PartitionValue>,
    chunk: usize,
}

impl PK {
    pub(crate) fn new(column: String, kind: Kind, values: Vec<PartitionValue>, chunk: usize) -> Self {
        Self {
            column,
            kind,
            values,
            chunk,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn values(&self) -> &[PartitionValue] {
        &self.values
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Number of chunks this key spans
    pub fn spaces(&self) -> usize {
        self.values.len().div_ceil(self.chunk)
    }

    /// Position of a declared value
    pub fn position(&self, value: &PartitionValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Chunk holding the value at `position`
    pub fn chunk_of(&self, position: usize) -> usize {
        position / self.chunk
    }
}

/// Partition key index of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    keys: Vec<PK>,
}

impl Pod {
    pub(crate) fn new(keys: Vec<PK>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[PK] {
        &self.keys
    }

    /// Key of a partition column
    pub fn key(&self, column: &str) -> Option<&PK> {
        self.keys.iter().find(|k| k.column == column)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total number of partition chunk combinations
    pub fn spaces(&self) -> usize {
        self.keys.iter().map(PK::spaces).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_key() -> PK {
        PK::new(
            "region".to_string(),
            Kind::Varchar,
            vec![
                PartitionValue::Str("us".to_string()),
                PartitionValue::Str("eu".to_string()),
                PartitionValue::Str("apac".to_string()),
            ],
            2,
        )
    }

    #[test]
    fn test_pk_chunks() {
        let pk = region_key();
        assert_eq!(pk.spaces(), 2);
        assert_eq!(pk.position(&PartitionValue::Str("apac".to_string())), Some(2));
        assert_eq!(pk.chunk_of(0), 0);
        assert_eq!(pk.chunk_of(1), 0);
        assert_eq!(pk.chunk_of(2), 1);
        assert_eq!(pk.position(&PartitionValue::Str("latam".to_string())), None);
    }

    #[test]
    fn test_pod_lookup() {
        let tier = PK::new(
            "tier".to_string(),
            Kind::Int,
            vec![PartitionValue::Int(1), PartitionValue::Int(2), PartitionValue::Int(3)],
            1,
        );
        let pod = Pod::new(vec![region_key(), tier]);

        assert_eq!(pod.len(), 2);
        assert_eq!(pod.key("tier").map(|k| k.kind()), Some(Kind::Int));
        assert!(pod.key("amount").is_none());
        assert_eq!(pod.spaces(), 6);
    }
}
