//! Catalog - table metadata (schema, column properties, partitions)
//!
//! The catalog stores metadata about every queryable table:
//! schema, per-column properties, access rules, bucketing and the
//! partition key index ("pod") derived from partition descriptors.
//!
//! Tables are built once and published as `Arc<Table>`; after that they
//! are read-only and shared by every query compiled against them.

pub mod meta;
pub mod pod;
pub mod table;

pub use meta::{Catalog, MetaService};
pub use pod::{PartitionValue, Pod, PK};
pub use table::{Table, TableBuilder};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessRule;

/// Column value kinds supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Boolean (true/false)
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Variable-length string
    Varchar,
}

impl Kind {
    /// Check if this kind is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Kind::TinyInt | Kind::SmallInt | Kind::Int | Kind::BigInt | Kind::Float | Kind::Double
        )
    }

    /// Check if this kind is an integer
    pub fn is_integer(&self) -> bool {
        matches!(self, Kind::TinyInt | Kind::SmallInt | Kind::Int | Kind::BigInt)
    }

    /// Check if this kind is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Kind::Varchar)
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Kind::Boolean => "BOOLEAN",
            Kind::TinyInt => "TINYINT",
            Kind::SmallInt => "SMALLINT",
            Kind::Int => "INT",
            Kind::BigInt => "BIGINT",
            Kind::Float => "FLOAT",
            Kind::Double => "DOUBLE",
            Kind::Varchar => "VARCHAR",
        }
    }
}

/// Named, typed schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: Kind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered list of fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: Kind) -> Self {
        self.fields.push(Field::new(name, kind));
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Find a field by name
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub(crate) fn insert_front(&mut self, field: Field) {
        self.fields.insert(0, field);
    }
}

/// Partition descriptor of a column.
///
/// Values are kept as strings. An empty value list or a zero chunk size
/// means the owning column is not a partition column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub values: Vec<String>,
    pub chunk: usize,
}

impl PartitionInfo {
    pub fn new<I, S>(values: I, chunk: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            chunk,
        }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.chunk > 0 && !self.values.is_empty()
    }
}

/// Bucketing of a table on an integer column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub count: u64,
    pub bucket_column: String,
}

impl BucketInfo {
    pub fn new(count: u64, bucket_column: impl Into<String>) -> Self {
        Self {
            count,
            bucket_column: bucket_column.into(),
        }
    }

    /// No bucketing
    pub fn empty() -> Self {
        Self {
            count: 0,
            bucket_column: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bucket of an integer column value, `None` without bucketing
    pub fn bucket(&self, value: u64) -> Option<u64> {
        value.checked_rem(self.count)
    }
}

/// Derived column computed from an expression string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomColumn {
    pub name: String,
    pub kind: Kind,
    pub expr: String,
}

impl CustomColumn {
    pub fn new(name: impl Into<String>, kind: Kind, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            expr: expr.into(),
        }
    }
}

/// Column properties from the metadata system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Build a bloom filter (off by default)
    pub with_bloom_filter: bool,
    /// Dictionary encode values (on by default)
    pub with_dict: bool,
    /// Compress values (off by default)
    pub with_compress: bool,
    /// Default value as string, empty means none
    pub default_value: String,
    /// Column level access rules
    pub rules: Vec<AccessRule>,
    pub partition: PartitionInfo,
}

impl Column {
    /// Properties of a column with nothing declared
    pub const EMPTY: Column = Column {
        with_bloom_filter: false,
        with_dict: true,
        with_compress: false,
        default_value: String::new(),
        rules: Vec::new(),
        partition: PartitionInfo {
            values: Vec::new(),
            chunk: 0,
        },
    };

    pub fn new() -> Self {
        Self::EMPTY
    }

    #[must_use]
    pub fn bloom_filter(mut self, on: bool) -> Self {
        self.with_bloom_filter = on;
        self
    }

    #[must_use]
    pub fn dict(mut self, on: bool) -> Self {
        self.with_dict = on;
        self
    }

    #[must_use]
    pub fn compress(mut self, on: bool) -> Self {
        self.with_compress = on;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Append an access rule
    #[must_use]
    pub fn rule(mut self, rule: AccessRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn partition(mut self, partition: PartitionInfo) -> Self {
        self.partition = partition;
        self
    }
}

impl Default for Column {
    fn default() -> Self {
        Self::EMPTY
    }
}

static EMPTY_COLUMN: Column = Column::EMPTY;

/// Name-to-kind resolution against a table schema
pub trait SchemaProvider {
    fn table_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Kind of a column, `None` when the schema has no such column
    fn lookup(&self, column: &str) -> Option<Kind> {
        self.schema().find(column).map(|f| f.kind)
    }
}

/// Per-column metadata beyond the schema
pub trait ColumnMetadata {
    /// Declared properties of a column, `None` when nothing was declared.
    ///
    /// This says nothing about whether the column exists in the schema.
    fn column(&self, name: &str) -> Option<&Column>;

    /// Declared properties, or the empty defaults
    fn column_or_default(&self, name: &str) -> &Column {
        self.column(name).unwrap_or(&EMPTY_COLUMN)
    }

    fn custom_column(&self, name: &str) -> Option<&CustomColumn>;

    fn pod(&self) -> Option<&Pod>;

    fn bucket(&self) -> &BucketInfo;
}

/// Catalog error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Table already registered
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// Table not found
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// Column properties declared for a column missing from the schema
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Same column name declared twice
    #[error("Column '{column}' declared twice in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// Partition descriptor that cannot be turned into a key
    #[error("Invalid partition column '{column}': {reason}")]
    InvalidPartitionColumn { column: String, reason: String },

    /// Bucket column missing or not an integer
    #[error("Invalid bucket column '{column}': {reason}")]
    InvalidBucketColumn { column: String, reason: String },
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_helpers() {
        assert!(Kind::Int.is_numeric());
        assert!(Kind::BigInt.is_integer());
        assert!(Kind::Float.is_numeric());
        assert!(!Kind::Float.is_integer());
        assert!(Kind::Varchar.is_string());
        assert!(!Kind::Boolean.is_numeric());
    }

    #[test]
    fn test_partition_info_valid() {
        assert!(PartitionInfo::new(["us", "eu"], 4).valid());
        assert!(!PartitionInfo::new(["us"], 0).valid());
        assert!(!PartitionInfo::new(Vec::<String>::new(), 2).valid());
        assert!(!PartitionInfo::default().valid());
    }

    #[test]
    fn test_bucket_info() {
        let b = BucketInfo::new(8, "user_id");
        assert_eq!(b.bucket(0), Some(0));
        assert_eq!(b.bucket(13), Some(5));
        assert_eq!(b.bucket(16), Some(0));

        let empty = BucketInfo::empty();
        assert_eq!(empty.count, 0);
        assert!(empty.is_empty());
        assert_eq!(empty.bucket(13), None);
    }

    #[test]
    fn test_column_defaults() {
        let c = Column::default();
        assert!(!c.with_bloom_filter);
        assert!(c.with_dict);
        assert!(!c.with_compress);
        assert!(c.default_value.is_empty());
        assert!(c.rules.is_empty());
        assert!(!c.partition.valid());

        let c = Column::new().bloom_filter(true).dict(false).default_value("0");
        assert!(c.with_bloom_filter);
        assert!(!c.with_dict);
        assert_eq!(c.default_value, "0");
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new()
            .field("id", Kind::BigInt)
            .field("name", Kind::Varchar);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.find("name").map(|f| f.kind), Some(Kind::Varchar));
        assert_eq!(schema.position("name"), Some(1));
        assert!(!schema.contains("missing"));
    }
}
