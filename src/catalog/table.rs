//! Table metadata
//!
//! A `Table` binds a name to its schema, declared column properties,
//! table level access rules, bucketing and the derived pod. Tables are
//! assembled with `TableBuilder` and are immutable once built.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::access::{evaluate_rules, AccessEvaluator, AccessRule, AccessType, ActionType};

use super::pod::{PartitionValue, Pod, PK};
use super::{
    BucketInfo, CatalogError, CatalogResult, Column, ColumnMetadata, CustomColumn, Field, Kind,
    PartitionInfo, Schema, SchemaProvider,
};

/// Table metadata
#[derive(Debug, Clone)]
pub struct Table {
    /// Globally unique, namespaced by convention (e.g. "sales.orders")
    name: String,
    schema: Schema,
    columns: HashMap<String, Column>,
    /// Table level access rules, can be empty
    rules: Vec<AccessRule>,
    /// Present only if at least one column is partitioned
    pod: Option<Pod>,
    bucket: BucketInfo,
    custom: Vec<CustomColumn>,
    ddl: String,
}

impl Table {
    /// select *
    pub const ALL_COLUMNS: &'static str = "*";

    /// Reserved time column, every table has it
    pub const TIME_COLUMN: &'static str = "_time_";

    /// Produced by time windowing, never a partition column
    pub const WINDOW_COLUMN: &'static str = "_window_";

    /// Start building a table
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ddl(&self) -> &str {
        &self.ddl
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn custom_columns(&self) -> &[CustomColumn] {
        &self.custom
    }

    /// Names of columns with declared properties
    pub fn declared_columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl SchemaProvider for Table {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl ColumnMetadata for Table {
    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    fn custom_column(&self, name: &str) -> Option<&CustomColumn> {
        self.custom.iter().find(|c| c.name == name)
    }

    fn pod(&self) -> Option<&Pod> {
        self.pod.as_ref()
    }

    fn bucket(&self) -> &BucketInfo {
        &self.bucket
    }
}

impl AccessEvaluator for Table {
    fn check_access(
        &self,
        access: AccessType,
        groups: &HashSet<String>,
        column: Option<&str>,
        default: ActionType,
    ) -> ActionType {
        let table_action = evaluate_rules(
            self.rules.iter().filter(|r| r.column.is_none()),
            access,
            groups,
        )
        .unwrap_or(default);

        let Some(column) = column else {
            return table_action;
        };

        // Column scoped table rules first, then the column's own rules
        let scoped = self
            .rules
            .iter()
            .filter(|r| r.column.as_deref() == Some(column));
        let own = self.column_or_default(column).rules.iter();

        match evaluate_rules(scoped.chain(own), access, groups) {
            Some(action) => table_action.restrict(action),
            None => table_action,
        }
    }
}

/// Builder for `Table`
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    fields: Vec<Field>,
    columns: Vec<(String, Column)>,
    rules: Vec<AccessRule>,
    bucket: BucketInfo,
    custom: Vec<CustomColumn>,
    ddl: String,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            columns: Vec::new(),
            rules: Vec::new(),
            bucket: BucketInfo::empty(),
            custom: Vec::new(),
            ddl: String::new(),
        }
    }

    /// Add a schema field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: Kind) -> Self {
        self.fields.push(Field::new(name, kind));
        self
    }

    /// Use every field of an existing schema
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.fields.extend(schema.fields().iter().cloned());
        self
    }

    /// Declare properties for a column
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.columns.push((name.into(), column));
        self
    }

    /// Append a table level access rule
    #[must_use]
    pub fn rule(mut self, rule: AccessRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn bucket(mut self, bucket: BucketInfo) -> Self {
        self.bucket = bucket;
        self
    }

    /// Register a derived column
    #[must_use]
    pub fn custom_column(mut self, column: CustomColumn) -> Self {
        self.custom.push(column);
        self
    }

    #[must_use]
    pub fn ddl(mut self, ddl: impl Into<String>) -> Self {
        self.ddl = ddl.into();
        self
    }

    /// Validate the metadata and build the table with its pod
    pub fn build(self) -> CatalogResult<Table> {
        let schema = load_schema(&self.name, self.fields, &self.custom)?;

        let mut columns = HashMap::with_capacity(self.columns.len());
        for (name, column) in self.columns {
            if !schema.contains(&name) {
                return Err(CatalogError::ColumnNotFound {
                    table: self.name,
                    column: name,
                });
            }
            if columns.contains_key(&name) {
                return Err(CatalogError::DuplicateColumn {
                    table: self.name,
                    column: name,
                });
            }
            columns.insert(name, column);
        }

        validate_bucket(&schema, &self.bucket)?;
        let pod = build_pod(&schema, &columns)?;

        tracing::debug!(
            table = %self.name,
            fields = schema.len(),
            partition_keys = pod.as_ref().map_or(0, Pod::len),
            "Table loaded"
        );

        Ok(Table {
            name: self.name,
            schema,
            columns,
            rules: self.rules,
            pod,
            bucket: self.bucket,
            custom: self.custom,
            ddl: self.ddl,
        })
    }
}

/// Assemble the in-memory schema: declared fields, the time column
/// (injected when missing) and registered custom columns.
fn load_schema(table: &str, fields: Vec<Field>, custom: &[CustomColumn]) -> CatalogResult<Schema> {
    let mut schema = Schema::new();
    for field in fields {
        if schema.contains(&field.name) {
            return Err(CatalogError::DuplicateColumn {
                table: table.to_string(),
                column: field.name,
            });
        }
        schema.push(field);
    }

    if !schema.contains(Table::TIME_COLUMN) {
        schema.insert_front(Field::new(Table::TIME_COLUMN, Kind::BigInt));
    }

    for c in custom {
        if schema.contains(&c.name) {
            return Err(CatalogError::DuplicateColumn {
                table: table.to_string(),
                column: c.name.clone(),
            });
        }
        schema.push(Field::new(c.name.clone(), c.kind));
    }

    Ok(schema)
}

fn validate_bucket(schema: &Schema, bucket: &BucketInfo) -> CatalogResult<()> {
    if bucket.is_empty() {
        return Ok(());
    }
    match schema.find(&bucket.bucket_column) {
        Some(field) if field.kind.is_integer() => Ok(()),
        Some(field) => Err(CatalogError::InvalidBucketColumn {
            column: bucket.bucket_column.clone(),
            reason: format!("expected an integer column, found {}", field.kind.to_str()),
        }),
        None => Err(CatalogError::InvalidBucketColumn {
            column: bucket.bucket_column.clone(),
            reason: "column not in schema".to_string(),
        }),
    }
}

/// Build the pod from every column with a valid partition descriptor,
/// keys ordered by schema position.
fn build_pod(schema: &Schema, columns: &HashMap<String, Column>) -> CatalogResult<Option<Pod>> {
    let mut keys = Vec::new();
    for field in schema.fields() {
        let Some(column) = columns.get(&field.name) else {
            continue;
        };
        if column.partition.valid() {
            keys.push(make_key(field, &column.partition)?);
        }
    }

    Ok(if keys.is_empty() {
        None
    } else {
        Some(Pod::new(keys))
    })
}

fn make_key(field: &Field, partition: &PartitionInfo) -> CatalogResult<PK> {
    let invalid = |reason: String| CatalogError::InvalidPartitionColumn {
        column: field.name.clone(),
        reason,
    };

    if field.name == Table::WINDOW_COLUMN {
        return Err(invalid("window column cannot be partitioned".to_string()));
    }

    let mut values = Vec::with_capacity(partition.values.len());
    for raw in &partition.values {
        let value = if field.kind.is_integer() {
            raw.trim()
                .parse::<i64>()
                .map(PartitionValue::Int)
                .map_err(|_| invalid(format!("value '{}' is not an integer", raw)))?
        } else if field.kind.is_string() {
            PartitionValue::Str(raw.clone())
        } else {
            return Err(invalid(format!(
                "unsupported partition kind {}",
                field.kind.to_str()
            )));
        };

        if values.contains(&value) {
            return Err(invalid(format!("duplicate value '{}'", raw)));
        }
        values.push(value);
    }

    Ok(PK::new(
        field.name.clone(),
        field.kind,
        values,
        partition.chunk,
    ))
}
