//! Table metadata produced by a [`CatalogProbe`](crate::probe::CatalogProbe)
//! and stored in the schema cache.

use serde::{Deserialize, Serialize};

use crate::identity::TableIdentity;

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Catalog data type name (`NVARCHAR`, `INTEGER`, `DECIMAL`, ...)
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub length: Option<i64>,
    pub scale: Option<i64>,
    pub is_primary_key: bool,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            length: None,
            scale: None,
            is_primary_key: false,
        }
    }
}

/// Foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// Unique constraint (other than the primary key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// Full schema metadata for one table
///
/// Descriptors are immutable once built: a rebuild replaces the cached value
/// wholesale rather than patching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub table: TableIdentity,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl TableDescriptor {
    #[must_use]
    pub const fn new(table: TableIdentity, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table,
            columns,
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    /// Set the primary key and flag the matching columns.
    #[must_use]
    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        for column in &mut self.columns {
            column.is_primary_key = columns.contains(&column.name);
        }
        self.primary_key = columns;
        self
    }

    #[must_use]
    pub fn with_foreign_keys(mut self, foreign_keys: Vec<ForeignKey>) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }

    #[must_use]
    pub fn with_unique_constraints(mut self, unique_constraints: Vec<UniqueConstraint>) -> Self {
        self.unique_constraints = unique_constraints;
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.table.full_name()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableDescriptor {
        TableDescriptor::new(
            TableIdentity::new(Some("APP"), "ORDERS"),
            vec![
                ColumnDescriptor::new("ID", "INTEGER", false),
                ColumnDescriptor::new("CUSTOMER_ID", "INTEGER", false),
                ColumnDescriptor::new("NOTE", "NVARCHAR", true),
            ],
        )
    }

    #[test]
    fn test_with_primary_key_flags_columns() {
        let table = orders().with_primary_key(vec!["ID".to_string()]);

        assert_eq!(table.primary_key, vec!["ID".to_string()]);
        assert!(table.column("ID").unwrap().is_primary_key);
        assert!(!table.column("NOTE").unwrap().is_primary_key);
    }

    #[test]
    fn test_column_lookup() {
        let table = orders();
        assert_eq!(table.column("NOTE").unwrap().data_type, "NVARCHAR");
        assert!(table.column("MISSING").is_none());
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["ID", "CUSTOMER_ID", "NOTE"]
        );
    }

    #[test]
    fn test_full_name() {
        assert_eq!(orders().full_name(), "APP.ORDERS");
    }

    #[test]
    fn test_json_preserves_constraints() {
        let table = orders()
            .with_primary_key(vec!["ID".to_string()])
            .with_foreign_keys(vec![ForeignKey {
                name: "FK_ORDERS_CUSTOMER".to_string(),
                columns: vec!["CUSTOMER_ID".to_string()],
                referenced_schema: Some("APP".to_string()),
                referenced_table: "CUSTOMERS".to_string(),
                referenced_columns: vec!["ID".to_string()],
            }])
            .with_unique_constraints(vec![UniqueConstraint {
                name: "UQ_NOTE".to_string(),
                columns: vec!["NOTE".to_string()],
            }]);

        let json = serde_json::to_vec(&table).unwrap();
        let decoded: TableDescriptor = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_missing_constraint_fields_default_to_empty() {
        let json = r#"{
            "table": {"schema": null, "table": "T"},
            "columns": [{
                "name": "A", "data_type": "INTEGER", "nullable": true,
                "default_value": null, "length": null, "scale": null,
                "is_primary_key": false
            }]
        }"#;
        let decoded: TableDescriptor = serde_json::from_str(json).unwrap();
        assert!(decoded.primary_key.is_empty());
        assert!(decoded.foreign_keys.is_empty());
        assert!(decoded.unique_constraints.is_empty());
    }
}
