//! SAP HANA catalog probe over `SYS` system views

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use hdbconnect_async::{HdbValue, Row};

use super::CatalogProbe;
use crate::constants::{
    CURRENT_SCHEMA, DESCRIBE_COLUMNS_TEMPLATE, DESCRIBE_CONSTRAINTS_TEMPLATE,
    DESCRIBE_FOREIGN_KEYS_TEMPLATE, HEALTH_CHECK_QUERY, LIST_TABLES_TEMPLATE, SQL_TRUE,
};
use crate::descriptor::{ColumnDescriptor, ForeignKey, TableDescriptor, UniqueConstraint};
use crate::identity::TableIdentity;
use crate::pool::{Pool, get_connection};
use crate::validation::quote_literal;
use crate::{Error, Result};

/// Reads table metadata from `SYS.TABLES`, `SYS.TABLE_COLUMNS`,
/// `SYS.CONSTRAINTS` and `SYS.REFERENTIAL_CONSTRAINTS`.
///
/// Each catalog query borrows a connection from the pool for its own
/// duration and is bounded by `query_timeout`. Schema and table names are
/// passed as escaped string literals, so quoted identifiers work as well.
#[derive(Clone)]
pub struct HanaCatalogProbe {
    pool: Pool,
    query_timeout: Duration,
}

impl std::fmt::Debug for HanaCatalogProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HanaCatalogProbe")
            .field("pool_size", &self.pool.status().max_size)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl HanaCatalogProbe {
    #[must_use]
    pub const fn new(pool: Pool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<Duration> {
        let start = std::time::Instant::now();
        self.query_rows(HEALTH_CHECK_QUERY).await?;
        Ok(start.elapsed())
    }

    async fn bounded<F, T>(&self, query_fn: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, hdbconnect::HdbError>>,
    {
        tokio::time::timeout(self.query_timeout, query_fn)
            .await
            .map_err(|_| Error::QueryTimeout(self.query_timeout))?
            .map_err(Into::into)
    }

    async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = get_connection(&self.pool).await?;
        let rows = self
            .bounded(async {
                let result_set = conn.query(sql).await?;
                result_set.into_rows().await
            })
            .await?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl CatalogProbe for HanaCatalogProbe {
    async fn list_table_names(&self, schema: Option<&str>) -> Result<Vec<String>> {
        let rows = self.query_rows(&list_tables_sql(schema)).await?;

        let names: Vec<String> = rows
            .into_iter()
            .filter_map(|mut row| next_string(&mut row))
            .collect();

        tracing::debug!(
            schema = schema.unwrap_or(CURRENT_SCHEMA),
            count = names.len(),
            "Listed catalog tables"
        );

        Ok(names)
    }

    async fn describe_table(&self, table: &TableIdentity) -> Result<Option<TableDescriptor>> {
        let rows = self
            .query_rows(&table_sql(DESCRIBE_COLUMNS_TEMPLATE, table))
            .await?;

        let columns: Vec<ColumnDescriptor> = rows
            .into_iter()
            .filter_map(|mut row| {
                let name = next_string(&mut row)?;
                let data_type = next_string(&mut row)?;
                let nullable = next_string(&mut row).is_some_and(|v| v == SQL_TRUE);

                let mut column = ColumnDescriptor::new(name, data_type, nullable);
                column.default_value = next_string(&mut row);
                column.length = next_i64(&mut row);
                column.scale = next_i64(&mut row);
                Some(column)
            })
            .collect();

        if columns.is_empty() {
            return Ok(None);
        }

        let rows = self
            .query_rows(&table_sql(DESCRIBE_CONSTRAINTS_TEMPLATE, table))
            .await?;
        let key_rows = rows.into_iter().filter_map(|mut row| {
            Some(KeyRow {
                constraint: next_string(&mut row)?,
                column: next_string(&mut row)?,
                is_primary: next_string(&mut row).is_some_and(|v| v == SQL_TRUE),
                is_unique: next_string(&mut row).is_some_and(|v| v == SQL_TRUE),
            })
        });
        let (primary_key, unique_constraints) = collect_key_constraints(key_rows);

        let rows = self
            .query_rows(&table_sql(DESCRIBE_FOREIGN_KEYS_TEMPLATE, table))
            .await?;
        let fk_rows = rows.into_iter().filter_map(|mut row| {
            Some(ForeignKeyRow {
                constraint: next_string(&mut row)?,
                column: next_string(&mut row)?,
                referenced_schema: next_string(&mut row),
                referenced_table: next_string(&mut row)?,
                referenced_column: next_string(&mut row)?,
            })
        });
        let foreign_keys = collect_foreign_keys(fk_rows);

        tracing::debug!(
            table = %table,
            columns = columns.len(),
            foreign_keys = foreign_keys.len(),
            "Described catalog table"
        );

        Ok(Some(
            TableDescriptor::new(table.clone(), columns)
                .with_primary_key(primary_key)
                .with_unique_constraints(unique_constraints)
                .with_foreign_keys(foreign_keys),
        ))
    }
}

fn next_string(row: &mut Row) -> Option<String> {
    match row.next_value()? {
        HdbValue::STRING(s) => Some(s),
        _ => None,
    }
}

fn next_i64(row: &mut Row) -> Option<i64> {
    match row.next_value()? {
        HdbValue::TINYINT(v) => Some(i64::from(v)),
        HdbValue::SMALLINT(v) => Some(i64::from(v)),
        HdbValue::INT(v) => Some(i64::from(v)),
        HdbValue::BIGINT(v) => Some(v),
        _ => None,
    }
}

fn schema_predicate(schema: Option<&str>) -> String {
    schema.map_or_else(|| CURRENT_SCHEMA.to_string(), quote_literal)
}

fn list_tables_sql(schema: Option<&str>) -> String {
    LIST_TABLES_TEMPLATE.replace("{SCHEMA}", &schema_predicate(schema))
}

fn table_sql(template: &str, table: &TableIdentity) -> String {
    template
        .replace("{SCHEMA}", &schema_predicate(table.schema()))
        .replace("{TABLE}", &quote_literal(table.table()))
}

struct KeyRow {
    constraint: String,
    column: String,
    is_primary: bool,
    is_unique: bool,
}

struct ForeignKeyRow {
    constraint: String,
    column: String,
    referenced_schema: Option<String>,
    referenced_table: String,
    referenced_column: String,
}

/// Split constraint rows, ordered by constraint then position, into the
/// primary key columns and the remaining unique constraints.
fn collect_key_constraints(
    rows: impl IntoIterator<Item = KeyRow>,
) -> (Vec<String>, Vec<UniqueConstraint>) {
    let mut primary_key = Vec::new();
    let mut unique: Vec<UniqueConstraint> = Vec::new();

    for row in rows {
        if row.is_primary {
            primary_key.push(row.column);
        } else if row.is_unique {
            match unique.last_mut() {
                Some(last) if last.name == row.constraint => last.columns.push(row.column),
                _ => unique.push(UniqueConstraint {
                    name: row.constraint,
                    columns: vec![row.column],
                }),
            }
        }
    }

    (primary_key, unique)
}

fn collect_foreign_keys(rows: impl IntoIterator<Item = ForeignKeyRow>) -> Vec<ForeignKey> {
    let mut keys: Vec<ForeignKey> = Vec::new();

    for row in rows {
        match keys.last_mut() {
            Some(last) if last.name == row.constraint => {
                last.columns.push(row.column);
                last.referenced_columns.push(row.referenced_column);
            }
            _ => keys.push(ForeignKey {
                name: row.constraint,
                columns: vec![row.column],
                referenced_schema: row.referenced_schema,
                referenced_table: row.referenced_table,
                referenced_columns: vec![row.referenced_column],
            }),
        }
    }

    keys
}
