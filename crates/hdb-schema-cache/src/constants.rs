//! Catalog queries and shared constants

/// Service name used for cache tracing spans and telemetry
pub const SERVICE_NAME: &str = "hdb-schema-cache";

/// SQL query to check database connection health
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1 FROM DUMMY";

/// Schema predicate for the current schema
pub const CURRENT_SCHEMA: &str = "CURRENT_SCHEMA";

/// Table names of a schema (use .replace("{SCHEMA}", predicate))
pub const LIST_TABLES_TEMPLATE: &str =
    "SELECT TABLE_NAME FROM SYS.TABLES WHERE SCHEMA_NAME = {SCHEMA} ORDER BY TABLE_NAME";

/// Columns of a table (use .replace("{SCHEMA}", predicate).replace("{TABLE}", literal))
pub const DESCRIBE_COLUMNS_TEMPLATE: &str = "SELECT COLUMN_NAME, DATA_TYPE_NAME, IS_NULLABLE, \
     DEFAULT_VALUE, LENGTH, SCALE FROM SYS.TABLE_COLUMNS \
     WHERE SCHEMA_NAME = {SCHEMA} AND TABLE_NAME = {TABLE} ORDER BY POSITION";

/// Primary key and unique constraint columns of a table
pub const DESCRIBE_CONSTRAINTS_TEMPLATE: &str = "SELECT CONSTRAINT_NAME, COLUMN_NAME, \
     IS_PRIMARY_KEY, IS_UNIQUE_KEY FROM SYS.CONSTRAINTS \
     WHERE SCHEMA_NAME = {SCHEMA} AND TABLE_NAME = {TABLE} \
     ORDER BY CONSTRAINT_NAME, POSITION";

/// Foreign key columns of a table
pub const DESCRIBE_FOREIGN_KEYS_TEMPLATE: &str = "SELECT CONSTRAINT_NAME, COLUMN_NAME, \
     REFERENCED_SCHEMA_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
     FROM SYS.REFERENTIAL_CONSTRAINTS \
     WHERE SCHEMA_NAME = {SCHEMA} AND TABLE_NAME = {TABLE} \
     ORDER BY CONSTRAINT_NAME, POSITION";

/// SQL boolean value: TRUE
pub const SQL_TRUE: &str = "TRUE";
