//! Database schema definitions

/// SQL to drop the expression table before recreation
pub const DROP_EXPR_TABLE: &str = "DROP TABLE IF EXISTS expr";

/// SQL to create the expression table
pub const CREATE_EXPR_TABLE: &str = r#"
CREATE TABLE expr (
    gene_id TEXT NOT NULL,
    cell_id TEXT NOT NULL,
    expr DOUBLE NOT NULL,
    PRIMARY KEY (gene_id, cell_id)
)
"#;

/// SQL to drop the clusters table before recreation
pub const DROP_CLUSTERS_TABLE: &str = "DROP TABLE IF EXISTS clusters";

/// SQL to create the clusters table
pub const CREATE_CLUSTERS_TABLE: &str = r#"
CREATE TABLE clusters (
    metacluster_id INTEGER NOT NULL,
    cluster_id INTEGER NOT NULL,
    cell_id TEXT NOT NULL,
    dataset_name TEXT NOT NULL,
    PRIMARY KEY (metacluster_id, cluster_id, cell_id),
    UNIQUE (cell_id, dataset_name)
)
"#;

/// Statements to replace the expression table.
///
/// SQLite has no `CREATE OR REPLACE TABLE`, so idempotent replacement is a
/// drop-if-exists followed by a create.
pub fn expr_table_statements() -> &'static [&'static str] {
    &[DROP_EXPR_TABLE, CREATE_EXPR_TABLE]
}

/// Statements to replace the clusters table
pub fn clusters_table_statements() -> &'static [&'static str] {
    &[DROP_CLUSTERS_TABLE, CREATE_CLUSTERS_TABLE]
}

/// All schema replacement statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = Vec::new();
    stmts.extend(expr_table_statements());
    stmts.extend(clusters_table_statements());
    stmts
}
