//! SQLite storage implementation

use crate::cluster::ClusterRecord;
use crate::loader::ExpressionRecord;
use crate::Result;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::path::Path;

use super::schema;

/// Default row cap for scan helpers
pub const DEFAULT_SCAN_LIMIT: usize = 20;

/// SQLite-backed store for expression and cluster data.
///
/// The connection is a single shared resource: exactly one loader is
/// expected to be active against it at a time. Each bulk insert runs in its
/// own transaction; nothing wraps a multi-batch load, so a failure mid-load
/// leaves earlier batches committed.
pub struct ExprStore {
    conn: Connection,
}

impl ExprStore {
    /// Open a database file (creates the file if it doesn't exist).
    ///
    /// Does not create tables: schema creation replaces existing tables,
    /// so it stays an explicit step (see [`ExprStore::create_tables`]).
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Check whether a database file already exists at `path`
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    // ========== Schema Operations ==========

    /// Replace both tables (drop-if-exists then create)
    pub fn create_tables(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Replace the expression table
    pub fn create_expr_table(&self) -> Result<()> {
        for stmt in schema::expr_table_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Replace the clusters table
    pub fn create_clusters_table(&self) -> Result<()> {
        for stmt in schema::clusters_table_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Bulk Inserts ==========

    /// Insert one batch of expression records.
    ///
    /// Runs a prepared statement inside a transaction, one bound parameter
    /// tuple per record; a no-op on an empty batch. A constraint violation
    /// (duplicate `(gene_id, cell_id)`) rolls the whole batch back and
    /// surfaces as a storage error.
    pub fn insert_expr_batch(&mut self, records: &[ExpressionRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO expr (gene_id, cell_id, expr) VALUES (?1, ?2, ?3)")?;
            for record in records {
                stmt.execute(params![record.gene_id, record.cell_id, record.expr])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert all cluster records from one file in a single transaction
    pub fn insert_clusters(&mut self, records: &[ClusterRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO clusters (metacluster_id, cluster_id, cell_id, dataset_name) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.metacluster_id,
                    record.cluster_id,
                    record.cell_id,
                    record.dataset_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ========== Scans & Queries ==========

    /// Fetch up to `limit` expression records
    pub fn scan_expr(&self, limit: usize) -> Result<Vec<ExpressionRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT gene_id, cell_id, expr FROM expr LIMIT ?1")?;

        let records = stmt
            .query_map([limit as i64], |row| {
                Ok(ExpressionRecord {
                    gene_id: row.get(0)?,
                    cell_id: row.get(1)?,
                    expr: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Fetch up to `limit` cluster records
    pub fn scan_clusters(&self, limit: usize) -> Result<Vec<ClusterRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT metacluster_id, cluster_id, cell_id, dataset_name FROM clusters LIMIT ?1",
        )?;

        let records = stmt
            .query_map([limit as i64], |row| {
                Ok(ClusterRecord {
                    metacluster_id: row.get(0)?,
                    cluster_id: row.get(1)?,
                    cell_id: row.get(2)?,
                    dataset_name: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Run arbitrary SQL and fetch all rows of the result set.
    ///
    /// Returns the column names and every row with cells rendered as text.
    pub fn query(&self, sql: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let cell = match row.get_ref(i)? {
                        ValueRef::Null => "NULL".to_string(),
                        ValueRef::Integer(v) => v.to_string(),
                        ValueRef::Real(v) => v.to_string(),
                        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
                        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
                    };
                    cells.push(cell);
                }
                Ok(cells)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((columns, rows))
    }

    // ========== Stats ==========

    /// Count expression records
    pub fn count_expr(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM expr", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count cluster records
    pub fn count_clusters(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clusters", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            expr: self.count_expr()?,
            clusters: self.count_clusters()?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub expr: usize,
    pub clusters: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Expression records: {}", self.expr)?;
        writeln!(f, "  Cluster records: {}", self.clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn store_with_schema() -> ExprStore {
        let store = ExprStore::open_in_memory().unwrap();
        store.create_tables().unwrap();
        store
    }

    fn expr_record(gene: &str, cell: &str, expr: f64) -> ExpressionRecord {
        ExpressionRecord {
            gene_id: gene.to_string(),
            cell_id: cell.to_string(),
            expr,
        }
    }

    fn cluster_record(meta: i64, cluster: i64, cell: &str, dataset: &str) -> ClusterRecord {
        ClusterRecord {
            metacluster_id: meta,
            cluster_id: cluster,
            cell_id: cell.to_string(),
            dataset_name: dataset.to_string(),
        }
    }

    #[test]
    fn test_expr_insert_and_scan() {
        let mut store = store_with_schema();

        store
            .insert_expr_batch(&[expr_record("g1", "c1", 0.5), expr_record("g2", "c2", 1.25)])
            .unwrap();

        let records = store.scan_expr(DEFAULT_SCAN_LIMIT).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gene_id, "g1");
        assert_eq!(records[0].expr, 0.5);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[]).unwrap();
        assert_eq!(store.count_expr().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_expr_key_is_constraint_violation() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]).unwrap();

        let result = store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]);
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.count_expr().unwrap(), 1);
    }

    #[test]
    fn test_failed_batch_rolls_back_whole_batch() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]).unwrap();

        // Second record collides; the first must not survive either
        let result = store.insert_expr_batch(&[
            expr_record("g9", "c9", 2.0),
            expr_record("g1", "c1", 0.5),
        ]);
        assert!(result.is_err());
        assert_eq!(store.count_expr().unwrap(), 1);
    }

    #[test]
    fn test_cluster_insert_and_scan() {
        let mut store = store_with_schema();

        store
            .insert_clusters(&[
                cluster_record(1, 10, "cellA", "datasetX"),
                cluster_record(1, 11, "cellB", "datasetX"),
            ])
            .unwrap();

        let records = store.scan_clusters(DEFAULT_SCAN_LIMIT).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dataset_name, "datasetX");
    }

    #[test]
    fn test_cell_dataset_uniqueness_enforced() {
        let mut store = store_with_schema();
        store
            .insert_clusters(&[cluster_record(1, 10, "cellA", "datasetX")])
            .unwrap();

        // Same cell, same dataset, different cluster
        let result = store.insert_clusters(&[cluster_record(2, 20, "cellA", "datasetX")]);
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[test]
    fn test_create_tables_replaces_existing_data() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]).unwrap();

        store.create_tables().unwrap();
        assert_eq!(store.count_expr().unwrap(), 0);
    }

    #[test]
    fn test_query_returns_columns_and_rows() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]).unwrap();

        let (columns, rows) = store
            .query("SELECT gene_id, expr FROM expr ORDER BY gene_id")
            .unwrap();

        assert_eq!(columns, vec!["gene_id", "expr"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "g1");
        assert_eq!(rows[0][1], "0.5");
    }

    #[test]
    fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exprdb.db");
        assert!(!ExprStore::exists(&path));

        let store = ExprStore::open(&path).unwrap();
        store.create_tables().unwrap();
        drop(store);

        assert!(ExprStore::exists(&path));
    }

    #[test]
    fn test_stats_counts_both_tables() {
        let mut store = store_with_schema();
        store.insert_expr_batch(&[expr_record("g1", "c1", 0.5)]).unwrap();
        store
            .insert_clusters(&[cluster_record(1, 10, "cellA", "d")])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.expr, 1);
        assert_eq!(stats.clusters, 1);
    }
}
