//! Dataset loaders - coordinate resolution and bulk insertion
//!
//! The expression loader builds the row/column identifier indexes for a
//! dataset, streams the matrix file in batches, resolves each triple's
//! ordinals into semantic identifiers, and issues one parameterized bulk
//! insert per batch. Batches already committed stay committed when a later
//! batch fails; detecting and cleaning up a partial load is the caller's
//! responsibility.

use crate::cluster;
use crate::index::IdentifierIndex;
use crate::matrix::{MatrixBatches, MatrixTriple, DEFAULT_BATCH_SIZE};
use crate::storage::ExprStore;
use crate::{Error, Result};
use std::path::Path;

/// Fixed naming convention for dataset files: `<base>.<INFIX>.mtx_cols`,
/// `<base>.<INFIX>.mtx_rows` and `<base>.<INFIX>_matrix.mtx`.
const FILE_INFIX: &str = "aggregated_filtered_counts";

/// A resolved matrix triple, the unit of persistence.
///
/// `(gene_id, cell_id)` pairs are unique within a dataset load, enforced by
/// the destination table's composite primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionRecord {
    pub gene_id: String,
    pub cell_id: String,
    pub expr: f64,
}

/// What to do when a matrix row resolves to an empty gene identifier.
///
/// Some published metadata files carry blank identifier lines; whether that
/// is tolerable depends on the dataset, so the policy is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyIdPolicy {
    /// Log a warning and insert the record anyway
    #[default]
    Warn,
    /// Fail the load
    Reject,
}

impl std::str::FromStr for EmptyIdPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(EmptyIdPolicy::Warn),
            "reject" => Ok(EmptyIdPolicy::Reject),
            _ => Err(Error::Parse(format!(
                "unknown empty-gene-id policy '{s}' (expected 'warn' or 'reject')"
            ))),
        }
    }
}

/// Tuning knobs for an expression load
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Triples per batch (and per bulk insert)
    pub batch_size: usize,
    /// Policy for empty resolved gene identifiers
    pub empty_gene_id: EmptyIdPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            empty_gene_id: EmptyIdPolicy::default(),
        }
    }
}

/// Counters reported by a completed expression load
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSummary {
    pub batches: usize,
    pub records: usize,
}

/// Load a dataset's expression matrix into the store.
///
/// `dir` is the dataset directory and `base` the dataset name, which is
/// also the prefix of its MTX files. The column and row metadata files are
/// parsed into identifier indexes, then the matrix is streamed batch by
/// batch; every batch is resolved and bulk-inserted before the next one is
/// read.
pub fn load_mtx(
    store: &mut ExprStore,
    dir: &Path,
    base: &str,
    options: &LoadOptions,
) -> Result<LoadSummary> {
    let prefix = format!("{base}.{FILE_INFIX}");

    let col_index = IdentifierIndex::from_file(&dir.join(format!("{prefix}.mtx_cols")))?;
    let row_index = IdentifierIndex::from_file(&dir.join(format!("{prefix}.mtx_rows")))?;
    tracing::debug!(
        "dataset '{}': {} genes, {} cells",
        base,
        row_index.len(),
        col_index.len()
    );

    let mut summary = LoadSummary::default();
    for batch in MatrixBatches::open(&dir.join(format!("{prefix}_matrix.mtx")), options.batch_size)? {
        let batch = batch?;
        let records = resolve_batch(&batch, &row_index, &col_index, options.empty_gene_id)?;
        store.insert_expr_batch(&records)?;
        summary.batches += 1;
        summary.records += records.len();
    }

    Ok(summary)
}

/// Resolve one batch of triples into expression records, in batch order.
///
/// An ordinal missing from either index fails the whole batch; nothing from
/// a failed batch reaches the store.
pub fn resolve_batch(
    batch: &[MatrixTriple],
    row_index: &IdentifierIndex,
    col_index: &IdentifierIndex,
    empty_gene_id: EmptyIdPolicy,
) -> Result<Vec<ExpressionRecord>> {
    let mut records = Vec::with_capacity(batch.len());

    for triple in batch {
        let gene_id = row_index.get(triple.row)?;
        let cell_id = col_index.get(triple.col)?;

        if gene_id.is_empty() {
            match empty_gene_id {
                EmptyIdPolicy::Warn => {
                    tracing::warn!(
                        "empty gene identifier at matrix row {} (cell '{}')",
                        triple.row,
                        cell_id
                    );
                }
                EmptyIdPolicy::Reject => {
                    return Err(Error::EmptyGeneId(cell_id.to_string()));
                }
            }
        }

        records.push(ExpressionRecord {
            gene_id: gene_id.to_string(),
            cell_id: cell_id.to_string(),
            expr: triple.value,
        });
    }

    Ok(records)
}

/// Load a dataset's cluster assignments into the store.
///
/// The whole file is parsed before the single bulk insert, so a malformed
/// line means nothing is inserted. Returns the number of records inserted.
pub fn load_clusters(store: &mut ExprStore, dir: &Path, file_name: &str) -> Result<usize> {
    let records = cluster::parse_cluster_file(dir, file_name)?;
    store.insert_clusters(&records)?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::DEFAULT_CLUSTER_FILE;
    use crate::storage::DEFAULT_SCAN_LIMIT;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    const BASE: &str = "E-TEST-1";

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn dataset_dir(root: &Path, cols: &str, rows: &str, matrix: &str) -> PathBuf {
        let dir = root.join("datasetX");
        std::fs::create_dir(&dir).unwrap();
        write_file(&dir, &format!("{BASE}.{FILE_INFIX}.mtx_cols"), cols);
        write_file(&dir, &format!("{BASE}.{FILE_INFIX}.mtx_rows"), rows);
        write_file(&dir, &format!("{BASE}.{FILE_INFIX}_matrix.mtx"), matrix);
        dir
    }

    fn store_with_schema() -> ExprStore {
        let store = ExprStore::open_in_memory().unwrap();
        store.create_tables().unwrap();
        store
    }

    #[test]
    fn test_round_trip_resolution() {
        let root = tempfile::tempdir().unwrap();
        let dir = dataset_dir(root.path(), "c1\nc2\nc3\n", "g1\ng2\n", "1 2 0.5\n2 3 1.25\n");
        let mut store = store_with_schema();

        let summary = load_mtx(&mut store, &dir, BASE, &LoadOptions::default()).unwrap();
        assert_eq!(summary.records, 2);

        let records = store.scan_expr(DEFAULT_SCAN_LIMIT).unwrap();
        assert_eq!(
            records,
            vec![
                ExpressionRecord {
                    gene_id: "g1".to_string(),
                    cell_id: "c2".to_string(),
                    expr: 0.5,
                },
                ExpressionRecord {
                    gene_id: "g2".to_string(),
                    cell_id: "c3".to_string(),
                    expr: 1.25,
                },
            ]
        );
    }

    #[test]
    fn test_empty_matrix_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let dir = dataset_dir(root.path(), "c1\n", "g1\n", "%%MatrixMarket\n");
        let mut store = store_with_schema();

        let summary = load_mtx(&mut store, &dir, BASE, &LoadOptions::default()).unwrap();

        assert_eq!(summary.batches, 1);
        assert_eq!(summary.records, 0);
        assert_eq!(store.count_expr().unwrap(), 0);
    }

    #[test]
    fn test_lookup_failure_aborts_but_keeps_prior_batches() {
        let root = tempfile::tempdir().unwrap();
        // Second line references row ordinal 9, absent from the row index
        let dir = dataset_dir(root.path(), "c1\n", "g1\n", "1 1 0.5\n9 1 1.0\n");
        let mut store = store_with_schema();

        let options = LoadOptions {
            batch_size: 1,
            ..LoadOptions::default()
        };
        let result = load_mtx(&mut store, &dir, BASE, &options);

        assert!(matches!(result, Err(Error::Lookup(_))));
        assert_eq!(store.count_expr().unwrap(), 1);
    }

    #[test]
    fn test_empty_gene_id_warn_policy_inserts() {
        let root = tempfile::tempdir().unwrap();
        // Row ordinal 1 resolves to an empty identifier
        let dir = dataset_dir(root.path(), "c1\n", "\ng2\n", "1 1 0.5\n");
        let mut store = store_with_schema();

        let summary = load_mtx(&mut store, &dir, BASE, &LoadOptions::default()).unwrap();

        assert_eq!(summary.records, 1);
        let records = store.scan_expr(DEFAULT_SCAN_LIMIT).unwrap();
        assert_eq!(records[0].gene_id, "");
        assert_eq!(records[0].cell_id, "c1");
    }

    #[test]
    fn test_empty_gene_id_reject_policy_fails() {
        let root = tempfile::tempdir().unwrap();
        let dir = dataset_dir(root.path(), "c1\n", "\ng2\n", "1 1 0.5\n");
        let mut store = store_with_schema();

        let options = LoadOptions {
            empty_gene_id: EmptyIdPolicy::Reject,
            ..LoadOptions::default()
        };
        let result = load_mtx(&mut store, &dir, BASE, &options);

        assert!(matches!(result, Err(Error::EmptyGeneId(_))));
        assert_eq!(store.count_expr().unwrap(), 0);
    }

    #[test]
    fn test_parse_error_aborts_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = dataset_dir(root.path(), "c1\n", "g1\n", "garbage\n");
        let mut store = store_with_schema();

        let result = load_mtx(&mut store, &dir, BASE, &LoadOptions::default());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_missing_matrix_file_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("datasetX");
        std::fs::create_dir(&dir).unwrap();
        write_file(&dir, &format!("{BASE}.{FILE_INFIX}.mtx_cols"), "c1\n");
        write_file(&dir, &format!("{BASE}.{FILE_INFIX}.mtx_rows"), "g1\n");
        let mut store = store_with_schema();

        let result = load_mtx(&mut store, &dir, BASE, &LoadOptions::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_reload_same_dataset_fails_on_primary_key() {
        let root = tempfile::tempdir().unwrap();
        let dir = dataset_dir(root.path(), "c1\n", "g1\n", "1 1 0.5\n");
        let mut store = store_with_schema();

        load_mtx(&mut store, &dir, BASE, &LoadOptions::default()).unwrap();
        let result = load_mtx(&mut store, &dir, BASE, &LoadOptions::default());

        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.count_expr().unwrap(), 1);
    }

    #[test]
    fn test_load_clusters_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("datasetX");
        std::fs::create_dir(&dir).unwrap();
        write_file(&dir, DEFAULT_CLUSTER_FILE, "1\t10\tcellA\n1\t11\tcellB\n");
        let mut store = store_with_schema();

        let inserted = load_clusters(&mut store, &dir, DEFAULT_CLUSTER_FILE).unwrap();
        assert_eq!(inserted, 2);

        let records = store.scan_clusters(DEFAULT_SCAN_LIMIT).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cell_id, "cellA");
        assert_eq!(records[0].dataset_name, "datasetX");
        assert_eq!(records[1].cluster_id, 11);
    }

    #[test]
    fn test_malformed_cluster_file_inserts_nothing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("datasetX");
        std::fs::create_dir(&dir).unwrap();
        write_file(&dir, DEFAULT_CLUSTER_FILE, "1\t10\tcellA\nbroken line\n");
        let mut store = store_with_schema();

        let result = load_clusters(&mut store, &dir, DEFAULT_CLUSTER_FILE);

        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(store.count_clusters().unwrap(), 0);
    }
}
