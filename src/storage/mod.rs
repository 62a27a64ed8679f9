//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - expr(gene_id, cell_id, expr)
//! - clusters(metacluster_id, cluster_id, cell_id, dataset_name)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, ExprStore, DEFAULT_SCAN_LIMIT};
