//! # Exprdb - Gene-expression ingest into an embedded SQLite store
//!
//! Loads sparse single-cell expression data into a relational store for
//! downstream querying.
//!
//! Exprdb provides:
//! - Identifier indexes mapping MTX ordinals to gene/cell identifiers
//! - A streaming batcher over MTX-formatted sparse matrix files
//! - A loader that resolves matrix coordinates and bulk-inserts records
//! - A cluster-assignment loader for per-dataset TSV files
//! - SQLite-backed storage with parameterized bulk inserts

pub mod cluster;
pub mod config;
pub mod index;
pub mod loader;
pub mod matrix;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use cluster::ClusterRecord;
pub use index::IdentifierIndex;
pub use loader::{EmptyIdPolicy, ExpressionRecord, LoadOptions, LoadSummary};
pub use matrix::{MatrixBatches, MatrixTriple};
pub use storage::ExprStore;

/// Result type alias for Exprdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Exprdb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Empty gene identifier resolved for cell '{0}'")]
    EmptyGeneId(String),
}
