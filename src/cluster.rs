//! Cluster assignments - per-dataset TSV files
//!
//! Each dataset directory carries a `clusters.tsv` mapping cells to two
//! levels of group identifier: the globally-scoped metacluster and the
//! per-dataset cluster. Cluster files are small relative to matrix files,
//! so the whole file is accumulated before a single bulk insert.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Default cluster assignment file name inside a dataset directory
pub const DEFAULT_CLUSTER_FILE: &str = "clusters.tsv";

/// One cell's cluster assignment, tagged with its originating dataset.
///
/// `(metacluster_id, cluster_id, cell_id)` is unique in the store, and a
/// cell belongs to exactly one cluster per dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub metacluster_id: i64,
    pub cluster_id: i64,
    pub cell_id: String,
    pub dataset_name: String,
}

/// Derive the dataset name from a dataset directory's final path component.
pub fn dataset_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Parse(format!(
                "cannot derive a dataset name from '{}'",
                dir.display()
            ))
        })
}

/// Parse a cluster assignment file into records.
///
/// Each line must be exactly `<metacluster_id>\t<cluster_id>\t<cell_id>`;
/// all fields are trimmed. Every record is tagged with the dataset name
/// derived from `dir`. A malformed line aborts the whole parse, so no
/// records reach the store from a bad file.
pub fn parse_cluster_file(dir: &Path, file_name: &str) -> Result<Vec<ClusterRecord>> {
    let dataset = dataset_name(dir)?;
    let path = dir.join(file_name);

    let file = File::open(&path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(Error::Parse(format!(
                "line {}: expected 3 tab-separated fields, got {}",
                line_no + 1,
                fields.len()
            )));
        }

        let metacluster_id = fields[0].trim().parse::<i64>().map_err(|e| {
            Error::Parse(format!(
                "line {}: invalid metacluster id '{}': {}",
                line_no + 1,
                fields[0],
                e
            ))
        })?;
        let cluster_id = fields[1].trim().parse::<i64>().map_err(|e| {
            Error::Parse(format!(
                "line {}: invalid cluster id '{}': {}",
                line_no + 1,
                fields[1],
                e
            ))
        })?;

        records.push(ClusterRecord {
            metacluster_id,
            cluster_id,
            cell_id: fields[2].trim().to_string(),
            dataset_name: dataset.clone(),
        });
    }

    tracing::debug!(
        "parsed {} cluster assignments for dataset '{}'",
        records.len(),
        dataset
    );
    Ok(records)
}
