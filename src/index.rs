//! Identifier indexes - MTX metadata files
//!
//! MTX datasets ship two metadata files alongside the matrix data: one
//! listing gene identifiers (rows) and one listing cell identifiers
//! (columns). The 1-based line number of an identifier is its ordinal, and
//! matrix coordinates reference identifiers by ordinal.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Mapping from 1-based ordinal position to a semantic identifier.
///
/// Built once per metadata file and immutable afterwards. Ordinals are
/// contiguous by construction: one entry per line, in file order. Duplicate
/// identifier values are allowed; only the ordinal is a key.
#[derive(Debug, Clone)]
pub struct IdentifierIndex {
    ids: Vec<String>,
}

impl IdentifierIndex {
    /// Build an index from a metadata file.
    ///
    /// Each line is trimmed and split on the first tab; the leading field
    /// becomes the identifier at ordinal = line number. Lines without a tab
    /// contribute the whole trimmed line. Extra tab-separated fields are
    /// ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut ids = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let id = line.trim().split('\t').next().unwrap_or("");
            ids.push(id.to_string());
        }

        Ok(Self { ids })
    }

    /// Resolve a 1-based ordinal to its identifier.
    pub fn get(&self, ordinal: usize) -> Result<&str> {
        if ordinal == 0 || ordinal > self.ids.len() {
            return Err(Error::Lookup(format!(
                "ordinal {} out of range (index has {} entries)",
                ordinal,
                self.ids.len()
            )));
        }
        Ok(&self.ids[ordinal - 1])
    }

    /// Number of identifiers in the index
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
