//! Voter registry loaded from the flat voters file

use crate::types::VoterRecord;
use crate::{Error, Result};
use std::io::Read;
use std::path::Path;
use tracing::info;

const REQUIRED_COLUMNS: [&str; 3] = ["name", "aadhar", "image"];

/// Eligible voters, in file order
#[derive(Debug, Clone, Default)]
pub struct VoterRegistry {
    voters: Vec<VoterRecord>,
}

impl VoterRegistry {
    /// Load the registry from a CSV file with a `name,aadhar,image` header
    ///
    /// A missing file is an error; the service cannot start without a
    /// registry. Empty cells load as empty strings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::registry(format!(
                "Missing {}. Create voters.csv",
                path.display()
            )));
        }

        let file = std::fs::File::open(path)?;
        let registry = Self::from_reader(file)?;

        info!(
            "📋 Loaded {} voters from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse a registry from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = rows.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::registry(format!(
                    "voters file is missing the '{column}' column"
                )));
            }
        }

        let voters = rows
            .deserialize::<VoterRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { voters })
    }

    /// Build a registry from records already in memory
    pub fn from_records(voters: Vec<VoterRecord>) -> Self {
        Self { voters }
    }

    /// Find the row for an exact (name, aadhar) pair
    pub fn find(&self, name: &str, aadhar: &str) -> Option<&VoterRecord> {
        self.voters.iter().find(|voter| voter.matches(name, aadhar))
    }

    /// Whether an exact (name, aadhar) pair is registered
    pub fn contains(&self, name: &str, aadhar: &str) -> bool {
        self.find(name, aadhar).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoterRecord> {
        self.voters.iter()
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}
