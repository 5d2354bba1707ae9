//! # Core Types for the Face-Verified Voting Service
//!
//! This module defines the data structures shared across the registry,
//! enrollment, ballot and reporting components.
//!
//! ## Type Categories
//!
//! ### Registry
//! - [`VoterRecord`]: One eligible voter as listed in the registry file
//! - [`NationalId`]: The aadhar number used as the join key everywhere
//!
//! ### Ballot
//! - [`Party`]: A party a vote can be cast for
//! - [`Tally`]: Party name to vote count
//!
//! ### Reporting
//! - [`PreviousElection`], [`UpcomingElection`], [`ElectionSummary`]
//!
//! ## Usage Examples
//!
//! ```rust
//! use face_vote::types::{Party, find_party};
//!
//! let inc = find_party("INC").expect("INC is a listed party");
//! assert_eq!(inc.logo, "✋ Hand");
//! assert!(find_party("inc").is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// National ID (aadhar) of a voter
///
/// Stored as the exact string found in the registry file. Comparisons are
/// case-sensitive string equality; no normalisation beyond trimming the
/// surrounding whitespace of request fields is performed.
pub type NationalId = String;

/// Vote counts keyed by party name
///
/// A `BTreeMap` keeps JSON output ordered. Only parties that have received at
/// least one vote appear.
pub type Tally = BTreeMap<String, u64>;

/// An eligible voter as listed in the registry file
///
/// Column names match the registry CSV header: `name,aadhar,image`.
/// Records are immutable once the registry has been loaded.
///
/// # Examples
///
/// ```rust
/// use face_vote::types::VoterRecord;
///
/// let voter = VoterRecord {
///     name: "Asha".to_string(),
///     aadhar: "1111".to_string(),
///     image: "asha.jpg".to_string(),
/// };
///
/// assert!(voter.matches("Asha", "1111"));
/// assert!(!voter.matches("asha", "1111"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VoterRecord {
    /// Voter name, compared exactly
    pub name: String,

    /// National ID, the join key into enrollment and ballot state
    pub aadhar: NationalId,

    /// File name of the reference photo, relative to the images directory
    pub image: String,
}

impl VoterRecord {
    /// Whether this record is exactly the claimed (name, aadhar) pair
    pub fn matches(&self, name: &str, aadhar: &str) -> bool {
        self.name == name && self.aadhar == aadhar
    }
}

/// A party listed on the ballot
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Party {
    /// Party name, also the tally key
    pub name: &'static str,

    /// Ballot symbol shown next to the name
    pub logo: &'static str,
}

/// Parties on the ballot
pub const PARTIES: &[Party] = &[
    Party { name: "BRS", logo: "🚗 Car" },
    Party { name: "INC", logo: "✋ Hand" },
    Party { name: "BJP", logo: "🌸 Lotus" },
    Party { name: "AIMIM", logo: "🪁 Kite" },
    Party { name: "BSP", logo: "🐘 Elephant" },
    Party { name: "CPI(M)", logo: "☭ Hammer & Sickle" },
];

/// Look up a listed party by exact name
pub fn find_party(name: &str) -> Option<&'static Party> {
    PARTIES.iter().find(|party| party.name == name)
}

/// A concluded election shown on the admin panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviousElection {
    pub year: i32,
    pub winner: String,
}

/// A scheduled election shown on the admin panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpcomingElection {
    pub year: i32,

    #[serde(rename = "type")]
    pub kind: String,

    /// Polling date when announced (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Admin panel summary
///
/// The historical and upcoming entries are static reference data; only
/// `live` reflects state, as a snapshot of the ballot store tally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElectionSummary {
    pub previous: Vec<PreviousElection>,
    pub upcoming: Vec<UpcomingElection>,
    pub live: Tally,
}
