//! In-memory ballot store with one-vote-per-ID enforcement
//!
//! This module keeps the only mutable state of the service:
//! 1. Per-party tally of accepted votes
//! 2. The set of national IDs that have voted (one-way, never cleared)
//! 3. In-flight verification sessions, so two concurrent requests for the
//!    same ID cannot both reach the recording step
//!
//! Accepted votes produce an anonymous [`BallotReceipt`] that is handed back
//! to the voter and not kept.
//!
//! Nothing is persisted; a restart discards every vote.

use crate::types::{NationalId, Tally};
use crate::{Result, voting_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Proof of one accepted vote, with no link back to the voter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotReceipt {
    pub receipt_id: Uuid,
    pub party: String,
    pub cast_at: DateTime<Utc>,
}

impl BallotReceipt {
    fn new(party: &str) -> Self {
        Self {
            receipt_id: Uuid::new_v4(),
            party: party.to_string(),
            cast_at: Utc::now(),
        }
    }
}

/// Result of asking to start a verification for an ID
#[derive(Debug)]
pub enum Admission {
    /// No vote recorded and no other verification running
    Admitted(VotingSession),

    /// The ID has already voted
    AlreadyVoted,

    /// Another request for the same ID is still being verified
    InProgress,
}

/// Result of recording a vote
#[derive(Debug, Clone, PartialEq)]
pub enum CastResult {
    /// Vote counted; carries the tally after this vote
    Recorded { receipt: BallotReceipt, tally: Tally },

    /// Blocked because the ID voted in the meantime
    AlreadyVoted,
}

#[derive(Debug, Default)]
struct BallotState {
    tally: Tally,
    voted: HashSet<NationalId>,
    in_flight: HashSet<NationalId>,
}

/// Owned, lock-protected ballot state shared through `Arc`
#[derive(Debug, Default)]
pub struct BallotStore {
    state: RwLock<BallotState>,
}

impl BallotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the ID has a recorded vote
    pub fn has_voted(&self, aadhar: &str) -> Result<bool> {
        let state = self
            .state
            .read()
            .map_err(|_| voting_error!("Ballot store read error"))?;
        Ok(state.voted.contains(aadhar))
    }

    /// Start a verification session for an ID
    ///
    /// The session must be [committed](VotingSession::commit) to count a
    /// vote; dropping it without committing releases the ID so the voter can
    /// retry.
    pub fn begin(self: &Arc<Self>, aadhar: &str) -> Result<Admission> {
        let mut state = self
            .state
            .write()
            .map_err(|_| voting_error!("Ballot store write error"))?;

        if state.voted.contains(aadhar) {
            return Ok(Admission::AlreadyVoted);
        }
        if !state.in_flight.insert(aadhar.to_string()) {
            return Ok(Admission::InProgress);
        }

        Ok(Admission::Admitted(VotingSession {
            store: Arc::clone(self),
            aadhar: aadhar.to_string(),
        }))
    }

    /// Record a vote for `party` unless the ID has already voted
    ///
    /// The voted check and the update happen under one write lock.
    pub fn cast(&self, aadhar: &str, party: &str) -> Result<CastResult> {
        let mut state = self
            .state
            .write()
            .map_err(|_| voting_error!("Ballot store write error"))?;

        if state.voted.contains(aadhar) {
            return Ok(CastResult::AlreadyVoted);
        }

        *state.tally.entry(party.to_string()).or_insert(0) += 1;
        state.voted.insert(aadhar.to_string());

        let receipt = BallotReceipt::new(party);
        info!("🗳️  Vote recorded for {} (receipt {})", party, receipt.receipt_id);

        Ok(CastResult::Recorded {
            receipt,
            tally: state.tally.clone(),
        })
    }

    /// Snapshot of the current tally
    pub fn tally(&self) -> Result<Tally> {
        let state = self
            .state
            .read()
            .map_err(|_| voting_error!("Ballot store read error"))?;
        Ok(state.tally.clone())
    }

    /// Number of accepted votes
    pub fn total_votes(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|_| voting_error!("Ballot store read error"))?;
        Ok(state.voted.len())
    }

    fn release(&self, aadhar: &str) {
        // A poisoned lock cannot be repaired from a destructor; the ID simply
        // stays blocked.
        if let Ok(mut state) = self.state.write() {
            state.in_flight.remove(aadhar);
        }
    }
}

/// Exclusive right to verify and record a vote for one ID
#[derive(Debug)]
pub struct VotingSession {
    store: Arc<BallotStore>,
    aadhar: NationalId,
}

impl VotingSession {
    pub fn aadhar(&self) -> &str {
        &self.aadhar
    }

    /// Record the vote and end the session
    pub fn commit(self, party: &str) -> Result<CastResult> {
        self.store.cast(&self.aadhar, party)
    }
}

impl Drop for VotingSession {
    fn drop(&mut self) {
        self.store.release(&self.aadhar);
    }
}
