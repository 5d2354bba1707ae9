//! Enrollment preloader: reference photo embeddings keyed by national ID
//!
//! Built once at startup from the voter registry and never updated. Rows
//! whose photo is missing, unreadable or shows no face are skipped with a
//! warning; those voters stay in the registry (they can log in) but can never
//! pass face verification.

use crate::face::{FaceEmbedding, FaceEncoder};
use crate::registry::VoterRegistry;
use crate::types::NationalId;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reference face for one voter
#[derive(Debug, Clone)]
pub struct EnrolledVoter {
    pub name: String,
    pub image: String,
    pub embedding: FaceEmbedding,
}

/// Per-run counts of the preload outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentReport {
    pub enrolled: usize,
    pub missing_image: usize,
    pub unreadable_image: usize,
    pub no_face: usize,
}

impl EnrollmentReport {
    pub fn skipped(&self) -> usize {
        self.missing_image + self.unreadable_image + self.no_face
    }
}

/// National ID to reference embedding
#[derive(Debug, Clone, Default)]
pub struct Enrollment {
    voters: HashMap<NationalId, EnrolledVoter>,
}

impl Enrollment {
    /// Encode every registry row's reference photo
    ///
    /// Never fails: per-row problems are logged and counted in the report.
    pub fn preload(
        registry: &VoterRegistry,
        images_dir: &Path,
        encoder: &dyn FaceEncoder,
    ) -> (Self, EnrollmentReport) {
        let mut enrollment = Self::default();
        let mut report = EnrollmentReport::default();

        for voter in registry.iter() {
            let path = images_dir.join(&voter.image);
            if voter.image.is_empty() || !path.is_file() {
                warn!("Missing image for {} at {}", voter.name, path.display());
                report.missing_image += 1;
                continue;
            }

            let image = match image::open(&path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Unreadable image for {} ({}): {}", voter.name, path.display(), e);
                    report.unreadable_image += 1;
                    continue;
                }
            };

            let first_face = match encoder.encode(&image) {
                Ok(faces) => faces.into_iter().next(),
                Err(e) => {
                    warn!("Encoder failed for {} ({}): {}", voter.name, path.display(), e);
                    None
                }
            };

            match first_face {
                Some(embedding) => {
                    debug!("Enrolled {} from {}", voter.name, path.display());
                    enrollment.insert(
                        voter.aadhar.clone(),
                        EnrolledVoter {
                            name: voter.name.clone(),
                            image: voter.image.clone(),
                            embedding,
                        },
                    );
                }
                None => {
                    warn!("No face found in {} ({})", voter.name, path.display());
                    report.no_face += 1;
                }
            }
        }

        report.enrolled = enrollment.len();
        info!(
            "🧑 Enrolled {} of {} voters with the {} encoder ({} skipped)",
            report.enrolled,
            registry.len(),
            encoder.name(),
            report.skipped()
        );

        (enrollment, report)
    }

    /// Add or replace the reference face for an ID
    pub fn insert(&mut self, aadhar: NationalId, voter: EnrolledVoter) {
        self.voters.insert(aadhar, voter);
    }

    pub fn get(&self, aadhar: &str) -> Option<&EnrolledVoter> {
        self.voters.get(aadhar)
    }

    pub fn contains(&self, aadhar: &str) -> bool {
        self.voters.contains_key(aadhar)
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}
