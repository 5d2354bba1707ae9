//! Voter login and the verify-and-vote flow
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. All fields present
//! 2. (name, aadhar) is a registry row
//! 3. The ID has not voted (and is not mid-verification)
//! 4. The party is on the ballot
//! 5. The capture decodes to an image
//! 6. A face is found in the capture
//! 7. The ID has an enrolled reference face
//! 8. The two embeddings are within tolerance
//!
//! Only then is the vote recorded. Refusals are [`Rejection`] values, never
//! errors; [`crate::Error`] is reserved for broken infrastructure.

use crate::ballot::{Admission, BallotReceipt, BallotStore, CastResult};
use crate::enrollment::Enrollment;
use crate::face::{FaceEmbedding, FaceEncoder, decode_capture};
use crate::registry::VoterRegistry;
use crate::types::{Tally, find_party};
use crate::{Result, face_error};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a login or vote was refused
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Name and Aadhaar are required")]
    MissingCredentials,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Not found in voter list")]
    NotRegistered,

    #[error("Vote already cast for this Aadhaar")]
    AlreadyVoted,

    #[error("Verification already in progress for this Aadhaar")]
    VerificationInProgress,

    #[error("Unknown party: {0}")]
    UnknownParty(String),

    /// Base64 or image decoding failed; carries the rendered cause
    #[error("{0}")]
    InvalidImage(String),

    #[error("No face detected in captured image")]
    NoFaceDetected,

    #[error("No stored face for this Aadhaar")]
    NoStoredFace,

    #[error("Face does not match registered photo")]
    FaceMismatch { distance: f32 },

    #[error("Face verification timed out")]
    Timeout,
}

/// A vote submission as received from the client
#[derive(Debug, Clone, Default)]
pub struct VoteRequest {
    pub name: String,
    pub aadhar: String,
    pub party: String,
    /// `data:image/...;base64,...` capture of the voter
    pub image: String,
}

/// An accepted vote
#[derive(Debug, Clone, PartialEq)]
pub struct VoteConfirmation {
    pub party: String,
    pub receipt: BallotReceipt,
    pub tally: Tally,
    pub distance: f32,
}

impl VoteConfirmation {
    pub fn message(&self) -> String {
        format!("✅ Vote cast for {}", self.party)
    }
}

/// Outcome of a vote attempt
pub type VoteOutcome = std::result::Result<VoteConfirmation, Rejection>;

/// Login, face verification and vote recording over shared state
#[derive(Clone)]
pub struct VerificationService {
    registry: Arc<VoterRegistry>,
    enrollment: Arc<Enrollment>,
    ballot: Arc<BallotStore>,
    encoder: Arc<dyn FaceEncoder>,
    tolerance: f32,
    encode_timeout: Duration,
}

impl VerificationService {
    pub fn new(
        registry: Arc<VoterRegistry>,
        enrollment: Arc<Enrollment>,
        ballot: Arc<BallotStore>,
        encoder: Arc<dyn FaceEncoder>,
        tolerance: f32,
        encode_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            enrollment,
            ballot,
            encoder,
            tolerance,
            encode_timeout,
        }
    }

    pub fn registry(&self) -> &VoterRegistry {
        &self.registry
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    pub fn ballot(&self) -> &Arc<BallotStore> {
        &self.ballot
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Check a (name, aadhar) pair against the registry
    pub fn login(&self, name: &str, aadhar: &str) -> std::result::Result<(), Rejection> {
        let (name, aadhar) = (name.trim(), aadhar.trim());
        if name.is_empty() || aadhar.is_empty() {
            return Err(Rejection::MissingCredentials);
        }
        if !self.registry.contains(name, aadhar) {
            return Err(Rejection::NotRegistered);
        }
        Ok(())
    }

    /// Verify the captured face and record the vote
    ///
    /// `Err` is only returned for infrastructure failures (poisoned ballot
    /// lock, crashed encoder task); every refusal is `Ok(Err(Rejection))`.
    pub async fn verify_and_vote(&self, request: VoteRequest) -> Result<VoteOutcome> {
        let name = request.name.trim();
        let aadhar = request.aadhar.trim();
        let party = request.party.trim();

        if name.is_empty() || aadhar.is_empty() || party.is_empty() || request.image.is_empty() {
            return Ok(Err(Rejection::MissingFields));
        }

        if !self.registry.contains(name, aadhar) {
            return Ok(Err(Rejection::NotRegistered));
        }

        // Held until the end of this call; blocks concurrent attempts for the ID.
        let session = match self.ballot.begin(aadhar)? {
            Admission::Admitted(session) => session,
            Admission::AlreadyVoted => return Ok(Err(Rejection::AlreadyVoted)),
            Admission::InProgress => return Ok(Err(Rejection::VerificationInProgress)),
        };

        let Some(party) = find_party(party) else {
            return Ok(Err(Rejection::UnknownParty(party.to_string())));
        };

        let captured = match self.encode_capture(request.image).await? {
            Ok(embedding) => embedding,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let Some(enrolled) = self.enrollment.get(aadhar) else {
            warn!("Vote attempt for an ID without enrollment");
            return Ok(Err(Rejection::NoStoredFace));
        };

        let distance = enrolled.embedding.distance(&captured);
        debug!("Face distance {:.4} (tolerance {})", distance, self.tolerance);
        if distance > self.tolerance {
            info!("Face mismatch at distance {:.4}", distance);
            return Ok(Err(Rejection::FaceMismatch { distance }));
        }

        match session.commit(party.name)? {
            CastResult::Recorded { receipt, tally } => Ok(Ok(VoteConfirmation {
                party: party.name.to_string(),
                receipt,
                tally,
                distance,
            })),
            CastResult::AlreadyVoted => Ok(Err(Rejection::AlreadyVoted)),
        }
    }

    /// Decode and encode a capture on the blocking pool, bounded by the timeout
    async fn encode_capture(
        &self,
        data_url: String,
    ) -> Result<std::result::Result<FaceEmbedding, Rejection>> {
        let encoder = Arc::clone(&self.encoder);

        let task = tokio::task::spawn_blocking(move || -> Result<std::result::Result<_, _>> {
            let image = match decode_capture(&data_url) {
                Ok(image) => image,
                Err(e) => return Ok(Err(Rejection::InvalidImage(e.to_string()))),
            };

            let faces = encoder.encode(&image)?;
            Ok(faces.into_iter().next().ok_or(Rejection::NoFaceDetected))
        });

        match tokio::time::timeout(self.encode_timeout, task).await {
            Ok(joined) => joined.map_err(|e| face_error!("Face encoding task failed: {}", e))?,
            Err(_) => {
                warn!("⏱️  Face encoding exceeded {:?}", self.encode_timeout);
                Ok(Err(Rejection::Timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::EnrolledVoter;
    use crate::types::VoterRecord;
    use base64::Engine;
    use image::DynamicImage;
    use std::collections::HashMap;

    /// Encoder that reads the embedding from the image's first pixel row
    struct RowEncoder;

    impl FaceEncoder for RowEncoder {
        fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
            let gray = image.to_luma8();
            if gray.pixels().all(|p| p.0[0] == 0) {
                return Ok(Vec::new());
            }
            let row = (0..gray.width())
                .map(|x| f32::from(gray.get_pixel(x, 0).0[0]) / 100.0)
                .collect::<Vec<_>>();
            Ok(vec![FaceEmbedding::new(row)])
        }

        fn name(&self) -> &'static str {
            "row"
        }
    }

    fn capture(values: &[u8]) -> String {
        let img = image::GrayImage::from_fn(values.len() as u32, 1, |x, _| {
            image::Luma([values[x as usize]])
        });
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
        )
    }

    fn service() -> VerificationService {
        let registry = VoterRegistry::from_records(vec![
            VoterRecord {
                name: "Asha".to_string(),
                aadhar: "1111".to_string(),
                image: "asha.png".to_string(),
            },
            VoterRecord {
                name: "Ravi".to_string(),
                aadhar: "2222".to_string(),
                image: "ravi.png".to_string(),
            },
        ]);

        let mut enrollment = Enrollment::default();
        enrollment.insert(
            "1111".to_string(),
            EnrolledVoter {
                name: "Asha".to_string(),
                image: "asha.png".to_string(),
                embedding: FaceEmbedding::new(vec![1.0, 1.0]),
            },
        );

        VerificationService::new(
            Arc::new(registry),
            Arc::new(enrollment),
            Arc::new(BallotStore::new()),
            Arc::new(RowEncoder),
            0.5,
            Duration::from_secs(5),
        )
    }

    fn request(name: &str, aadhar: &str, party: &str, image: String) -> VoteRequest {
        VoteRequest {
            name: name.to_string(),
            aadhar: aadhar.to_string(),
            party: party.to_string(),
            image,
        }
    }

    #[test]
    fn test_login() {
        let service = service();

        assert_eq!(service.login("Asha", "1111"), Ok(()));
        assert_eq!(service.login(" Asha ", "1111 "), Ok(()));
        assert_eq!(service.login("asha", "1111"), Err(Rejection::NotRegistered));
        assert_eq!(service.login("Asha", ""), Err(Rejection::MissingCredentials));
    }

    #[tokio::test]
    async fn test_vote_then_already_voted() {
        let service = service();

        let confirmation = service
            .verify_and_vote(request("Asha", "1111", "INC", capture(&[100, 100])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmation.message(), "✅ Vote cast for INC");
        assert_eq!(confirmation.tally.get("INC"), Some(&1));
        assert_eq!(confirmation.distance, 0.0);

        let second = service
            .verify_and_vote(request("Asha", "1111", "NOT-A-PARTY", "garbage".to_string()))
            .await
            .unwrap();
        assert_eq!(second, Err(Rejection::AlreadyVoted));
    }

    #[tokio::test]
    async fn test_rejections_in_order() {
        let service = service();
        let good = capture(&[100, 100]);

        let cases = vec![
            (request("Asha", "1111", "INC", String::new()), Rejection::MissingFields),
            (request("Asha", "9999", "INC", good.clone()), Rejection::NotRegistered),
            (
                request("Asha", "1111", "Party A", good.clone()),
                Rejection::UnknownParty("Party A".to_string()),
            ),
            (request("Asha", "1111", "INC", capture(&[0, 0])), Rejection::NoFaceDetected),
            (request("Ravi", "2222", "INC", good.clone()), Rejection::NoStoredFace),
        ];

        for (req, expected) in cases {
            assert_eq!(service.verify_and_vote(req).await.unwrap(), Err(expected));
        }

        let bad_image = service
            .verify_and_vote(request("Asha", "1111", "INC", "data:image/png;base64,AAAA".into()))
            .await
            .unwrap();
        assert_eq!(bad_image, Err(Rejection::InvalidImage("Invalid image data".to_string())));

        assert_eq!(service.ballot().total_votes().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tolerance_boundary() {
        let service = service();

        // Enrolled at (1.0, 1.0); (1.5, 1.0) sits exactly on the threshold.
        let mismatch = service
            .verify_and_vote(request("Asha", "1111", "BJP", capture(&[151, 100])))
            .await
            .unwrap();
        assert!(matches!(mismatch, Err(Rejection::FaceMismatch { distance }) if distance > 0.5));

        let accepted = service
            .verify_and_vote(request("Asha", "1111", "BJP", capture(&[150, 100])))
            .await
            .unwrap();
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_failed_attempt_allows_retry() {
        let service = service();

        let first = service
            .verify_and_vote(request("Asha", "1111", "BRS", capture(&[250, 250])))
            .await
            .unwrap();
        assert!(matches!(first, Err(Rejection::FaceMismatch { .. })));

        let retry = service
            .verify_and_vote(request("Asha", "1111", "BRS", capture(&[100, 100])))
            .await
            .unwrap();
        assert!(retry.is_ok());

        let tally: HashMap<_, _> = service.ballot().tally().unwrap().into_iter().collect();
        assert_eq!(tally.get("BRS"), Some(&1));
    }
}
