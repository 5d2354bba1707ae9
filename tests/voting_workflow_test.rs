//! Voting workflow edge cases: concurrency, tolerance and startup failures

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use face_vote::ballot::BallotStore;
use face_vote::enrollment::{EnrolledVoter, Enrollment};
use face_vote::face::{FaceEmbedding, FaceEncoder};
use face_vote::registry::VoterRegistry;
use face_vote::server::AppState;
use face_vote::types::VoterRecord;
use face_vote::verification::{Rejection, VerificationService, VoteRequest};
use face_vote::{Error, Result};
use image::DynamicImage;

fn vote(name: &str, aadhar: &str, party: &str, image: String) -> VoteRequest {
    VoteRequest {
        name: name.to_string(),
        aadhar: aadhar.to_string(),
        party: party.to_string(),
        image,
    }
}

// =============================================================================
// CONCURRENT OPERATIONS TESTS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_for_same_id_count_once() -> Result<()> {
    let fixture = Fixture::new();
    let state = fixture.state().await;
    let selfie = data_url(&portrait(1));

    let mut handles = Vec::new();
    for party in ["INC", "BJP", "BRS", "BSP", "INC", "AIMIM", "BJP", "INC"] {
        let verification = state.verification.clone();
        let request = vote("Asha", "1111", party, selfie.clone());
        handles.push(tokio::spawn(async move {
            verification.verify_and_vote(request).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.expect("vote task panicked")? {
            Ok(_) => accepted += 1,
            Err(Rejection::AlreadyVoted | Rejection::VerificationInProgress) => {}
            Err(other) => panic!("Unexpected rejection: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    let tally = state.verification.ballot().tally()?;
    assert_eq!(tally.values().sum::<u64>(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_for_different_ids() -> Result<()> {
    let fixture = Fixture::new();
    let state = fixture.state().await;

    let asha = {
        let verification = state.verification.clone();
        let request = vote("Asha", "1111", "INC", data_url(&portrait(1)));
        tokio::spawn(async move { verification.verify_and_vote(request).await })
    };
    let ravi = {
        let verification = state.verification.clone();
        let request = vote("Ravi Kumar", "2222", "INC", data_url(&portrait(2)));
        tokio::spawn(async move { verification.verify_and_vote(request).await })
    };

    assert!(asha.await.expect("task panicked")?.is_ok());
    assert!(ravi.await.expect("task panicked")?.is_ok());
    assert_eq!(state.verification.ballot().tally()?.get("INC"), Some(&2));
    Ok(())
}

// =============================================================================
// TOLERANCE TESTS
// =============================================================================

/// Encoder returning a fixed embedding, for exercising the threshold
struct FixedEncoder(Vec<f32>);

impl FaceEncoder for FixedEncoder {
    fn encode(&self, _image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
        Ok(vec![FaceEmbedding::new(self.0.clone())])
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn service_with_capture(captured: Vec<f32>, tolerance: f32) -> VerificationService {
    let registry = VoterRegistry::from_records(vec![VoterRecord {
        name: "Asha".to_string(),
        aadhar: "1111".to_string(),
        image: "asha.png".to_string(),
    }]);

    let mut enrollment = Enrollment::default();
    enrollment.insert(
        "1111".to_string(),
        EnrolledVoter {
            name: "Asha".to_string(),
            image: "asha.png".to_string(),
            embedding: FaceEmbedding::new(vec![0.0, 0.0, 0.0, 0.0]),
        },
    );

    VerificationService::new(
        Arc::new(registry),
        Arc::new(enrollment),
        Arc::new(BallotStore::new()),
        Arc::new(FixedEncoder(captured)),
        tolerance,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_distance_threshold_decides_match() -> Result<()> {
    let selfie = data_url(&portrait(1));

    // Distances 0.25, 0.5 and 0.75 from the enrolled zero vector
    let cases = [(0.25, true), (0.5, true), (0.75, false)];
    for (offset, should_accept) in cases {
        let service = service_with_capture(vec![offset, 0.0, 0.0, 0.0], 0.5);
        let outcome = service
            .verify_and_vote(vote("Asha", "1111", "BSP", selfie.clone()))
            .await?;

        assert_eq!(outcome.is_ok(), should_accept, "distance {offset}");
        if !should_accept {
            assert!(matches!(outcome, Err(Rejection::FaceMismatch { .. })));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_custom_tolerance_is_honoured() -> Result<()> {
    let selfie = data_url(&portrait(1));

    let strict = service_with_capture(vec![0.25, 0.0, 0.0, 0.0], 0.2);
    let outcome = strict.verify_and_vote(vote("Asha", "1111", "BSP", selfie.clone())).await?;
    assert!(matches!(outcome, Err(Rejection::FaceMismatch { .. })));

    let loose = service_with_capture(vec![0.75, 0.0, 0.0, 0.0], 1.0);
    let outcome = loose.verify_and_vote(vote("Asha", "1111", "BSP", selfie)).await?;
    assert!(outcome.is_ok());
    Ok(())
}

/// Encoder that never finishes in time
struct SlowEncoder;

impl FaceEncoder for SlowEncoder {
    fn encode(&self, _image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(vec![FaceEmbedding::new(vec![0.0])])
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn test_encoder_timeout_is_a_rejection() -> Result<()> {
    let registry = VoterRegistry::from_records(vec![VoterRecord {
        name: "Asha".to_string(),
        aadhar: "1111".to_string(),
        image: "asha.png".to_string(),
    }]);
    let service = VerificationService::new(
        Arc::new(registry),
        Arc::new(Enrollment::default()),
        Arc::new(BallotStore::new()),
        Arc::new(SlowEncoder),
        0.5,
        Duration::from_millis(20),
    );

    let outcome = service
        .verify_and_vote(vote("Asha", "1111", "INC", data_url(&portrait(1))))
        .await?;
    assert_eq!(outcome, Err(Rejection::Timeout));

    // The session was released; the voter has not voted
    assert!(!service.ballot().has_voted("1111")?);
    Ok(())
}

/// Encoder that always fails
struct BrokenEncoder;

impl FaceEncoder for BrokenEncoder {
    fn encode(&self, _image: &DynamicImage) -> Result<Vec<FaceEmbedding>> {
        Err(Error::face("model not loaded"))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_encoder_failure_is_an_error() {
    let registry = VoterRegistry::from_records(vec![VoterRecord {
        name: "Asha".to_string(),
        aadhar: "1111".to_string(),
        image: "asha.png".to_string(),
    }]);
    let service = VerificationService::new(
        Arc::new(registry),
        Arc::new(Enrollment::default()),
        Arc::new(BallotStore::new()),
        Arc::new(BrokenEncoder),
        0.5,
        Duration::from_secs(5),
    );

    let result = service
        .verify_and_vote(vote("Asha", "1111", "INC", data_url(&portrait(1))))
        .await;
    assert!(matches!(result, Err(Error::Face { .. })));
}

// =============================================================================
// STARTUP TESTS
// =============================================================================

#[tokio::test]
async fn test_startup_fails_without_registry() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.path().join("voters.csv")).unwrap();

    let result = AppState::load(fixture.config.clone(), Arc::new(BadgeEncoder)).await;
    assert!(matches!(result, Err(Error::Registry { .. })));
}

#[tokio::test]
async fn test_enrollment_is_fixed_at_startup() -> Result<()> {
    let fixture = Fixture::new();
    let state = fixture.state().await;

    // Replacing the photo after startup does not change the enrolled face
    portrait(2).save(fixture.path().join("images/asha.png")).unwrap();

    let outcome = state
        .verification
        .verify_and_vote(vote("Asha", "1111", "INC", data_url(&portrait(1))))
        .await?;
    assert!(outcome.is_ok());
    Ok(())
}
