//! Application state and the HTTP server lifecycle

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::info;

use crate::ballot::BallotStore;
use crate::config::Config;
use crate::enrollment::Enrollment;
use crate::face::{FaceEncoder, OnnxFaceEncoder};
use crate::registry::VoterRegistry;
use crate::verification::VerificationService;
use crate::{Error, Result};

/// Everything a request handler can reach
pub struct AppState {
    pub config: Config,
    pub verification: VerificationService,
}

impl AppState {
    /// Assemble state from already-loaded components
    pub fn new(
        config: Config,
        registry: VoterRegistry,
        enrollment: Enrollment,
        encoder: Arc<dyn FaceEncoder>,
    ) -> Arc<Self> {
        let verification = VerificationService::new(
            Arc::new(registry),
            Arc::new(enrollment),
            Arc::new(BallotStore::new()),
            encoder,
            config.face.match_tolerance,
            Duration::from_millis(config.face.encode_timeout_ms),
        );

        Arc::new(Self {
            config,
            verification,
        })
    }

    /// Load the registry and preload enrollment from disk
    ///
    /// Fails if the registry cannot be loaded; individual photos that cannot
    /// be enrolled only produce warnings.
    pub async fn load(config: Config, encoder: Arc<dyn FaceEncoder>) -> Result<Arc<Self>> {
        let registry = VoterRegistry::load(&config.data.voters_csv)?;

        info!("Preloading voter face encodings...");
        let images_dir = config.data.images_dir.clone();
        let preload_encoder = Arc::clone(&encoder);
        let (registry, enrollment) = tokio::task::spawn_blocking(move || {
            let (enrollment, _report) =
                Enrollment::preload(&registry, &images_dir, preload_encoder.as_ref());
            (registry, enrollment)
        })
        .await
        .map_err(|e| Error::internal(format!("Enrollment preload failed: {e}")))?;

        Ok(Self::new(config, registry, enrollment, encoder))
    }
}

/// Load state, bind the listener and serve until Ctrl+C / SIGTERM
pub async fn start_server(config: Config) -> Result<()> {
    info!("Loading face models from {}", config.face.models_dir.display());
    let encoder = OnnxFaceEncoder::load(&config.face)?;

    info!("Initializing state...");
    let state = AppState::load(config, Arc::new(encoder)).await?;

    let address = state.config.server.address();
    let app = crate::api::router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("🗳️  Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
