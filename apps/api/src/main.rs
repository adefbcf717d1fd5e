mod assistant;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod preferences;
mod review;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::extraction::orchestrator::{ExtractionStrategy, Orchestrator};
use crate::extraction::remote::{ChatExtractor, ServiceExtractor};
use crate::llm_client::augment::RequestAugmentor;
use crate::llm_client::{Credential, LlmClient};
use crate::preferences::PreferencesState;
use crate::review::ReviewRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{KeyValueStore, MemoryStore, RedisStore, CREDENTIAL_KEY};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvlens API v{}", env!("CARGO_PKG_VERSION"));

    // Key-value store: Redis when configured, otherwise process memory
    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set; settings and the latest profile will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    // A persisted credential wins over the environment
    let stored_key = store.get(CREDENTIAL_KEY).await?;
    let credential = Credential::new(stored_key.or_else(|| config.llm_api_key.clone()));
    if credential.get().await.is_none() {
        warn!("No LLM credential configured; remote extraction and assistant will fall back locally");
    }

    let preferences = PreferencesState::init_from_store(store.clone()).await;

    // Two clients share the credential; only extraction calls are augmented
    let base_llm = LlmClient::new(
        config.chat_endpoint(),
        config.llm_model.clone(),
        config.llm_max_tokens,
        credential.clone(),
    )
    .context("Failed to build LLM client")?;
    let extraction_llm =
        base_llm.clone().with_augmentor(RequestAugmentor::new(config.augmentation_policy()));
    info!("LLM client initialized (model: {})", base_llm.model());

    let remote: Arc<dyn ExtractionStrategy> = match &config.extraction_service_url {
        Some(url) => {
            info!("Remote extraction via service at {url}");
            Arc::new(
                ServiceExtractor::new(url, config.remote_timeout)
                    .context("Failed to build extraction service client")?,
            )
        }
        None => {
            info!("Remote extraction via chat model");
            Arc::new(ChatExtractor::new(extraction_llm))
        }
    };
    let orchestrator = Orchestrator::standard(
        Some(remote),
        config.remote_timeout,
        config.upload_limits(),
    );

    let assistant = Assistant::new(Arc::new(base_llm), config.assistant_timeout);

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        assistant,
        reviews: ReviewRegistry::new(),
        store,
        preferences,
        credential,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
