use anyhow::{Context, Result};
use memora_core::{Gallery, OnnxVerifier, PersonDirectory, RecognitionService};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("memorad starting");

    let config = config::Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    let people = match &config.people_file {
        Some(path) => PersonDirectory::load(path)
            .with_context(|| format!("loading person table {}", path.display()))?,
        None => PersonDirectory::builtin().context("loading built-in person table")?,
    };
    tracing::info!(people = people.len(), "person table ready");

    let gallery = Gallery::new(&config.gallery_dir);
    match gallery.entries() {
        Ok(entries) => tracing::info!(
            dir = %config.gallery_dir.display(),
            references = entries.len(),
            "reference gallery found"
        ),
        Err(err) => tracing::warn!(error = %err, "reference gallery unavailable; requests will fail until it exists"),
    }

    let verifier = OnnxVerifier::load(
        &config.scrfd_model_path(),
        &config.arcface_model_path(),
        config.similarity_threshold,
    )
    .context("loading face models")?;

    let service = RecognitionService::new(verifier, gallery, Arc::new(people));
    let engine = engine::spawn_engine(service)?;
    let app = http::router(engine, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "memorad ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("memorad shutting down");
    Ok(())
}
