use anyhow::Context as _;

use clearbill_auth::{AsymmetricBearerVerifier, SigningConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clearbill_observability::init();

    // Invalid security configuration aborts startup; it is never recovered.
    let config = SigningConfig::from_env().context("security configuration is invalid")?;
    let external = AsymmetricBearerVerifier::from_env()
        .context("external issuer configuration is invalid")?;

    let app = clearbill_api::app::build_app(config, external);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .context("failed to bind 0.0.0.0:8080")?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
