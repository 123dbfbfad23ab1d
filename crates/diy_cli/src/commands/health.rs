//! Health command - Check that the backend is reachable.

use anyhow::{Context, Result};
use clap::Args;

use super::App;

#[derive(Args)]
pub struct HealthArgs {}

pub async fn execute(_args: HealthArgs, app: &App) -> Result<()> {
    let client = app.client();
    println!("🩺 Checking {}...", client.base_url());

    let health = client.health().await.context("Backend health check failed")?;
    if !health.is_healthy() {
        anyhow::bail!("Backend reported status '{}'", health.status);
    }
    println!("✅ Backend is healthy");
    Ok(())
}
