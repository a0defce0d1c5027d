// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use gitlab_provisioner::cli::{Cli, Command};
use gitlab_provisioner::config::Config;
use gitlab_provisioner::deploy::{describe, Deployment};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: dns_suffix={}, gitlab_namespace={}, oidc_namespace={}",
        config.dns_suffix, config.gitlab_namespace, config.oidc_namespace
    );

    let deployment = Deployment::connect(config).await?;

    let outcome = match cli.command {
        Command::Apply => deployment.apply().await.map(|converged| {
            info!("GitLab deployment converged ({} resources)", converged.len());
        }),
        Command::Destroy => deployment.destroy().await.map(|deleted| {
            info!("Deleted {} resources", deleted.len());
        }),
        Command::Plan => deployment
            .plan()
            .await
            .and_then(|graph| describe(&graph))
            .map(|plan| print!("{}", plan)),
    };

    if let Err(e) = outcome {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}
