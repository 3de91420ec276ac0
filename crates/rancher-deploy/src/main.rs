//! rancher-deploy — one-shot in-service upgrade driver for Rancher.
//!
//! Resolves a service (optionally as `stack/service`), requests a
//! rolling in-service upgrade that reuses the service's launch
//! configuration, waits for the `upgraded` state, and commits it with
//! `finishupgrade`. Exits non-zero as soon as any step fails.
//!
//! Credentials come from the `RANCHER_ACCESS_KEY` and
//! `RANCHER_SECRET_KEY` environment variables:
//!
//! ```text
//! RANCHER_ACCESS_KEY=… RANCHER_SECRET_KEY=… rancher-deploy \
//!     --service web/api \
//!     --rancher-url https://rancher.example.com/v2-beta/projects/1a5 \
//!     --docker-image registry.example.com/api:1.2.3
//! ```

use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use rancher_client::{ClientOpts, RancherClient};
use rancher_upgrade::{Deploy, DeployConfig, Target, config};

/// Environment variable holding the Rancher API access key.
const ENV_ACCESS_KEY: &str = "RANCHER_ACCESS_KEY";
/// Environment variable holding the Rancher API secret key.
const ENV_SECRET_KEY: &str = "RANCHER_SECRET_KEY";

#[derive(Parser)]
#[command(
    name = "rancher-deploy",
    version,
    about = "Upgrade a Rancher service in place and wait for it to finish"
)]
struct Cli {
    /// Rancher environment; narrows the stack lookup for stack-scoped
    /// services.
    #[arg(long)]
    env: Option<String>,

    /// Service to upgrade, as `name` or `stack/name`.
    #[arg(long)]
    service: String,

    /// Base URL of the Rancher project API, e.g.
    /// https://rancher.example.com/v2-beta/projects/1a5.
    #[arg(long)]
    rancher_url: String,

    /// Image the service is expected to run after the upgrade.
    #[arg(long)]
    docker_image: String,

    /// Maximum wait for the service to reach the upgraded state
    /// (e.g. 90s, 2m).
    #[arg(long, default_value = "60s", value_parser = config::parse_duration)]
    upgrade_timeout: Duration,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!(error = %err, "deploy failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %cli.service,
        image = %cli.docker_image,
        "starting rancher-deploy"
    );

    let client = RancherClient::new(ClientOpts::new(
        cli.rancher_url,
        std::env::var(ENV_ACCESS_KEY).unwrap_or_default(),
        std::env::var(ENV_SECRET_KEY).unwrap_or_default(),
    ))?;

    let target = Target::parse(&cli.service, cli.env);
    let config = DeployConfig::new(target, cli.docker_image)
        .with_upgrade_timeout(cli.upgrade_timeout);

    Deploy::new(client, config).run().await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
