//! Generative-AI dispatch CLI
//!
//! Single-binary stand-in for the application that owns prompts:
//! 1. Loads configuration and collects API keys from the environment
//! 2. Builds the credential pool (one client handle per usable key)
//! 3. Dispatches one prompt with failover across keys and backoff over time
//! 4. Prints the generated text, or a generic failure message
//!
//! Usage: `genai-dispatch [--config PATH] [--metrics] [PROMPT...]`.
//! Without a prompt argument the prompt is read from stdin.

mod config;
mod metrics;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use genai_client::GenAiClient;
use key_pool::{CancellationToken, CredentialPool, Dispatcher};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<String>,
    metrics: bool,
    prompt: Vec<String>,
}

/// Simple flag parsing: `--config PATH`, `--metrics`, everything else is prompt text.
fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => cli.config = iter.next().cloned(),
            "--metrics" => cli.metrics = true,
            _ => cli.prompt.push(arg.clone()),
        }
    }
    cli
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args);

    let prometheus = cli.metrics.then(metrics::install_recorder);

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let prompt = if cli.prompt.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read prompt from stdin")?;
        buf
    } else {
        cli.prompt.join(" ")
    };
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("no prompt given");
    }

    let raw = config
        .raw_credentials()
        .context("failed to collect API keys")?;
    let client_config = config.client_config();
    let pool = Arc::new(CredentialPool::build(
        raw.iter().map(|key| key.expose().as_str()),
        |key| GenAiClient::new(key, &client_config),
    ));

    info!(
        model = %client_config.model,
        base_url = %client_config.base_url,
        handles = pool.len(),
        "configuration loaded"
    );

    let dispatcher = Dispatcher::new(pool).with_policy(config.retry_policy());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling dispatch");
            on_signal.cancel();
        }
    });

    let result = dispatcher
        .run_with_cancel(&cancel, |client: Arc<GenAiClient>| async move {
            client.generate_text(prompt).await
        })
        .await;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }

    match result {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(key_pool::Error::NoCredentialsAvailable) => {
            let list_var = config.credentials.env_var.as_str();
            let prefix = list_var.strip_suffix('S').unwrap_or(list_var);
            anyhow::bail!("no usable API keys configured, set {list_var} or {prefix}_1, {prefix}_2, ...")
        }
        Err(e) => {
            error!(outcome = e.label(), error = %e, "generation failed");
            anyhow::bail!("generation failed, please retry")
        }
    }
}
