//! MoxApp CLI — the binary entry point (§6.5).
//!
//! Loads the YAML configuration, applies CLI/env overrides, validates
//! it, then wires up the token manager, HTTP client, outgoing
//! scheduler, inbound responder, and management gateway and starts
//! serving.

use clap::Parser;
use moxapp_auth::TokenManager;
use moxapp_client::HttpClient;
use moxapp_config::{ConfigStore, OutgoingEndpoint};
use moxapp_core::{Clock, EnvSource, ProcessEnv, SystemClock, SystemRandom};
use moxapp_gateway::AppState;
use moxapp_inbound::InboundResponder;
use moxapp_metrics::{InboundCollector, OutgoingCollector};
use moxapp_scheduler::{OutgoingScheduler, ResultSink};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "moxapp",
    about = "MoxApp — a bidirectional HTTP traffic generator and simulator",
    version
)]
struct Cli {
    /// Global rate multiplier applied to every outgoing endpoint's frequency
    #[arg(long, default_value_t = 1.0)]
    multiplier: f64,

    /// Maximum number of outgoing requests in flight at once
    #[arg(long, default_value_t = 30)]
    concurrent: u32,

    /// Only run outgoing endpoints whose name contains one of these
    /// comma-separated substrings
    #[arg(long)]
    filter: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,

    /// Load and validate the configuration, print the effective
    /// settings, and exit without starting any traffic
    #[arg(long)]
    dry_run: bool,

    /// Path to the YAML configuration file
    #[arg(long, default_value = "moxapp.yaml")]
    config: PathBuf,

    /// Port the management gateway and /sim adapter listen on
    #[arg(long)]
    port: Option<u16>,

    /// Log every outgoing and inbound request at info level
    #[arg(long)]
    log_requests: bool,

    /// Confirm starting a run that will generate live outgoing traffic
    #[arg(long)]
    yes: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn apply_filter(endpoints: &mut [OutgoingEndpoint], filter: &str) {
    let needles: Vec<&str> = filter.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if needles.is_empty() {
        return;
    }
    for endpoint in endpoints.iter_mut() {
        if !needles.iter().any(|needle| endpoint.name.contains(needle)) {
            endpoint.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut data = moxapp_config::file::load_yaml(&cli.config)?;
    data.global.global_multiplier = cli.multiplier;
    data.global.concurrent_requests = cli.concurrent.max(1);
    if cli.log_requests {
        data.global.log_all_requests = true;
    }
    if let Some(filter) = &cli.filter {
        apply_filter(&mut data.outgoing_endpoints, filter);
    }

    let env: Arc<dyn EnvSource> = Arc::new(ProcessEnv);
    let port = cli
        .port
        .or_else(|| env.get("API_PORT").and_then(|v| v.parse().ok()))
        .unwrap_or(data.api_port);

    let store = match ConfigStore::from_loaded(data) {
        Ok(store) => store,
        Err(moxapp_config::ConfigError::Validation(errors)) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    store.set_config_path(cli.config.clone());

    if cli.validate {
        println!("configuration is valid");
        println!("  outgoing endpoints: {}", store.list_outgoing().await.len());
        println!("  inbound routes:     {}", store.list_incoming().await.len());
        return Ok(());
    }

    let enabled_endpoints: Vec<_> = store.list_outgoing().await.into_iter().filter(|e| e.enabled).collect();
    let adjusted_rate = store.get_adjusted_requests_per_min().await;

    if cli.dry_run {
        println!("dry run — no traffic will be generated");
        println!("  port:                 {port}");
        println!("  concurrent requests:  {}", cli.concurrent);
        println!("  enabled endpoints:    {}", enabled_endpoints.len());
        println!("  adjusted rate:        {adjusted_rate:.1} req/min");
        return Ok(());
    }

    if !enabled_endpoints.is_empty() && !cli.yes {
        eprintln!("this run will generate live outgoing HTTP traffic:");
        eprintln!("  {} enabled endpoint(s), ~{adjusted_rate:.1} req/min", enabled_endpoints.len());
        eprintln!("pass --yes to confirm and start");
        std::process::exit(1);
    }

    let store = Arc::new(store);
    let clock = Arc::new(SystemClock);
    let random = Arc::new(SystemRandom);

    let auth = Arc::new(TokenManager::new(env.clone(), clock.clone()));
    let auth_configs = store.list_auth().await.into_iter().map(|c| (c.name.clone(), c)).collect();
    auth.update_auth_configs(auth_configs).await;
    auth.start_background_refresh().await;

    let client = Arc::new(HttpClient::new(cli.concurrent.max(1), env, clock.clone(), random.clone(), auth.clone()));

    let outgoing_metrics = Arc::new(OutgoingCollector::default());
    let sink: ResultSink = {
        let metrics = Arc::clone(&outgoing_metrics);
        Arc::new(move |result| metrics.record(&result))
    };
    let scheduler = OutgoingScheduler::new(Arc::clone(&store), client, clock.clone() as Arc<dyn Clock>, sink);
    scheduler.start();

    let inbound_metrics = Arc::new(InboundCollector::default());
    let inbound = Arc::new(InboundResponder::new(Arc::clone(&store), random, clock, Arc::clone(&inbound_metrics)));

    let state = AppState {
        config: Arc::clone(&store),
        auth,
        scheduler,
        inbound,
        outgoing_metrics,
        inbound_metrics,
    };

    moxapp_gateway::serve(state, port).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxapp_config::HttpMethod;

    fn endpoint(name: &str) -> OutgoingEndpoint {
        OutgoingEndpoint {
            name: name.into(),
            method: HttpMethod::Get,
            url_template: "https://example.com".into(),
            frequency: 60.0,
            headers: Default::default(),
            body: None,
            timeout: 30,
            auth: None,
            enabled: true,
            resolved_auth: None,
        }
    }

    #[test]
    fn filter_disables_non_matching_endpoints() {
        let mut endpoints = vec![endpoint("checkout-api"), endpoint("inventory-sync")];
        apply_filter(&mut endpoints, "checkout");
        assert!(endpoints[0].enabled);
        assert!(!endpoints[1].enabled);
    }

    #[test]
    fn empty_filter_leaves_endpoints_unchanged() {
        let mut endpoints = vec![endpoint("checkout-api")];
        apply_filter(&mut endpoints, "");
        assert!(endpoints[0].enabled);
    }

    #[test]
    fn comma_separated_filter_matches_any_substring() {
        let mut endpoints = vec![endpoint("checkout-api"), endpoint("inventory-sync"), endpoint("billing-retry")];
        apply_filter(&mut endpoints, "checkout, billing");
        assert!(endpoints[0].enabled);
        assert!(!endpoints[1].enabled);
        assert!(endpoints[2].enabled);
    }
}
