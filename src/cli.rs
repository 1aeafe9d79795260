//! CLI module for hopline.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hopline::chain::{DialerChain, build_selector};
use hopline::config::{
    CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};
use hopline::core::io::relay_framed;
use hopline::dial::{Dialer, Network};
use hopline::dns::{Family, LookupIp, RacingResolver};
use hopline::select::Selection;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Hopline CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "hopline",
    version,
    about = "Tunnel through the fastest of several CONNECT proxy hops",
    propagate_version = true
)]
pub struct Cli {
    /// Config file path (toml/json/jsonc/yaml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Race the configured resolvers and print the winning addresses.
    Resolve {
        host: String,
        /// Address family: ip, ip4 or ip6.
        #[arg(long, default_value = "ip")]
        family: Family,
    },
    /// Pick an endpoint with the configured policy and print it.
    Select,
    /// Tunnel to `target` (host:port) and relay stdin/stdout through it.
    Dial { target: String },
}

pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli.overrides);

    init_tracing(&config.logging);

    // Graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    match cli.command {
        Command::Resolve { host, family } => resolve(&config, &host, family, &shutdown).await,
        Command::Select => {
            let (chain, selection) = select(&config, &shutdown).await?;
            println!(
                "{}\t{}",
                selection.index,
                chain.address(selection.index).unwrap_or_default()
            );
            Ok(())
        }
        Command::Dial { target } => dial(&config, &target, &shutdown).await,
    }
}

async fn resolve(
    config: &Config,
    host: &str,
    family: Family,
    shutdown: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = RacingResolver::from_config(&config.dns)?;
    let addrs = resolver.lookup_ip(family, host, shutdown).await?;
    if addrs.is_empty() {
        warn!(host, %family, "resolved to no addresses");
    }
    for addr in addrs {
        println!("{addr}");
    }
    Ok(())
}

async fn select(
    config: &Config,
    shutdown: &CancellationToken,
) -> Result<(DialerChain, Selection<dyn Dialer>), Box<dyn std::error::Error>> {
    validate_config(config)?;
    let chain = DialerChain::from_config(config)?;
    let selector = build_selector(&config.selection)?;

    info!(
        policy = %selector.policy(),
        candidates = chain.dialers().len(),
        "selecting endpoint"
    );
    let selection = selector.select(chain.dialers(), shutdown).await?;
    info!(
        index = selection.index,
        address = chain.address(selection.index).unwrap_or_default(),
        "endpoint selected"
    );
    Ok((chain, selection))
}

async fn dial(
    config: &Config,
    target: &str,
    shutdown: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_chain, selection) = select(config, shutdown).await?;
    let tunnel = match selection.dialer.dial(Network::Tcp, target, shutdown).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(
                target,
                kind = e.kind(),
                blocked = e.is_upstream_blocked(),
                error = %e,
                "tunnel failed"
            );
            return Err(e.into());
        }
    };
    info!(target, "tunnel established");

    let stats = relay_framed(tokio::io::stdin(), tokio::io::stdout(), tunnel, shutdown).await;
    info!(
        inbound = stats.inbound,
        outbound = stats.outbound,
        "relay finished"
    );
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Logs go to stderr unless configured otherwise; stdout carries tunnel data.
fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    for (module, level) in &config.filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"));

    let writer = match config.output.as_deref() {
        Some("stdout") => BoxMakeWriter::new(io::stdout),
        _ => BoxMakeWriter::new(io::stderr),
    };
    let layer = match config.format.as_deref() {
        Some("json") => fmt::layer().json().with_writer(writer).boxed(),
        Some("compact") => fmt::layer().compact().with_writer(writer).boxed(),
        _ => fmt::layer().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
}
