mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use alternate_dns::config::Config;
use alternate_dns::dns::{HickoryLookup, UdpLookup};
use alternate_dns::policy::{compare, display_order, select_best};
use alternate_dns::progress::{ProgressSink, TracingSink};
use alternate_dns::service::{Applier, DryRunApplier, Rotator, RotatorOptions};
use alternate_dns::{domains, output, resolver, Engine, Lookup};

use crate::cli::{Cli, Command, LookupKind, Sources};

/// Candidates and domains after merging every source
struct Inputs {
	config: Config,
	candidates: Vec<String>,
	domains: Vec<String>,
}

fn collect_inputs(sources: &Sources) -> Result<Inputs> {
	let config = match &sources.config {
		Some(path) => Config::load_or_init(Path::new(path))?,
		None => Config::default(),
	};

	// From CLI flags, resolver file and system resolvers
	let mut candidates = Vec::new();
	for r in &sources.resolvers {
		resolver::parse_resolver(r)?;
		candidates.push(r.trim().to_string());
	}
	if let Some(path) = &sources.resolver_file {
		candidates.extend(resolver::read_resolver_file(path)?);
	}
	if sources.system_resolvers {
		candidates.extend(resolver::system_resolvers());
	}

	// Fall back to the configured list
	if candidates.is_empty() {
		candidates = config.dns_addresses.clone();
	}
	if candidates.is_empty() {
		bail!("no DNS addresses specified");
	}

	let domains = match &sources.domain_file {
		Some(path) => domains::read_domain_file(path)?,
		None => domains::effective_domains(&config.test_domains),
	};

	Ok(Inputs { config, candidates, domains })
}

fn init_logging(verbose: bool) {
	let default = if verbose { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.init();
}

async fn execute<L: Lookup>(command: Command, inputs: Inputs, lookup: L) -> Result<()> {
	let engine = Engine::new(lookup);
	let sink: Arc<dyn ProgressSink> = Arc::new(TracingSink);
	let Inputs { config, candidates, domains } = inputs;

	match command {
		Command::Test { timeout, output: csv_path } => {
			let timeout = Duration::from_millis(timeout);
			output::print_config_summary(&candidates, &domains, timeout);
			println!("Testing DNS servers...");
			let mut results = engine.benchmark_all(&candidates, &domains, timeout, sink.as_ref()).await;
			results.sort_by(display_order);
			output::print_results_table(&results);
			if let Some(path) = csv_path {
				output::write_csv(&path, &results)?;
			}
		}
		Command::Best { apply } => {
			let selection = select_best(&engine, &candidates, &domains, sink.as_ref())
				.await
				.ok_or_else(|| anyhow!("no DNS addresses specified"))?;
			println!("Best DNS: {} (index {})", selection.address, selection.index);
			if apply {
				DryRunApplier::new(Arc::clone(&sink)).apply(&selection.address)?;
			}
		}
		Command::Compare { current, next } => {
			let len = candidates.len();
			let next = next.unwrap_or((current + 1) % len);
			if current >= len || next >= len {
				bail!("index out of range: list has {} resolvers", len);
			}
			let selection = compare(
				&engine,
				(candidates[current].as_str(), current),
				(candidates[next].as_str(), next),
				&domains,
				sink.as_ref(),
			).await;
			let verdict = if selection.switched { "switch to" } else { "keep" };
			println!("Decision: {} {} (index {})", verdict, selection.address, selection.index);
		}
		Command::Rotate { interval, debug, best_first } => {
			let interval = match interval {
				Some(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
				None => config.interval(),
			};
			let options = RotatorOptions { interval, debug, best_first };
			info!(resolvers = candidates.len(), interval = ?options.effective_interval(), "starting rotation");
			let applier = DryRunApplier::new(Arc::clone(&sink));
			let rotator = Rotator::new(engine, applier, candidates, domains, options, sink);

			let (tx, rx) = watch::channel(false);
			tokio::spawn(async move {
				if let Err(e) = tokio::signal::ctrl_c().await {
					// Keep the sender alive so the rotator is not stopped
					warn!(error = %e, "failed to listen for ctrl-c");
					std::future::pending::<()>().await;
				}
				let _ = tx.send(true);
			});
			rotator.run(rx).await?;
		}
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	let inputs = collect_inputs(&cli.sources)?;
	match cli.lookup {
		LookupKind::Udp => execute(cli.command, inputs, UdpLookup).await,
		LookupKind::Hickory => execute(cli.command, inputs, HickoryLookup).await,
	}
}
