use alternate_dns::service::MAX_INTERVAL_MINUTES;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Benchmark DNS resolvers and rotate to the best one
#[derive(Parser, Debug)]
#[command(name = "alternate-dns")]
#[command(about = "Benchmark DNS resolvers and switch to the best-performing one")]
pub struct Cli {
	#[command(flatten)]
	pub sources: Sources,

	/// Lookup primitive used for probes
	#[arg(long = "lookup", value_enum, default_value_t = LookupKind::Udp, global = true)]
	pub lookup: LookupKind,

	/// Log at debug level (overridden by RUST_LOG)
	#[arg(short = 'v', long = "verbose", global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

/// Where candidates and probe domains come from
#[derive(Args, Debug)]
pub struct Sources {
	/// YAML config file; created with defaults if missing
	#[arg(short = 'c', long = "config", global = true)]
	pub config: Option<String>,

	/// DNS resolver address (repeatable, e.g. 1.1.1.1 or 1.1.1.1:53)
	#[arg(short = 'r', long = "resolver", global = true)]
	pub resolvers: Vec<String>,

	/// File containing resolver addresses (one per line)
	#[arg(short = 'f', long = "resolver-file", global = true)]
	pub resolver_file: Option<String>,

	/// Include system resolvers from /etc/resolv.conf
	#[arg(long = "system-resolvers", global = true)]
	pub system_resolvers: bool,

	/// File containing domains to probe (one per line)
	#[arg(long = "domain-file", global = true)]
	pub domain_file: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Benchmark every resolver and print a ranked table
	Test {
		/// Per-probe timeout in milliseconds
		#[arg(short = 't', long = "timeout", default_value = "5000")]
		timeout: u64,

		/// Output CSV file path
		#[arg(short = 'o', long = "output")]
		output: Option<String>,
	},

	/// Pick the best resolver of the list
	Best {
		/// Apply the choice (dry run only reports it)
		#[arg(long = "apply")]
		apply: bool,
	},

	/// Decide whether to move from one resolver of the list to another
	Compare {
		/// Index of the current resolver
		current: usize,

		/// Index of the next resolver (defaults to the one after current)
		next: Option<usize>,
	},

	/// Rotate through the list until interrupted
	Rotate {
		/// Minutes between rotations (overrides the config interval)
		#[arg(
			short = 'i',
			long = "interval",
			value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES),
		)]
		interval: Option<u64>,

		/// Rotate every 10 seconds
		#[arg(long = "debug")]
		debug: bool,

		/// Start from the best resolver instead of the first
		#[arg(long = "best-first")]
		best_first: bool,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LookupKind {
	/// Raw UDP A query on a dedicated socket
	Udp,
	/// hickory-resolver pinned to the resolver, A and AAAA
	Hickory,
}
