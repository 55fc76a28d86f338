use std::time::Duration;

use thiserror::Error;

/// Why a single lookup did not produce an answer.
///
/// These never escape the engine: a probe folds them into
/// `ProbeOutcome::error` as text.
#[derive(Debug, Error)]
pub enum LookupError {
	#[error("invalid resolver address '{0}'")]
	InvalidResolver(String),

	#[error("invalid domain name '{domain}': {reason}")]
	InvalidName { domain: String, reason: String },

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("timed out after {0:?}")]
	Timeout(Duration),

	#[error("server returned {0}")]
	Rcode(String),

	#[error("no records in answer")]
	NoAnswer,

	#[error("malformed response: {0}")]
	Malformed(String),

	#[error("{0}")]
	Resolve(String),
}

/// Resolver address parsing failure
#[derive(Debug, Error)]
pub enum ResolverError {
	#[error("empty resolver address")]
	Empty,

	#[error("invalid IP address '{input}': {source}")]
	InvalidAddress {
		input: String,
		#[source]
		source: std::net::AddrParseError,
	},

	#[error("failed to read resolver file '{path}': {source}")]
	File {
		path: String,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config '{path}': {source}")]
	Read {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write config '{path}': {source}")]
	Write {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config '{path}': {source}")]
	Parse {
		path: String,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("invalid change interval in '{path}': {reason}")]
	Interval { path: String, reason: String },

	#[error("failed to serialize config: {0}")]
	Serialize(#[from] serde_yaml::Error),
}

/// Failure reported by an `Applier` while writing system DNS settings
#[derive(Debug, Error)]
#[error("failed to apply DNS {address}: {reason}")]
pub struct ApplyError {
	pub address: String,
	pub reason: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("no DNS addresses specified in config")]
	NoCandidates,

	#[error("rotation interval must be greater than zero")]
	ZeroInterval,

	#[error(transparent)]
	Apply(#[from] ApplyError),
}
