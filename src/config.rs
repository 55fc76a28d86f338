use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::resolver::default_resolvers;
use crate::service::{MAX_INTERVAL, MAX_INTERVAL_MINUTES};

/// Rotation interval when the config gives none
pub const DEFAULT_INTERVAL_HOURS: i64 = 6;

/// On-disk configuration (YAML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
	#[serde(default = "default_resolvers")]
	pub dns_addresses: Vec<String>,

	#[serde(default)]
	pub change_interval_hours: i64,

	/// Takes precedence over hours when positive
	#[serde(default, skip_serializing_if = "is_zero")]
	pub change_interval_minutes: i64,

	/// Domains probed while testing; empty means the built-in set
	#[serde(default)]
	pub test_domains: Vec<String>,
}

fn is_zero(v: &i64) -> bool {
	*v == 0
}

impl Default for Config {
	fn default() -> Self {
		Config {
			dns_addresses: default_resolvers(),
			change_interval_hours: DEFAULT_INTERVAL_HOURS,
			change_interval_minutes: 0,
			test_domains: Vec::new(),
		}
	}
}

impl Config {
	/// Parse YAML text, normalizing a missing or non-positive interval.
	///
	/// Intervals longer than `MAX_INTERVAL_MINUTES` are rejected.
	pub fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
		let mut config: Config = serde_yaml::from_str(text)
			.map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
		if config.change_interval_hours <= 0 {
			config.change_interval_hours = DEFAULT_INTERVAL_HOURS;
		}
		match config.interval_minutes() {
			Some(minutes) if minutes <= MAX_INTERVAL_MINUTES => Ok(config),
			_ => Err(ConfigError::Interval {
				path: path.to_string(),
				reason: format!("longer than {} minutes", MAX_INTERVAL_MINUTES),
			}),
		}
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let display = path.display().to_string();
		let text = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: display.clone(), source })?;
		Self::from_yaml(&text, &display)
	}

	/// Load `path`, writing the default configuration there first if it
	/// does not exist yet.
	pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			let config = Config::default();
			config.save(path)?;
			info!(path = %path.display(), "wrote default config");
			return Ok(config);
		}
		Self::load(path)
	}

	pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
		let text = serde_yaml::to_string(self)?;
		std::fs::write(path, text)
			.map_err(|source| ConfigError::Write { path: path.display().to_string(), source })
	}

	/// Minutes between rotations, `None` on overflow
	fn interval_minutes(&self) -> Option<u64> {
		if self.change_interval_minutes > 0 {
			u64::try_from(self.change_interval_minutes).ok()
		} else if self.change_interval_hours > 0 {
			u64::try_from(self.change_interval_hours).ok()?.checked_mul(60)
		} else {
			u64::try_from(DEFAULT_INTERVAL_HOURS).ok()?.checked_mul(60)
		}
	}

	/// Time between automatic rotations, capped at `MAX_INTERVAL`.
	pub fn interval(&self) -> Duration {
		self.interval_minutes()
			.and_then(|minutes| minutes.checked_mul(60))
			.map_or(MAX_INTERVAL, Duration::from_secs)
			.min(MAX_INTERVAL)
	}
}
