use std::fmt;
use std::time::Duration;

/// Timeout applied to every probe by the selection policies
pub const SELECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of a single resolution attempt
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
	pub domain: String,
	pub elapsed: Duration,
	pub success: bool,
	pub error: Option<String>,
}

impl ProbeOutcome {
	pub fn succeeded(domain: &str, elapsed: Duration) -> Self {
		ProbeOutcome {
			domain: domain.to_string(),
			elapsed,
			success: true,
			error: None,
		}
	}

	pub fn failed(domain: &str, elapsed: Duration, cause: impl fmt::Display) -> Self {
		ProbeOutcome {
			domain: domain.to_string(),
			elapsed,
			success: false,
			error: Some(format!("{}: {}", domain, cause)),
		}
	}
}

/// Classification of a resolver's probe outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	/// Every probe succeeded
	Ok,
	/// Some but not all probes succeeded
	Partial,
	/// No probe succeeded
	Failed,
}

impl Status {
	pub fn as_str(&self) -> &'static str {
		match self {
			Status::Ok => "OK",
			Status::Partial => "PARTIAL",
			Status::Failed => "FAILED",
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Aggregate over all probes of one resolver.
///
/// `avg_latency` is the mean over successful probes only and is zero when
/// none succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSummary {
	pub address: String,
	pub avg_latency: Duration,
	/// Percentage of successful probes, 0 to 100 inclusive
	pub success_rate: f64,
	pub status: Status,
	/// Up to three failure causes joined by "; "
	pub error: Option<String>,
	pub total_probes: usize,
	pub successful_probes: usize,
}

impl ResolverSummary {
	pub fn is_failed(&self) -> bool {
		self.status == Status::Failed
	}

	pub fn avg_latency_ms(&self) -> f64 {
		self.avg_latency.as_secs_f64() * 1000.0
	}
}

/// Outcome of a selection decision.
///
/// `index` points into the caller's candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
	pub address: String,
	pub index: usize,
	pub switched: bool,
}
