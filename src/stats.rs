use std::time::Duration;

use crate::types::{ProbeOutcome, ResolverSummary, Status};

/// Maximum number of failure causes carried in a summary
const MAX_SAMPLE_ERRORS: usize = 3;

/// Calculate the arithmetic mean of a slice of durations.
pub fn mean(values: &[Duration]) -> Option<Duration> {
	if values.is_empty() {
		return None;
	}
	let total: Duration = values.iter().sum();
	Some(total / values.len() as u32)
}

/// Percentage of successes, 0.0 when nothing was attempted.
pub fn success_rate(successes: usize, total: usize) -> f64 {
	if total == 0 {
		return 0.0;
	}
	(successes as f64 / total as f64) * 100.0
}

/// Fold probe outcomes for one resolver into a summary.
///
/// Failed probes count toward the total but never toward the latency mean.
/// Outcomes are expected in domain order so the sampled errors are the
/// first failures encountered.
pub fn summarize(address: &str, outcomes: &[ProbeOutcome]) -> ResolverSummary {
	let total = outcomes.len();
	let latencies: Vec<Duration> = outcomes.iter()
		.filter(|o| o.success)
		.map(|o| o.elapsed)
		.collect();
	let successes = latencies.len();

	let causes: Vec<&str> = outcomes.iter()
		.filter(|o| !o.success)
		.filter_map(|o| o.error.as_deref())
		.take(MAX_SAMPLE_ERRORS)
		.collect();
	let joined = if causes.is_empty() {
		None
	} else {
		Some(causes.join("; "))
	};

	if successes == 0 {
		return ResolverSummary {
			address: address.to_string(),
			avg_latency: Duration::ZERO,
			success_rate: 0.0,
			status: Status::Failed,
			error: Some(joined.unwrap_or_else(|| "failed to resolve any domains".to_string())),
			total_probes: total,
			successful_probes: 0,
		};
	}

	let status = if successes == total {
		Status::Ok
	} else {
		Status::Partial
	};

	ResolverSummary {
		address: address.to_string(),
		avg_latency: mean(&latencies).unwrap_or(Duration::ZERO),
		success_rate: success_rate(successes, total),
		status,
		error: joined,
		total_probes: total,
		successful_probes: successes,
	}
}
