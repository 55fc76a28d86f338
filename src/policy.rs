//! Resolver selection policies.
//!
//! Both policies are split into a pure decision over summaries and an async
//! driver that benchmarks, narrates and then decides. Best-of-all is the
//! canonical policy; pairwise compare is the rotation mode and keeps its own
//! thresholds.

use std::cmp::Ordering;
use std::time::Duration;

use crate::bench::{summary_line, Engine};
use crate::probe::Lookup;
use crate::progress::ProgressSink;
use crate::types::{ResolverSummary, Selection, Status, SELECTION_TIMEOUT};

/// Success rate separating usable from unreliable resolvers
pub const RELIABLE_RATE: f64 = 50.0;

/// Success-rate margin within which best-of-all compares latency instead
pub const RATE_MARGIN: f64 = 10.0;

/// Percentage by which the next resolver must be faster to be switched to
pub const MIN_IMPROVEMENT_PCT: f64 = 20.0;

/// Result of ranking a list of summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct BestDecision {
	pub index: usize,
	/// Every candidate failed and the first one was taken
	pub fallback: bool,
	pub rationale: String,
}

/// Result of comparing the current resolver against the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchDecision {
	pub switch: bool,
	pub rationale: String,
}

/// Whether `candidate` should replace the running best.
///
/// Rules are evaluated in order and the first match decides.
fn replaces_best(best: &ResolverSummary, candidate: &ResolverSummary) -> bool {
	let best_rate = best.success_rate;
	let rate = candidate.success_rate;

	if best_rate >= RELIABLE_RATE && rate < RELIABLE_RATE {
		false
	} else if best_rate < RELIABLE_RATE && rate >= RELIABLE_RATE {
		true
	} else if rate > best_rate + RATE_MARGIN {
		true
	} else if rate >= best_rate - RATE_MARGIN && !candidate.avg_latency.is_zero() {
		candidate.avg_latency < best.avg_latency
	} else {
		false
	}
}

/// Pick the best of `summaries`, scanning in order.
///
/// FAILED summaries never take part. Returns `None` for an empty slice and
/// index 0 flagged as a fallback when every summary failed.
pub fn pick_best(summaries: &[ResolverSummary]) -> Option<BestDecision> {
	if summaries.is_empty() {
		return None;
	}

	let mut best: Option<usize> = None;
	for (i, candidate) in summaries.iter().enumerate() {
		if candidate.is_failed() {
			continue;
		}
		best = match best {
			None => Some(i),
			Some(b) if replaces_best(&summaries[b], candidate) => Some(i),
			keep => keep,
		};
	}

	Some(match best {
		Some(index) => {
			let s = &summaries[index];
			BestDecision {
				index,
				fallback: false,
				rationale: format!(
					"Best DNS selected: {} (latency: {:?}, success rate: {:.1}%)",
					s.address, s.avg_latency, s.success_rate,
				),
			}
		}
		None => BestDecision {
			index: 0,
			fallback: true,
			rationale: "Warning: All DNS servers failed testing, using first DNS as fallback".to_string(),
		},
	})
}

/// Decide whether to move from `current` to `next`.
pub fn decide_switch(current: &ResolverSummary, next: &ResolverSummary) -> SwitchDecision {
	let decide = |switch: bool, rationale: String| SwitchDecision { switch, rationale };

	if current.is_failed() && !next.is_failed() {
		return decide(true, "Current DNS failed, switching to next DNS".to_string());
	}
	if next.is_failed() {
		return decide(false, "Next DNS failed, keeping current DNS".to_string());
	}
	if current.success_rate < RELIABLE_RATE && next.success_rate > current.success_rate {
		return decide(true, format!(
			"Current DNS has low success rate ({:.1}%), next DNS is better ({:.1}%)",
			current.success_rate, next.success_rate,
		));
	}
	if !current.avg_latency.is_zero() && !next.avg_latency.is_zero() {
		let improvement = latency_improvement(current.avg_latency, next.avg_latency);
		if improvement > MIN_IMPROVEMENT_PCT {
			return decide(true, format!(
				"Next DNS is {:.1}% faster ({:?} vs {:?}), switching",
				improvement, next.avg_latency, current.avg_latency,
			));
		}
		return decide(false, format!(
			"Next DNS is not significantly faster ({:.1}% improvement, need more than {:.0}%), keeping current DNS",
			improvement, MIN_IMPROVEMENT_PCT,
		));
	}
	decide(false, "Cannot compare latencies, keeping current DNS".to_string())
}

/// Percentage by which `next` is faster than `current`; negative when slower.
pub fn latency_improvement(current: Duration, next: Duration) -> f64 {
	let cur = current.as_nanos() as f64;
	(cur - next.as_nanos() as f64) * 100.0 / cur
}

/// Ordering used for display: working resolvers first, fastest first.
pub fn display_order(a: &ResolverSummary, b: &ResolverSummary) -> Ordering {
	match (a.status == Status::Failed, b.status == Status::Failed) {
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		_ => a.avg_latency.cmp(&b.avg_latency),
	}
}

/// Benchmark every candidate and choose the best one.
///
/// Returns `None` only when `candidates` is empty.
pub async fn select_best<L: Lookup>(
	engine: &Engine<L>,
	candidates: &[String],
	domains: &[String],
	sink: &dyn ProgressSink,
) -> Option<Selection> {
	if candidates.is_empty() {
		return None;
	}

	sink.report(&format!(
		"Testing all {} DNS servers to find the best one...",
		candidates.len(),
	));
	let mut summaries = Vec::with_capacity(candidates.len());
	for (i, address) in candidates.iter().enumerate() {
		let summary = engine.benchmark(address, domains, SELECTION_TIMEOUT).await;
		sink.report(&summary_line(i, candidates.len(), &summary));
		if summary.is_failed() {
			sink.report(&format!(
				"  Skipping {}: {}",
				address, summary.error.as_deref().unwrap_or("failed"),
			));
		}
		summaries.push(summary);
	}

	let decision = pick_best(&summaries)?;
	sink.report(&decision.rationale);
	Some(Selection {
		address: candidates[decision.index].clone(),
		index: decision.index,
		switched: false,
	})
}

/// Benchmark `current` and `next` and decide whether to switch.
pub async fn compare<L: Lookup>(
	engine: &Engine<L>,
	current: (&str, usize),
	next: (&str, usize),
	domains: &[String],
	sink: &dyn ProgressSink,
) -> Selection {
	let (current_addr, current_index) = current;
	let (next_addr, next_index) = next;

	sink.report(&format!(
		"Testing current DNS ({}) vs next DNS ({})...",
		current_addr, next_addr,
	));
	let (cur, nxt) = tokio::join!(
		engine.benchmark(current_addr, domains, SELECTION_TIMEOUT),
		engine.benchmark(next_addr, domains, SELECTION_TIMEOUT),
	);
	for (role, s) in [("Current", &cur), ("Next", &nxt)] {
		sink.report(&format!(
			"{} DNS ({}): Avg latency {:?}, Success rate {:.1}%, Status: {}",
			role, s.address, s.avg_latency, s.success_rate, s.status,
		));
	}

	let decision = decide_switch(&cur, &nxt);
	sink.report(&decision.rationale);
	if decision.switch {
		Selection { address: next_addr.to_string(), index: next_index, switched: true }
	} else {
		Selection { address: current_addr.to_string(), index: current_index, switched: false }
	}
}
