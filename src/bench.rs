use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::warn;

use crate::domains::effective_domains;
use crate::probe::{probe, Lookup};
use crate::progress::ProgressSink;
use crate::stats::summarize;
use crate::types::{ProbeOutcome, ResolverSummary};

/// Benchmarking front end over a shared lookup primitive.
pub struct Engine<L> {
	lookup: Arc<L>,
}

impl<L> Clone for Engine<L> {
	fn clone(&self) -> Self {
		Engine { lookup: Arc::clone(&self.lookup) }
	}
}

impl<L: Lookup> Engine<L> {
	pub fn new(lookup: L) -> Self {
		Engine { lookup: Arc::new(lookup) }
	}

	pub fn lookup(&self) -> &L {
		&self.lookup
	}

	/// Probe `address` once per domain and summarize the outcomes.
	///
	/// An empty domain list is replaced by the default set. Probes run
	/// concurrently, each bounded by `timeout`; aggregation waits for all of
	/// them. Dropping the returned future aborts every in-flight probe.
	pub async fn benchmark(
		&self,
		address: &str,
		domains: &[String],
		timeout: Duration,
	) -> ResolverSummary {
		let domains = effective_domains(domains);

		let mut set = JoinSet::new();
		for (i, domain) in domains.iter().enumerate() {
			let lookup = Arc::clone(&self.lookup);
			let address = address.to_string();
			let domain = domain.clone();
			set.spawn(async move {
				(i, probe(&*lookup, &address, &domain, timeout).await)
			});
		}

		let mut slots: Vec<Option<ProbeOutcome>> = vec![None; domains.len()];
		while let Some(joined) = set.join_next().await {
			match joined {
				Ok((i, outcome)) => slots[i] = Some(outcome),
				Err(e) => warn!(address, error = %e, "probe task failed"),
			}
		}

		// A probe task that died without reporting counts as a failure
		let outcomes: Vec<ProbeOutcome> = slots.into_iter()
			.zip(&domains)
			.map(|(slot, domain)| {
				slot.unwrap_or_else(|| ProbeOutcome::failed(domain, Duration::ZERO, "probe task aborted"))
			})
			.collect();

		summarize(address, &outcomes)
	}

	/// Benchmark every candidate in list order, narrating each summary.
	pub async fn benchmark_all(
		&self,
		candidates: &[String],
		domains: &[String],
		timeout: Duration,
		sink: &dyn ProgressSink,
	) -> Vec<ResolverSummary> {
		let mut summaries = Vec::with_capacity(candidates.len());
		for (i, address) in candidates.iter().enumerate() {
			let summary = self.benchmark(address, domains, timeout).await;
			sink.report(&summary_line(i, candidates.len(), &summary));
			summaries.push(summary);
		}
		summaries
	}
}

/// One line of narration for candidate `i` of `n`
pub(crate) fn summary_line(i: usize, n: usize, summary: &ResolverSummary) -> String {
	format!(
		"DNS {}/{} ({}): Avg latency {:?}, Success rate {:.1}%, Status: {}",
		i + 1, n, summary.address,
		summary.avg_latency, summary.success_rate, summary.status,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domains::default_probe_domains;
	use crate::probe::fake::{FakeLookup, Reply};
	use crate::progress::LogBuffer;
	use crate::types::Status;

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	fn domains(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_domains_use_defaults() {
		let engine = Engine::new(FakeLookup::new().resolver("1.1.1.1", Reply::Answer(ms(10))));
		let summary = engine.benchmark("1.1.1.1", &[], ms(3000)).await;
		assert_eq!(summary.total_probes, 5);
		assert_eq!(summary.successful_probes, 5);
		assert_eq!(summary.status, Status::Ok);
		assert_eq!(engine.lookup.calls(), default_probe_domains().len());
	}

	#[tokio::test(start_paused = true)]
	async fn test_mixed_outcomes_are_attributed_per_domain() {
		let lookup = FakeLookup::new()
			.resolver("9.9.9.9", Reply::Answer(ms(10)))
			.domain("9.9.9.9", "b.com", Reply::Fail(ms(1), "SERVFAIL"))
			.domain("9.9.9.9", "d.com", Reply::Hang);
		let engine = Engine::new(lookup);
		let summary = engine
			.benchmark("9.9.9.9", &domains(&["a.com", "b.com", "c.com", "d.com"]), ms(500))
			.await;
		assert_eq!(summary.status, Status::Partial);
		assert_eq!(summary.successful_probes, 2);
		assert_eq!(summary.success_rate, 50.0);
		// The hung probe's 500 ms never reaches the mean
		assert!(summary.avg_latency < ms(15));
		let error = summary.error.unwrap();
		assert!(error.starts_with("b.com: SERVFAIL; d.com: timed out"), "{}", error);
	}

	#[tokio::test(start_paused = true)]
	async fn test_probes_run_concurrently() {
		let engine = Engine::new(FakeLookup::new().resolver("1.1.1.1", Reply::Hang));
		let start = tokio::time::Instant::now();
		let summary = engine.benchmark("1.1.1.1", &default_probe_domains(), ms(1000)).await;
		// Five hung probes finish together at one timeout, not five
		assert!(start.elapsed() < ms(2000));
		assert_eq!(summary.status, Status::Failed);
		assert_eq!(summary.avg_latency, Duration::ZERO);
		assert_eq!(summary.success_rate, 0.0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unreachable_resolver_is_failed_summary() {
		// Unknown resolver: the fake refuses every query
		let engine = Engine::new(FakeLookup::new());
		let summary = engine.benchmark("203.0.113.9", &domains(&["a.com", "b.com"]), ms(100)).await;
		assert_eq!(summary.status, Status::Failed);
		assert_eq!(
			summary.error.as_deref(),
			Some("a.com: connection refused; b.com: connection refused"),
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_benchmark_all_keeps_order_and_narrates() {
		let engine = Engine::new(FakeLookup::new()
			.resolver("1.1.1.1", Reply::Answer(ms(20)))
			.resolver("9.9.9.9", Reply::Answer(ms(15))));
		let sink = LogBuffer::default();
		let candidates = domains(&["1.1.1.1", "10.9.9.9", "9.9.9.9"]);
		let summaries = engine.benchmark_all(&candidates, &[], ms(3000), &sink).await;
		let order: Vec<&str> = summaries.iter().map(|s| s.address.as_str()).collect();
		assert_eq!(order, vec!["1.1.1.1", "10.9.9.9", "9.9.9.9"]);
		let lines = sink.lines();
		assert_eq!(lines.len(), 3);
		assert!(lines[1].starts_with("DNS 2/3 (10.9.9.9)"));
		assert!(lines[1].ends_with("Status: FAILED"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancelled_benchmark_aborts_probes() {
		let engine = Engine::new(FakeLookup::new().resolver("1.1.1.1", Reply::Hang));
		let result = tokio::time::timeout(
			ms(50),
			engine.benchmark("1.1.1.1", &default_probe_domains(), Duration::from_secs(60)),
		).await;
		assert!(result.is_err());
		// Dropping the benchmark dropped the JoinSet and with it every probe
		for _ in 0..10 {
			if Arc::strong_count(&engine.lookup) == 1 {
				break;
			}
			tokio::task::yield_now().await;
		}
		assert_eq!(Arc::strong_count(&engine.lookup), 1);
	}
}
