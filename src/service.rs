//! Rotation service.
//!
//! Holds which resolver is in use and periodically decides whether to move
//! on to the next candidate. Writing the choice to the operating system is
//! delegated to an `Applier`.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bench::Engine;
use crate::error::{ApplyError, ServiceError};
use crate::policy::{compare, select_best};
use crate::probe::Lookup;
use crate::progress::ProgressSink;
use crate::types::Selection;

/// Rotation interval used in debug mode
pub const DEBUG_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted rotation interval, in minutes (366 days)
pub const MAX_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

pub const MAX_INTERVAL: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

/// Writes the chosen resolver into the system configuration.
pub trait Applier: Send + Sync {
	fn apply(&self, address: &str) -> Result<(), ApplyError>;

	/// Hand DNS back to automatic configuration when the service stops
	fn restore(&self) -> Result<(), ApplyError> {
		Ok(())
	}
}

/// Narrates what would be applied without touching the system.
pub struct DryRunApplier {
	sink: Arc<dyn ProgressSink>,
}

impl DryRunApplier {
	pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
		DryRunApplier { sink }
	}
}

impl Applier for DryRunApplier {
	fn apply(&self, address: &str) -> Result<(), ApplyError> {
		self.sink.report(&format!("[dry run] would set system DNS to {}", address));
		Ok(())
	}

	fn restore(&self) -> Result<(), ApplyError> {
		self.sink.report("[dry run] would restore automatic DNS");
		Ok(())
	}
}

/// Mutable service state, shared behind a mutex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceState {
	pub running: bool,
	/// Address and candidate index currently applied
	pub current: Option<(String, usize)>,
	pub next_change: Option<SystemTime>,
}

/// Options for the rotator.
#[derive(Debug, Clone)]
pub struct RotatorOptions {
	pub interval: Duration,
	/// Shorten the interval to `DEBUG_INTERVAL`
	pub debug: bool,
	/// Pick the starting resolver with best-of-all instead of index 0
	pub best_first: bool,
}

impl RotatorOptions {
	/// Interval actually used, capped at `MAX_INTERVAL`
	pub fn effective_interval(&self) -> Duration {
		if self.debug {
			DEBUG_INTERVAL
		} else {
			self.interval.min(MAX_INTERVAL)
		}
	}
}

/// Orchestrates selection and application over a fixed candidate list.
pub struct Rotator<L, A> {
	engine: Engine<L>,
	applier: A,
	candidates: Arc<[String]>,
	domains: Arc<[String]>,
	options: RotatorOptions,
	state: Mutex<ServiceState>,
	sink: Arc<dyn ProgressSink>,
}

impl<L: Lookup, A: Applier> Rotator<L, A> {
	pub fn new(
		engine: Engine<L>,
		applier: A,
		candidates: Vec<String>,
		domains: Vec<String>,
		options: RotatorOptions,
		sink: Arc<dyn ProgressSink>,
	) -> Self {
		Rotator {
			engine,
			applier,
			candidates: candidates.into(),
			domains: domains.into(),
			options,
			state: Mutex::new(ServiceState::default()),
			sink,
		}
	}

	pub fn snapshot(&self) -> ServiceState {
		self.state.lock().clone()
	}

	/// Apply `address` and record it as current.
	fn apply(&self, address: &str, index: usize) -> Result<(), ServiceError> {
		self.applier.apply(address)?;
		let next_change = SystemTime::now().checked_add(self.options.effective_interval());
		let mut state = self.state.lock();
		state.current = Some((address.to_string(), index));
		state.next_change = next_change;
		debug!(address, index, "applied resolver");
		Ok(())
	}

	/// Move to a new resolver or confirm the current one.
	///
	/// With nothing applied yet the first candidate is applied untested.
	/// `force` skips testing and advances to the next candidate; otherwise
	/// the current and next candidates are compared and the winner applied.
	pub async fn change_dns(&self, force: bool) -> Result<Selection, ServiceError> {
		let len = self.candidates.len();
		if len == 0 {
			return Err(ServiceError::NoCandidates);
		}

		let current_index = self.state.lock().current.as_ref().map(|(_, i)| *i);
		let current_index = match current_index {
			Some(i) if i < len => i,
			_ => {
				let address = &self.candidates[0];
				self.apply(address, 0)?;
				return Ok(Selection { address: address.clone(), index: 0, switched: true });
			}
		};

		let current = &self.candidates[current_index];
		let next_index = (current_index + 1) % len;
		let next = &self.candidates[next_index];

		if force {
			self.sink.report(&format!("Force changing DNS from {} to {}", current, next));
			self.apply(next, next_index)?;
			return Ok(Selection { address: next.clone(), index: next_index, switched: true });
		}

		let selection = compare(
			&self.engine,
			(current.as_str(), current_index),
			(next.as_str(), next_index),
			&self.domains,
			self.sink.as_ref(),
		).await;

		if selection.switched {
			self.sink.report(&format!(
				"Switching from {} to {} (better performance)",
				current, selection.address,
			));
		} else {
			self.sink.report(&format!(
				"Keeping current DNS ({}) - it performs better than next DNS ({})",
				current, next,
			));
		}
		// The current resolver is re-applied when kept so the system stays in sync
		self.apply(&selection.address, selection.index)?;
		Ok(selection)
	}

	/// Run best-of-all over every candidate and apply the winner.
	pub async fn apply_best(&self) -> Result<Selection, ServiceError> {
		let selection = select_best(&self.engine, &self.candidates, &self.domains, self.sink.as_ref())
			.await
			.ok_or(ServiceError::NoCandidates)?;
		self.apply(&selection.address, selection.index)?;
		Ok(selection)
	}

	/// Rotate until `shutdown` flips to true or its sender is dropped.
	///
	/// Failures of a single rotation are reported and the loop carries on.
	/// On exit the applier is asked to restore automatic DNS.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServiceError> {
		if self.candidates.is_empty() {
			return Err(ServiceError::NoCandidates);
		}
		let period = self.options.effective_interval();
		if period.is_zero() {
			return Err(ServiceError::ZeroInterval);
		}
		self.state.lock().running = true;
		self.sink.report("Service started");

		let initial = if self.options.best_first {
			self.apply_best().await
		} else {
			self.change_dns(false).await
		};
		self.report_result(initial);

		let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					let result = self.change_dns(false).await;
					self.report_result(result);
				}
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						break;
					}
				}
			}
		}

		{
			let mut state = self.state.lock();
			state.running = false;
			state.next_change = None;
		}
		match self.applier.restore() {
			Ok(()) => self.sink.report("DNS restored to automatic (DHCP)"),
			Err(e) => self.sink.report(&format!("ERROR: Failed to restore DNS: {}", e)),
		}
		self.sink.report("Service stopped");
		Ok(())
	}

	fn report_result(&self, result: Result<Selection, ServiceError>) {
		match result {
			Ok(selection) => self.sink.report(&format!(
				"DNS changed to {} (index {})",
				selection.address, selection.index,
			)),
			Err(e) => {
				warn!(error = %e, "rotation failed");
				self.sink.report(&format!("ERROR: {}", e));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::fake::{FakeLookup, Reply};
	use crate::progress::LogBuffer;

	/// Records every applied address
	#[derive(Default)]
	struct RecordingApplier {
		applied: Mutex<Vec<String>>,
		restored: Mutex<bool>,
		fail: bool,
	}

	impl Applier for Arc<RecordingApplier> {
		fn apply(&self, address: &str) -> Result<(), ApplyError> {
			if self.fail {
				return Err(ApplyError {
					address: address.to_string(),
					reason: "permission denied".to_string(),
				});
			}
			self.applied.lock().push(address.to_string());
			Ok(())
		}

		fn restore(&self) -> Result<(), ApplyError> {
			*self.restored.lock() = true;
			Ok(())
		}
	}

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	fn options() -> RotatorOptions {
		RotatorOptions { interval: Duration::from_secs(3600), debug: false, best_first: false }
	}

	fn rotator(
		lookup: FakeLookup,
		candidates: &[&str],
		options: RotatorOptions,
	) -> (Rotator<FakeLookup, Arc<RecordingApplier>>, Arc<RecordingApplier>, Arc<LogBuffer>) {
		let applier = Arc::new(RecordingApplier::default());
		let log = Arc::new(LogBuffer::default());
		let r = Rotator::new(
			Engine::new(lookup),
			Arc::clone(&applier),
			candidates.iter().map(|s| s.to_string()).collect(),
			Vec::new(),
			options,
			log.clone(),
		);
		(r, applier, log)
	}

	fn fast_and_slow() -> FakeLookup {
		FakeLookup::new()
			.resolver("1.1.1.1", Reply::Answer(ms(100)))
			.resolver("1.0.0.1", Reply::Answer(ms(40)))
			.resolver("9.9.9.9", Reply::Answer(ms(95)))
	}

	#[tokio::test(start_paused = true)]
	async fn test_empty_candidates() {
		let (r, _, _) = rotator(FakeLookup::new(), &[], options());
		assert!(matches!(r.change_dns(false).await, Err(ServiceError::NoCandidates)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_first_change_applies_first_untested() {
		let lookup = fast_and_slow();
		let (r, applier, _) = rotator(lookup, &["1.1.1.1", "1.0.0.1", "9.9.9.9"], options());
		let selection = r.change_dns(false).await.unwrap();
		assert_eq!(selection.index, 0);
		assert_eq!(r.engine_calls(), 0);
		assert_eq!(*applier.applied.lock(), vec!["1.1.1.1"]);
		let state = r.snapshot();
		assert_eq!(state.current, Some(("1.1.1.1".to_string(), 0)));
		assert!(state.next_change.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn test_smart_change_switches_to_faster_next() {
		let (r, applier, log) = rotator(fast_and_slow(), &["1.1.1.1", "1.0.0.1", "9.9.9.9"], options());
		r.change_dns(false).await.unwrap();
		let selection = r.change_dns(false).await.unwrap();
		assert_eq!(selection, Selection { address: "1.0.0.1".to_string(), index: 1, switched: true });
		assert_eq!(*applier.applied.lock(), vec!["1.1.1.1", "1.0.0.1"]);
		assert!(log.lines().iter().any(|l| l == "Switching from 1.1.1.1 to 1.0.0.1 (better performance)"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_smart_change_keeps_and_reapplies_current() {
		let (r, applier, _) = rotator(fast_and_slow(), &["1.1.1.1", "1.0.0.1", "9.9.9.9"], options());
		r.change_dns(false).await.unwrap();
		r.change_dns(false).await.unwrap();
		// 1.0.0.1 at 40 ms vs 9.9.9.9 at 95 ms: keep
		let selection = r.change_dns(false).await.unwrap();
		assert!(!selection.switched);
		assert_eq!(selection.index, 1);
		assert_eq!(*applier.applied.lock(), vec!["1.1.1.1", "1.0.0.1", "1.0.0.1"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_force_change_wraps_around() {
		let (r, applier, _) = rotator(fast_and_slow(), &["1.1.1.1", "9.9.9.9"], options());
		r.change_dns(true).await.unwrap();
		assert_eq!(r.change_dns(true).await.unwrap().index, 1);
		assert_eq!(r.change_dns(true).await.unwrap().index, 0);
		assert_eq!(*applier.applied.lock(), vec!["1.1.1.1", "9.9.9.9", "1.1.1.1"]);
		assert_eq!(r.engine_calls(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_apply_failure_leaves_state_untouched() {
		let log = Arc::new(LogBuffer::default());
		let applier = Arc::new(RecordingApplier { fail: true, ..Default::default() });
		let r = Rotator::new(
			Engine::new(fast_and_slow()),
			applier,
			vec!["1.1.1.1".to_string()],
			Vec::new(),
			options(),
			log,
		);
		assert!(matches!(r.change_dns(false).await, Err(ServiceError::Apply(_))));
		assert_eq!(r.snapshot().current, None);
	}

	#[tokio::test(start_paused = true)]
	async fn test_apply_best_picks_fastest() {
		let (r, applier, _) = rotator(fast_and_slow(), &["1.1.1.1", "1.0.0.1", "9.9.9.9"], options());
		let selection = r.apply_best().await.unwrap();
		assert_eq!(selection.index, 1);
		assert_eq!(*applier.applied.lock(), vec!["1.0.0.1"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_rotates_until_shutdown() {
		let opts = RotatorOptions { interval: Duration::from_secs(60), debug: false, best_first: true };
		let (r, applier, log) = rotator(fast_and_slow(), &["1.1.1.1", "1.0.0.1", "9.9.9.9"], opts);
		let (tx, rx) = watch::channel(false);
		let r = Arc::new(r);
		let runner = Arc::clone(&r);
		let handle = tokio::spawn(async move { runner.run(rx).await });

		// Initial best-of-all plus two ticks
		tokio::time::sleep(Duration::from_secs(150)).await;
		assert!(r.snapshot().running);
		tx.send(true).unwrap();
		handle.await.unwrap().unwrap();

		let state = r.snapshot();
		assert!(!state.running);
		assert!(*applier.restored.lock());
		// best -> 1.0.0.1, then 1.0.0.1 vs 9.9.9.9 keeps twice
		assert_eq!(*applier.applied.lock(), vec!["1.0.0.1", "1.0.0.1", "1.0.0.1"]);
		let lines = log.lines();
		assert_eq!(lines.first().map(String::as_str), Some("Service started"));
		assert_eq!(lines.last().map(String::as_str), Some("Service stopped"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_rejects_zero_interval() {
		let opts = RotatorOptions { interval: Duration::ZERO, debug: false, best_first: false };
		let (r, applier, _) = rotator(fast_and_slow(), &["1.1.1.1", "9.9.9.9"], opts);
		let (_tx, rx) = watch::channel(false);
		assert!(matches!(r.run(rx).await, Err(ServiceError::ZeroInterval)));
		assert!(applier.applied.lock().is_empty());
		assert!(!r.snapshot().running);
	}

	#[tokio::test(start_paused = true)]
	async fn test_huge_interval_is_capped() {
		let opts = RotatorOptions { interval: Duration::MAX, debug: false, best_first: false };
		assert_eq!(opts.effective_interval(), MAX_INTERVAL);
		let (r, _, _) = rotator(fast_and_slow(), &["1.1.1.1"], opts);
		r.change_dns(false).await.unwrap();
		assert!(r.snapshot().next_change.is_some());
	}

	#[test]
	fn test_debug_interval() {
		let opts = RotatorOptions { interval: Duration::from_secs(3600), debug: true, best_first: false };
		assert_eq!(opts.effective_interval(), DEBUG_INTERVAL);
	}

	impl<A: Applier> Rotator<FakeLookup, A> {
		fn engine_calls(&self) -> usize {
			self.engine.lookup().calls()
		}
	}
}
