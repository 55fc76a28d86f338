use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::domains::FALLBACK_DOMAIN;
use crate::error::LookupError;
use crate::types::ProbeOutcome;

/// A name-resolution primitive aimed at one explicit resolver.
///
/// Implementations perform a single query against `resolver` (an IP literal,
/// port 53 when absent) and must not fall back to the system resolver chain.
/// They should not retry; the caller bounds the whole attempt by `timeout`.
pub trait Lookup: Send + Sync + 'static {
	fn lookup(
		&self,
		resolver: &str,
		domain: &str,
		timeout: Duration,
	) -> impl Future<Output = Result<(), LookupError>> + Send;
}

/// Resolve one domain through one resolver within `timeout`.
///
/// Never fails: timeouts and resolution errors come back as an unsuccessful
/// outcome carrying the cause.
pub async fn probe<L: Lookup>(
	lookup: &L,
	resolver: &str,
	domain: &str,
	timeout: Duration,
) -> ProbeOutcome {
	let domain = if domain.trim().is_empty() {
		FALLBACK_DOMAIN
	} else {
		domain
	};

	let start = Instant::now();
	let result = match tokio::time::timeout(timeout, lookup.lookup(resolver, domain, timeout)).await {
		Ok(result) => result,
		Err(_) => Err(LookupError::Timeout(timeout)),
	};
	let elapsed = start.elapsed();

	match result {
		Ok(()) => {
			debug!(resolver, domain, ?elapsed, "probe succeeded");
			ProbeOutcome::succeeded(domain, elapsed)
		}
		Err(e) => {
			debug!(resolver, domain, ?elapsed, error = %e, "probe failed");
			ProbeOutcome::failed(domain, elapsed, e)
		}
	}
}


#[cfg(test)]
mod tests {
	use super::fake::{FakeLookup, Reply};
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn test_probe_success_measures_elapsed() {
		let lookup = FakeLookup::new()
			.resolver("1.1.1.1", Reply::Answer(Duration::from_millis(20)));
		let outcome = probe(&lookup, "1.1.1.1", "example.com", Duration::from_secs(3)).await;
		assert!(outcome.success);
		assert!(outcome.elapsed >= Duration::from_millis(20));
		assert!(outcome.elapsed < Duration::from_millis(25));
		assert!(outcome.error.is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_probe_failure_carries_cause() {
		let lookup = FakeLookup::new()
			.resolver("1.1.1.1", Reply::Fail(Duration::from_millis(5), "NXDomain"));
		let outcome = probe(&lookup, "1.1.1.1", "nope.example", Duration::from_secs(3)).await;
		assert!(!outcome.success);
		assert_eq!(outcome.error.as_deref(), Some("nope.example: NXDomain"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_probe_timeout_bounds_attempt() {
		let lookup = FakeLookup::new().resolver("10.0.0.1", Reply::Hang);
		let timeout = Duration::from_millis(300);
		let outcome = probe(&lookup, "10.0.0.1", "example.com", timeout).await;
		assert!(!outcome.success);
		assert!(outcome.elapsed >= timeout);
		assert!(outcome.elapsed < timeout + Duration::from_millis(5));
		assert!(outcome.error.unwrap().contains("timed out"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_probe_empty_domain_uses_fallback() {
		let lookup = FakeLookup::new()
			.resolver("1.1.1.1", Reply::Fail(Duration::ZERO, "refused"))
			.domain("1.1.1.1", FALLBACK_DOMAIN, Reply::Answer(Duration::from_millis(1)));
		let outcome = probe(&lookup, "1.1.1.1", "", Duration::from_secs(1)).await;
		assert!(outcome.success);
		assert_eq!(outcome.domain, FALLBACK_DOMAIN);
	}
}
