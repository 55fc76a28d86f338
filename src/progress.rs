//! Narration sinks.
//!
//! The engine reports what it is doing as plain text lines. A sink only
//! records or forwards them; it cannot fail and never blocks on I/O.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Lines retained by a `LogBuffer` unless told otherwise
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Fire-and-forget receiver of progress lines.
pub trait ProgressSink: Send + Sync {
	fn report(&self, line: &str);
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
	fn report(&self, line: &str) {
		(**self).report(line)
	}
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
	fn report(&self, line: &str) {
		(**self).report(line)
	}
}

/// Emits every line as an INFO event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
	fn report(&self, line: &str) {
		info!(target: "alternate_dns::progress", "{}", line);
	}
}

/// Bounded in-memory log, oldest lines dropped first.
#[derive(Debug)]
pub struct LogBuffer {
	lines: Mutex<VecDeque<String>>,
	max_lines: usize,
}

impl LogBuffer {
	pub fn with_capacity(max_lines: usize) -> Self {
		LogBuffer {
			lines: Mutex::new(VecDeque::with_capacity(max_lines.min(64))),
			max_lines: max_lines.max(1),
		}
	}

	/// Snapshot of the retained lines, oldest first
	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().iter().cloned().collect()
	}

	pub fn clear(&self) {
		self.lines.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.lines.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for LogBuffer {
	fn default() -> Self {
		LogBuffer::with_capacity(DEFAULT_MAX_LINES)
	}
}

impl ProgressSink for LogBuffer {
	fn report(&self, line: &str) {
		let mut lines = self.lines.lock();
		lines.push_back(line.to_string());
		while lines.len() > self.max_lines {
			lines.pop_front();
		}
	}
}

/// Forwards each line to two sinks in turn.
pub struct Tee<A, B>(pub A, pub B);

impl<A: ProgressSink, B: ProgressSink> ProgressSink for Tee<A, B> {
	fn report(&self, line: &str) {
		self.0.report(line);
		self.1.report(line);
	}
}
