use std::time::Duration;

use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use hickory_resolver::config::{
	LookupIpStrategy, NameServerConfig, ResolveHosts, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::Resolver;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::debug;

use crate::error::LookupError;
use crate::probe::Lookup;
use crate::resolver::parse_resolver;

/// Stray datagrams tolerated on a probe socket before giving up
const MAX_STRAY_DATAGRAMS: usize = 3;

/// DNS response information extracted from a parsed message
#[derive(Debug)]
pub struct DnsResponse {
	pub rcode: ResponseCode,
	pub answer_count: usize,
}

/// Build a recursive DNS query message for the given domain and record type.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_query(domain: &str, record_type: RecordType, txid: u16) -> Result<Vec<u8>, LookupError> {
	let mut name = Name::from_ascii(domain)
		.map_err(|e| LookupError::InvalidName {
			domain: domain.to_string(),
			reason: e.to_string(),
		})?;
	// Absolute name so no search suffix is ever appended
	name.set_fqdn(true);

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, record_type));

	message.to_vec()
		.map_err(|e| LookupError::Malformed(format!("failed to serialize query: {}", e)))
}

/// Parse a DNS response, validating the transaction ID and extracting the rcode.
///
/// Returns an error if the response cannot be parsed or the txid does not match.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<DnsResponse, LookupError> {
	let message = Message::from_vec(bytes)
		.map_err(|e| LookupError::Malformed(e.to_string()))?;

	if message.id() != expected_txid {
		return Err(LookupError::Malformed(format!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		)));
	}

	// Verify this is a response, not a query
	if message.message_type() != MessageType::Response {
		return Err(LookupError::Malformed("received a query instead of a response".to_string()));
	}

	Ok(DnsResponse {
		rcode: message.response_code(),
		answer_count: message.answer_count() as usize,
	})
}

/// Classify a parsed response: NOERROR with at least one answer record.
pub fn check_answer(response: &DnsResponse) -> Result<(), LookupError> {
	if response.rcode != ResponseCode::NoError {
		return Err(LookupError::Rcode(response.rcode.to_string()));
	}
	if response.answer_count == 0 {
		return Err(LookupError::NoAnswer);
	}
	Ok(())
}

/// Sends one A query per probe over UDP straight to the resolver.
///
/// Each call binds a dedicated socket so concurrent probes never read each
/// other's responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpLookup;

impl Lookup for UdpLookup {
	async fn lookup(
		&self,
		resolver: &str,
		domain: &str,
		timeout: Duration,
	) -> Result<(), LookupError> {
		let addr = parse_resolver(resolver)
			.map_err(|_| LookupError::InvalidResolver(resolver.to_string()))?;
		let txid: u16 = rand::random();
		let query_bytes = build_query(domain, RecordType::A, txid)?;

		let bind_addr = if addr.is_ipv4() {
			"0.0.0.0:0"
		} else {
			"[::]:0"
		};
		let socket = UdpSocket::bind(bind_addr).await?;

		let start = Instant::now();
		socket.send_to(&query_bytes, addr).await?;

		// Use 4096-byte buffer to handle EDNS-extended responses
		let mut buf = vec![0u8; 4096];
		for _ in 0..=MAX_STRAY_DATAGRAMS {
			let remaining = match timeout.checked_sub(start.elapsed()) {
				Some(r) if !r.is_zero() => r,
				_ => return Err(LookupError::Timeout(timeout)),
			};

			let (len, src) = tokio::time::timeout(remaining, socket.recv_from(&mut buf))
				.await
				.map_err(|_| LookupError::Timeout(timeout))??;
			if src.ip() != addr.ip() {
				continue;
			}
			match parse_response(&buf[..len], txid) {
				Ok(response) => return check_answer(&response),
				// Late answer to someone else's query, keep listening
				Err(e) => debug!(resolver, error = %e, "ignoring stray datagram"),
			}
		}
		Err(LookupError::Malformed(format!(
			"gave up after {} stray datagrams",
			MAX_STRAY_DATAGRAMS + 1,
		)))
	}
}

/// Resolves through hickory-resolver pinned to the single target server.
///
/// Asks for both A and AAAA like a stub resolver would; caching, hosts file
/// and retries are disabled so every probe hits the wire once.
#[derive(Debug, Clone, Copy, Default)]
pub struct HickoryLookup;

impl HickoryLookup {
	fn build(resolver: &str, timeout: Duration) -> Result<Resolver<TokioConnectionProvider>, LookupError> {
		let addr = parse_resolver(resolver)
			.map_err(|_| LookupError::InvalidResolver(resolver.to_string()))?;

		let mut config = ResolverConfig::new();
		config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));

		let mut opts = ResolverOpts::default();
		opts.timeout = timeout;
		opts.attempts = 1;
		opts.ndots = 0;
		opts.use_hosts_file = ResolveHosts::Never;
		opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

		Ok(Resolver::builder_with_config(config, TokioConnectionProvider::default())
			.with_options(opts)
			.build())
	}
}

impl Lookup for HickoryLookup {
	async fn lookup(
		&self,
		resolver: &str,
		domain: &str,
		timeout: Duration,
	) -> Result<(), LookupError> {
		let client = Self::build(resolver, timeout)?;
		let fqdn = if domain.ends_with('.') {
			domain.to_string()
		} else {
			format!("{}.", domain)
		};
		let response = client.lookup_ip(fqdn.as_str())
			.await
			.map_err(|e| LookupError::Resolve(e.to_string()))?;
		if response.iter().next().is_none() {
			return Err(LookupError::NoAnswer);
		}
		Ok(())
	}
}
