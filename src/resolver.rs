use std::net::{IpAddr, SocketAddr};

use crate::error::ResolverError;

/// Port used when an address carries none
pub const DNS_PORT: u16 = 53;

/// Parse a resolver address string into a socket address.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_resolver(input: &str) -> Result<SocketAddr, ResolverError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(ResolverError::Empty);
	}

	let invalid = |source| ResolverError::InvalidAddress {
		input: trimmed.to_string(),
		source,
	};

	if trimmed.starts_with('[') {
		// Bracketed IPv6 with port: [::1]:53
		return trimmed.parse().map_err(invalid);
	}
	if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port (e.g. "8.8.8.8:5353")
		return Ok(addr);
	}
	// Plain IPv4 or bare IPv6 without port
	let ip: IpAddr = trimmed.parse().map_err(invalid)?;
	Ok(SocketAddr::new(ip, DNS_PORT))
}

/// Read resolver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped. Every remaining
/// line must parse as a resolver address.
pub fn read_resolver_file(path: &str) -> Result<Vec<String>, ResolverError> {
	let content = std::fs::read_to_string(path)
		.map_err(|source| ResolverError::File { path: path.to_string(), source })?;
	let mut resolvers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		parse_resolver(trimmed)?;
		resolvers.push(trimmed.to_string());
	}
	Ok(resolvers)
}

/// Read system resolvers from /etc/resolv.conf (Unix only).
///
/// Returns an empty vec on non-Unix platforms or if the file cannot be read.
pub fn system_resolvers() -> Vec<String> {
	match std::fs::read_to_string("/etc/resolv.conf") {
		Ok(content) => parse_resolv_conf(&content),
		Err(_) => Vec::new(),
	}
}

fn parse_resolv_conf(content: &str) -> Vec<String> {
	content.lines()
		.filter_map(|line| {
			let mut parts = line.split_whitespace();
			match (parts.next(), parts.next()) {
				(Some("nameserver"), Some(addr)) => Some(addr),
				_ => None,
			}
		})
		.filter(|addr| parse_resolver(addr).is_ok())
		.map(String::from)
		.collect()
}

/// Return the resolvers rotated through when no configuration names any.
pub fn default_resolvers() -> Vec<String> {
	vec!["1.1.1.1", "1.0.0.1", "9.9.9.9"]
		.into_iter()
		.map(String::from)
		.collect()
}
