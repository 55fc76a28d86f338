use anyhow::{anyhow, Result};

/// Domain resolved when a probe is handed an empty name
pub const FALLBACK_DOMAIN: &str = "google.com";

/// Return the well-known domains probed when the caller supplies none.
pub fn default_probe_domains() -> Vec<String> {
	vec![
		"google.com",
		"cloudflare.com",
		"github.com",
		"microsoft.com",
		"amazon.com",
	].into_iter().map(String::from).collect()
}

/// Return `domains`, or the default set when it is empty.
pub fn effective_domains(domains: &[String]) -> Vec<String> {
	if domains.is_empty() {
		default_probe_domains()
	} else {
		domains.to_vec()
	}
}

/// Read domains from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	let domains: Vec<String> = content.lines()
		.map(|line| line.trim().to_string())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.collect();
	Ok(domains)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_default_domains_size() {
		assert_eq!(default_probe_domains().len(), 5);
	}

	#[test]
	fn test_effective_domains_substitutes_defaults() {
		assert_eq!(effective_domains(&[]), default_probe_domains());
		let custom = vec!["example.org".to_string()];
		assert_eq!(effective_domains(&custom), custom);
	}

	#[test]
	fn test_read_domain_file_skips_comments() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "# probe set").unwrap();
		writeln!(file, "example.org").unwrap();
		writeln!(file).unwrap();
		writeln!(file, "  rust-lang.org  ").unwrap();
		let path = file.path().to_str().unwrap();
		let domains = read_domain_file(path).unwrap();
		assert_eq!(domains, vec!["example.org", "rust-lang.org"]);
	}

	#[test]
	fn test_read_domain_file_missing() {
		let err = read_domain_file("/nonexistent/domains.txt").unwrap_err();
		assert!(err.to_string().contains("failed to read domain file"));
	}
}
