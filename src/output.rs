use std::time::Duration;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::types::{ResolverSummary, Status};

/// Print what is about to be tested.
pub fn print_config_summary(candidates: &[String], domains: &[String], timeout: Duration) {
	println!("DNS Test Configuration");
	println!("======================");
	println!("Resolvers:      {}", candidates.len());
	for (i, r) in candidates.iter().enumerate() {
		println!("  {}. {}", i + 1, r);
	}
	println!("Test domains:   {}", domains.len());
	for d in domains {
		println!("  - {}", d);
	}
	println!("Timeout:        {} ms", timeout.as_millis());
	println!();
}

fn format_latency(summary: &ResolverSummary) -> String {
	if summary.avg_latency.is_zero() {
		"N/A".to_string()
	} else {
		format!("{:.1} ms", summary.avg_latency_ms())
	}
}

fn status_cell(status: Status) -> Cell {
	let color = match status {
		Status::Ok => Color::Green,
		Status::Partial => Color::Yellow,
		Status::Failed => Color::Red,
	};
	Cell::new(status.as_str()).fg(color)
}

/// Print summaries as a formatted table, in the order given.
pub fn print_results_table(results: &[ResolverSummary]) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Rank", "Resolver", "Avg latency", "Success %", "Probes", "Status", "Errors",
	]);

	for (i, s) in results.iter().enumerate() {
		table.add_row(vec![
			Cell::new(i + 1),
			Cell::new(&s.address),
			Cell::new(format_latency(s)),
			Cell::new(format!("{:.1}%", s.success_rate)),
			Cell::new(format!("{}/{}", s.successful_probes, s.total_probes)),
			status_cell(s.status),
			Cell::new(s.error.as_deref().unwrap_or("")),
		]);
	}

	println!("\nDNS Test Results");
	println!("================\n");
	println!("{table}");
}

/// Write summaries to a CSV file.
pub fn write_csv(path: &str, results: &[ResolverSummary]) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"rank", "resolver", "avg_latency_ms", "success_rate",
		"successful_probes", "total_probes", "status", "error",
	])?;

	for (i, s) in results.iter().enumerate() {
		writer.write_record([
			(i + 1).to_string(),
			s.address.clone(),
			format!("{:.2}", s.avg_latency_ms()),
			format!("{:.1}", s.success_rate),
			s.successful_probes.to_string(),
			s.total_probes.to_string(),
			s.status.to_string(),
			s.error.clone().unwrap_or_default(),
		])?;
	}

	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}
