use crate::error::Diagnostic;
use crate::model::{Finding, PackageMap, ScanResult};
use anyhow::Result;
use chrono::SecondsFormat;
use serde::Serialize;
use std::path::Path;

/// Structured report for one project.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub scan_info: ScanInfo<'a>,
    pub summary: Summary,
    pub findings: &'a [Finding],
    pub packages_checked: &'a PackageMap,
}

#[derive(Serialize)]
pub struct ScanInfo<'a> {
    pub target: &'a Path,
    pub timestamp: String,
    pub elapsed_seconds: f64,
    pub scanned_files: usize,
    pub scanned_packages: usize,
    pub iocs_database_size: usize,
    pub warnings: &'a [Diagnostic],
}

#[derive(Serialize)]
pub struct Summary {
    pub total_findings: usize,
    pub critical: usize,
    pub high: usize,
    pub warning: usize,
    pub clean: bool,
}

impl<'a> From<&'a ScanResult> for JsonReport<'a> {
    fn from(result: &'a ScanResult) -> Self {
        Self {
            scan_info: ScanInfo {
                target: &result.target,
                timestamp: result.scan_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                elapsed_seconds: result.elapsed.as_secs_f64(),
                scanned_files: result.scanned_files,
                scanned_packages: result.scanned_packages(),
                iocs_database_size: result.ioc_database_size,
                warnings: &result.diagnostics,
            },
            summary: Summary {
                total_findings: result.findings.len(),
                critical: result.counts.critical,
                high: result.counts.high,
                warning: result.counts.warning,
                clean: result.verdict(),
            },
            findings: &result.findings,
            packages_checked: &result.packages_checked,
        }
    }
}

/// One report for a single project, an array of reports otherwise.
pub fn generate_json_string(results: &[ScanResult]) -> Result<String> {
    let json = match results {
        [single] => serde_json::to_string_pretty(&JsonReport::from(single))?,
        many => {
            let reports: Vec<JsonReport> = many.iter().map(JsonReport::from).collect();
            serde_json::to_string_pretty(&reports)?
        }
    };
    Ok(json)
}

pub fn print_json(results: &[ScanResult]) -> Result<()> {
    println!("{}", generate_json_string(results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FindingsAggregator;
    use crate::model::{Category, Location, Severity};

    #[test]
    fn test_report_sections() {
        let mut agg = FindingsAggregator::new("/project", 11);
        agg.add_scan_findings([Finding::new(
            Severity::Critical,
            Category::KnownMaliciousFile,
            Location::file("setup_bun.js"),
            "Known malicious file: setup_bun.js",
        )]);
        agg.add_packages(&[("posthog-node", "4.2.1")].into_iter().collect());
        let result = agg.finish();

        let value: serde_json::Value =
            serde_json::from_str(&generate_json_string(std::slice::from_ref(&result)).unwrap())
                .unwrap();
        assert_eq!(value["scan_info"]["target"], "/project");
        assert_eq!(value["scan_info"]["iocs_database_size"], 11);
        assert_eq!(value["summary"]["critical"], 1);
        assert_eq!(value["summary"]["clean"], false);
        assert_eq!(value["findings"][0]["category"], "known-malicious-file");
        assert_eq!(value["packages_checked"]["posthog-node"], "4.2.1");
    }

    #[test]
    fn test_multiple_projects_render_as_array() {
        let results = vec![
            FindingsAggregator::new("/a", 0).finish(),
            FindingsAggregator::new("/b", 0).finish(),
        ];
        let value: serde_json::Value =
            serde_json::from_str(&generate_json_string(&results).unwrap()).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["summary"]["clean"], true);
    }
}
