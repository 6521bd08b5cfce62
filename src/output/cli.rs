use crate::model::{Finding, ScanResult, Severity};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Packages")]
    packages: usize,
    #[tabled(rename = "Critical")]
    critical: usize,
    #[tabled(rename = "High")]
    high: usize,
    #[tabled(rename = "Warning")]
    warning: usize,
}

pub fn print_cli_table(results: &[ScanResult]) -> Result<()> {
    for result in results {
        print_project(result);
    }
    if results.len() > 1 {
        print_overall(results);
    }
    Ok(())
}

fn print_project(result: &ScanResult) {
    println!();
    println!("Project: {}", result.target.display());
    println!(
        "Scan completed at: {} ({:.2}s)",
        result.scan_time.format("%Y-%m-%d %H:%M:%S UTC"),
        result.elapsed.as_secs_f64()
    );

    if !result.diagnostics.is_empty() {
        println!();
        println!("Warnings:");
        for diagnostic in &result.diagnostics {
            println!("  {}", diagnostic);
        }
    }

    println!();
    if result.findings.is_empty() {
        println!("No Shai-Hulud 2.0 indicators found.");
    } else {
        println!("Found {} issues:", result.findings.len());
        println!();

        let mut findings: Vec<&Finding> = result.findings.iter().collect();
        findings.sort_by_key(|f| f.severity);

        let rows: Vec<FindingRow> = findings
            .iter()
            .map(|f| FindingRow {
                severity: format_severity(&f.severity),
                category: f.category.to_string(),
                location: truncate(&f.location.to_string(), 50),
                message: truncate(&f.message, 70),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    println!();
    print_summary(result);

    if !result.verdict() {
        print_remediation();
    }
}

fn print_summary(result: &ScanResult) {
    println!("Summary:");
    println!("  Files scanned: {}", result.scanned_files);
    println!("  Packages checked: {}", result.scanned_packages());
    println!("  IOC database: {} compromised packages", result.ioc_database_size);
    if !result.findings.is_empty() {
        println!(
            "  Findings: {} critical, {} high, {} warning",
            result.counts.critical, result.counts.high, result.counts.warning
        );
    }
    println!();
    if result.verdict() {
        println!("Verdict: \x1b[32mCLEAN\x1b[0m");
    } else {
        println!("Verdict: \x1b[31mCOMPROMISED\x1b[0m");
    }
}

fn print_overall(results: &[ScanResult]) {
    println!();
    println!("Scanned {} projects:", results.len());
    println!();

    let rows: Vec<ProjectRow> = results
        .iter()
        .map(|r| ProjectRow {
            project: truncate(&r.target.display().to_string(), 50),
            files: r.scanned_files,
            packages: r.scanned_packages(),
            critical: r.counts.critical,
            high: r.counts.high,
            warning: r.counts.warning,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    let compromised = results.iter().filter(|r| !r.verdict()).count();
    let total: usize = results.iter().map(|r| r.findings.len()).sum();
    println!();
    println!(
        "Clean projects: {}, compromised projects: {}, total findings: {}",
        results.len() - compromised,
        compromised,
        total
    );
}

fn print_remediation() {
    println!();
    println!("Immediate actions:");
    println!("  1. Isolate the machine from the network");
    println!("  2. Rotate all credentials:");
    println!("     - GitHub tokens (Settings > Developer settings > revoke all)");
    println!("     - npm tokens (npm token revoke)");
    println!("     - AWS credentials (aws iam delete-access-key)");
    println!("     - GCP credentials (gcloud auth revoke --all)");
    println!("     - Azure credentials");
    println!("  3. Look for GitHub repositories named 'Sha1-Hulud: The Second Coming'");
    println!("  4. Look for self-hosted runners named 'SHA1HULUD'");
    println!("  5. Reinstall dependencies from clean versions:");
    println!("     rm -rf node_modules package-lock.json");
    println!("     npm install --ignore-scripts");
    println!("  6. Inspect .github/workflows/discussion.yaml");
    println!("  7. Review audit logs for unauthorized activity");
    println!();
    println!("More: https://securitylabs.datadoghq.com/articles/shai-hulud-2.0-npm-worm/");
}

fn format_severity(severity: &Severity) -> String {
    match severity {
        Severity::Critical => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Warning => "\x1b[33mWARNING\x1b[0m".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
