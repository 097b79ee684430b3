//! Helpers shared by the `gametools` binary: tracing setup, file I/O and the
//! plain-text rendering of workflow results.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gametools_core::{AppError, ErrorMetadata, LogLevel, ProviderRecord, UploadedFile, UserKey};
use gametools_processing::classify;
use gametools_services::{BundleOutput, BundleTarget, FetchOutcome, LaunchReport, ProviderLookup};
use serde::Serialize;

/// Initialize tracing for the CLI. Logs go to stderr so `--json` output stays
/// machine-readable; `LOG_FORMAT=json` switches to structured lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// What the user sees when a command fails
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub hint: Option<&'static str>,
    pub exit_code: i32,
}

pub fn error_report(err: &anyhow::Error) -> ErrorReport {
    match err.downcast_ref::<AppError>() {
        Some(app) => ErrorReport {
            message: app.client_message(),
            hint: app.suggested_action(),
            exit_code: app.exit_code(),
        },
        None => ErrorReport {
            message: format!("{:#}", err),
            hint: None,
            exit_code: 1,
        },
    }
}

/// Log a failed command at the level its error calls for
pub fn log_failure(err: &anyhow::Error) {
    let Some(app) = err.downcast_ref::<AppError>() else {
        tracing::error!(error = ?err, "Command failed");
        return;
    };
    let code = app.error_code();
    let recoverable = app.is_recoverable();
    match app.log_level() {
        LogLevel::Debug => tracing::debug!(code, recoverable, error = %app, "Command failed"),
        LogLevel::Warn => tracing::warn!(code, recoverable, error = %app, "Command failed"),
        LogLevel::Error if app.is_sensitive() => {
            tracing::error!(code, recoverable, "Command failed")
        }
        LogLevel::Error => {
            tracing::error!(code, recoverable, error = %app.detailed_message(), "Command failed")
        }
    }
}

/// Keep only the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

pub fn read_uploads(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("Not a file path: {}", path.display()))?;
            Ok(UploadedFile::new(name, bytes))
        })
        .collect()
}

/// Write the bundle into `dir`, creating it if needed
pub fn write_bundle(dir: &Path, output: &BundleOutput) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&output.file_name);
    std::fs::write(&path, &output.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn classification_line(filename: &str) -> String {
    match classify(filename) {
        Some(role) => format!("{} -> {}", filename, role),
        None => format!("{} -> unclassified", filename),
    }
}

pub fn render_accounts(accounts: &BTreeMap<String, UserKey>) -> String {
    if accounts.is_empty() {
        return "No saved accounts".to_string();
    }
    let mut out = String::new();
    for user in accounts.values() {
        let _ = writeln!(
            out,
            "{}\tstate: {}\tkey: {}",
            user.designer,
            user.state_name,
            mask_secret(&user.tracker_key)
        );
    }
    out
}

fn render_provider(out: &mut String, provider: &ProviderRecord) {
    let _ = writeln!(out, "    {} ({})", provider.key, provider.url);
    if provider.has_credentials() {
        let _ = writeln!(out, "      username: {}", provider.username);
        let _ = writeln!(out, "      password: {}", provider.password);
    } else {
        let _ = writeln!(out, "      no credentials on file");
    }
}

pub fn render_lookup(title: &str, lookup: &ProviderLookup) -> String {
    let mut out = format!("{}\n", title);
    for provider in &lookup.matches {
        render_provider(&mut out, provider);
    }
    if let Some(notice) = lookup.notice() {
        let _ = writeln!(out, "  ! {}", notice);
    }
    out
}

pub fn render_report(report: &LaunchReport) -> String {
    let mut out = format!(
        "{} [{}] {}\n",
        report.title, report.ticket.identifier, report.ticket.url
    );

    if !report.duplicates.is_empty() {
        out.push_str("  Possible duplicates:\n");
        for dup in &report.duplicates {
            let _ = writeln!(out, "    - {} {}", dup.identifier, dup.url);
        }
    }

    if !report.providers.is_empty() {
        out.push_str("  Providers:\n");
        for provider in &report.providers {
            render_provider(&mut out, provider);
        }
        if !report.unmatched_tags.is_empty() {
            let _ = writeln!(out, "  Unmatched tags: {}", report.unmatched_tags.join(", "));
        }
    }

    if let Some(notice) = &report.provider_notice {
        let _ = writeln!(out, "  ! {}", notice);
    }
    out
}

pub fn render_outcome(outcome: &FetchOutcome) -> String {
    let mut out = String::new();
    if let Some(warning) = outcome.index_warning() {
        let _ = writeln!(out, "! {}", warning);
    }
    if outcome.reports.is_empty() {
        let _ = writeln!(out, "No launches due {}", outcome.date);
        return out;
    }

    let _ = writeln!(
        out,
        "Launches due {}: {}\n",
        outcome.date,
        outcome.reports.len()
    );
    for report in &outcome.reports {
        out.push_str(&render_report(report));
        out.push('\n');
    }
    out
}

pub fn render_bundle(path: &Path, output: &BundleOutput, target: Option<&BundleTarget>) -> String {
    let roles: Vec<String> = output.roles.iter().map(|r| r.to_string()).collect();
    let mut out = format!(
        "Wrote {} ({} bytes, roles: {})\n",
        path.display(),
        output.size_bytes,
        roles.join(", ")
    );
    if !output.unclassified.is_empty() {
        let _ = writeln!(out, "Skipped unclassified: {}", output.unclassified.join(", "));
    }
    if let Some(target) = target {
        let _ = writeln!(
            out,
            "Ticket: {} {} ({})",
            target.ticket.identifier, target.ticket.url, target.title
        );
    }
    out
}
