//! Canonical campaign reports.
//!
//! Every campaign writes a summary report; a second error report is added
//! only when failures were recorded. Both are YAML mappings with a fixed
//! field order and sorted sub-maps, so two identical campaigns produce
//! byte-equal documents modulo the timestamp.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::roundtrip::Campaign;

/// Version string recorded in every report.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run metadata shared by both report kinds.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub ir_path: String,
    pub ir_sha256: String,
    pub artifact_dir: String,
    pub artifact_hashes: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub timestamp: String,
    pub tool_version: String,
    pub ir_path: String,
    pub ir_sha256: String,
    pub artifact_dir: String,
    pub artifact_hashes: BTreeMap<String, String>,
    pub master_seed: u64,
    pub loop_seeds: Vec<u64>,
    pub passed: bool,
    pub failure_count: usize,
    pub stopped_early: bool,
    pub loops: Vec<LoopReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopReport {
    pub loop_index: u32,
    pub loop_seed: u64,
    pub messages: Vec<MessageReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageReport {
    pub message: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub timestamp: String,
    pub tool_version: String,
    pub ir_path: String,
    pub ir_sha256: String,
    pub artifact_dir: String,
    pub artifact_hashes: BTreeMap<String, String>,
    pub master_seed: u64,
    pub failures: Vec<FailureReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub loop_index: u32,
    pub loop_seed: u64,
    pub message: String,
    pub input: BTreeMap<String, String>,
    pub encoded: String,
    pub decoded: BTreeMap<String, String>,
    pub property: String,
    pub detail: String,
}

/// Paths of the written reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub error: Option<PathBuf>,
}

/// Builds the summary report of a campaign.
pub fn summary_report(context: &ReportContext, campaign: &Campaign) -> SummaryReport {
    SummaryReport {
        timestamp: context.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        tool_version: TOOL_VERSION.to_string(),
        ir_path: context.ir_path.clone(),
        ir_sha256: context.ir_sha256.clone(),
        artifact_dir: context.artifact_dir.clone(),
        artifact_hashes: context.artifact_hashes.clone(),
        master_seed: campaign.master_seed,
        loop_seeds: campaign.loop_seeds.clone(),
        passed: campaign.passed(),
        failure_count: campaign.failures.len(),
        stopped_early: campaign.stopped_early,
        loops: campaign
            .loops
            .iter()
            .map(|l| LoopReport {
                loop_index: l.loop_index,
                loop_seed: l.loop_seed,
                messages: l
                    .messages
                    .iter()
                    .map(|m| MessageReport { message: m.message.clone(), passed: m.passed })
                    .collect(),
            })
            .collect(),
    }
}

/// Builds the error report, if any failure was recorded.
pub fn error_report(context: &ReportContext, campaign: &Campaign) -> Option<ErrorReport> {
    if campaign.failures.is_empty() {
        return None;
    }
    Some(ErrorReport {
        timestamp: context.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        tool_version: TOOL_VERSION.to_string(),
        ir_path: context.ir_path.clone(),
        ir_sha256: context.ir_sha256.clone(),
        artifact_dir: context.artifact_dir.clone(),
        artifact_hashes: context.artifact_hashes.clone(),
        master_seed: campaign.master_seed,
        failures: campaign
            .failures
            .iter()
            .map(|f| FailureReport {
                loop_index: f.loop_index,
                loop_seed: f.loop_seed,
                message: f.message.clone(),
                input: f.input.clone(),
                encoded: f.encoded.clone(),
                decoded: f.decoded.clone(),
                property: f.property.as_str().to_string(),
                detail: f.detail.clone(),
            })
            .collect(),
    })
}

/// Timestamp slug used in report file names, e.g. `20260801T120000Z`.
fn timestamp_slug(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Writes the campaign reports into `dir`, creating it if needed.
pub fn write_reports(
    dir: &Path,
    context: &ReportContext,
    campaign: &Campaign,
) -> io::Result<ReportPaths> {
    fs::create_dir_all(dir)?;
    let slug = timestamp_slug(&context.timestamp);

    let summary = summary_report(context, campaign);
    let summary_path = dir.join(format!("{slug}-raw.report.yaml"));
    fs::write(&summary_path, to_yaml(&summary)?)?;

    let error = match error_report(context, campaign) {
        Some(report) => {
            let path = dir.join(format!("{slug}-raw.error.report.yaml"));
            fs::write(&path, to_yaml(&report)?)?;
            Some(path)
        }
        None => None,
    };

    Ok(ReportPaths { summary: summary_path, error })
}

fn to_yaml<T: Serialize>(value: &T) -> io::Result<String> {
    serde_yml::to_string(value).map_err(io::Error::other)
}
