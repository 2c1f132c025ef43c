//! Pipeline orchestration.
//!
//! One call runs the whole chain: load the IR, validate both layers,
//! generate sources, gate them, run the roundtrip campaign and write the
//! reports. Validation failures abort before codegen, a failing gate aborts
//! before the campaign, and generated artifacts are staged in a scratch
//! directory and swapped into place only when complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cangen_codegen::{CodegenError, GeneratedSources, Naming, generate};
use cangen_core::error::{SchemaError, SemanticError};
use cangen_core::ir::Spec;
use cangen_core::validate::{schema, semantic};
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::gate::{self, GateError, GateVerdict};
use crate::hash;
use crate::report::{self, ReportContext, ReportPaths};
use crate::roundtrip::{self, Campaign, CampaignOptions, RoundtripError};
use crate::toolchain::Toolchain;

/// Wall-clock budget for each external step (compile, harness run).
const STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Any failure that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Roundtrip(#[from] RoundtripError),

    #[error("pipeline i/o failure: {0}")]
    Io(#[from] io::Error),
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub spec: Spec,
    pub gen_dir: PathBuf,
    pub gate: GateVerdict,
    pub campaign: Campaign,
    pub reports: ReportPaths,
}

/// The full verification pipeline bound to one configuration.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the pipeline over one IR document.
    pub fn run(&self, ir_path: &Path, master_seed: u64) -> Result<PipelineOutcome, PipelineError> {
        let spec = Spec::load(ir_path)?;
        let ir_sha256 = hash::sha256_file(ir_path)?;

        let schema_issues = schema::validate(&spec);
        if !schema_issues.is_empty() {
            return Err(SchemaError::Invalid(schema_issues).into());
        }
        let semantic_issues = semantic::validate(&spec);
        if !semantic_issues.is_empty() {
            return Err(SemanticError { issues: semantic_issues }.into());
        }
        info!(messages = spec.messages.len(), name = %spec.meta.name, "IR validated");

        // Canonical IR copy under <out>/output/.
        let naming = Naming::new(&spec.meta.name);
        let output_dir = self.config.output_root.join("output");
        fs::create_dir_all(&output_dir)?;
        spec.save(&output_dir.join(format!("{}.ir.yaml", naming.spec())))?;

        let sources = generate(&spec)?;
        let gen_dir = self.config.output_root.join("gen");
        stage_into(&sources, &gen_dir)?;
        info!(dir = %gen_dir.display(), "sources generated");

        let toolchain = Toolchain::discover(self.config.toolchain_hint.as_deref())?;
        let gate = gate::run(&spec, &gen_dir, &toolchain, STEP_TIMEOUT)?;

        let options = CampaignOptions {
            loops: self.config.default_loops,
            master_seed,
            fail_policy: self.config.fail_policy,
            step_timeout: STEP_TIMEOUT,
        };
        let campaign = roundtrip::run_campaign(&spec, &gen_dir, &toolchain, &options)?;

        let context = ReportContext {
            ir_path: ir_path.display().to_string(),
            ir_sha256,
            artifact_dir: gen_dir.display().to_string(),
            artifact_hashes: hash::hash_named_files(
                &gen_dir,
                &[&sources.header_name, &sources.source_name],
            )?,
            timestamp: Utc::now(),
        };
        let reports =
            report::write_reports(&self.config.output_root.join("raw_reports"), &context, &campaign)?;
        info!(passed = campaign.passed(), "pipeline finished");

        Ok(PipelineOutcome { spec, gen_dir, gate, campaign, reports })
    }
}

/// Writes the sources into a fresh staging directory next to `final_dir`,
/// then swaps it into place. A partially written `gen/` is never visible.
fn stage_into(sources: &GeneratedSources, final_dir: &Path) -> io::Result<()> {
    let parent = final_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)?;

    let staging = tempfile::Builder::new().prefix(".gen-staging").tempdir_in(&parent)?;
    sources.write_to_dir(staging.path())?;

    if final_dir.exists() {
        fs::remove_dir_all(final_dir)?;
    }
    fs::rename(staging.keep(), final_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_temp_dir, load_fixture};

    fn pipeline_into(dir: &Path) -> Pipeline {
        Pipeline::new(Config { output_root: dir.to_path_buf(), ..Config::default() })
    }

    #[test]
    fn structural_failure_aborts_before_codegen() {
        let doc = load_fixture("valid", "single_bit.ir.yaml").replace("dlc: 1", "dlc: 0");
        let ir = test_utils::create_temp_file(&doc, "yaml");
        let out = create_temp_dir();

        let err = pipeline_into(&out).run(&ir, 1).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(SchemaError::Invalid(_))));
        // Nothing may have been generated.
        assert!(!out.join("gen").exists());

        fs::remove_file(ir).ok();
        fs::remove_dir_all(out).ok();
    }

    #[test]
    fn semantic_failure_aborts_before_codegen() {
        let doc = load_fixture("invalid", "scale_zero.ir.yaml");
        let ir = test_utils::create_temp_file(&doc, "yaml");
        let out = create_temp_dir();

        let err = pipeline_into(&out).run(&ir, 1).unwrap_err();
        match err {
            PipelineError::Semantic(semantic) => {
                assert_eq!(semantic.issues.len(), 1);
                assert_eq!(semantic.issues[0].category.as_str(), "SCALE_ZERO");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.join("gen").exists());

        fs::remove_file(ir).ok();
        fs::remove_dir_all(out).ok();
    }

    #[test]
    fn malformed_document_aborts_with_schema_error() {
        let doc = load_fixture("invalid", "unknown_key.ir.yaml");
        let ir = test_utils::create_temp_file(&doc, "yaml");
        let out = create_temp_dir();

        let err = pipeline_into(&out).run(&ir, 1).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(SchemaError::Parse(_))));

        fs::remove_file(ir).ok();
        fs::remove_dir_all(out).ok();
    }

    #[test]
    fn staging_replaces_previous_output() {
        let spec = Spec::from_yaml(&load_fixture("valid", "single_bit.ir.yaml")).unwrap();
        let sources = generate(&spec).unwrap();
        let out = create_temp_dir();
        let gen_dir = out.join("gen");

        fs::create_dir_all(&gen_dir).unwrap();
        fs::write(gen_dir.join("stale.c"), "stale").unwrap();

        stage_into(&sources, &gen_dir).unwrap();
        assert!(gen_dir.join("single_bit_protocol.h").exists());
        assert!(gen_dir.join("single_bit_protocol.c").exists());
        assert!(!gen_dir.join("stale.c").exists());

        fs::remove_dir_all(out).ok();
    }
}
