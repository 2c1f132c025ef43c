//! Codegen gate.
//!
//! Three checks run over a generated artifact directory, each fatal on
//! failure: the generator is re-run and must reproduce the artifacts
//! byte-for-byte, the expected files must be present and non-empty, and the
//! implementation must compile cleanly with the discovered native
//! toolchain. A failing gate aborts the pipeline before any roundtrip
//! campaign starts.

use std::fs;
use std::path::Path;
use std::time::Duration;

use cangen_codegen::{CodegenError, Naming, generate};
use cangen_core::ir::Spec;
use thiserror::Error;
use tracing::{debug, info};

use crate::hash::sha256_hex;
use crate::toolchain::Toolchain;

/// Failure of one of the gate steps.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("no usable C toolchain found (tried: {tried})")]
    ToolchainNotFound { tried: String },

    #[error("generated output is not deterministic, changed file(s): {}", files.join(", "))]
    DeterminismMismatch { files: Vec<String> },

    #[error("expected artifact {path} is missing or empty")]
    MissingArtifact { path: String },

    #[error("compile step failed with exit code {exit}: {stderr}")]
    CompileFailed { exit: i32, stderr: String },

    #[error("compile step exceeded the {seconds}s timeout")]
    CompileTimeout { seconds: u64 },

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("gate i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one gate step.
#[derive(Debug, Clone)]
pub struct GateMetric {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// The gate's structured verdict: one metric per step, in run order.
#[derive(Debug, Clone)]
pub struct GateVerdict {
    pub metrics: Vec<GateMetric>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.metrics.iter().all(|m| m.passed)
    }
}

/// Runs the full gate over `artifact_dir`.
///
/// Returns the verdict when every step passes; the first failing step
/// aborts with its [`GateError`].
pub fn run(
    spec: &Spec,
    artifact_dir: &Path,
    toolchain: &Toolchain,
    compile_timeout: Duration,
) -> Result<GateVerdict, GateError> {
    let naming = Naming::new(&spec.meta.name);
    let mut metrics = Vec::new();

    let detail = check_determinism(spec, artifact_dir)?;
    record(&mut metrics, "determinism", detail);

    let detail = check_presence(artifact_dir, &naming)?;
    record(&mut metrics, "presence", detail);

    let detail = check_compile(artifact_dir, &naming, toolchain, compile_timeout)?;
    record(&mut metrics, "compile", detail);

    let verdict = GateVerdict { metrics };
    info!(steps = verdict.metrics.len(), "codegen gate passed");
    Ok(verdict)
}

fn record(metrics: &mut Vec<GateMetric>, name: &'static str, detail: String) {
    debug!(step = name, %detail, "gate step passed");
    metrics.push(GateMetric { name, passed: true, detail });
}

/// Re-runs the generator into a scratch directory and compares hashes.
fn check_determinism(spec: &Spec, artifact_dir: &Path) -> Result<String, GateError> {
    let sources = generate(spec)?;
    let scratch = tempfile::tempdir()?;
    sources.write_to_dir(scratch.path())?;

    let mut changed = Vec::new();
    let mut details = Vec::new();
    for (name, _) in sources.files() {
        let artifact = fs::read(artifact_dir.join(name)).map_err(|_| {
            GateError::MissingArtifact { path: artifact_dir.join(name).display().to_string() }
        })?;
        let rerun = fs::read(scratch.path().join(name))?;

        let artifact_hash = sha256_hex(&artifact);
        if artifact_hash != sha256_hex(&rerun) {
            changed.push(name.to_string());
        }
        details.push(format!("{name}={artifact_hash}"));
    }

    if changed.is_empty() {
        Ok(details.join(" "))
    } else {
        Err(GateError::DeterminismMismatch { files: changed })
    }
}

/// Checks that both expected artifacts exist and are non-empty.
fn check_presence(artifact_dir: &Path, naming: &Naming) -> Result<String, GateError> {
    let expected = [naming.header_file(), naming.source_file()];
    for name in &expected {
        let path = artifact_dir.join(name);
        let missing = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if missing {
            return Err(GateError::MissingArtifact { path: path.display().to_string() });
        }
    }
    Ok(expected.join(", "))
}

/// Compiles the implementation to a throwaway object in a scratch directory.
fn check_compile(
    artifact_dir: &Path,
    naming: &Naming,
    toolchain: &Toolchain,
    timeout: Duration,
) -> Result<String, GateError> {
    let scratch = tempfile::tempdir()?;
    let object = scratch.path().join("gate_check.o");

    let capture = toolchain.compile_object(
        &artifact_dir.join(naming.source_file()),
        artifact_dir,
        &object,
        timeout,
    )?;
    if capture.exit != 0 {
        return Err(GateError::CompileFailed { exit: capture.exit, stderr: capture.stderr });
    }
    Ok(format!("{} ok", toolchain.command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangen_core::ir::Spec;
    use test_utils::{create_temp_dir, load_fixture};

    fn spec() -> Spec {
        Spec::from_yaml(&load_fixture("valid", "nibble_pair.ir.yaml")).unwrap()
    }

    #[test]
    fn determinism_passes_on_untouched_artifacts() {
        let spec = spec();
        let dir = create_temp_dir();
        generate(&spec).unwrap().write_to_dir(&dir).unwrap();

        let detail = check_determinism(&spec, &dir).unwrap();
        assert!(detail.contains("nibble_pair_protocol.h="));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn determinism_flags_a_tampered_artifact() {
        let spec = spec();
        let dir = create_temp_dir();
        let sources = generate(&spec).unwrap();
        sources.write_to_dir(&dir).unwrap();
        fs::write(dir.join(&sources.source_name), "/* tampered */").unwrap();

        let err = check_determinism(&spec, &dir).unwrap_err();
        match err {
            GateError::DeterminismMismatch { files } => {
                assert_eq!(files, vec!["nibble_pair_protocol.c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn presence_flags_empty_artifact() {
        let spec = spec();
        let dir = create_temp_dir();
        let sources = generate(&spec).unwrap();
        sources.write_to_dir(&dir).unwrap();
        fs::write(dir.join(&sources.header_name), "").unwrap();

        let naming = Naming::new(&spec.meta.name);
        let err = check_presence(&dir, &naming).unwrap_err();
        assert!(matches!(err, GateError::MissingArtifact { .. }));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn presence_passes_on_generated_tree() {
        let spec = spec();
        let dir = create_temp_dir();
        generate(&spec).unwrap().write_to_dir(&dir).unwrap();

        let naming = Naming::new(&spec.meta.name);
        let detail = check_presence(&dir, &naming).unwrap();
        assert_eq!(detail, "nibble_pair_protocol.h, nibble_pair_protocol.c");
        fs::remove_dir_all(dir).ok();
    }
}
