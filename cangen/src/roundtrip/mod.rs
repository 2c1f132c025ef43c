//! Seeded roundtrip verification campaign.
//!
//! Given a validated Spec and a gated artifact directory, the verifier
//! plans a campaign of `loops` independent loops, emits and compiles a C
//! harness embedding the sampled raw values, runs it once, and judges the
//! transcript on the Rust side against the reference codec:
//!
//! - encode must accept every in-range assignment and reproduce the
//!   reference payload, with every bit outside the signal masks zero;
//! - decode must return the sampled values field by field;
//! - re-encoding the decoded struct must reproduce the payload within the
//!   signal positions.
//!
//! Loops run serially so their reports are totally ordered; the verifier
//! never modifies the artifacts it exercises.

pub mod harness;
pub mod seed;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use cangen_codegen::Naming;
use cangen_core::codec;
use cangen_core::error::CodecError;
use cangen_core::ir::{Message, Spec};
use cangen_core::layout::message_mask;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::FailPolicy;
use crate::gate::GateError;
use crate::toolchain::{Toolchain, run_with_timeout};

/// Parameters of one campaign.
#[derive(Debug, Clone)]
pub struct CampaignOptions {
    pub loops: u32,
    pub master_seed: u64,
    pub fail_policy: FailPolicy,
    /// Wall-clock budget for each external step (compile, run).
    pub step_timeout: Duration,
}

/// Sampled raw values for one message in one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePlan {
    pub message_index: usize,
    pub values: Vec<u64>,
}

/// Everything one loop will exercise, derived from `(master_seed, index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPlan {
    pub loop_index: u32,
    pub loop_seed: u64,
    pub cases: Vec<CasePlan>,
}

/// Which roundtrip property a failing case violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundtripProperty {
    ValueMismatch,
    MaskViolation,
    EncodeRejected,
    DecodeRejected,
}

impl RoundtripProperty {
    /// Stable category string used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundtripProperty::ValueMismatch => "VALUE_MISMATCH",
            RoundtripProperty::MaskViolation => "MASK_VIOLATION",
            RoundtripProperty::EncodeRejected => "ENCODE_REJECTED",
            RoundtripProperty::DecodeRejected => "DECODE_REJECTED",
        }
    }
}

impl fmt::Display for RoundtripProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded failure, with everything needed to reproduce it.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub loop_index: u32,
    pub loop_seed: u64,
    pub message: String,
    pub input: BTreeMap<String, String>,
    pub encoded: String,
    pub decoded: BTreeMap<String, String>,
    pub property: RoundtripProperty,
    pub detail: String,
}

/// Pass/fail of one message in one loop.
#[derive(Debug, Clone)]
pub struct MessageOutcome {
    pub message: String,
    pub passed: bool,
}

/// All message outcomes of one evaluated loop.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub loop_index: u32,
    pub loop_seed: u64,
    pub messages: Vec<MessageOutcome>,
}

/// The finished campaign.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub master_seed: u64,
    pub loop_seeds: Vec<u64>,
    pub loops: Vec<LoopOutcome>,
    pub failures: Vec<FailureRecord>,
    /// True when a stop-on-fail policy halted the campaign early.
    pub stopped_early: bool,
}

impl Campaign {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Campaign infrastructure failure (as opposed to a recorded property
/// violation, which lives in [`FailureRecord`]).
#[derive(Debug, Error)]
pub enum RoundtripError {
    #[error("failed to build the roundtrip harness: {0}")]
    Build(#[from] GateError),

    #[error("roundtrip harness exited with code {exit}: {stderr}")]
    HarnessFailed { exit: i32, stderr: String },

    #[error("unexpected harness output at line {line}: {detail}")]
    Transcript { line: usize, detail: String },

    #[error("reference codec rejected sampled values: {0}")]
    Codec(#[from] CodecError),

    #[error("roundtrip i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Plans every loop of a campaign from its master seed.
///
/// Signals are sampled in IR order from a per-loop SplitMix64 stream, so a
/// plan is reproducible from `(master_seed, loop_index)` alone.
pub fn plan_campaign(spec: &Spec, loops: u32, master_seed: u64) -> Vec<LoopPlan> {
    (0..loops)
        .map(|i| {
            let loop_seed = seed::derive_loop_seed(master_seed, i as u64);
            let mut rng = seed::SplitMix64::new(loop_seed);
            let cases = spec
                .messages
                .iter()
                .enumerate()
                .map(|(m, message)| CasePlan {
                    message_index: m,
                    values: message
                        .signals
                        .iter()
                        .map(|s| seed::sample_raw(&mut rng, s.bit_length, s.signed))
                        .collect(),
                })
                .collect();
            LoopPlan { loop_index: i, loop_seed, cases }
        })
        .collect()
}

/// Runs a full campaign against the artifacts in `artifact_dir`.
pub fn run_campaign(
    spec: &Spec,
    artifact_dir: &Path,
    toolchain: &Toolchain,
    options: &CampaignOptions,
) -> Result<Campaign, RoundtripError> {
    let naming = Naming::new(&spec.meta.name);
    let plans = plan_campaign(spec, options.loops, options.master_seed);
    let source = harness::render_harness(spec, &naming, &plans);

    let scratch = tempfile::tempdir()?;
    let harness_path = scratch.path().join("roundtrip_harness.c");
    std::fs::write(&harness_path, &source)?;
    let executable = scratch
        .path()
        .join(if cfg!(windows) { "roundtrip_harness.exe" } else { "roundtrip_harness" });

    let impl_path = artifact_dir.join(naming.source_file());
    let compile = toolchain.build_executable(
        &[harness_path.as_path(), impl_path.as_path()],
        artifact_dir,
        &executable,
        options.step_timeout,
    )?;
    if compile.exit != 0 {
        return Err(RoundtripError::Build(GateError::CompileFailed {
            exit: compile.exit,
            stderr: compile.stderr,
        }));
    }
    debug!(loops = options.loops, "roundtrip harness built");

    let run = run_with_timeout(&mut Command::new(&executable), options.step_timeout)?;
    if run.exit != 0 {
        return Err(RoundtripError::HarnessFailed { exit: run.exit, stderr: run.stderr });
    }

    let (loops, failures, stopped_early) =
        evaluate_transcript(spec, &naming, &plans, &run.stdout, options.fail_policy)?;
    info!(
        loops = loops.len(),
        failures = failures.len(),
        stopped_early,
        "roundtrip campaign finished"
    );

    Ok(Campaign {
        master_seed: options.master_seed,
        loop_seeds: plans.iter().map(|p| p.loop_seed).collect(),
        loops,
        failures,
        stopped_early,
    })
}

/// Judges a harness transcript against the campaign plan.
///
/// Separated from [`run_campaign`] so property evaluation can be exercised
/// without a native toolchain.
pub fn evaluate_transcript(
    spec: &Spec,
    naming: &Naming,
    plans: &[LoopPlan],
    transcript: &str,
    fail_policy: FailPolicy,
) -> Result<(Vec<LoopOutcome>, Vec<FailureRecord>, bool), RoundtripError> {
    let mut lines = transcript.lines().enumerate();
    let mut loops = Vec::new();
    let mut failures = Vec::new();
    let mut stopped_early = false;

    for plan in plans {
        let mut outcomes = Vec::new();
        for case in &plan.cases {
            let message = &spec.messages[case.message_index];
            let failure = evaluate_case(message, naming, plan, case, &mut lines)?;
            let passed = failure.is_none();
            outcomes.push(MessageOutcome { message: message.name.clone(), passed });

            if let Some(record) = failure {
                warn!(
                    loop_index = record.loop_index,
                    message = %record.message,
                    property = %record.property,
                    "roundtrip failure recorded"
                );
                failures.push(record);
                if fail_policy == FailPolicy::StopOnFail {
                    stopped_early = true;
                    break;
                }
            }
        }
        loops.push(LoopOutcome {
            loop_index: plan.loop_index,
            loop_seed: plan.loop_seed,
            messages: outcomes,
        });
        if stopped_early {
            break;
        }
    }

    Ok((loops, failures, stopped_early))
}

type NumberedLines<'a> = std::iter::Enumerate<std::str::Lines<'a>>;

fn next_line<'a>(lines: &mut NumberedLines<'a>) -> Result<(usize, &'a str), RoundtripError> {
    match lines.next() {
        Some((index, line)) => Ok((index + 1, line)),
        None => Err(RoundtripError::Transcript {
            line: 0,
            detail: "unexpected end of harness output".into(),
        }),
    }
}

fn transcript_error(line: usize, detail: impl Into<String>) -> RoundtripError {
    RoundtripError::Transcript { line, detail: detail.into() }
}

fn parse_step<'a>(
    lines: &mut NumberedLines<'a>,
    keyword: &str,
) -> Result<(usize, i32, Vec<&'a str>), RoundtripError> {
    let (number, line) = next_line(lines)?;
    let mut parts = line.split_whitespace();
    if parts.next() != Some(keyword) {
        return Err(transcript_error(number, format!("expected a {keyword} line, got '{line}'")));
    }
    let rc = parts
        .next()
        .and_then(|p| p.parse::<i32>().ok())
        .ok_or_else(|| transcript_error(number, format!("missing return code on '{line}'")))?;
    Ok((number, rc, parts.collect()))
}

fn parse_payload(line: usize, text: &str, dlc: usize) -> Result<Vec<u8>, RoundtripError> {
    if text.len() != dlc * 2 {
        return Err(transcript_error(
            line,
            format!("payload '{text}' is not {dlc} byte(s) of hex"),
        ));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| transcript_error(line, format!("bad hex payload '{text}'")))
        })
        .collect()
}

fn hex_value_map(message: &Message, values: &[u64]) -> BTreeMap<String, String> {
    message
        .signals
        .iter()
        .zip(values)
        .map(|(signal, value)| (signal.name.clone(), format!("{value:#x}")))
        .collect()
}

fn hex_bytes(payload: &[u8]) -> String {
    hex::encode(payload)
}

/// Consumes and judges one CASE block of the transcript.
///
/// Line consumption mirrors the harness control flow: past the first
/// nonzero return code no further lines belong to the case.
fn evaluate_case(
    message: &Message,
    naming: &Naming,
    plan: &LoopPlan,
    case: &CasePlan,
    lines: &mut NumberedLines<'_>,
) -> Result<Option<FailureRecord>, RoundtripError> {
    let tag = naming.message_tag(message);
    let expected_case = format!("CASE {} {tag}", plan.loop_index);
    let (number, line) = next_line(lines)?;
    if line != expected_case {
        return Err(transcript_error(number, format!("expected '{expected_case}', got '{line}'")));
    }

    let input = hex_value_map(message, &case.values);
    let fail = |property, encoded: String, decoded, detail: String| {
        Some(FailureRecord {
            loop_index: plan.loop_index,
            loop_seed: plan.loop_seed,
            message: message.name.clone(),
            input: input.clone(),
            encoded,
            decoded,
            property,
            detail,
        })
    };

    // The harness stops printing a case's lines at the first nonzero return
    // code, so returning early is only safe where the harness also stopped.
    // A judged property violation is buffered instead: the rest of the block
    // must still be consumed or the next case would read dangling lines.
    // The first violated property wins.
    let mut failure: Option<FailureRecord> = None;

    // ENCODE
    let (number, rc, rest) = parse_step(lines, "ENCODE")?;
    if rc != 0 {
        return Ok(fail(
            RoundtripProperty::EncodeRejected,
            "-".into(),
            BTreeMap::new(),
            format!("encode returned {rc} for in-range values"),
        ));
    }
    let payload_text = rest
        .first()
        .ok_or_else(|| transcript_error(number, "ENCODE line has no payload"))?;
    let encoded = parse_payload(number, payload_text, message.dlc as usize)?;
    let encoded_hex = hex_bytes(&encoded);

    let mask = message_mask(message);
    if let Some(byte) = encoded
        .iter()
        .zip(&mask)
        .position(|(byte, mask)| byte & !mask != 0)
    {
        failure = fail(
            RoundtripProperty::MaskViolation,
            encoded_hex.clone(),
            BTreeMap::new(),
            format!("byte {byte} has bits set outside every signal's positions"),
        );
    }

    let expected = codec::encode_raw(message, &case.values)?;
    if failure.is_none() && encoded != expected {
        failure = fail(
            RoundtripProperty::ValueMismatch,
            encoded_hex.clone(),
            BTreeMap::new(),
            format!("encoder produced {} but {} was expected", hex_bytes(&encoded), hex_bytes(&expected)),
        );
    }

    // DECODE
    let (number, rc, rest) = parse_step(lines, "DECODE")?;
    if rc != 0 {
        return Ok(failure.or_else(|| {
            fail(
                RoundtripProperty::DecodeRejected,
                encoded_hex,
                BTreeMap::new(),
                format!("decode returned {rc} for a payload produced by encode"),
            )
        }));
    }
    if rest.len() != message.signals.len() {
        return Err(transcript_error(
            number,
            format!("expected {} decoded value(s), got {}", message.signals.len(), rest.len()),
        ));
    }
    let decoded: Vec<u64> = rest
        .iter()
        .map(|text| {
            u64::from_str_radix(text, 16)
                .map_err(|_| transcript_error(number, format!("bad decoded value '{text}'")))
        })
        .collect::<Result<_, _>>()?;
    let decoded_map = hex_value_map(message, &decoded);

    if failure.is_none()
        && let Some(position) =
            decoded.iter().zip(&case.values).position(|(got, want)| got != want)
    {
        let signal = &message.signals[position];
        failure = fail(
            RoundtripProperty::ValueMismatch,
            encoded_hex.clone(),
            decoded_map.clone(),
            format!(
                "signal '{}' decoded as {:#x}, expected {:#x}",
                signal.name, decoded[position], case.values[position]
            ),
        );
    }

    // REENCODE
    let (number, rc, rest) = parse_step(lines, "REENCODE")?;
    if rc != 0 {
        return Ok(failure.or_else(|| {
            fail(
                RoundtripProperty::EncodeRejected,
                encoded_hex,
                decoded_map,
                format!("re-encode of the decoded struct returned {rc}"),
            )
        }));
    }
    let payload_text = rest
        .first()
        .ok_or_else(|| transcript_error(number, "REENCODE line has no payload"))?;
    let reencoded = parse_payload(number, payload_text, message.dlc as usize)?;
    if failure.is_none() && reencoded != encoded {
        failure = fail(
            RoundtripProperty::MaskViolation,
            encoded_hex,
            decoded_map,
            format!(
                "re-encoded payload {} differs from {} within the signal positions",
                hex_bytes(&reencoded),
                hex_bytes(&encoded)
            ),
        );
    }

    Ok(failure)
}
