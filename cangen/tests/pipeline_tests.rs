//! End-to-end tests driving the gate and roundtrip campaign against a real
//! C toolchain.
//!
//! Every test that needs a compiler discovers one the same way the pipeline
//! does and skips with a note when none is installed; the pure pipeline
//! stages are covered by unit tests that run everywhere.

use std::fs;
use std::time::Duration;

use cangen::config::{Config, FailPolicy};
use cangen::gate;
use cangen::pipeline::Pipeline;
use cangen::roundtrip::{self, CampaignOptions, RoundtripProperty};
use cangen::toolchain::Toolchain;
use cangen_codegen::generate;
use cangen_core::ir::Spec;
use test_utils::{create_temp_dir, create_temp_file, load_fixture};

const TIMEOUT: Duration = Duration::from_secs(60);

fn require_toolchain() -> Option<Toolchain> {
    match Toolchain::discover(None) {
        Ok(toolchain) => Some(toolchain),
        Err(_) => {
            eprintln!("skipping: no C toolchain available");
            None
        }
    }
}

fn options(loops: u32, master_seed: u64) -> CampaignOptions {
    CampaignOptions {
        loops,
        master_seed,
        fail_policy: FailPolicy::ContinueOnFail,
        step_timeout: TIMEOUT,
    }
}

fn spec_from(category: &str, name: &str) -> Spec {
    Spec::from_yaml(&load_fixture(category, name)).unwrap()
}

/// Generates, gates and campaigns one fixture; returns the campaign.
fn gate_and_campaign(
    toolchain: &Toolchain,
    spec: &Spec,
    loops: u32,
    master_seed: u64,
) -> cangen::Campaign {
    let dir = create_temp_dir();
    generate(spec).unwrap().write_to_dir(&dir).unwrap();

    let verdict = gate::run(spec, &dir, toolchain, TIMEOUT).expect("gate failed");
    assert!(verdict.passed());
    assert_eq!(verdict.metrics.len(), 3);

    let campaign = roundtrip::run_campaign(spec, &dir, toolchain, &options(loops, master_seed))
        .expect("campaign failed");
    fs::remove_dir_all(dir).ok();
    campaign
}

#[test]
fn single_bit_roundtrips() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "single_bit.ir.yaml");

    let campaign = gate_and_campaign(&toolchain, &spec, 4, 0xC0FFEE);
    assert!(campaign.passed(), "failures: {:?}", campaign.failures);
    assert_eq!(campaign.loops.len(), 4);
}

#[test]
fn nibble_pair_roundtrips() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "nibble_pair.ir.yaml");

    let campaign = gate_and_campaign(&toolchain, &spec, 8, 0xA5A5);
    assert!(campaign.passed(), "failures: {:?}", campaign.failures);
}

#[test]
fn big_endian_word_roundtrips() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "big_endian_word.ir.yaml");

    let campaign = gate_and_campaign(&toolchain, &spec, 8, 0x1234);
    assert!(campaign.passed(), "failures: {:?}", campaign.failures);
}

#[test]
fn mixed_orders_roundtrip_across_messages() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "mixed_orders.ir.yaml");

    let campaign = gate_and_campaign(&toolchain, &spec, 6, 0xFEEDFACE);
    assert!(campaign.passed(), "failures: {:?}", campaign.failures);
    for outcome in &campaign.loops {
        assert_eq!(outcome.messages.len(), 2);
    }
}

#[test]
fn campaigns_are_reproducible() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "mixed_orders.ir.yaml");

    let first = gate_and_campaign(&toolchain, &spec, 3, 99);
    let second = gate_and_campaign(&toolchain, &spec, 3, 99);

    assert_eq!(first.loop_seeds, second.loop_seeds);
    let outcomes = |campaign: &cangen::Campaign| {
        campaign
            .loops
            .iter()
            .flat_map(|l| l.messages.iter().map(|m| (m.message.clone(), m.passed)))
            .collect::<Vec<_>>()
    };
    assert_eq!(outcomes(&first), outcomes(&second));
}

#[test]
fn injected_decoder_bug_is_caught_as_value_mismatch() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "nibble_pair.ir.yaml");

    let dir = create_temp_dir();
    let sources = generate(&spec).unwrap();
    // Sabotage the decoder of the 4-bit low nibble: off by one, wrapped to
    // the field width.
    let sabotaged = sources
        .source
        .replace("out->low_nibble = raw;", "out->low_nibble = (raw + 1) & 0xf;");
    assert_ne!(sabotaged, sources.source, "mutation did not apply");
    fs::write(dir.join(&sources.header_name), &sources.header).unwrap();
    fs::write(dir.join(&sources.source_name), sabotaged).unwrap();

    // Three loops under continue-on-fail: every loop hits the bug, and each
    // one must still be judged from its own transcript block.
    let campaign = roundtrip::run_campaign(&spec, &dir, &toolchain, &options(3, 7))
        .expect("campaign failed");

    assert!(!campaign.passed());
    assert!(!campaign.stopped_early);
    assert_eq!(campaign.loops.len(), 3);
    assert_eq!(campaign.failures.len(), 3);
    for (index, failure) in campaign.failures.iter().enumerate() {
        assert_eq!(failure.loop_index, index as u32);
        assert_eq!(failure.property, RoundtripProperty::ValueMismatch);
    }

    let failure = &campaign.failures[0];
    assert_eq!(failure.loop_index, 0);
    assert!(failure.message == "nibbles");
    // Both the sampled input and the observed output are captured.
    assert!(failure.input.contains_key("low_nibble"));
    assert!(failure.decoded.contains_key("low_nibble"));
    assert_ne!(failure.input["low_nibble"], failure.decoded["low_nibble"]);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn tampered_artifact_fails_the_gate() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "single_bit.ir.yaml");

    let dir = create_temp_dir();
    let sources = generate(&spec).unwrap();
    sources.write_to_dir(&dir).unwrap();
    let mut tampered = fs::read_to_string(dir.join(&sources.source_name)).unwrap();
    tampered.push_str("\n/* drift */\n");
    fs::write(dir.join(&sources.source_name), tampered).unwrap();

    let err = gate::run(&spec, &dir, &toolchain, TIMEOUT).unwrap_err();
    assert!(matches!(err, cangen::GateError::DeterminismMismatch { .. }));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn full_pipeline_writes_the_expected_layout() {
    let Some(_) = require_toolchain() else { return };
    let out = create_temp_dir();
    let ir = create_temp_file(&load_fixture("valid", "mixed_orders.ir.yaml"), "yaml");

    let config = Config { output_root: out.clone(), default_loops: 3, ..Config::default() };
    let outcome = Pipeline::new(config).run(&ir, 0xBADC0DE).expect("pipeline failed");

    assert!(outcome.campaign.passed());
    assert!(out.join("output/drivetrain.ir.yaml").exists());
    assert!(out.join("gen/drivetrain_protocol.h").exists());
    assert!(out.join("gen/drivetrain_protocol.c").exists());
    assert!(outcome.reports.summary.exists());
    assert!(outcome.reports.error.is_none());

    // The summary is a well-formed canonical mapping.
    let body = fs::read_to_string(&outcome.reports.summary).unwrap();
    let value: serde_yml::Value = serde_yml::from_str(&body).unwrap();
    let mapping = value.as_mapping().unwrap();
    for key in ["timestamp", "tool_version", "ir_sha256", "master_seed", "loop_seeds", "loops"] {
        let key = serde_yml::Value::String(key.to_string());
        assert!(mapping.contains_key(&key), "summary is missing '{key:?}'");
    }

    fs::remove_file(ir).ok();
    fs::remove_dir_all(out).ok();
}

#[test]
fn stop_on_fail_halts_a_sabotaged_campaign() {
    let Some(toolchain) = require_toolchain() else { return };
    let spec = spec_from("valid", "nibble_pair.ir.yaml");

    let dir = create_temp_dir();
    let sources = generate(&spec).unwrap();
    let sabotaged = sources
        .source
        .replace("out->low_nibble = raw;", "out->low_nibble = (raw + 1) & 0xf;");
    fs::write(dir.join(&sources.header_name), &sources.header).unwrap();
    fs::write(dir.join(&sources.source_name), sabotaged).unwrap();

    let mut options = options(5, 21);
    options.fail_policy = FailPolicy::StopOnFail;
    let campaign = roundtrip::run_campaign(&spec, &dir, &toolchain, &options).unwrap();

    assert!(campaign.stopped_early);
    assert_eq!(campaign.failures.len(), 1);
    assert_eq!(campaign.loops.len(), 1);
    // All five planned seeds are still recorded for reproduction.
    assert_eq!(campaign.loop_seeds.len(), 5);

    fs::remove_dir_all(dir).ok();
}
