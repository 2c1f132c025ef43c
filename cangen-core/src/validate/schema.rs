//! Layer-0 (structural) validation.
//!
//! serde already guarantees types, required fields and the closed key set;
//! this pass adds the primitive-range constraints the type system cannot
//! express. Every finding carries a JSON-pointer-style path into the
//! document.

use crate::error::SchemaIssue;
use crate::ir::{IR_VERSION, Spec};

/// Inclusive DLC bounds. 1..=64 covers the CAN-FD envelope; classic-CAN
/// 0..8 is deliberately not enforced here.
pub const DLC_RANGE: std::ops::RangeInclusive<u8> = 1..=64;

/// Inclusive signal width bounds: everything must fit 64-bit storage.
pub const BIT_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 1..=64;

fn issue(issues: &mut Vec<SchemaIssue>, path: String, message: String) {
    issues.push(SchemaIssue { path, message });
}

/// Runs the layer-0 pass, returning every structural issue found.
pub fn validate(spec: &Spec) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    if spec.ir_version != IR_VERSION {
        issue(
            &mut issues,
            "/ir_version".into(),
            format!(
                "unsupported ir_version '{}', expected '{}'",
                spec.ir_version, IR_VERSION
            ),
        );
    }
    if spec.meta.name.is_empty() {
        issue(&mut issues, "/meta/name".into(), "name must not be empty".into());
    }

    for (m, message) in spec.messages.iter().enumerate() {
        let base = format!("/messages/{m}");
        if message.name.is_empty() {
            issue(&mut issues, format!("{base}/name"), "name must not be empty".into());
        }
        if !DLC_RANGE.contains(&message.dlc) {
            issue(
                &mut issues,
                format!("{base}/dlc"),
                format!(
                    "dlc {} outside {}..={}",
                    message.dlc,
                    DLC_RANGE.start(),
                    DLC_RANGE.end()
                ),
            );
        }

        for (s, signal) in message.signals.iter().enumerate() {
            let base = format!("{base}/signals/{s}");
            if signal.name.is_empty() {
                issue(&mut issues, format!("{base}/name"), "name must not be empty".into());
            }
            if !BIT_LENGTH_RANGE.contains(&signal.bit_length) {
                issue(
                    &mut issues,
                    format!("{base}/bit_length"),
                    format!(
                        "bit_length {} outside {}..={}",
                        signal.bit_length,
                        BIT_LENGTH_RANGE.start(),
                        BIT_LENGTH_RANGE.end()
                    ),
                );
            }
        }
    }

    issues
}
