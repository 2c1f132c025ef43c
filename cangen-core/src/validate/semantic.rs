//! Layer-1 (semantic) validation.
//!
//! Enforces the cross-field invariants of a Spec: bit layouts stay inside
//! the payload, no two signals of a message share a bit, ranges are ordered,
//! defaults fall inside them, scales are nonzero, enum values are
//! representable, and names/ids are unique. All issues are collected into a
//! single batch; the pass never short-circuits.

use std::collections::HashMap;

use crate::codec::raw_range;
use crate::error::{SemanticCategory, SemanticIssue};
use crate::ir::{Message, Signal, Spec};
use crate::layout::signal_positions;

fn issue(
    issues: &mut Vec<SemanticIssue>,
    category: SemanticCategory,
    path: String,
    message: String,
) {
    issues.push(SemanticIssue { category, path, message });
}

/// Runs the layer-1 pass, returning every semantic issue found.
pub fn validate(spec: &Spec) -> Vec<SemanticIssue> {
    let mut issues = Vec::new();

    check_unique_messages(spec, &mut issues);
    for (m, message) in spec.messages.iter().enumerate() {
        check_message(message, &format!("/messages/{m}"), &mut issues);
    }

    issues
}

fn check_unique_messages(spec: &Spec, issues: &mut Vec<SemanticIssue>) {
    let mut seen_ids: HashMap<u32, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, usize> = HashMap::new();

    for (m, message) in spec.messages.iter().enumerate() {
        if let Some(first) = seen_ids.get(&message.id) {
            issue(
                issues,
                SemanticCategory::DuplicateId,
                format!("/messages/{m}/id"),
                format!(
                    "message id {:#x} already used by '{}'",
                    message.id, spec.messages[*first].name
                ),
            );
        } else {
            seen_ids.insert(message.id, m);
        }

        if seen_names.contains_key(message.name.as_str()) {
            issue(
                issues,
                SemanticCategory::DuplicateName,
                format!("/messages/{m}/name"),
                format!("message name '{}' is not unique", message.name),
            );
        } else {
            seen_names.insert(&message.name, m);
        }
    }
}

fn check_message(message: &Message, base: &str, issues: &mut Vec<SemanticIssue>) {
    let payload_bits = message.dlc as u32 * 8;
    // Owner of each payload bit, by signal index, for overlap reporting.
    let mut owner: Vec<Option<usize>> = vec![None; payload_bits as usize];
    let mut seen_names: HashMap<&str, usize> = HashMap::new();

    for (s, signal) in message.signals.iter().enumerate() {
        let path = format!("{base}/signals/{s}");

        if seen_names.contains_key(signal.name.as_str()) {
            issue(
                issues,
                SemanticCategory::DuplicateName,
                format!("{path}/name"),
                format!("signal name '{}' is not unique within '{}'", signal.name, message.name),
            );
        } else {
            seen_names.insert(&signal.name, s);
        }

        let positions = signal_positions(signal);

        if let Some(&first_out) = positions.iter().find(|&&p| p >= payload_bits) {
            issue(
                issues,
                SemanticCategory::DlcOverflow,
                path.clone(),
                format!(
                    "signal '{}' occupies bit {} outside the {}-byte payload (bits 0..{})",
                    signal.name, first_out, message.dlc, payload_bits
                ),
            );
        }

        let mut overlap_reported = false;
        for &p in positions.iter().filter(|&&p| p < payload_bits) {
            match owner[p as usize] {
                Some(other) if !overlap_reported => {
                    issue(
                        issues,
                        SemanticCategory::BitOverlap,
                        path.clone(),
                        format!(
                            "signal '{}' overlaps '{}' at bit {}",
                            signal.name, message.signals[other].name, p
                        ),
                    );
                    overlap_reported = true;
                }
                Some(_) => {}
                None => owner[p as usize] = Some(s),
            }
        }

        check_signal_fields(signal, &path, issues);
    }
}

fn check_signal_fields(signal: &Signal, path: &str, issues: &mut Vec<SemanticIssue>) {
    if let (Some(min), Some(max)) = (signal.min, signal.max)
        && min >= max
    {
        issue(
            issues,
            SemanticCategory::RangeInverted,
            format!("{path}/min"),
            format!("min {min} is not below max {max}"),
        );
    }

    if let Some(default) = signal.default {
        let below = signal.min.is_some_and(|min| (default as f64) < min);
        let above = signal.max.is_some_and(|max| (default as f64) > max);
        if below || above {
            issue(
                issues,
                SemanticCategory::DefaultOutOfRange,
                format!("{path}/default"),
                format!(
                    "default {} outside [{:?}, {:?}]",
                    default, signal.min, signal.max
                ),
            );
        }
    }

    if signal.scale == 0.0 {
        issue(
            issues,
            SemanticCategory::ScaleZero,
            format!("{path}/scale"),
            format!("signal '{}' has scale 0", signal.name),
        );
    }

    if let Some(entries) = &signal.enumeration {
        let (lo, hi) = raw_range(signal.bit_length, signal.signed);
        let mut seen_labels: HashMap<&str, usize> = HashMap::new();
        let mut seen_values: HashMap<i64, usize> = HashMap::new();

        for (e, entry) in entries.iter().enumerate() {
            let entry_path = format!("{path}/enum/{e}");
            let value = entry.value as i128;
            if value < lo || value > hi {
                issue(
                    issues,
                    SemanticCategory::EnumOutOfRange,
                    format!("{entry_path}/value"),
                    format!(
                        "enum value {} not representable in {} {} bit(s)",
                        entry.value,
                        if signal.signed { "signed" } else { "unsigned" },
                        signal.bit_length
                    ),
                );
            }
            if seen_labels.insert(&entry.name, e).is_some() {
                issue(
                    issues,
                    SemanticCategory::DuplicateName,
                    format!("{entry_path}/name"),
                    format!("enum label '{}' is not unique", entry.name),
                );
            }
            if seen_values.insert(entry.value, e).is_some() {
                issue(
                    issues,
                    SemanticCategory::DuplicateId,
                    format!("{entry_path}/value"),
                    format!("enum value {} is not unique", entry.value),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SemanticCategory;
    use crate::ir::Spec;
    use test_utils::load_fixture;

    fn load(category: &str, name: &str) -> Spec {
        Spec::from_yaml(&load_fixture(category, name)).unwrap()
    }

    #[test]
    fn valid_spec_has_no_issues() {
        let spec = load("valid", "mixed_orders.ir.yaml");
        assert!(validate(&spec).is_empty());
    }

    #[test]
    fn scale_zero_is_the_only_issue() {
        let spec = load("invalid", "scale_zero.ir.yaml");
        let issues = validate(&spec);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::ScaleZero);
        assert_eq!(issues[0].path, "/messages/0/signals/0/scale");
    }

    #[test]
    fn overlap_cites_both_signals_without_dlc_overflow() {
        // Two little-endian signals at start bits 0 and 3, both 5 bits, DLC 1.
        let spec = load("invalid", "overlap.ir.yaml");
        let issues = validate(&spec);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::BitOverlap);
        assert!(issues[0].message.contains("second"));
        assert!(issues[0].message.contains("first"));
        assert!(!issues.iter().any(|i| i.category == SemanticCategory::DlcOverflow));
    }

    #[test]
    fn dlc_overflow_cites_first_out_of_range_bit() {
        let spec = load("invalid", "dlc_overflow.ir.yaml");
        let issues = validate(&spec);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::DlcOverflow);
        // Signal spans bits 6..10 of a 1-byte payload; bit 8 is the first out.
        assert!(issues[0].message.contains("bit 8"));
    }

    #[test]
    fn inverted_range_is_reported() {
        let spec = load("invalid", "range_inverted.ir.yaml");
        let issues = validate(&spec);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::RangeInverted);
    }

    #[test]
    fn default_outside_range_is_reported() {
        let mut spec = load("valid", "mixed_orders.ir.yaml");
        let signal = &mut spec.messages[0].signals[0];
        signal.min = Some(0.0);
        signal.max = Some(100.0);
        signal.default = Some(200);

        let issues = validate(&spec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::DefaultOutOfRange);
    }

    #[test]
    fn enum_value_must_fit_width() {
        let spec = load("invalid", "enum_out_of_range.ir.yaml");
        let issues = validate(&spec);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::EnumOutOfRange);
        assert_eq!(issues[0].path, "/messages/0/signals/0/enum/2/value");
    }

    #[test]
    fn negative_enum_value_fits_signed_width() {
        let mut spec = load("valid", "mixed_orders.ir.yaml");
        let signal = &mut spec.messages[0].signals[1];
        assert!(signal.signed);
        signal.enumeration = Some(vec![
            crate::ir::EnumEntry { name: "low".into(), value: -2048 },
            crate::ir::EnumEntry { name: "high".into(), value: 2047 },
        ]);

        assert!(validate(&spec).is_empty());
    }

    #[test]
    fn duplicate_message_ids_and_names_are_reported() {
        let mut spec = load("valid", "mixed_orders.ir.yaml");
        let mut dup = spec.messages[0].clone();
        dup.signals.clear();
        spec.messages.push(dup);

        let issues = validate(&spec);
        assert!(issues.iter().any(|i| i.category == SemanticCategory::DuplicateId));
        assert!(issues.iter().any(|i| i.category == SemanticCategory::DuplicateName));
    }

    #[test]
    fn duplicate_signal_name_is_reported() {
        let mut spec = load("valid", "single_bit.ir.yaml");
        let mut dup = spec.messages[0].signals[0].clone();
        dup.start_bit = 1;
        spec.messages[0].signals.push(dup);

        let issues = validate(&spec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, SemanticCategory::DuplicateName);
    }

    #[test]
    fn issues_accumulate_across_signals() {
        let mut spec = load("valid", "mixed_orders.ir.yaml");
        spec.messages[0].signals[0].scale = 0.0;
        spec.messages[0].signals[1].scale = 0.0;

        assert_eq!(validate(&spec).len(), 2);
    }
}
