//! Naming policy for generated C identifiers.
//!
//! All public names in the generated sources are derived purely from IR
//! content: names are sanitized to lowercase snake_case, and every public
//! symbol carries the fixed vendor prefix plus the sanitized Spec name so
//! that two generated protocols can never collide in one translation unit.

use cangen_core::ir::Message;

/// Fixed vendor prefix carried by every public generated symbol.
pub const VENDOR_PREFIX: &str = "cg";

/// Converts a name to a stable lowercase snake_case C identifier.
///
/// Camel-case boundaries become underscores, every non-alphanumeric
/// character maps to an underscore, runs collapse to one, and a leading
/// digit is prefixed with `x` so the result is always a valid identifier.
///
/// # Examples
///
/// ```
/// use cangen_codegen::naming::sanitize;
/// assert_eq!(sanitize("MotorStatus"), "motor_status");
/// assert_eq!(sanitize("Cell-Voltage #3"), "cell_voltage_3");
/// assert_eq!(sanitize("2fast"), "x2fast");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if c.is_ascii_uppercase() && (prev_lower || next_lower) && !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    // Collapse underscore runs and trim the edges.
    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    let trimmed = collapsed.trim_matches('_');

    match trimmed.chars().next() {
        None => "x".to_string(),
        Some(c) if c.is_ascii_digit() => format!("x{trimmed}"),
        _ => trimmed.to_string(),
    }
}

/// Uppercase variant of [`sanitize`] for macro names.
pub fn shout(name: &str) -> String {
    sanitize(name).to_uppercase()
}

/// The naming policy bound to one Spec.
///
/// Pure: every method is a function of the sanitized Spec name and its
/// argument, nothing else.
#[derive(Debug, Clone)]
pub struct Naming {
    spec: String,
}

impl Naming {
    pub fn new(spec_name: &str) -> Self {
        Self { spec: sanitize(spec_name) }
    }

    /// Sanitized Spec name, e.g. `drivetrain`.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Lowercase symbol prefix, e.g. `cg_drivetrain`.
    pub fn symbol_prefix(&self) -> String {
        format!("{VENDOR_PREFIX}_{}", self.spec)
    }

    /// Uppercase macro prefix, e.g. `CG_DRIVETRAIN`.
    pub fn macro_prefix(&self) -> String {
        self.symbol_prefix().to_uppercase()
    }

    /// Sanitized message tag, e.g. `motor_status`.
    pub fn message_tag(&self, message: &Message) -> String {
        sanitize(&message.name)
    }

    /// Struct type name, e.g. `cg_drivetrain_motor_status_t`.
    pub fn struct_name(&self, message: &Message) -> String {
        format!("{}_{}_t", self.symbol_prefix(), self.message_tag(message))
    }

    /// Encode function name, e.g. `cg_drivetrain_encode_motor_status`.
    pub fn encode_fn(&self, message: &Message) -> String {
        format!("{}_encode_{}", self.symbol_prefix(), self.message_tag(message))
    }

    /// Decode function name, e.g. `cg_drivetrain_decode_motor_status`.
    pub fn decode_fn(&self, message: &Message) -> String {
        format!("{}_decode_{}", self.symbol_prefix(), self.message_tag(message))
    }

    /// Frame id macro, e.g. `CG_DRIVETRAIN_MOTOR_STATUS_ID`.
    pub fn id_macro(&self, message: &Message) -> String {
        format!("{}_{}_ID", self.macro_prefix(), shout(&message.name))
    }

    /// DLC macro, e.g. `CG_DRIVETRAIN_MOTOR_STATUS_DLC`.
    pub fn dlc_macro(&self, message: &Message) -> String {
        format!("{}_{}_DLC", self.macro_prefix(), shout(&message.name))
    }

    /// Struct field name of a signal.
    pub fn field(&self, signal_name: &str) -> String {
        sanitize(signal_name)
    }

    /// Generated header file name, e.g. `drivetrain_protocol.h`.
    pub fn header_file(&self) -> String {
        format!("{}_protocol.h", self.spec)
    }

    /// Generated implementation file name, e.g. `drivetrain_protocol.c`.
    pub fn source_file(&self) -> String {
        format!("{}_protocol.c", self.spec)
    }

    /// Include guard macro, e.g. `CG_DRIVETRAIN_PROTOCOL_H`.
    pub fn include_guard(&self) -> String {
        format!("{}_PROTOCOL_H", self.macro_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_maps_camel_case() {
        assert_eq!(sanitize("MotorStatus"), "motor_status");
        assert_eq!(sanitize("motorStatus"), "motor_status");
        assert_eq!(sanitize("SSR"), "ssr");
        assert_eq!(sanitize("Mode3a"), "mode3a");
    }

    #[test]
    fn sanitize_collapses_separator_runs() {
        assert_eq!(sanitize("a--b__c  d"), "a_b_c_d");
        assert_eq!(sanitize("__edge__"), "edge");
    }

    #[test]
    fn sanitize_prefixes_leading_digit() {
        assert_eq!(sanitize("2fast"), "x2fast");
        assert_eq!(sanitize("4WD_Active"), "x4wd_active");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize(""), "x");
        assert_eq!(sanitize("---"), "x");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["MotorStatus", "2fast", "a--b", "already_snake"] {
            let once = sanitize(name);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn policy_prefixes_every_public_name() {
        use cangen_core::ir::Message;

        let naming = Naming::new("DriveTrain");
        let message = Message {
            id: 0x100,
            name: "MotorStatus".into(),
            dlc: 8,
            signals: vec![],
        };

        assert_eq!(naming.struct_name(&message), "cg_drive_train_motor_status_t");
        assert_eq!(naming.encode_fn(&message), "cg_drive_train_encode_motor_status");
        assert_eq!(naming.decode_fn(&message), "cg_drive_train_decode_motor_status");
        assert_eq!(naming.id_macro(&message), "CG_DRIVE_TRAIN_MOTOR_STATUS_ID");
        assert_eq!(naming.dlc_macro(&message), "CG_DRIVE_TRAIN_MOTOR_STATUS_DLC");
        assert_eq!(naming.header_file(), "drive_train_protocol.h");
        assert_eq!(naming.include_guard(), "CG_DRIVE_TRAIN_PROTOCOL_H");
    }
}
