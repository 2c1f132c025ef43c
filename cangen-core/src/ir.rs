//! Typed intermediate representation of a bus specification.
//!
//! The IR is the canonical, diff-stable form every other component consumes.
//! Its on-disk shape is a UTF-8 YAML mapping with a closed schema: unknown
//! keys are rejected so forward compatibility stays explicit through
//! [`Spec::ir_version`]. Serialization preserves struct declaration order,
//! which makes parse-then-emit bytewise stable.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The IR version this crate reads and writes.
pub const IR_VERSION: &str = "1.0";

/// Root of a validated bus specification.
///
/// Identity of a Spec is the `(meta.name, meta.source)` tuple. Entities are
/// produced once per ingestion and never mutated in place; any fix-up is a
/// pure transformation producing a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spec {
    pub ir_version: String,
    pub meta: Meta,
    pub bus_type: BusType,
    pub messages: Vec<Message>,
}

/// Descriptive metadata carried over from the source description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meta {
    pub name: String,
    pub version: String,
    pub source: String,
    pub format: String,
}

/// Bus family and mode descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusType {
    pub bustype: String,
    pub busmode: String,
}

/// A framed unit on the bus: numeric identifier, payload length in bytes
/// and an ordered sequence of signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub id: u32,
    pub name: String,
    pub dlc: u8,
    pub signals: Vec<Signal>,
}

/// A named bit-field within a message payload.
///
/// `scale`, `offset`, `min` and `max` describe the physical interpretation
/// of the raw value; they are validated but no physical-value conversion is
/// ever generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signal {
    pub name: String,
    pub start_bit: u32,
    pub bit_length: u32,
    pub byte_order: ByteOrder,
    pub signed: bool,
    pub scale: f64,
    pub offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<EnumEntry>>,
}

/// Bit-ordering convention of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Intel: `start_bit` names the LSB, bits ascend through the payload.
    LittleEndian,
    /// Motorola: `start_bit` names the MSB, bytes ascend MSB-first.
    BigEndian,
}

/// One labelled raw value of a signal's enum table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumEntry {
    pub name: String,
    pub value: i64,
}

impl Spec {
    /// Parses a Spec from its canonical YAML form.
    ///
    /// Unknown keys, missing required fields and type mismatches all fail
    /// with [`SchemaError::Parse`].
    pub fn from_yaml(input: &str) -> Result<Spec, SchemaError> {
        Ok(serde_yml::from_str(input)?)
    }

    /// Emits the canonical YAML form: stable key order, UTF-8.
    ///
    /// Round-trip stable: `from_yaml(to_yaml(x)) == x`.
    pub fn to_yaml(&self) -> Result<String, SchemaError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Reads and parses a Spec from a file.
    pub fn load(path: &Path) -> Result<Spec, SchemaError> {
        let input = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Spec::from_yaml(&input)
    }

    /// Writes the canonical YAML form to a file.
    pub fn save(&self, path: &Path) -> Result<(), SchemaError> {
        let output = self.to_yaml()?;
        fs::write(path, output).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
