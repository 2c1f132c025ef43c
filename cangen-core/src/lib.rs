//! Core model for CAN protocol code generation.
//!
//! This crate holds everything the generator and the verifier share:
//!
//! - [`ir`] - the typed intermediate representation of a bus specification
//!   and its canonical YAML form
//! - [`validate`] - the structural (layer 0) and semantic (layer 1)
//!   validation passes
//! - [`layout`] - the bit-layout engine mapping signals to absolute payload
//!   bit positions for both byte orders
//! - [`codec`] - the reference bit-field encoder/decoder mirroring the
//!   semantics of the generated C sources
//! - [`error`] - the shared error taxonomy

pub mod codec;
pub mod error;
pub mod ir;
pub mod layout;
pub mod validate;

pub use error::{CodecError, SchemaError, SchemaIssue, SemanticCategory, SemanticError, SemanticIssue};
pub use ir::{BusType, ByteOrder, EnumEntry, Message, Meta, Signal, Spec};
