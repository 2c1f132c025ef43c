//! Deterministic C code generation from a validated Spec.
//!
//! Two modules do the work:
//!
//! - [`naming`] - the pure naming policy mapping IR names to C identifiers
//! - [`generate`] - string-builder rendering of the protocol header and
//!   implementation sources
//!
//! Everything emitted is a pure function of the IR bytes: signal iteration
//! follows IR order, identifiers come from the naming policy alone, and no
//! timestamp, host path or map iteration order can leak into the output.

pub mod error;
pub mod generate;
pub mod naming;

pub use error::CodegenError;
pub use generate::{GeneratedSources, generate};
pub use naming::Naming;
