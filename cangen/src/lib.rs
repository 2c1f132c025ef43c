//! cangen - verified C codec generation for CAN-style bus specifications.
//!
//! This crate ties the core model and the code generator into the full
//! verification pipeline:
//!
//! - [`config`] - the small configuration value driving a run
//! - [`gate`] - the codegen gate (determinism, presence, native compile)
//! - [`toolchain`] - native toolchain discovery and subprocess capability
//! - [`roundtrip`] - the seeded randomized roundtrip campaign
//! - [`report`] - canonical summary and error reports
//! - [`pipeline`] - the orchestration running all of the above in order
//!
//! The model and generator crates are re-exported for single-import usage.

pub mod config;
pub mod gate;
pub mod hash;
pub mod pipeline;
pub mod report;
pub mod roundtrip;
pub mod toolchain;

/// Re-export of cangen-core: IR model, validators, layout engine, codec.
pub mod model {
    pub use cangen_core::*;
}

/// Re-export of cangen-codegen: naming policy and C source generation.
pub mod codegen {
    pub use cangen_codegen::*;
}

pub use config::{Config, FailPolicy};
pub use gate::{GateError, GateVerdict};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome};
pub use roundtrip::{Campaign, CampaignOptions, RoundtripError, RoundtripProperty};
pub use toolchain::Toolchain;
