use thiserror::Error;

/// Internal contradiction detected during template expansion.
///
/// Unreachable on a Spec that passed both validation layers; it exists so
/// the generator can refuse to emit nonsense instead of panicking if it is
/// ever handed an unvalidated document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("internal codegen contradiction: {0}")]
    Internal(String),
}
