//! Two-layer IR validation.
//!
//! [`schema`] (layer 0) checks that a parsed document respects the primitive
//! constraints of the typed model; [`semantic`] (layer 1) checks the
//! cross-field invariants that make bit-level code generation sound. Both
//! passes are pure: they take a `&Spec`, return every issue they find in one
//! sweep, and never mutate the IR. Passing layer 0 is a precondition for
//! running layer 1.

pub mod schema;
pub mod semantic;
