//! pfc-engine
//!
//! Challenge Evaluation Engine for the prop-firm challenge product.
//!
//! Covers:
//! - Fixed-point money representation
//! - Challenge data model + plan tier table
//! - Factory (create), activation, trade application, day roll
//! - Pass/fail status derivation with loss-precedence rules
//!
//! Deterministic, pure logic. No IO, no async, no clock reads inside the
//! transition functions (callers inject `now`).

mod engine;
mod factory;
mod money;
mod types;

pub use money::Money;
pub use types::*;
