//! Utility functions.
//!
//! Numerical tolerance contexts and small slice helpers.

pub mod numerics;

pub use numerics::NumberContext;
