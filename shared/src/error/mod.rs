//! Failure classification shared across crates

mod category;

pub use category::FailureKind;
