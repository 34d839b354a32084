//! Job execution engine

pub mod error;
pub mod executor;

pub use error::AttemptError;
pub use executor::{Executor, Outcome};
