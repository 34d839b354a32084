//! Builtin actions

mod arithmetic;
mod fetch;
mod fs;
mod sleep;

pub use arithmetic::{AddAction, SubAction};
pub use fetch::FetchAction;
pub use fs::{ReadFileAction, WriteFileAction};
pub use sleep::SleepAction;
