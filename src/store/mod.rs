//! Durable stores: task entries, status ledger, waiting queue

pub mod ledger;
pub mod tasks;
pub mod waiting;

pub use ledger::StatusLedger;
pub use tasks::TaskStore;
pub use waiting::WaitingQueue;
