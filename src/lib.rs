pub mod build;
pub mod cli;
pub mod config;
pub mod notifications;

pub use build::{BuildRecord, ChangeEntry, Verdict};
pub use notifications::{classify, compose, BuildOutcome, Delivery, Notifier};
