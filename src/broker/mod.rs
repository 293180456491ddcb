pub mod engine;
pub mod record;
pub mod sweep;
pub mod topic;

pub use engine::{Broker, RetentionPolicy};
pub use record::Record;
pub use sweep::CompactionTrigger;
pub use topic::FolderName;

#[cfg(test)]
mod tests;
