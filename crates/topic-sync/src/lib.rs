//! Forum topic membership sync.
//!
//! Keeps the allow-lists of forum topics in line with the member roster of the
//! reference entity (e.g. a project) they belong to. The engine resolves the
//! roster, reads every linked topic's allow-list, plans the minimal grants and
//! revocations and applies them.
//!
//! External systems are reached through the traits in [`traits`];
//! [`client::ForumClient`], [`roster::HttpRosterSource`] and the stores in
//! [`store`] are the shipped implementations.

pub mod allow_list;
pub mod auth;
pub mod client;
pub mod error;
pub mod identity;
pub mod mutator;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod roster;
pub mod store;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::{ForumClientError, ForumClientResult, SyncError, SyncErrorKind, SyncResult};
pub use identity::{ForumUsername, MemberId, TopicId, SYSTEM_USERNAME};
pub use orchestrator::{SyncOrchestrator, SyncRequest};
pub use report::SyncReport;
