//! Infrastructure adapters for stores and external collaborators.

pub mod directory;
pub mod notifier;
pub mod store;

pub use directory::InMemoryCourseDirectory;
pub use notifier::{InMemoryNotifier, PromotionNotice};
pub use store::{InMemoryAdmissionStore, PostgresSchema};
