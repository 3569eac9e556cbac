//! Course store backends.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryAdmissionStore;
pub use postgres::PostgresSchema;
