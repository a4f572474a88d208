//! Todo domain: the record model, its in-memory store and the operations
//! that mutate it. Mutations are announced through `events::EventPublisher`.

pub use events::Id;

pub mod error;
pub mod query;
pub mod store;
pub mod todo;
pub mod todos;

pub use query::{ListOptions, SortField, SortOrder};
pub use store::Store;
