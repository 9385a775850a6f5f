pub mod kv;
pub mod state;
pub mod store;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use state::FilterState;
pub use store::FilterStore;
