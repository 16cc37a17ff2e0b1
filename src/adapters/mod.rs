// Adapters layer: concrete implementations for external systems (file storage, input formats).

pub mod input;
pub mod storage;

pub use storage::LocalStorage;
