//! Session store implementations for Bookline.

pub mod file_backend;
pub mod in_memory;
pub mod store;

pub use file_backend::FileSessionStore;
pub use in_memory::InMemorySessionStore;
pub use store::SessionStore;
