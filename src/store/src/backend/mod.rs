//! Storage backend implementations

pub mod memory;
pub mod sled;
pub mod unavailable;

pub use self::memory::MemoryStore;
pub use self::sled::SledStore;
pub use self::unavailable::UnavailableStore;
