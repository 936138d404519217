//! # Deadbolt Store
//!
//! String-keyed storage backends shared by the Deadbolt vault components.
//!
//! Everything the vault persists flows through the [`KeyValueStore`] trait so
//! the rest of the system never knows which engine sits underneath. Three
//! backends ship with the crate:
//!
//! - [`SledStore`]: durable, file-backed storage for real deployments
//! - [`MemoryStore`]: process-local storage for session state and tests
//! - [`UnavailableStore`]: a null backend for contexts with no persistence
//!
//! Callers that can run without durable storage (ephemeral containers,
//! read-only profiles) wire in [`UnavailableStore`] and handle
//! [`StoreError::Unavailable`] instead of crashing.

pub mod backend;
pub mod error;
pub mod kv;

pub use backend::{MemoryStore, SledStore, UnavailableStore};
pub use error::{Result, StoreError};
pub use kv::KeyValueStore;
