//! Contract with the credential vault's cryptographic store

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported when the vault payload could not be destroyed.
#[derive(Debug, Clone, Error)]
#[error("Vault wipe failed: {0}")]
pub struct WipeError(pub String);

/// Capability the credential vault exposes to the guard subsystem.
///
/// The coordinator calls [`wipe`](CredentialVault::wipe) before sweeping
/// persisted settings, so implementations should destroy key material first;
/// once keys are gone the encrypted payload is unreadable even if a later
/// sweep stage fails.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Irreversibly destroy the vault payload.
    async fn wipe(&self) -> std::result::Result<(), WipeError>;
}
