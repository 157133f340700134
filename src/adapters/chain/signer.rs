//! Keystore Signer - Decrypt the Relay Signing Key
//!
//! The private key never exists in plaintext on disk: it is decrypted
//! from an encrypted JSON keystore with the operator's password once at
//! startup.

use std::path::Path;

use alloy::signers::local::{LocalSignerError, PrivateKeySigner};
use tracing::{info, instrument};

use crate::config::StartupError;

/// Decrypt `path` with `password` into a local signer.
#[instrument(skip(password), fields(path = %path.display()))]
pub fn decrypt_keystore(path: &Path, password: &str) -> Result<PrivateKeySigner, StartupError> {
    if password.is_empty() {
        return Err(StartupError::MissingPassword);
    }

    let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| match e {
        LocalSignerError::EcdsaError(_) => StartupError::MalformedKey {
            path: path.display().to_string(),
        },
        other => StartupError::Decryption {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    })?;

    info!(signer = %signer.address(), "Keystore decrypted");
    Ok(signer)
}
