//! Key store and envelope verification.

use std::collections::HashMap;

use josekit::jwe::alg::rsaes::RsaesJweDecrypter;
use josekit::jwe::{self, RSA_OAEP};
use josekit::jws::alg::rsassa::RsassaJwsVerifier;
use josekit::jws::{self, RS256};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::envelope::{Envelope, TrustedPayload};
use crate::error::{CredentialError, KeyError};

/// Process-wide key material, loaded once and read-only afterwards.
struct KeyMaterial {
    decrypter: RsaesJweDecrypter,
    platforms: HashMap<String, RsassaJwsVerifier>,
}

/// Readiness-gated store for the service private key and the registered
/// platform verification keys.
///
/// Key material arrives asynchronously at startup (the private key from
/// disk, the platform keys from storage). Until [`KeyStore::install`] has
/// run, [`KeyStore::verify`] fails with [`CredentialError::NotReady`]
/// rather than crashing or treating the absent keys as a denial.
pub struct KeyStore {
    material: OnceCell<KeyMaterial>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            material: OnceCell::new(),
        }
    }

    /// Whether key material has been installed.
    pub fn is_ready(&self) -> bool {
        self.material.initialized()
    }

    /// Install the service private key (PKCS#8 PEM) and the platform
    /// public keys (SPKI PEM). Callable exactly once.
    pub fn install(
        &self,
        private_key_pem: &[u8],
        platform_keys: &[(String, String)],
    ) -> Result<(), KeyError> {
        let decrypter = RSA_OAEP
            .decrypter_from_pem(private_key_pem)
            .map_err(KeyError::PrivateKey)?;

        let mut platforms = HashMap::with_capacity(platform_keys.len());
        for (id, pem) in platform_keys {
            let verifier = RS256
                .verifier_from_pem(pem.as_bytes())
                .map_err(|source| KeyError::PlatformKey {
                    platform: id.clone(),
                    source,
                })?;
            platforms.insert(id.clone(), verifier);
        }

        self.material
            .set(KeyMaterial {
                decrypter,
                platforms,
            })
            .map_err(|_| KeyError::AlreadyInstalled)?;
        info!(platforms = platform_keys.len(), "key material installed");
        Ok(())
    }

    /// Decrypt and verify an envelope, yielding its trusted payload and
    /// the proven platform identity.
    ///
    /// Stage order is fixed: registered-platform check (cheap rejection
    /// before any crypto), JWE decryption with the service key, JWS
    /// verification with the claimed platform's key, JSON parse.
    /// Decryption alone does not authenticate the sender; the signature
    /// check is what proves the claimed identity.
    pub fn verify(
        &self,
        envelope: &Envelope,
    ) -> Result<(TrustedPayload, String), CredentialError> {
        let material = self.material.get().ok_or(CredentialError::NotReady)?;
        let verifier = material
            .platforms
            .get(&envelope.platform_id)
            .ok_or_else(|| CredentialError::UnknownPlatform(envelope.platform_id.clone()))?;

        let (plaintext, _header) = jwe::deserialize_compact(&envelope.token, &material.decrypter)
            .map_err(|err| {
                debug!(error = %err, "token decryption failed");
                CredentialError::Decryption
            })?;
        let (payload, _header) =
            jws::deserialize_compact(&plaintext, verifier).map_err(|err| {
                debug!(error = %err, "signature verification failed");
                CredentialError::SignatureInvalid
            })?;
        let payload: TrustedPayload =
            serde_json::from_slice(&payload).map_err(|_| CredentialError::PayloadMalformed)?;
        Ok((payload, envelope.platform_id.clone()))
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}
