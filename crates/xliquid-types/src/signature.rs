//! Manager signature verification.
//!
//! Claims and withdrawals are authorized by a vault manager signing the
//! 32-byte authorization hash as an EIP-191 personal message:
//!
//! ```text
//! digest = keccak256("\x19Ethereum Signed Message:\n32" || hash)
//! ```
//!
//! The signature is the 65-byte `r || s || v` form with `v` in `{0, 1, 27, 28}`.
//! Verification recovers the signer address from the digest and checks it
//! against the caller-supplied manager set. There is no other state.

use std::collections::HashSet;

use alloy_primitives::{Address, B256, keccak256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::constants::SIGNATURE_LENGTH;
use crate::{Result, XliquidError};

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// EIP-191 personal-message digest of a 32-byte hash.
#[must_use]
pub fn personal_message_digest(hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(hash.as_slice());
    keccak256(buf)
}

/// Ethereum address of a secp256k1 public key.
#[must_use]
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

/// Stateless verifier for manager-signed authorizations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureAuthorizer;

impl SignatureAuthorizer {
    /// Recover the address that signed `hash` as a personal message.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if the signature is malformed or recovery fails.
    pub fn recover(hash: B256, signature: &[u8]) -> Result<Address> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(XliquidError::invalid_signature(format!(
                "expected {SIGNATURE_LENGTH} bytes, got {}",
                signature.len()
            )));
        }

        let v = match signature[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            other => {
                return Err(XliquidError::invalid_signature(format!(
                    "invalid recovery byte {other}"
                )));
            }
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| XliquidError::invalid_signature("invalid recovery id"))?;
        let sig = Signature::from_slice(&signature[..64])
            .map_err(|e| XliquidError::invalid_signature(format!("bad r/s: {e}")))?;

        let digest = personal_message_digest(hash);
        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
            .map_err(|e| XliquidError::invalid_signature(format!("recovery failed: {e}")))?;
        Ok(address_of(&key))
    }

    /// Recover the signer and require membership in `authorized`.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if recovery fails or the recovered address
    /// is not in `authorized`.
    pub fn verify(authorized: &HashSet<Address>, hash: B256, signature: &[u8]) -> Result<Address> {
        let signer = Self::recover(hash, signature)?;
        if !authorized.contains(&signer) {
            return Err(XliquidError::invalid_signature(format!(
                "signer {signer} is not a vault manager"
            )));
        }
        Ok(signer)
    }
}

/// Deterministic manager keys for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing {
    use alloy_primitives::{Address, B256};
    use k256::ecdsa::SigningKey;

    use super::{address_of, personal_message_digest};

    /// A signing key that produces manager signatures.
    #[derive(Clone)]
    pub struct ManagerKey {
        key: SigningKey,
    }

    impl ManagerKey {
        /// Key derived from a single seed byte (`seed` must be non-zero).
        pub fn from_seed(seed: u8) -> Self {
            let mut secret = [0u8; 32];
            secret[31] = seed;
            secret[0] = 0x11;
            let key = SigningKey::from_slice(&secret).expect("seeded key is a valid scalar");
            Self { key }
        }

        pub fn address(&self) -> Address {
            address_of(self.key.verifying_key())
        }

        /// Sign `hash` as a personal message, `v` encoded as 27/28.
        pub fn sign(&self, hash: B256) -> Vec<u8> {
            let digest = personal_message_digest(hash);
            let (sig, recovery_id) = self
                .key
                .sign_prehash_recoverable(digest.as_slice())
                .expect("prehash signing cannot fail for a 32-byte digest");
            let mut out = sig.to_bytes().to_vec();
            out.push(recovery_id.to_byte() + 27);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManagerKey;
    use super::*;

    fn managers(keys: &[&ManagerKey]) -> HashSet<Address> {
        keys.iter().map(|k| k.address()).collect()
    }

    #[test]
    fn recover_returns_signer() {
        let key = ManagerKey::from_seed(1);
        let hash = keccak256(b"claim");
        let sig = key.sign(hash);
        assert_eq!(SignatureAuthorizer::recover(hash, &sig).unwrap(), key.address());
    }

    #[test]
    fn verify_accepts_manager() {
        let key = ManagerKey::from_seed(1);
        let hash = keccak256(b"claim");
        let sig = key.sign(hash);
        let signer = SignatureAuthorizer::verify(&managers(&[&key]), hash, &sig).unwrap();
        assert_eq!(signer, key.address());
    }

    #[test]
    fn verify_rejects_non_manager() {
        let manager = ManagerKey::from_seed(1);
        let outsider = ManagerKey::from_seed(2);
        let hash = keccak256(b"claim");
        let sig = outsider.sign(hash);
        let err = SignatureAuthorizer::verify(&managers(&[&manager]), hash, &sig).unwrap_err();
        assert!(matches!(err, XliquidError::InvalidSignature { .. }));
    }

    #[test]
    fn verify_rejects_empty_manager_set() {
        let key = ManagerKey::from_seed(1);
        let hash = keccak256(b"claim");
        let sig = key.sign(hash);
        assert!(SignatureAuthorizer::verify(&HashSet::new(), hash, &sig).is_err());
    }

    #[test]
    fn signature_over_other_hash_recovers_someone_else() {
        let key = ManagerKey::from_seed(1);
        let sig = key.sign(keccak256(b"claim-a"));
        let recovered = SignatureAuthorizer::recover(keccak256(b"claim-b"), &sig);
        assert!(recovered.map_or(true, |addr| addr != key.address()));
    }

    #[test]
    fn raw_v_accepted() {
        let key = ManagerKey::from_seed(3);
        let hash = keccak256(b"claim");
        let mut sig = key.sign(hash);
        sig[64] -= 27;
        assert_eq!(SignatureAuthorizer::recover(hash, &sig).unwrap(), key.address());
    }

    #[test]
    fn bad_v_rejected() {
        let key = ManagerKey::from_seed(1);
        let hash = keccak256(b"claim");
        let mut sig = key.sign(hash);
        sig[64] = 29;
        assert!(matches!(
            SignatureAuthorizer::recover(hash, &sig),
            Err(XliquidError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn wrong_length_rejected() {
        let hash = keccak256(b"claim");
        assert!(SignatureAuthorizer::recover(hash, &[0u8; 64]).is_err());
        assert!(SignatureAuthorizer::recover(hash, &[0u8; 65]).is_err());
    }

    #[test]
    fn personal_digest_differs_from_raw_hash() {
        let hash = keccak256(b"claim");
        assert_ne!(personal_message_digest(hash), hash);
    }
}
