//! Session sealing (AES-256-GCM with a machine-derived key)
//!
//! The persisted session record carries a bearer token. When sealing is on,
//! the record is stored as `nonce || ciphertext` so that copying the
//! database to another machine does not carry the token along.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs;

const NONCE_SIZE: usize = 12;

/// Seals and opens session records
#[derive(Clone)]
pub struct SessionCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

impl SessionCipher {
    /// Cipher keyed to this machine and user
    pub fn for_this_machine() -> Self {
        Self { key: derive_key() }
    }

    /// Cipher with an explicit key
    pub const fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow!("Invalid key length"))
    }

    /// Encrypt `plaintext` under a fresh random nonce
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(nonce, plaintext)
            .map_err(|_| anyhow!("Failed to encrypt session"))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    /// Decrypt a record produced by [`seal`](Self::seal)
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(anyhow!("Sealed session is truncated"));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt session"))
    }
}

/// Machine identifier for key derivation
fn machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Derive the sealing key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();

    if let Some(id) = machine_id() {
        hasher.update(id.as_bytes());
    }
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hasher.update(b"wpreader-session-v1");

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let cipher = SessionCipher::from_key([7; 32]);
        let sealed = cipher.seal(b"{\"token\":\"jwt\"}").unwrap();
        assert_ne!(&sealed[NONCE_SIZE..], b"{\"token\":\"jwt\"}");
        assert_eq!(cipher.open(&sealed).unwrap(), b"{\"token\":\"jwt\"}");
    }

    #[test]
    fn test_wrong_key_cannot_open() {
        let sealed = SessionCipher::from_key([1; 32]).seal(b"token").unwrap();
        assert!(SessionCipher::from_key([2; 32]).open(&sealed).is_err());
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let cipher = SessionCipher::from_key([1; 32]);
        assert!(cipher.open(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_machine_key_is_stable() {
        assert_eq!(derive_key(), derive_key());
    }
}
