//! Reversible byte-wise obfuscation of output files.
//!
//! The transform is keyed by a caller-supplied non-empty key and by the
//! byte's zero-based offset within the stream being transformed. The offset
//! restarts at 0 for every file and must be identical between the encrypt
//! and decrypt passes or the round trip breaks. All arithmetic is unsigned
//! 8-bit with wraparound.

use crate::{Error, Result};

/// Key for the byte transform. Guaranteed to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey(Vec<u8>);

impl EncryptionKey {
    /// Creates a new [`EncryptionKey`]. An empty key is rejected here so that
    /// it cannot fail halfway through a stream.
    ///
    /// # Example
    ///
    /// ```rust
    /// use contentpipe_pipeline::EncryptionKey;
    /// let key = EncryptionKey::new("my-passphrase").unwrap();
    /// assert_eq!(key.as_bytes(), &b"my-passphrase"[..]);
    /// ```
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::EmptyEncryptionKey);
        }
        Ok(Self(key))
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypts the byte at offset `i` of the stream. `key` must not be empty.
pub fn encrypt_byte(c: u8, i: usize, key: &[u8]) -> u8 {
    let k = key[i % key.len()];
    (c ^ !k).wrapping_add(k).wrapping_sub(i as u8)
}

/// Inverse of [`encrypt_byte`] for the same offset and key.
pub fn decrypt_byte(c: u8, i: usize, key: &[u8]) -> u8 {
    let k = key[i % key.len()];
    c.wrapping_sub(k).wrapping_add(i as u8) ^ !k
}

/// Encrypts `data` in place, with the offset counting from 0.
pub fn encrypt_bytes(data: &mut [u8], key: &EncryptionKey) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = encrypt_byte(*byte, i, key.as_bytes());
    }
}

/// Decrypts `data` in place, with the offset counting from 0.
pub fn decrypt_bytes(data: &mut [u8], key: &EncryptionKey) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = decrypt_byte(*byte, i, key.as_bytes());
    }
}
