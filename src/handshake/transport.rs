use crate::Error;
use crate::crypto::{aes_gcm_decrypt, aes_gcm_encrypt, counter_nonce};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Directional keys produced by a finished handshake.
pub struct TransportKeys {
    write_key: Zeroizing<[u8; 32]>,
    read_key: Zeroizing<[u8; 32]>,
}

impl TransportKeys {
    pub(crate) fn new(write_key: [u8; 32], read_key: [u8; 32]) -> Self {
        Self {
            write_key: Zeroizing::new(write_key),
            read_key: Zeroizing::new(read_key),
        }
    }

    pub fn write_key(&self) -> &[u8; 32] {
        &self.write_key
    }

    pub fn read_key(&self) -> &[u8; 32] {
        &self.read_key
    }

    /// Returns the `(writer, reader)` ciphers for one connection.
    pub fn split(self) -> (TransportCipher, TransportCipher) {
        (
            TransportCipher::new(*self.write_key),
            TransportCipher::new(*self.read_key),
        )
    }
}

/// AES-GCM for one direction of a connection, with its own nonce counter.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct TransportCipher {
    key: [u8; 32],
    counter: u64,
}

impl TransportCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key, counter: 0 }
    }

    /// Frames processed so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = self.next_nonce()?;
        aes_gcm_encrypt(&self.key, &nonce, plaintext, &[])
    }

    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce = self.next_nonce()?;
        aes_gcm_decrypt(&self.key, &nonce, ciphertext, &[])
    }

    fn next_nonce(&mut self) -> Result<[u8; 12], Error> {
        let nonce = counter_nonce(self.counter);
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| Error::Handshake("Transport nonce counter exhausted".to_string()))?;
        Ok(nonce)
    }
}
