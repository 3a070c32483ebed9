//! Noise-style `XX` handshake state used to establish the encrypted socket.
//!
//! The caller drives the message pattern; this type only tracks the running
//! hash, chaining salt, cipher key and nonce counter.

mod transport;
pub use transport::{TransportCipher, TransportKeys};

use crate::crypto::{aes_gcm_decrypt, aes_gcm_encrypt, counter_nonce, derive_secrets, sha256};
use crate::types::{X25519PublicKey, X25519Secret};
use crate::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Protocol name, zero padded to the hash length.
pub const NOISE_PROTOCOL_NAME: &[u8; 32] = b"Noise_XX_25519_AESGCM_SHA256\0\0\0\0";

/// Which side of the handshake we are; decides how the final keys are split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Running state of one handshake; consumed by [`Handshake::finish`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Handshake {
    #[zeroize(skip)]
    role: Role,
    hash: [u8; 32],
    salt: [u8; 32],
    key: [u8; 32],
    counter: u64,
    poisoned: bool,
}

impl Handshake {
    pub fn new(role: Role, prologue: &[u8]) -> Self {
        let mut handshake = Self {
            role,
            hash: *NOISE_PROTOCOL_NAME,
            salt: *NOISE_PROTOCOL_NAME,
            key: *NOISE_PROTOCOL_NAME,
            counter: 0,
            poisoned: false,
        };
        handshake.authenticate(prologue);
        handshake
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Current handshake hash.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Mixes cleartext handshake data into the hash.
    pub fn authenticate(&mut self, data: &[u8]) {
        let mut input = Vec::with_capacity(self.hash.len() + data.len());
        input.extend_from_slice(&self.hash);
        input.extend_from_slice(data);
        self.hash = sha256(&input);
    }

    /// Encrypts or decrypts one handshake payload.
    ///
    /// The AAD is the hash before the ciphertext is mixed in. A failed
    /// decryption wipes the handshake and every later call fails.
    pub fn cipher(&mut self, bytes: &[u8], encrypting: bool) -> Result<Vec<u8>, Error> {
        self.ensure_usable()?;

        let nonce = counter_nonce(self.counter);
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| Error::Handshake("Nonce counter exhausted".to_string()))?;
        let aad = self.hash;

        if encrypting {
            let ciphertext = aes_gcm_encrypt(&self.key, &nonce, bytes, &aad)?;
            self.authenticate(&ciphertext);
            return Ok(ciphertext);
        }

        self.authenticate(bytes);
        match aes_gcm_decrypt(&self.key, &nonce, bytes, &aad) {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => {
                warn!(role = ?self.role, "Handshake payload failed authentication");
                self.zeroize();
                self.poisoned = true;
                Err(Error::Handshake(err.to_string()))
            }
        }
    }

    /// Derives a new salt and cipher key from `bytes`, resetting the nonce counter.
    pub fn mix_into_key(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.ensure_usable()?;

        let expanded = derive_secrets(bytes, Some(&self.salt), &[], 64)?;
        self.salt.copy_from_slice(&expanded[..32]);
        self.key.copy_from_slice(&expanded[32..]);
        self.counter = 0;
        Ok(())
    }

    /// Mixes the X25519 agreement between `our_secret` and `their_public` into the key.
    pub fn mix_shared_secret(
        &mut self,
        our_secret: &X25519Secret,
        their_public: &X25519PublicKey,
    ) -> Result<(), Error> {
        let shared = our_secret.dh(their_public)?;
        self.mix_into_key(shared.as_slice())
    }

    /// Splits the final salt into the transport keys for our role.
    pub fn finish(self) -> Result<TransportKeys, Error> {
        self.ensure_usable()?;

        let expanded = derive_secrets(&[], Some(&self.salt), &[], 64)?;
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        first.copy_from_slice(&expanded[..32]);
        second.copy_from_slice(&expanded[32..]);

        debug!(role = ?self.role, "Handshake finished");
        Ok(match self.role {
            Role::Initiator => TransportKeys::new(first, second),
            Role::Responder => TransportKeys::new(second, first),
        })
    }

    fn ensure_usable(&self) -> Result<(), Error> {
        if self.poisoned {
            return Err(Error::Handshake(
                "Handshake aborted after an authentication failure".to_string(),
            ));
        }
        Ok(())
    }
}
