use crate::Error;
use crate::crypto::{derive_secrets, hmac_sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

const MESSAGE_KEY_SEED: &[u8] = &[0x01];
const CHAIN_KEY_SEED: &[u8] = &[0x02];

const WHISPER_GROUP: &[u8] = b"WhisperGroup";

/// Sender chain: a 32-byte seed at a given iteration.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SenderChainKey {
    iteration: u32,
    seed: Box<[u8; 32]>,
}

impl SenderChainKey {
    pub(crate) fn new(iteration: u32, seed: Box<[u8; 32]>) -> Self {
        Self { iteration, seed }
    }

    pub(crate) fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    pub(crate) fn next(&self) -> Result<Self, Error> {
        let seed = hmac_sha256(self.seed.as_slice(), CHAIN_KEY_SEED)?;
        let iteration = self
            .iteration
            .checked_add(1)
            .ok_or_else(|| Error::InvalidMessage("Sender chain iteration overflow".to_string()))?;
        Ok(Self::new(iteration, Box::new(seed)))
    }

    pub(crate) fn sender_message_key(&self) -> Result<SenderMessageKey, Error> {
        let seed = hmac_sha256(self.seed.as_slice(), MESSAGE_KEY_SEED)?;
        SenderMessageKey::new(self.iteration, seed)
    }
}

/// IV and cipher key for one group message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SenderMessageKey {
    iteration: u32,
    seed: [u8; 32],
    iv: [u8; 16],
    cipher_key: [u8; 32],
}

impl SenderMessageKey {
    /// Expands a message seed into IV (first 16 bytes) and cipher key (next 32).
    pub(crate) fn new(iteration: u32, seed: [u8; 32]) -> Result<Self, Error> {
        let okm = derive_secrets(&seed, None, WHISPER_GROUP, 48)?;

        let mut key = Self {
            iteration,
            seed,
            iv: [0u8; 16],
            cipher_key: [0u8; 32],
        };
        key.iv.copy_from_slice(&okm[0..16]);
        key.cipher_key.copy_from_slice(&okm[16..48]);
        Ok(key)
    }

    pub(crate) fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    pub(crate) fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub(crate) fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_chain_is_deterministic() {
        let first = SenderChainKey::new(0, Box::new([4u8; 32]));
        let second = SenderChainKey::new(0, Box::new([4u8; 32]));

        let first_key = first.next().unwrap().sender_message_key().unwrap();
        let second_key = second.next().unwrap().sender_message_key().unwrap();

        assert_eq!(first_key.iteration(), 1);
        assert_eq!(first_key.cipher_key(), second_key.cipher_key());
        assert_eq!(first_key.iv(), second_key.iv());
    }

    #[test]
    fn test_message_key_rebuilds_from_seed() {
        let chain = SenderChainKey::new(9, Box::new([8u8; 32]));
        let key = chain.sender_message_key().unwrap();
        let rebuilt = SenderMessageKey::new(key.iteration(), *key.seed()).unwrap();

        assert_eq!(rebuilt.cipher_key(), key.cipher_key());
        assert_eq!(rebuilt.iv(), key.iv());
        assert_ne!(key.seed(), chain.seed());
    }
}
