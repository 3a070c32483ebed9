use crate::Error;
use crate::crypto::{derive_secrets, hmac_sha256};
use crate::types::{X25519PublicKey, X25519Secret};
use zeroize::{Zeroize, ZeroizeOnDrop};

const MESSAGE_KEY_SEED: &[u8] = &[0x01];
const CHAIN_KEY_SEED: &[u8] = &[0x02];

const WHISPER_MESSAGE_KEYS: &[u8] = b"WhisperMessageKeys";
const WHISPER_RATCHET: &[u8] = b"WhisperRatchet";

/// Symmetric ratchet chain for deriving message keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct ChainKey {
    key: Box<[u8; 32]>,
    index: u32,
}

impl ChainKey {
    pub(crate) fn new(key: Box<[u8; 32]>, index: u32) -> Self {
        Self { key, index }
    }

    pub(crate) fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    /// The chain key one step further along.
    pub(crate) fn next(&self) -> Result<Self, Error> {
        let next_key = hmac_sha256(self.key.as_slice(), CHAIN_KEY_SEED)?;
        let index = self
            .index
            .checked_add(1)
            .ok_or_else(|| Error::InvalidMessage("Chain index overflow".to_string()))?;
        Ok(Self::new(Box::new(next_key), index))
    }

    /// Message keys for the current index.
    pub(crate) fn message_keys(&self) -> Result<MessageKeys, Error> {
        let mut seed = hmac_sha256(self.key.as_slice(), MESSAGE_KEY_SEED)?;
        let keys = MessageKeys::derive(&seed, self.index);
        seed.zeroize();
        keys
    }
}

/// Per-message cipher key, MAC key and IV.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct MessageKeys {
    cipher_key: [u8; 32],
    mac_key: [u8; 32],
    iv: [u8; 16],
    counter: u32,
}

impl MessageKeys {
    fn derive(seed: &[u8; 32], counter: u32) -> Result<Self, Error> {
        let okm = derive_secrets(seed, None, WHISPER_MESSAGE_KEYS, 80)?;

        let mut keys = Self {
            cipher_key: [0u8; 32],
            mac_key: [0u8; 32],
            iv: [0u8; 16],
            counter,
        };
        keys.cipher_key.copy_from_slice(&okm[0..32]);
        keys.mac_key.copy_from_slice(&okm[32..64]);
        keys.iv.copy_from_slice(&okm[64..80]);
        Ok(keys)
    }

    pub(crate) fn new(cipher_key: [u8; 32], mac_key: [u8; 32], iv: [u8; 16], counter: u32) -> Self {
        Self {
            cipher_key,
            mac_key,
            iv,
            counter,
        }
    }

    pub(crate) fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    pub(crate) fn mac_key(&self) -> &[u8; 32] {
        &self.mac_key
    }

    pub(crate) fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub(crate) fn counter(&self) -> u32 {
        self.counter
    }
}

/// Root of the asymmetric ratchet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct RootKey {
    key: Box<[u8; 32]>,
}

impl RootKey {
    pub(crate) fn new(key: Box<[u8; 32]>) -> Self {
        Self { key }
    }

    pub(crate) fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// DH ratchet step: mixes a fresh agreement into the root key and
    /// returns the next root key with the chain it seeds.
    pub(crate) fn create_chain(
        &self,
        their_ratchet_key: &X25519PublicKey,
        our_ratchet_key: &X25519Secret,
    ) -> Result<(RootKey, ChainKey), Error> {
        let shared_secret = our_ratchet_key.dh(their_ratchet_key)?;
        let okm = derive_secrets(
            shared_secret.as_slice(),
            Some(self.key.as_slice()),
            WHISPER_RATCHET,
            64,
        )?;

        let mut root_key = Box::new([0u8; 32]);
        let mut chain_key = Box::new([0u8; 32]);
        root_key.copy_from_slice(&okm[0..32]);
        chain_key.copy_from_slice(&okm[32..64]);

        Ok((RootKey::new(root_key), ChainKey::new(chain_key, 0)))
    }
}
