use crate::types::{X25519PublicKey, X25519Secret};
use crate::{Error, IdentityKeyPair};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// A medium-term signed pre-key.
///
/// The public key, serialized with its type byte, is signed by the owner's
/// identity key so initiators can authenticate it before use.
#[derive(Clone)]
pub struct SignedPreKeyRecord {
    id: u32,
    key_pair: X25519Secret,
    signature: [u8; 64],
    timestamp: u64,
}

impl SignedPreKeyRecord {
    /// Creates and signs a new signed pre-key with the given ID.
    pub fn generate(id: u32, identity: &IdentityKeyPair) -> Result<Self, Error> {
        let key_pair = X25519Secret::generate()?;
        let signature = identity.sign(&key_pair.public_key().serialize());
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Ok(Self {
            id,
            key_pair,
            signature,
            timestamp,
        })
    }

    pub fn new(id: u32, key_pair: X25519Secret, signature: [u8; 64], timestamp: u64) -> Self {
        Self {
            id,
            key_pair,
            signature,
            timestamp,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.key_pair.public_key()
    }

    pub(crate) fn key_pair(&self) -> &X25519Secret {
        &self.key_pair
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Serializes the private key material.
    ///
    /// Layout: id (4, big-endian) || timestamp (8, big-endian) || signature (64) || private key (32).
    pub fn to_bytes(&self) -> Zeroizing<[u8; 108]> {
        let mut bytes = Zeroizing::new([0u8; 108]);
        bytes[0..4].copy_from_slice(&self.id.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.timestamp.to_be_bytes());
        bytes[12..76].copy_from_slice(&self.signature);
        bytes[76..].copy_from_slice(self.key_pair.as_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for SignedPreKeyRecord {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 108 {
            return Err(Error::Serde(format!(
                "Signed pre-key record must be 108 bytes, got {}",
                bytes.len()
            )));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[4..12]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[12..76]);

        Ok(Self {
            id: u32::from_be_bytes(id),
            key_pair: X25519Secret::try_from(&bytes[76..])?,
            signature,
            timestamp: u64::from_be_bytes(timestamp),
        })
    }
}
