use crate::Error;
use crate::types::{X25519PublicKey, X25519Secret};
use zeroize::Zeroizing;

/// A one-time pre-key.
///
/// Each key is handed out in at most one bundle and removed from the store
/// once the first message that references it has been decrypted.
#[derive(Clone)]
pub struct PreKeyRecord {
    id: u32,
    key_pair: X25519Secret,
}

impl PreKeyRecord {
    /// Creates a new one-time pre-key with the given ID.
    pub fn generate(id: u32) -> Result<Self, Error> {
        Ok(Self {
            id,
            key_pair: X25519Secret::generate()?,
        })
    }

    pub fn new(id: u32, key_pair: X25519Secret) -> Self {
        Self { id, key_pair }
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

    /// Serializes as id (4, big-endian) || private key (32).
    pub fn to_bytes(&self) -> Zeroizing<[u8; 36]> {
        let mut bytes = Zeroizing::new([0u8; 36]);
        bytes[0..4].copy_from_slice(&self.id.to_be_bytes());
        bytes[4..].copy_from_slice(self.key_pair.as_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for PreKeyRecord {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 36 {
            return Err(Error::Serde(format!(
                "Pre-key record must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);

        Ok(Self {
            id: u32::from_be_bytes(id),
            key_pair: X25519Secret::try_from(&bytes[4..])?,
        })
    }
}
