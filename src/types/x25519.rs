use crate::Error;
use crate::crypto::generate_random_seed;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Type byte prefixed to serialized Curve25519 public keys.
pub const DJB_TYPE: u8 = 0x05;

/// An X25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    /// Raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Serializes the key with its `0x05` type byte.
    pub fn serialize(&self) -> [u8; 33] {
        let mut bytes = [0u8; 33];
        bytes[0] = DJB_TYPE;
        bytes[1..].copy_from_slice(self.0.as_bytes());
        bytes
    }

    /// Parses either a raw 32-byte key or a 33-byte key prefixed with `0x05`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let raw = match bytes.len() {
            32 => bytes,
            33 if bytes[0] == DJB_TYPE => &bytes[1..],
            33 => {
                return Err(Error::InvalidKey(format!(
                    "Unknown key type byte {:#04x}",
                    bytes[0]
                )));
            }
            len => {
                return Err(Error::InvalidKey(format!(
                    "Expected 32 or 33 key bytes, got {len}"
                )));
            }
        };

        let mut key = [0u8; 32];
        key.copy_from_slice(raw);
        Ok(Self::from(key))
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

impl AsRef<PublicKey> for X25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

/// An X25519 private key. The public half is derived on demand.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct X25519Secret(Box<StaticSecret>);

impl X25519Secret {
    /// Generates a fresh key from the OS random source.
    pub fn generate() -> Result<Self, Error> {
        Ok(Self::from(generate_random_seed()?))
    }

    /// Computes the X25519 agreement with `public_key`.
    ///
    /// Low-order public keys yield an all-zero output; these are rejected.
    pub fn dh(&self, public_key: &X25519PublicKey) -> Result<Zeroizing<[u8; 32]>, Error> {
        let shared = self.0.diffie_hellman(public_key.as_ref());
        if !shared.was_contributory() {
            return Err(Error::InvalidKey(
                "Non-contributory Diffie-Hellman result".to_string(),
            ));
        }

        Ok(Zeroizing::new(shared.to_bytes()))
    }

    pub fn public_key(&self) -> X25519PublicKey {
        PublicKey::from(self.0.as_ref()).into()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<[u8; 32]> for X25519Secret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(Box::new(StaticSecret::from(bytes)))
    }
}

impl From<Box<[u8; 32]>> for X25519Secret {
    fn from(mut bytes: Box<[u8; 32]>) -> Self {
        let secret = StaticSecret::from(*bytes);
        bytes.zeroize();
        Self(Box::new(secret))
    }
}

impl TryFrom<&[u8]> for X25519Secret {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let mut key = Box::new([0u8; 32]);
        if bytes.len() != key.len() {
            return Err(Error::InvalidKey(format!(
                "Expected 32 private key bytes, got {}",
                bytes.len()
            )));
        }
        key.copy_from_slice(bytes);
        Ok(Self::from(key))
    }
}
