use crate::crypto::{self, generate_random_seed};
use crate::types::{DJB_TYPE, X25519PublicKey, X25519Secret};
use crate::Error;
use base64::Engine;
use ed25519_dalek::{SecretKey, SigningKey, VerifyingKey};
use zeroize::{Zeroize, Zeroizing};

/// Length of a serialized [`IdentityKey`].
pub const IDENTITY_KEY_LENGTH: usize = 65;

/// Public half of a device's long-term identity.
///
/// Carries the X25519 key used in the key agreement and the Ed25519 key that
/// verifies pre-key and sender-key signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityKey {
    dh_key: X25519PublicKey,
    signing_key: VerifyingKey,
}

impl IdentityKey {
    pub fn new(dh_key: X25519PublicKey, signing_key: VerifyingKey) -> Self {
        Self {
            dh_key,
            signing_key,
        }
    }

    /// Returns the public X25519 key for Diffie-Hellman operations.
    pub fn dh_key(&self) -> &X25519PublicKey {
        &self.dh_key
    }

    /// Returns the public Ed25519 verification key.
    pub fn signing_key(&self) -> &VerifyingKey {
        &self.signing_key
    }

    /// Verifies a signature made by the matching [`IdentityKeyPair`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, Error> {
        crypto::verify(&self.signing_key, message, signature)
    }

    /// Serializes as `0x05 || x25519 || ed25519`.
    pub fn serialize(&self) -> [u8; IDENTITY_KEY_LENGTH] {
        let mut bytes = [0u8; IDENTITY_KEY_LENGTH];
        bytes[0] = DJB_TYPE;
        bytes[1..33].copy_from_slice(self.dh_key.as_bytes());
        bytes[33..].copy_from_slice(self.signing_key.as_bytes());
        bytes
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != IDENTITY_KEY_LENGTH {
            return Err(Error::InvalidKey(format!(
                "Identity key must be {IDENTITY_KEY_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }

        let dh_key = X25519PublicKey::from_slice(&bytes[..33])?;
        let mut signing_bytes = [0u8; 32];
        signing_bytes.copy_from_slice(&bytes[33..]);
        let signing_key = VerifyingKey::from_bytes(&signing_bytes)
            .map_err(|err| Error::InvalidKey(err.to_string()))?;

        Ok(Self::new(dh_key, signing_key))
    }

    /// Short printable digest of the key, used in logs and trust errors.
    pub fn fingerprint(&self) -> String {
        let digest = crypto::sha256(&self.serialize());
        base64::engine::general_purpose::STANDARD.encode(&digest[..12])
    }
}

/// Long-term identity key pair that combines signing and key agreement capabilities.
///
/// Both the Ed25519 signing key and the X25519 agreement key are derived
/// from the same 32-byte seed.
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing_key: Box<SigningKey>,
    dh_key: X25519Secret,
}

impl IdentityKeyPair {
    /// Creates a new identity key pair from a random seed.
    pub fn generate() -> Result<Self, Error> {
        let seed = generate_random_seed()?;
        let signing_key = Box::new(SigningKey::from(SecretKey::from(*seed)));
        let dh_key = X25519Secret::from(seed);

        Ok(Self {
            signing_key,
            dh_key,
        })
    }

    pub fn public_key(&self) -> IdentityKey {
        IdentityKey::new(self.dh_key.public_key(), self.signing_key.verifying_key())
    }

    /// Signs a message using the Ed25519 signing key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        crypto::sign(&self.signing_key, message)
    }

    /// Performs Diffie-Hellman key agreement with another party's public key.
    pub fn dh(&self, public_key: &X25519PublicKey) -> Result<Zeroizing<[u8; 32]>, Error> {
        self.dh_key.dh(public_key)
    }

    /// Serializes the private halves: Ed25519 first, then X25519.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 64]> {
        let mut bytes = Zeroizing::new([0u8; 64]);
        bytes[0..32].copy_from_slice(self.signing_key.as_bytes().as_slice());
        bytes[32..64].copy_from_slice(self.dh_key.as_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for IdentityKeyPair {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 64 {
            return Err(Error::InvalidKey(format!(
                "Identity key pair must be 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut signing_bytes = Box::new([0u8; 32]);
        signing_bytes.copy_from_slice(&bytes[0..32]);
        let signing_key = Box::new(SigningKey::from_bytes(&signing_bytes));
        signing_bytes.zeroize();

        let dh_key = X25519Secret::try_from(&bytes[32..64])?;

        Ok(Self {
            signing_key,
            dh_key,
        })
    }
}
