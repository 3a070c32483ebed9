mod identity_key;
pub use identity_key::*;
mod one_time_pre_key;
pub use one_time_pre_key::*;
mod pre_key;
pub use pre_key::*;

use crate::Error;
use crate::crypto::derive_secrets;
use crate::types::{X25519PublicKey, X25519Secret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// HKDF info for the initial key agreement.
const WHISPER_TEXT: &[u8] = b"WhisperText";

/// Prefix of the agreement input, marking it as distinct from a plain DH output.
const DISCONTINUITY_BYTES: [u8; 32] = [0xFF; 32];

/// A bundle of public keys published by a device so others can start a session
/// with it while it is offline.
#[derive(Clone, Debug)]
pub struct PreKeyBundle {
    registration_id: u32,
    device_id: u32,
    pre_key: Option<(u32, X25519PublicKey)>,
    signed_pre_key_id: u32,
    signed_pre_key: X25519PublicKey,
    signed_pre_key_signature: Vec<u8>,
    identity_key: IdentityKey,
}

impl PreKeyBundle {
    pub fn new(
        registration_id: u32,
        device_id: u32,
        pre_key: Option<(u32, X25519PublicKey)>,
        signed_pre_key: (u32, X25519PublicKey),
        signed_pre_key_signature: Vec<u8>,
        identity_key: IdentityKey,
    ) -> Self {
        Self {
            registration_id,
            device_id,
            pre_key,
            signed_pre_key_id: signed_pre_key.0,
            signed_pre_key: signed_pre_key.1,
            signed_pre_key_signature,
            identity_key,
        }
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Returns the optional one-time pre-key from this bundle.
    pub fn pre_key(&self) -> Option<(u32, X25519PublicKey)> {
        self.pre_key
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }

    pub fn signed_pre_key(&self) -> X25519PublicKey {
        self.signed_pre_key
    }

    pub fn signed_pre_key_signature(&self) -> &[u8] {
        &self.signed_pre_key_signature
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    /// Verifies that the signed pre-key was signed by the bundle's identity key.
    pub fn verify(&self) -> Result<(), Error> {
        let signed = self.signed_pre_key.serialize();
        match self
            .identity_key
            .verify(&signed, &self.signed_pre_key_signature)
        {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(Error::InvalidSignature),
        }
    }
}

/// Root and first chain key produced by the initial agreement.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct X3DHSharedSecret {
    pub(crate) root_key: Box<[u8; 32]>,
    pub(crate) chain_key: Box<[u8; 32]>,
}

/// The extended triple Diffie-Hellman agreement.
pub(crate) struct X3DH;

impl X3DH {
    /// Agreement from the initiator's side.
    pub(crate) fn initiate_for_alice(
        our_identity: &IdentityKeyPair,
        our_base_key: &X25519Secret,
        their_identity: &IdentityKey,
        their_signed_pre_key: &X25519PublicKey,
        their_one_time_pre_key: Option<&X25519PublicKey>,
    ) -> Result<X3DHSharedSecret, Error> {
        let mut secrets = Vec::with_capacity(32 * 5);
        secrets.extend_from_slice(&DISCONTINUITY_BYTES);

        // DH1 = DH(IKa, SPKb)
        secrets.extend_from_slice(our_identity.dh(their_signed_pre_key)?.as_slice());
        // DH2 = DH(EKa, IKb)
        secrets.extend_from_slice(our_base_key.dh(their_identity.dh_key())?.as_slice());
        // DH3 = DH(EKa, SPKb)
        secrets.extend_from_slice(our_base_key.dh(their_signed_pre_key)?.as_slice());
        // DH4 = DH(EKa, OPKb)
        if let Some(one_time_pre_key) = their_one_time_pre_key {
            secrets.extend_from_slice(our_base_key.dh(one_time_pre_key)?.as_slice());
        }

        Self::derive(secrets)
    }

    /// Mirror of [`X3DH::initiate_for_alice`] from the responder's side.
    pub(crate) fn initiate_for_bob(
        our_identity: &IdentityKeyPair,
        our_signed_pre_key: &X25519Secret,
        our_one_time_pre_key: Option<&X25519Secret>,
        their_identity: &IdentityKey,
        their_base_key: &X25519PublicKey,
    ) -> Result<X3DHSharedSecret, Error> {
        let mut secrets = Vec::with_capacity(32 * 5);
        secrets.extend_from_slice(&DISCONTINUITY_BYTES);

        // DH1 = DH(SPKb, IKa)
        secrets.extend_from_slice(our_signed_pre_key.dh(their_identity.dh_key())?.as_slice());
        // DH2 = DH(IKb, EKa)
        secrets.extend_from_slice(our_identity.dh(their_base_key)?.as_slice());
        // DH3 = DH(SPKb, EKa)
        secrets.extend_from_slice(our_signed_pre_key.dh(their_base_key)?.as_slice());
        // DH4 = DH(OPKb, EKa)
        if let Some(one_time_pre_key) = our_one_time_pre_key {
            secrets.extend_from_slice(one_time_pre_key.dh(their_base_key)?.as_slice());
        }

        Self::derive(secrets)
    }

    fn derive(mut secrets: Vec<u8>) -> Result<X3DHSharedSecret, Error> {
        let derived = derive_secrets(&secrets, None, WHISPER_TEXT, 96);
        secrets.zeroize();
        let derived = derived?;

        let mut root_key = Box::new([0u8; 32]);
        let mut chain_key = Box::new([0u8; 32]);
        root_key.copy_from_slice(&derived[0..32]);
        chain_key.copy_from_slice(&derived[32..64]);

        Ok(X3DHSharedSecret {
            root_key,
            chain_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Party {
        identity: IdentityKeyPair,
        signed_pre_key: X25519Secret,
        one_time_pre_key: X25519Secret,
    }

    fn party() -> Party {
        Party {
            identity: IdentityKeyPair::generate().unwrap(),
            signed_pre_key: X25519Secret::generate().unwrap(),
            one_time_pre_key: X25519Secret::generate().unwrap(),
        }
    }

    #[test]
    fn test_agreement_matches_with_one_time_pre_key() {
        let alice = party();
        let bob = party();
        let base_key = X25519Secret::generate().unwrap();

        let alice_secret = X3DH::initiate_for_alice(
            &alice.identity,
            &base_key,
            &bob.identity.public_key(),
            &bob.signed_pre_key.public_key(),
            Some(&bob.one_time_pre_key.public_key()),
        )
        .unwrap();
        let bob_secret = X3DH::initiate_for_bob(
            &bob.identity,
            &bob.signed_pre_key,
            Some(&bob.one_time_pre_key),
            &alice.identity.public_key(),
            &base_key.public_key(),
        )
        .unwrap();

        assert_eq!(alice_secret.root_key, bob_secret.root_key);
        assert_eq!(alice_secret.chain_key, bob_secret.chain_key);
    }

    #[test]
    fn test_one_time_pre_key_changes_the_secret() {
        let alice = party();
        let bob = party();
        let base_key = X25519Secret::generate().unwrap();

        let with_otpk = X3DH::initiate_for_alice(
            &alice.identity,
            &base_key,
            &bob.identity.public_key(),
            &bob.signed_pre_key.public_key(),
            Some(&bob.one_time_pre_key.public_key()),
        )
        .unwrap();
        let without_otpk = X3DH::initiate_for_bob(
            &bob.identity,
            &bob.signed_pre_key,
            None,
            &alice.identity.public_key(),
            &base_key.public_key(),
        )
        .unwrap();

        assert_ne!(with_otpk.root_key, without_otpk.root_key);
    }

    #[test]
    fn test_bundle_signature_verification() {
        let bob = IdentityKeyPair::generate().unwrap();
        let signed_pre_key = SignedPreKeyRecord::generate(7, &bob).unwrap();

        let bundle = PreKeyBundle::new(
            1,
            1,
            None,
            (signed_pre_key.id(), signed_pre_key.public_key()),
            signed_pre_key.signature().to_vec(),
            bob.public_key(),
        );
        assert!(bundle.verify().is_ok());

        let mut bad_signature = signed_pre_key.signature().to_vec();
        bad_signature[0] ^= 0x01;
        let forged = PreKeyBundle::new(
            1,
            1,
            None,
            (signed_pre_key.id(), signed_pre_key.public_key()),
            bad_signature,
            bob.public_key(),
        );
        assert_eq!(forged.verify(), Err(Error::InvalidSignature));
    }
}
