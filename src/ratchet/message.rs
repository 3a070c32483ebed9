use crate::crypto::{hmac_sha256_parts, hmac_sha256_verify_truncated};
use crate::proto::schema::{PreKeySignalMessageProto, SignalMessageProto};
use crate::types::X25519PublicKey;
use crate::{Error, IdentityKey};
use prost::Message;

/// Protocol version produced and accepted by this crate.
pub const CIPHERTEXT_MESSAGE_CURRENT_VERSION: u8 = 3;

/// Length of the truncated MAC appended to a [`SignalMessage`].
pub const MAC_LENGTH: usize = 8;

fn version_byte(version: u8) -> u8 {
    (version << 4) | CIPHERTEXT_MESSAGE_CURRENT_VERSION
}

/// Splits the leading version byte off a serialized message.
pub(crate) fn parse_version(bytes: &[u8]) -> Result<(u8, &[u8]), Error> {
    let (&first, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::InvalidMessage("Empty message".to_string()))?;

    let version = first >> 4;
    if version != CIPHERTEXT_MESSAGE_CURRENT_VERSION {
        return Err(Error::InvalidMessage(format!(
            "Unsupported message version {version}"
        )));
    }
    Ok((version, rest))
}

pub(crate) fn with_version(version: u8, body: &[u8]) -> Vec<u8> {
    let mut serialized = Vec::with_capacity(1 + body.len());
    serialized.push(version_byte(version));
    serialized.extend_from_slice(body);
    serialized
}

/// A ratchet message: version byte, protobuf body and a truncated MAC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalMessage {
    version: u8,
    sender_ratchet_key: X25519PublicKey,
    counter: u32,
    previous_counter: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SignalMessage {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        version: u8,
        mac_key: &[u8],
        sender_ratchet_key: X25519PublicKey,
        counter: u32,
        previous_counter: u32,
        ciphertext: Vec<u8>,
        sender_identity: &IdentityKey,
        receiver_identity: &IdentityKey,
    ) -> Result<Self, Error> {
        let body = SignalMessageProto {
            ratchet_key: sender_ratchet_key.serialize().to_vec(),
            counter,
            previous_counter,
            ciphertext: ciphertext.clone(),
        }
        .encode_to_vec();

        let mut serialized = with_version(version, &body);
        let mac = hmac_sha256_parts(
            mac_key,
            &[
                &sender_identity.serialize(),
                &receiver_identity.serialize(),
                &serialized,
            ],
        )?;
        serialized.extend_from_slice(&mac[..MAC_LENGTH]);

        Ok(Self {
            version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
            serialized,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn sender_ratchet_key(&self) -> &X25519PublicKey {
        &self.sender_ratchet_key
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn body(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    /// Checks the MAC over sender identity, receiver identity and the message.
    pub(crate) fn verify_mac(
        &self,
        sender_identity: &IdentityKey,
        receiver_identity: &IdentityKey,
        mac_key: &[u8],
    ) -> Result<bool, Error> {
        let (message, their_mac) = self
            .serialized
            .split_at(self.serialized.len() - MAC_LENGTH);
        hmac_sha256_verify_truncated(
            mac_key,
            &[
                &sender_identity.serialize(),
                &receiver_identity.serialize(),
                message,
            ],
            their_mac,
        )
    }
}

impl TryFrom<&[u8]> for SignalMessage {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 1 + MAC_LENGTH {
            return Err(Error::InvalidMessage("Message too short".to_string()));
        }

        let (version, rest) = parse_version(bytes)?;
        let body = &rest[..rest.len() - MAC_LENGTH];
        let proto = SignalMessageProto::decode(body)?;

        Ok(Self {
            version,
            sender_ratchet_key: X25519PublicKey::from_slice(&proto.ratchet_key)?,
            counter: proto.counter,
            previous_counter: proto.previous_counter,
            ciphertext: proto.ciphertext,
            serialized: bytes.to_vec(),
        })
    }
}

/// The first messages of a session: a [`SignalMessage`] plus the handshake
/// fields the recipient needs to build its side of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreKeySignalMessage {
    version: u8,
    registration_id: u32,
    pre_key_id: Option<u32>,
    signed_pre_key_id: u32,
    base_key: X25519PublicKey,
    identity_key: IdentityKey,
    message: SignalMessage,
    serialized: Vec<u8>,
}

impl PreKeySignalMessage {
    pub(crate) fn new(
        version: u8,
        registration_id: u32,
        pre_key_id: Option<u32>,
        signed_pre_key_id: u32,
        base_key: X25519PublicKey,
        identity_key: IdentityKey,
        message: SignalMessage,
    ) -> Self {
        let body = PreKeySignalMessageProto {
            pre_key_id,
            base_key: base_key.serialize().to_vec(),
            identity_key: identity_key.serialize().to_vec(),
            message: message.serialized().to_vec(),
            registration_id,
            signed_pre_key_id,
        }
        .encode_to_vec();

        Self {
            version,
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
            serialized: with_version(version, &body),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn pre_key_id(&self) -> Option<u32> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &X25519PublicKey {
        &self.base_key
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn message(&self) -> &SignalMessage {
        &self.message
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for PreKeySignalMessage {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let (version, body) = parse_version(bytes)?;
        let proto = PreKeySignalMessageProto::decode(body)?;
        let message = SignalMessage::try_from(proto.message.as_slice())?;

        Ok(Self {
            version,
            registration_id: proto.registration_id,
            pre_key_id: proto.pre_key_id,
            signed_pre_key_id: proto.signed_pre_key_id,
            base_key: X25519PublicKey::from_slice(&proto.base_key)?,
            identity_key: IdentityKey::from_slice(&proto.identity_key)?,
            message,
            serialized: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityKeyPair;
    use crate::types::X25519Secret;

    fn sample(mac_key: &[u8], sender: &IdentityKey, receiver: &IdentityKey) -> SignalMessage {
        SignalMessage::new(
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            mac_key,
            X25519Secret::generate().unwrap().public_key(),
            4,
            2,
            b"ciphertext".to_vec(),
            sender,
            receiver,
        )
        .unwrap()
    }

    #[test]
    fn test_signal_message_parses_and_verifies() {
        let sender = IdentityKeyPair::generate().unwrap().public_key();
        let receiver = IdentityKeyPair::generate().unwrap().public_key();
        let message = sample(&[5u8; 32], &sender, &receiver);

        assert_eq!(message.serialized()[0], 0x33);
        let parsed = SignalMessage::try_from(message.serialized()).unwrap();
        assert_eq!(parsed, message);
        assert!(parsed.verify_mac(&sender, &receiver, &[5u8; 32]).unwrap());
        assert!(!parsed.verify_mac(&receiver, &sender, &[5u8; 32]).unwrap());
        assert!(!parsed.verify_mac(&sender, &receiver, &[6u8; 32]).unwrap());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let identity = IdentityKeyPair::generate().unwrap().public_key();
        let message = sample(&[1u8; 32], &identity, &identity);

        let mut bytes = message.serialized().to_vec();
        bytes[0] = 0x23;
        assert!(matches!(
            SignalMessage::try_from(bytes.as_slice()),
            Err(Error::InvalidMessage(_))
        ));
        assert!(SignalMessage::try_from(&bytes[..4]).is_err());
    }

    #[test]
    fn test_pre_key_message_parses() {
        let identity = IdentityKeyPair::generate().unwrap().public_key();
        let inner = sample(&[1u8; 32], &identity, &identity);
        let base_key = X25519Secret::generate().unwrap().public_key();

        let message = PreKeySignalMessage::new(
            CIPHERTEXT_MESSAGE_CURRENT_VERSION,
            1234,
            None,
            7,
            base_key,
            identity,
            inner,
        );

        let parsed = PreKeySignalMessage::try_from(message.serialized()).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.pre_key_id(), None);
        assert_eq!(parsed.signed_pre_key_id(), 7);
    }
}
