use crate::Error;
use crate::crypto::{sign, verify};
use crate::proto::schema::{SenderKeyDistributionMessageProto, SenderKeyMessageProto};
use crate::ratchet::{parse_version, with_version};
use ed25519_dalek::{SigningKey, VerifyingKey};
use prost::Message;

/// Length of the Ed25519 signature appended to a [`SenderKeyMessage`].
pub const SIGNATURE_LENGTH: usize = 64;

/// A group message, signed by the sender's per-group signing key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderKeyMessage {
    version: u8,
    key_id: u32,
    iteration: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SenderKeyMessage {
    pub(crate) fn new(
        version: u8,
        key_id: u32,
        iteration: u32,
        ciphertext: Vec<u8>,
        signing_key: &SigningKey,
    ) -> Self {
        let body = SenderKeyMessageProto {
            id: key_id,
            iteration,
            ciphertext: ciphertext.clone(),
        }
        .encode_to_vec();

        let mut serialized = with_version(version, &body);
        let signature = sign(signing_key, &serialized);
        serialized.extend_from_slice(&signature);

        Self {
            version,
            key_id,
            iteration,
            ciphertext,
            serialized,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    pub(crate) fn verify_signature(&self, signing_key: &VerifyingKey) -> Result<bool, Error> {
        let (message, signature) = self
            .serialized
            .split_at(self.serialized.len() - SIGNATURE_LENGTH);
        verify(signing_key, message, signature)
    }
}

impl TryFrom<&[u8]> for SenderKeyMessage {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 1 + SIGNATURE_LENGTH {
            return Err(Error::InvalidMessage("Sender key message too short".to_string()));
        }

        let (version, rest) = parse_version(bytes)?;
        let proto = SenderKeyMessageProto::decode(&rest[..rest.len() - SIGNATURE_LENGTH])?;

        Ok(Self {
            version,
            key_id: proto.id,
            iteration: proto.iteration,
            ciphertext: proto.ciphertext,
            serialized: bytes.to_vec(),
        })
    }
}

/// Hands a sender's chain to another group member, normally over a pairwise session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderKeyDistributionMessage {
    version: u8,
    key_id: u32,
    iteration: u32,
    chain_key: [u8; 32],
    signing_key: VerifyingKey,
    serialized: Vec<u8>,
}

impl SenderKeyDistributionMessage {
    pub(crate) fn new(
        version: u8,
        key_id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key: VerifyingKey,
    ) -> Self {
        let body = SenderKeyDistributionMessageProto {
            id: key_id,
            iteration,
            chain_key: chain_key.to_vec(),
            signing_key: signing_key.as_bytes().to_vec(),
        }
        .encode_to_vec();

        Self {
            version,
            key_id,
            iteration,
            chain_key,
            signing_key,
            serialized: with_version(version, &body),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn chain_key(&self) -> &[u8; 32] {
        &self.chain_key
    }

    pub fn signing_key(&self) -> &VerifyingKey {
        &self.signing_key
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for SenderKeyDistributionMessage {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let (version, body) = parse_version(bytes)?;
        let proto = SenderKeyDistributionMessageProto::decode(body)?;

        let chain_key: [u8; 32] = proto
            .chain_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidMessage("Chain key must be 32 bytes".to_string()))?;
        let signing_key: [u8; 32] = proto
            .signing_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidKey("Signing key must be 32 bytes".to_string()))?;
        let signing_key = VerifyingKey::from_bytes(&signing_key)
            .map_err(|err| Error::InvalidKey(err.to_string()))?;

        Ok(Self {
            version,
            key_id: proto.id,
            iteration: proto.iteration,
            chain_key,
            signing_key,
            serialized: bytes.to_vec(),
        })
    }
}
