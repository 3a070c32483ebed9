use crate::types::X25519PublicKey;
use crate::{
    Error, IdentityKey, PreKeySignalMessage, SenderKeyDistributionMessage, SenderKeyMessage,
    SignalMessage,
};

/// Type tag carried next to a serialized [`CiphertextMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CiphertextMessageType {
    Whisper = 2,
    PreKey = 3,
    SenderKey = 7,
    SenderKeyDistribution = 8,
}

impl CiphertextMessageType {
    /// Name used for the `type` attribute of encrypted message nodes.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Whisper => "msg",
            Self::PreKey => "pkmsg",
            Self::SenderKey => "skmsg",
            Self::SenderKeyDistribution => "skdm",
        }
    }
}

impl TryFrom<u8> for CiphertextMessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Whisper),
            3 => Ok(Self::PreKey),
            7 => Ok(Self::SenderKey),
            8 => Ok(Self::SenderKeyDistribution),
            other => Err(Error::InvalidMessage(format!(
                "Unknown ciphertext message type {other}"
            ))),
        }
    }
}

/// Handshake fields a pre-key message carries for the recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreKeyContext<'a> {
    pub registration_id: u32,
    pub pre_key_id: Option<u32>,
    pub signed_pre_key_id: u32,
    pub base_key: &'a X25519PublicKey,
    pub identity_key: &'a IdentityKey,
}

/// Any message the session layer produces or consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CiphertextMessage {
    Whisper(SignalMessage),
    PreKey(PreKeySignalMessage),
    SenderKey(SenderKeyMessage),
    SenderKeyDistribution(SenderKeyDistributionMessage),
}

impl CiphertextMessage {
    pub fn message_type(&self) -> CiphertextMessageType {
        match self {
            Self::Whisper(_) => CiphertextMessageType::Whisper,
            Self::PreKey(_) => CiphertextMessageType::PreKey,
            Self::SenderKey(_) => CiphertextMessageType::SenderKey,
            Self::SenderKeyDistribution(_) => CiphertextMessageType::SenderKeyDistribution,
        }
    }

    pub fn serialized(&self) -> &[u8] {
        match self {
            Self::Whisper(message) => message.serialized(),
            Self::PreKey(message) => message.serialized(),
            Self::SenderKey(message) => message.serialized(),
            Self::SenderKeyDistribution(message) => message.serialized(),
        }
    }

    pub fn deserialize(message_type: CiphertextMessageType, bytes: &[u8]) -> Result<Self, Error> {
        Ok(match message_type {
            CiphertextMessageType::Whisper => Self::Whisper(SignalMessage::try_from(bytes)?),
            CiphertextMessageType::PreKey => Self::PreKey(PreKeySignalMessage::try_from(bytes)?),
            CiphertextMessageType::SenderKey => {
                Self::SenderKey(SenderKeyMessage::try_from(bytes)?)
            }
            CiphertextMessageType::SenderKeyDistribution => {
                Self::SenderKeyDistribution(SenderKeyDistributionMessage::try_from(bytes)?)
            }
        })
    }

    /// Handshake fields, present only on pre-key messages.
    pub fn pre_key_context(&self) -> Option<PreKeyContext<'_>> {
        match self {
            Self::PreKey(message) => Some(PreKeyContext {
                registration_id: message.registration_id(),
                pre_key_id: message.pre_key_id(),
                signed_pre_key_id: message.signed_pre_key_id(),
                base_key: message.base_key(),
                identity_key: message.identity_key(),
            }),
            Self::Whisper(_) | Self::SenderKey(_) | Self::SenderKeyDistribution(_) => None,
        }
    }
}
