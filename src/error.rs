/// Errors that can occur while establishing or using a session.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// The remote identity key does not match the key pinned for this address.
    #[error("Untrusted identity for {0}")]
    UntrustedIdentity(String),

    /// A signed pre-key or sender-key message carried a bad signature.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The message key for this counter was already used or evicted.
    #[error("Stale message: counter {requested} already processed (chain at {current})")]
    StaleCounter {
        /// Chain index when the message arrived.
        current: u32,
        /// Counter carried by the message.
        requested: u32,
    },

    /// The message is further ahead of the chain than the skip bound allows.
    #[error("Message counter {requested} too far ahead of chain at {current} (limit {limit})")]
    TooFarInFuture {
        /// Chain index when the message arrived.
        current: u32,
        /// Counter carried by the message.
        requested: u32,
        /// Maximum forward gap.
        limit: u32,
    },

    /// Authentication or decryption of a message failed.
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// The key store reported an error.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// A key was malformed or produced a degenerate agreement.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A message was malformed or had the wrong version.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// There is no usable session for the address.
    #[error("No session for {0}")]
    NoSession(String),

    /// There is no sender key state for the group and sender.
    #[error("No sender key state")]
    NoSenderKeyState,

    /// A one-time pre-key referenced by a message is unknown.
    #[error("Missing pre-key {0}")]
    MissingPreKey(u32),

    /// A signed pre-key referenced by a message is unknown.
    #[error("Missing signed pre-key {0}")]
    MissingSignedPreKey(u32),

    /// The transport handshake failed and can no longer be used.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// A cryptographic primitive rejected its input.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),
}

impl From<aes_gcm::Error> for Error {
    fn from(_: aes_gcm::Error) -> Self {
        Self::DecryptionFailure("AEAD tag mismatch".to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(value: prost::DecodeError) -> Self {
        Self::Serde(value.to_string())
    }
}
