pub(crate) mod schema;

use crate::group::{SenderChainKey, SenderKeyState, SenderMessageKey};
use crate::ratchet::{ChainKey, MessageKeys, ReceiverChain, RootKey, SenderChain};
use crate::types::{X25519PublicKey, X25519Secret};
use crate::{Error, IdentityKey, PendingPreKey, SenderKeyRecord, SessionRecord, SessionState};
use ed25519_dalek::{SigningKey, VerifyingKey};
use prost::Message;
use schema::{
    ChainKeyProto, ChainProto, MessageKeyProto, PendingPreKeyProto, RecordStructureProto,
    SenderChainKeyProto, SenderKeyRecordProto, SenderKeyStateProto, SessionStructureProto,
};
use std::collections::VecDeque;

impl SessionRecord {
    /// Serializes the current and archived states to Protocol Buffers format.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let record_proto = RecordStructureProto {
            current_session: self.current.as_ref().map(serialize_state),
            previous_sessions: self.previous.iter().map(serialize_state).collect(),
        };

        let mut buf = Vec::new();
        record_proto
            .encode(&mut buf)
            .map_err(|err| Error::Serde(format!("Failed to encode session record: {err:?}")))?;

        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let record_proto = RecordStructureProto::decode(bytes)
            .map_err(|err| Error::Serde(format!("Failed to decode session record: {err:?}")))?;

        let current = record_proto
            .current_session
            .map(deserialize_state)
            .transpose()?;
        let previous = record_proto
            .previous_sessions
            .into_iter()
            .map(deserialize_state)
            .collect::<Result<VecDeque<_>, _>>()?;

        Ok(SessionRecord { current, previous })
    }
}

impl SenderKeyRecord {
    /// Serializes every sender key generation to Protocol Buffers format.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let record_proto = SenderKeyRecordProto {
            states: self.states.iter().map(serialize_sender_key_state).collect(),
        };

        let mut buf = Vec::new();
        record_proto
            .encode(&mut buf)
            .map_err(|err| Error::Serde(format!("Failed to encode sender key record: {err:?}")))?;

        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let record_proto = SenderKeyRecordProto::decode(bytes).map_err(|err| {
            Error::Serde(format!("Failed to decode sender key record: {err:?}"))
        })?;

        let states = record_proto
            .states
            .into_iter()
            .map(deserialize_sender_key_state)
            .collect::<Result<VecDeque<_>, _>>()?;

        Ok(SenderKeyRecord { states })
    }
}

fn serialize_state(state: &SessionState) -> SessionStructureProto {
    SessionStructureProto {
        session_version: u32::from(state.version),
        local_identity: state.local_identity.serialize().to_vec(),
        remote_identity: state.remote_identity.serialize().to_vec(),
        root_key: state.root_key.key().to_vec(),
        previous_counter: state.previous_counter,
        sender_chain: state.sender_chain.as_ref().map(|chain| ChainProto {
            sender_ratchet_key: chain.ratchet_key.public_key().serialize().to_vec(),
            sender_ratchet_key_private: chain.ratchet_key.as_bytes().to_vec(),
            chain_key: Some(serialize_chain_key(&chain.chain_key)),
            message_keys: Vec::new(),
        }),
        receiver_chains: state
            .receiver_chains
            .iter()
            .map(|chain| ChainProto {
                sender_ratchet_key: chain.sender_ratchet_key.serialize().to_vec(),
                sender_ratchet_key_private: Vec::new(),
                chain_key: Some(serialize_chain_key(&chain.chain_key)),
                message_keys: chain
                    .message_keys
                    .iter()
                    .map(|keys| MessageKeyProto {
                        index: keys.counter(),
                        cipher_key: keys.cipher_key().to_vec(),
                        mac_key: keys.mac_key().to_vec(),
                        iv: keys.iv().to_vec(),
                    })
                    .collect(),
            })
            .collect(),
        pending_pre_key: state
            .pending_pre_key
            .as_ref()
            .map(|pending| PendingPreKeyProto {
                pre_key_id: pending.pre_key_id,
                signed_pre_key_id: pending.signed_pre_key_id,
                base_key: pending.base_key.serialize().to_vec(),
            }),
        remote_registration_id: state.remote_registration_id,
        local_registration_id: state.local_registration_id,
        base_key: state.base_key.serialize().to_vec(),
    }
}

fn serialize_chain_key(chain_key: &ChainKey) -> ChainKeyProto {
    ChainKeyProto {
        index: chain_key.index(),
        key: chain_key.key().to_vec(),
    }
}

fn deserialize_state(proto: SessionStructureProto) -> Result<SessionState, Error> {
    let version = u8::try_from(proto.session_version)
        .map_err(|_| Error::Serde(format!("Invalid session version {}", proto.session_version)))?;

    let sender_chain = match proto.sender_chain {
        Some(chain) => {
            let ratchet_key = X25519Secret::try_from(chain.sender_ratchet_key_private.as_slice())
                .map_err(|_| Error::Serde("Invalid sender ratchet private key".to_string()))?;
            let chain_key = deserialize_chain_key(chain.chain_key)?;
            Some(SenderChain {
                ratchet_key,
                chain_key,
            })
        }
        None => None,
    };

    let mut receiver_chains = VecDeque::with_capacity(proto.receiver_chains.len());
    for chain in proto.receiver_chains {
        let message_keys = chain
            .message_keys
            .into_iter()
            .map(deserialize_message_keys)
            .collect::<Result<VecDeque<_>, _>>()?;
        receiver_chains.push_back(ReceiverChain {
            sender_ratchet_key: public_key(&chain.sender_ratchet_key, "sender ratchet key")?,
            chain_key: deserialize_chain_key(chain.chain_key)?,
            message_keys,
        });
    }

    let pending_pre_key = match proto.pending_pre_key {
        Some(pending) => Some(PendingPreKey {
            pre_key_id: pending.pre_key_id,
            signed_pre_key_id: pending.signed_pre_key_id,
            base_key: public_key(&pending.base_key, "pending base key")?,
        }),
        None => None,
    };

    Ok(SessionState {
        version,
        local_identity: identity_key(&proto.local_identity)?,
        remote_identity: identity_key(&proto.remote_identity)?,
        root_key: RootKey::new(key_32(&proto.root_key, "root key")?),
        previous_counter: proto.previous_counter,
        sender_chain,
        receiver_chains,
        pending_pre_key,
        local_registration_id: proto.local_registration_id,
        remote_registration_id: proto.remote_registration_id,
        base_key: public_key(&proto.base_key, "base key")?,
    })
}

fn deserialize_chain_key(proto: Option<ChainKeyProto>) -> Result<ChainKey, Error> {
    let proto = proto.ok_or_else(|| Error::Serde("Missing chain key".to_string()))?;
    Ok(ChainKey::new(key_32(&proto.key, "chain key")?, proto.index))
}

fn deserialize_message_keys(proto: MessageKeyProto) -> Result<MessageKeys, Error> {
    let cipher_key = key_32(&proto.cipher_key, "cipher key")?;
    let mac_key = key_32(&proto.mac_key, "MAC key")?;
    let iv: [u8; 16] = proto
        .iv
        .as_slice()
        .try_into()
        .map_err(|_| Error::Serde("Invalid IV length".to_string()))?;

    Ok(MessageKeys::new(*cipher_key, *mac_key, iv, proto.index))
}

fn serialize_sender_key_state(state: &SenderKeyState) -> SenderKeyStateProto {
    SenderKeyStateProto {
        key_id: state.key_id(),
        chain_key: Some(SenderChainKeyProto {
            iteration: state.chain_key().iteration(),
            seed: state.chain_key().seed().to_vec(),
        }),
        signing_key_public: state.signing_key_public().as_bytes().to_vec(),
        signing_key_private: state
            .signing_key_private()
            .map(|key| key.to_bytes().to_vec()),
        message_keys: state
            .message_keys
            .iter()
            .map(|key| SenderChainKeyProto {
                iteration: key.iteration(),
                seed: key.seed().to_vec(),
            })
            .collect(),
    }
}

fn deserialize_sender_key_state(proto: SenderKeyStateProto) -> Result<SenderKeyState, Error> {
    let chain_key = proto
        .chain_key
        .ok_or_else(|| Error::Serde("Missing sender chain key".to_string()))?;
    let chain_key = SenderChainKey::new(
        chain_key.iteration,
        key_32(&chain_key.seed, "sender chain seed")?,
    );

    let public_bytes = key_32(&proto.signing_key_public, "signing key")?;
    let signing_key_public = VerifyingKey::from_bytes(&public_bytes)
        .map_err(|err| Error::Serde(format!("Invalid signing key: {err}")))?;
    let signing_key_private = match proto.signing_key_private {
        Some(bytes) => {
            let secret = key_32(&bytes, "private signing key")?;
            Some(Box::new(SigningKey::from_bytes(&secret)))
        }
        None => None,
    };

    let mut state = SenderKeyState::new(
        proto.key_id,
        chain_key,
        signing_key_public,
        signing_key_private,
    );
    for key in proto.message_keys {
        let seed = key_32(&key.seed, "sender message seed")?;
        state
            .message_keys
            .push_back(SenderMessageKey::new(key.iteration, *seed)?);
    }

    Ok(state)
}

fn key_32(bytes: &[u8], what: &str) -> Result<Box<[u8; 32]>, Error> {
    if bytes.len() != 32 {
        return Err(Error::Serde(format!("Invalid {what} length: {}", bytes.len())));
    }
    let mut key = Box::new([0u8; 32]);
    key.copy_from_slice(bytes);
    Ok(key)
}

fn public_key(bytes: &[u8], what: &str) -> Result<X25519PublicKey, Error> {
    X25519PublicKey::from_slice(bytes).map_err(|err| Error::Serde(format!("Invalid {what}: {err}")))
}

fn identity_key(bytes: &[u8]) -> Result<IdentityKey, Error> {
    IdentityKey::from_slice(bytes).map_err(|err| Error::Serde(format!("Invalid identity key: {err}")))
}
