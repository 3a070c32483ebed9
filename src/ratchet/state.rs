use crate::Error;
use crate::IdentityKey;
use crate::ratchet::chain::{ChainKey, MessageKeys, RootKey};
use crate::types::{X25519PublicKey, X25519Secret};
use std::collections::VecDeque;
use tracing::debug;

/// Handshake fields carried on outgoing messages until the peer answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPreKey {
    /// One-time pre-key consumed by the handshake, if any.
    pub pre_key_id: Option<u32>,
    /// Signed pre-key used by the handshake.
    pub signed_pre_key_id: u32,
    /// Our base (ephemeral) key from the handshake.
    pub base_key: X25519PublicKey,
}

#[derive(Clone)]
pub(crate) struct SenderChain {
    pub(crate) ratchet_key: X25519Secret,
    pub(crate) chain_key: ChainKey,
}

#[derive(Clone)]
pub(crate) struct ReceiverChain {
    pub(crate) sender_ratchet_key: X25519PublicKey,
    pub(crate) chain_key: ChainKey,
    // Oldest first.
    pub(crate) message_keys: VecDeque<MessageKeys>,
}

/// One ratchet session with a remote device.
#[derive(Clone)]
pub struct SessionState {
    pub(crate) version: u8,
    pub(crate) local_identity: IdentityKey,
    pub(crate) remote_identity: IdentityKey,
    pub(crate) root_key: RootKey,
    pub(crate) previous_counter: u32,
    pub(crate) sender_chain: Option<SenderChain>,
    // Most recent first.
    pub(crate) receiver_chains: VecDeque<ReceiverChain>,
    pub(crate) pending_pre_key: Option<PendingPreKey>,
    pub(crate) local_registration_id: u32,
    pub(crate) remote_registration_id: u32,
    pub(crate) base_key: X25519PublicKey,
}

impl SessionState {
    pub(crate) fn new(
        version: u8,
        local_identity: IdentityKey,
        remote_identity: IdentityKey,
        root_key: RootKey,
        base_key: X25519PublicKey,
    ) -> Self {
        Self {
            version,
            local_identity,
            remote_identity,
            root_key,
            previous_counter: 0,
            sender_chain: None,
            receiver_chains: VecDeque::new(),
            pending_pre_key: None,
            local_registration_id: 0,
            remote_registration_id: 0,
            base_key,
        }
    }

    pub fn session_version(&self) -> u8 {
        self.version
    }

    pub fn local_identity(&self) -> &IdentityKey {
        &self.local_identity
    }

    pub fn remote_identity(&self) -> &IdentityKey {
        &self.remote_identity
    }

    pub fn local_registration_id(&self) -> u32 {
        self.local_registration_id
    }

    pub fn remote_registration_id(&self) -> u32 {
        self.remote_registration_id
    }

    /// Base key of the handshake that created this state.
    pub fn base_key(&self) -> &X25519PublicKey {
        &self.base_key
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn pending_pre_key(&self) -> Option<&PendingPreKey> {
        self.pending_pre_key.as_ref()
    }

    pub(crate) fn clear_pending_pre_key(&mut self) {
        self.pending_pre_key = None;
    }

    pub(crate) fn sender_ratchet_key(&self) -> Result<X25519PublicKey, Error> {
        self.sender_chain()
            .map(|chain| chain.ratchet_key.public_key())
    }

    pub(crate) fn sender_ratchet_private(&self) -> Result<&X25519Secret, Error> {
        self.sender_chain().map(|chain| &chain.ratchet_key)
    }

    pub(crate) fn sender_chain_key(&self) -> Result<&ChainKey, Error> {
        self.sender_chain().map(|chain| &chain.chain_key)
    }

    fn sender_chain(&self) -> Result<&SenderChain, Error> {
        self.sender_chain
            .as_ref()
            .ok_or_else(|| Error::NoSession("Session has no sending chain".to_string()))
    }

    pub(crate) fn set_sender_chain(&mut self, ratchet_key: X25519Secret, chain_key: ChainKey) {
        self.sender_chain = Some(SenderChain {
            ratchet_key,
            chain_key,
        });
    }

    pub(crate) fn set_sender_chain_key(&mut self, chain_key: ChainKey) -> Result<(), Error> {
        let chain = self
            .sender_chain
            .as_mut()
            .ok_or_else(|| Error::NoSession("Session has no sending chain".to_string()))?;
        chain.chain_key = chain_key;
        Ok(())
    }

    fn receiver_chain_mut(&mut self, sender: &X25519PublicKey) -> Option<&mut ReceiverChain> {
        self.receiver_chains
            .iter_mut()
            .find(|chain| chain.sender_ratchet_key == *sender)
    }

    pub(crate) fn receiver_chain_key(&self, sender: &X25519PublicKey) -> Option<&ChainKey> {
        self.receiver_chains
            .iter()
            .find(|chain| chain.sender_ratchet_key == *sender)
            .map(|chain| &chain.chain_key)
    }

    /// Adds a receiving chain, evicting the oldest beyond `max_chains`.
    pub(crate) fn add_receiver_chain(
        &mut self,
        sender: X25519PublicKey,
        chain_key: ChainKey,
        max_chains: usize,
    ) {
        self.receiver_chains.push_front(ReceiverChain {
            sender_ratchet_key: sender,
            chain_key,
            message_keys: VecDeque::new(),
        });

        while self.receiver_chains.len() > max_chains.max(1) {
            self.receiver_chains.pop_back();
            debug!("Evicted oldest receiving chain");
        }
    }

    pub(crate) fn set_receiver_chain_key(
        &mut self,
        sender: &X25519PublicKey,
        chain_key: ChainKey,
    ) -> Result<(), Error> {
        let chain = self
            .receiver_chain_mut(sender)
            .ok_or_else(|| Error::InvalidMessage("Unknown receiving chain".to_string()))?;
        chain.chain_key = chain_key;
        Ok(())
    }

    /// Caches keys for a skipped message, evicting the oldest beyond `max_keys`.
    pub(crate) fn set_message_keys(
        &mut self,
        sender: &X25519PublicKey,
        keys: MessageKeys,
        max_keys: usize,
    ) -> Result<(), Error> {
        let chain = self
            .receiver_chain_mut(sender)
            .ok_or_else(|| Error::InvalidMessage("Unknown receiving chain".to_string()))?;
        chain.message_keys.push_back(keys);

        while chain.message_keys.len() > max_keys {
            if let Some(evicted) = chain.message_keys.pop_front() {
                debug!(counter = evicted.counter(), "Evicted skipped message key");
            }
        }
        Ok(())
    }

    /// Takes the cached keys for `counter`, if any.
    pub(crate) fn remove_message_keys(
        &mut self,
        sender: &X25519PublicKey,
        counter: u32,
    ) -> Option<MessageKeys> {
        let chain = self.receiver_chain_mut(sender)?;
        let position = chain
            .message_keys
            .iter()
            .position(|keys| keys.counter() == counter)?;
        chain.message_keys.remove(position)
    }
}
