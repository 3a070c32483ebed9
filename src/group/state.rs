use crate::group::chain::{SenderChainKey, SenderMessageKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::collections::VecDeque;
use tracing::debug;

/// One generation of a sender's group chain.
#[derive(Clone)]
pub(crate) struct SenderKeyState {
    pub(crate) key_id: u32,
    pub(crate) chain_key: SenderChainKey,
    pub(crate) signing_key_public: VerifyingKey,
    // Only present on the device that owns the chain.
    pub(crate) signing_key_private: Option<Box<SigningKey>>,
    // Oldest first.
    pub(crate) message_keys: VecDeque<SenderMessageKey>,
}

impl SenderKeyState {
    pub(crate) fn new(
        key_id: u32,
        chain_key: SenderChainKey,
        signing_key_public: VerifyingKey,
        signing_key_private: Option<Box<SigningKey>>,
    ) -> Self {
        Self {
            key_id,
            chain_key,
            signing_key_public,
            signing_key_private,
            message_keys: VecDeque::new(),
        }
    }

    pub(crate) fn key_id(&self) -> u32 {
        self.key_id
    }

    pub(crate) fn chain_key(&self) -> &SenderChainKey {
        &self.chain_key
    }

    pub(crate) fn set_chain_key(&mut self, chain_key: SenderChainKey) {
        self.chain_key = chain_key;
    }

    pub(crate) fn signing_key_public(&self) -> &VerifyingKey {
        &self.signing_key_public
    }

    pub(crate) fn signing_key_private(&self) -> Option<&SigningKey> {
        self.signing_key_private.as_deref()
    }

    pub(crate) fn add_message_key(&mut self, key: SenderMessageKey, max_keys: usize) {
        self.message_keys.push_back(key);
        while self.message_keys.len() > max_keys {
            if let Some(evicted) = self.message_keys.pop_front() {
                debug!(
                    iteration = evicted.iteration(),
                    "Evicted skipped sender message key"
                );
            }
        }
    }

    pub(crate) fn remove_message_key(&mut self, iteration: u32) -> Option<SenderMessageKey> {
        let position = self
            .message_keys
            .iter()
            .position(|key| key.iteration() == iteration)?;
        self.message_keys.remove(position)
    }
}

/// All known generations of one sender's chain in one group, most recent first.
#[derive(Clone, Default)]
pub struct SenderKeyRecord {
    pub(crate) states: VecDeque<SenderKeyState>,
}

impl SenderKeyRecord {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Key id of the most recent generation.
    pub fn current_key_id(&self) -> Option<u32> {
        self.states.front().map(SenderKeyState::key_id)
    }

    pub(crate) fn sender_key_state(&self) -> Option<&SenderKeyState> {
        self.states.front()
    }

    pub(crate) fn sender_key_state_mut(&mut self) -> Option<&mut SenderKeyState> {
        self.states.front_mut()
    }

    pub(crate) fn sender_key_state_for_key_id(&mut self, key_id: u32) -> Option<&mut SenderKeyState> {
        self.states.iter_mut().find(|state| state.key_id() == key_id)
    }

    /// Adds a generation. A generation already known with the same signing
    /// key is left untouched so its chain does not rewind.
    pub(crate) fn add_sender_key_state(&mut self, state: SenderKeyState, max_states: usize) {
        let known = self.states.iter().any(|existing| {
            existing.key_id() == state.key_id()
                && existing.signing_key_public() == state.signing_key_public()
        });
        if known {
            debug!(key_id = state.key_id(), "Sender key generation already known");
            return;
        }

        self.states.push_front(state);
        if self.states.len() > max_states {
            self.states.truncate(max_states.max(1));
            debug!(max_states, "Dropped oldest sender key generation");
        }
    }
}
