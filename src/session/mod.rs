//! Entry points for pairwise and group encryption.
//!
//! Each operation holds the lock for its address (or sender key name) for its
//! whole duration and commits the updated record with a single store call.

mod builder;
mod cipher;
mod locks;

use crate::group::{
    create_sender_key_distribution, group_decrypt, group_encrypt, process_sender_key_distribution,
};
use crate::store::ProtocolStore;
use crate::{
    CiphertextMessage, Error, PreKeyBundle, PreKeySignalMessage, SenderKeyDistributionMessage,
    SenderKeyMessage, SenderKeyName, SessionAddress, SessionConfig,
};
use locks::KeyedLocks;
use tracing::debug;

/// Pairwise and group cipher operations over a [`ProtocolStore`].
pub struct SessionManager<S: ProtocolStore> {
    store: S,
    config: SessionConfig,
    session_locks: KeyedLocks<SessionAddress>,
    sender_key_locks: KeyedLocks<SenderKeyName>,
}

impl<S: ProtocolStore> SessionManager<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            session_locks: KeyedLocks::new(),
            sender_key_locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Encrypts `plaintext` for `address`.
    ///
    /// Until the peer has replied the result is a [`CiphertextMessage::PreKey`].
    pub fn cipher(
        &self,
        address: &SessionAddress,
        plaintext: &[u8],
    ) -> Result<CiphertextMessage, Error> {
        let _guard = self.session_locks.lock(address);
        cipher::encrypt(&self.store, address, plaintext)
    }

    /// Decrypts a pairwise message from `address`.
    pub fn decipher(
        &self,
        address: &SessionAddress,
        message: &CiphertextMessage,
    ) -> Result<Vec<u8>, Error> {
        let _guard = self.session_locks.lock(address);
        match message {
            CiphertextMessage::Whisper(message) => {
                cipher::decrypt_signal_message(&self.store, &self.config, address, message)
            }
            CiphertextMessage::PreKey(message) => {
                cipher::decrypt_pre_key_message(&self.store, &self.config, address, message)
            }
            CiphertextMessage::SenderKey(_) | CiphertextMessage::SenderKeyDistribution(_) => {
                Err(Error::InvalidMessage(format!(
                    "{} is not a pairwise message",
                    message.message_type().wire_name()
                )))
            }
        }
    }

    /// Starts a session with `address` from its published bundle.
    pub fn create_outgoing_session(
        &self,
        address: &SessionAddress,
        bundle: &PreKeyBundle,
    ) -> Result<(), Error> {
        let _guard = self.session_locks.lock(address);
        builder::process_pre_key_bundle(&self.store, &self.config, address, bundle)
    }

    /// Builds the responder's session for a pre-key message without decrypting it.
    ///
    /// Returns the one-time pre-key id the message references, or `None` if
    /// the session already exists. The pre-key stays in the store until
    /// [`decipher`](Self::decipher) succeeds on the message.
    pub fn create_incoming_session(
        &self,
        address: &SessionAddress,
        message: &PreKeySignalMessage,
    ) -> Result<Option<u32>, Error> {
        let _guard = self.session_locks.lock(address);
        let mut record = self.store.load_session(address)?.unwrap_or_default();
        let known = record.has_session_state(message.version(), message.base_key());
        let pre_key_id =
            builder::process_pre_key_message(&self.store, &self.config, address, &mut record, message)?;

        if !known {
            builder::store_pinned_session(&self.store, address, message.identity_key(), &record)?;
        }
        Ok(pre_key_id)
    }

    pub fn has_session(&self, address: &SessionAddress) -> Result<bool, Error> {
        let _guard = self.session_locks.lock(address);
        Ok(self
            .store
            .load_session(address)?
            .is_some_and(|record| record.session_state().is_some()))
    }

    /// Drops every state held for `address`; the next message needs a new handshake.
    pub fn delete_session(&self, address: &SessionAddress) -> Result<(), Error> {
        let _guard = self.session_locks.lock(address);
        self.store.delete_session(address)?;
        debug!(%address, "Deleted session");
        Ok(())
    }

    pub fn remote_registration_id(&self, address: &SessionAddress) -> Result<u32, Error> {
        let _guard = self.session_locks.lock(address);
        self.store
            .load_session(address)?
            .and_then(|record| record.session_state().map(|state| state.remote_registration_id()))
            .ok_or_else(|| Error::NoSession(address.to_string()))
    }

    pub fn session_version(&self, address: &SessionAddress) -> Result<u8, Error> {
        let _guard = self.session_locks.lock(address);
        self.store
            .load_session(address)?
            .and_then(|record| record.session_state().map(|state| state.session_version()))
            .ok_or_else(|| Error::NoSession(address.to_string()))
    }

    /// Encrypts `plaintext` with our own sender key for `name`'s group.
    pub fn group_cipher(
        &self,
        name: &SenderKeyName,
        plaintext: &[u8],
    ) -> Result<SenderKeyMessage, Error> {
        let _guard = self.sender_key_locks.lock(name);
        group_encrypt(&self.store, name, plaintext)
    }

    /// Decrypts a group message sent by `name`'s sender.
    pub fn group_decipher(
        &self,
        name: &SenderKeyName,
        message: &SenderKeyMessage,
    ) -> Result<Vec<u8>, Error> {
        let _guard = self.sender_key_locks.lock(name);
        group_decrypt(&self.store, &self.config, name, message)
    }

    pub fn create_sender_key_distribution(
        &self,
        name: &SenderKeyName,
    ) -> Result<SenderKeyDistributionMessage, Error> {
        let _guard = self.sender_key_locks.lock(name);
        create_sender_key_distribution(&self.store, &self.config, name)
    }

    pub fn process_sender_key_distribution(
        &self,
        name: &SenderKeyName,
        message: &SenderKeyDistributionMessage,
    ) -> Result<(), Error> {
        let _guard = self.sender_key_locks.lock(name);
        process_sender_key_distribution(&self.store, &self.config, name, message)
    }
}
