use crate::config::SessionConfig;
use crate::crypto::{aes_cbc_decrypt, aes_cbc_encrypt};
use crate::ratchet::{ChainKey, MessageKeys, SessionState};
use crate::session::builder::{process_pre_key_message, store_pinned_session};
use crate::store::{Direction, ProtocolStore};
use crate::types::{X25519PublicKey, X25519Secret};
use crate::{
    CiphertextMessage, Error, PreKeyRecord, PreKeySignalMessage, SessionAddress, SessionRecord,
    SignalMessage,
};
use tracing::{debug, warn};

/// Encrypts `plaintext` with the current session for `address`.
pub(crate) fn encrypt<S: ProtocolStore>(
    store: &S,
    address: &SessionAddress,
    plaintext: &[u8],
) -> Result<CiphertextMessage, Error> {
    let mut record = store
        .load_session(address)?
        .ok_or_else(|| Error::NoSession(address.to_string()))?;
    let mut state = record
        .session_state()
        .ok_or_else(|| Error::NoSession(address.to_string()))?
        .clone();

    let chain_key = state.sender_chain_key()?.clone();
    let message_keys = chain_key.message_keys()?;
    let ciphertext = aes_cbc_encrypt(message_keys.cipher_key(), message_keys.iv(), plaintext)?;

    let message = SignalMessage::new(
        state.session_version(),
        message_keys.mac_key(),
        state.sender_ratchet_key()?,
        chain_key.index(),
        state.previous_counter(),
        ciphertext,
        state.local_identity(),
        state.remote_identity(),
    )?;

    let message = match state.pending_pre_key() {
        Some(pending) => CiphertextMessage::PreKey(PreKeySignalMessage::new(
            state.session_version(),
            state.local_registration_id(),
            pending.pre_key_id,
            pending.signed_pre_key_id,
            pending.base_key,
            *state.local_identity(),
            message,
        )),
        None => CiphertextMessage::Whisper(message),
    };

    if !store.is_trusted_identity(address, state.remote_identity(), Direction::Sending)? {
        warn!(%address, "Remote identity changed since the session was created");
        return Err(Error::UntrustedIdentity(address.to_string()));
    }

    state.set_sender_chain_key(chain_key.next()?)?;
    record.set_session_state(state);
    store.store_session(address, &record)?;

    Ok(message)
}

/// Decrypts a message on an established session.
pub(crate) fn decrypt_signal_message<S: ProtocolStore>(
    store: &S,
    config: &SessionConfig,
    address: &SessionAddress,
    message: &SignalMessage,
) -> Result<Vec<u8>, Error> {
    let mut record = store
        .load_session(address)?
        .ok_or_else(|| Error::NoSession(address.to_string()))?;

    let plaintext = decrypt_with_record(&mut record, message, config)?;
    commit(store, address, &record, None)?;

    Ok(plaintext)
}

/// Decrypts the first message(s) of a session, building the session if needed.
///
/// The one-time pre-key the message references is removed only after the
/// enclosed message decrypts, and is put back if the session cannot be stored.
pub(crate) fn decrypt_pre_key_message<S: ProtocolStore>(
    store: &S,
    config: &SessionConfig,
    address: &SessionAddress,
    message: &PreKeySignalMessage,
) -> Result<Vec<u8>, Error> {
    let mut record = store.load_session(address)?.unwrap_or_default();

    process_pre_key_message(store, config, address, &mut record, message)?;
    let plaintext = decrypt_with_record(&mut record, message.message(), config)?;

    let consumed = match message.pre_key_id() {
        Some(pre_key_id) => store.pre_key(pre_key_id)?,
        None => None,
    };
    commit(store, address, &record, consumed.as_ref())?;

    Ok(plaintext)
}

/// Persists a decrypted record. The session write comes last; a consumed
/// pre-key is restored when anything after its removal fails.
fn commit<S: ProtocolStore>(
    store: &S,
    address: &SessionAddress,
    record: &SessionRecord,
    consumed: Option<&PreKeyRecord>,
) -> Result<(), Error> {
    let state = record
        .session_state()
        .ok_or_else(|| Error::NoSession(address.to_string()))?;
    let remote_identity = state.remote_identity();

    if !store.is_trusted_identity(address, remote_identity, Direction::Receiving)? {
        warn!(%address, "Decrypted message from untrusted identity");
        return Err(Error::UntrustedIdentity(address.to_string()));
    }

    let Some(pre_key) = consumed else {
        return store_pinned_session(store, address, remote_identity, record);
    };

    store.remove_pre_key(pre_key.id())?;
    if let Err(err) = store_pinned_session(store, address, remote_identity, record) {
        if let Err(restore_err) = store.save_pre_key(pre_key.id(), pre_key) {
            warn!(pre_key_id = pre_key.id(), %restore_err, "Failed to restore one-time pre-key");
        }
        return Err(err);
    }

    debug!(pre_key_id = pre_key.id(), "Removed consumed one-time pre-key");
    Ok(())
}

/// Tries the current state, then each archived state, most recent first.
///
/// Each attempt runs on a copy; only a successful copy is written back, and a
/// successful archived state becomes current.
fn decrypt_with_record(
    record: &mut SessionRecord,
    message: &SignalMessage,
    config: &SessionConfig,
) -> Result<Vec<u8>, Error> {
    let mut first_error = None;

    if let Some(current) = record.session_state() {
        let mut state = current.clone();
        match decrypt_with_state(&mut state, message, config) {
            Ok(plaintext) => {
                record.set_session_state(state);
                return Ok(plaintext);
            }
            Err(err) => first_error = Some(err),
        }
    }

    let mut promoted = None;
    for (index, previous) in record.previous_states().enumerate() {
        let mut state = previous.clone();
        match decrypt_with_state(&mut state, message, config) {
            Ok(plaintext) => {
                promoted = Some((index, state, plaintext));
                break;
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    if let Some((index, state, plaintext)) = promoted {
        debug!(index, "Decrypted with archived session state");
        record.promote_old_session(index, state, config.max_archived_states);
        return Ok(plaintext);
    }

    let err = first_error.unwrap_or_else(|| Error::NoSession("Empty session record".to_string()));
    warn!(error = %err, "No session state could decrypt the message");
    Err(err)
}

fn decrypt_with_state(
    state: &mut SessionState,
    message: &SignalMessage,
    config: &SessionConfig,
) -> Result<Vec<u8>, Error> {
    if message.version() != state.session_version() {
        return Err(Error::InvalidMessage(format!(
            "Message version {} does not match session version {}",
            message.version(),
            state.session_version()
        )));
    }

    let their_ephemeral = message.sender_ratchet_key();
    let chain_key = get_or_create_chain_key(state, their_ephemeral, config)?;
    let message_keys =
        get_or_create_message_keys(state, their_ephemeral, &chain_key, message.counter(), config)?;

    if !message.verify_mac(
        state.remote_identity(),
        state.local_identity(),
        message_keys.mac_key(),
    )? {
        return Err(Error::DecryptionFailure("Bad MAC".to_string()));
    }

    let plaintext = aes_cbc_decrypt(message_keys.cipher_key(), message_keys.iv(), message.body())?;
    state.clear_pending_pre_key();
    Ok(plaintext)
}

/// Receiving chain for `their_ephemeral`, running a DH ratchet step if it is new.
fn get_or_create_chain_key(
    state: &mut SessionState,
    their_ephemeral: &X25519PublicKey,
    config: &SessionConfig,
) -> Result<ChainKey, Error> {
    if let Some(chain_key) = state.receiver_chain_key(their_ephemeral) {
        return Ok(chain_key.clone());
    }

    let (receiver_root, receiver_chain) = state
        .root_key
        .create_chain(their_ephemeral, state.sender_ratchet_private()?)?;
    let our_new_ephemeral = X25519Secret::generate()?;
    let (sender_root, sender_chain) =
        receiver_root.create_chain(their_ephemeral, &our_new_ephemeral)?;

    let current_index = state.sender_chain_key()?.index();

    state.root_key = sender_root;
    state.add_receiver_chain(
        *their_ephemeral,
        receiver_chain.clone(),
        config.max_receiver_chains,
    );
    state.previous_counter = current_index.saturating_sub(1);
    state.set_sender_chain(our_new_ephemeral, sender_chain);

    debug!(previous_counter = state.previous_counter, "Ratchet step");
    Ok(receiver_chain)
}

fn get_or_create_message_keys(
    state: &mut SessionState,
    their_ephemeral: &X25519PublicKey,
    chain_key: &ChainKey,
    counter: u32,
    config: &SessionConfig,
) -> Result<MessageKeys, Error> {
    let chain_index = chain_key.index();

    if chain_index > counter {
        return state
            .remove_message_keys(their_ephemeral, counter)
            .ok_or(Error::StaleCounter {
                current: chain_index,
                requested: counter,
            });
    }

    if counter - chain_index > config.max_skipped_messages {
        return Err(Error::TooFarInFuture {
            current: chain_index,
            requested: counter,
            limit: config.max_skipped_messages,
        });
    }

    let mut chain_key = chain_key.clone();
    while chain_key.index() < counter {
        state.set_message_keys(
            their_ephemeral,
            chain_key.message_keys()?,
            config.max_message_keys,
        )?;
        chain_key = chain_key.next()?;
    }

    state.set_receiver_chain_key(their_ephemeral, chain_key.next()?)?;
    chain_key.message_keys()
}
