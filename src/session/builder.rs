use crate::config::SessionConfig;
use crate::ratchet::{
    AliceParameters, BobParameters, PendingPreKey, initialize_alice_session,
    initialize_bob_session,
};
use crate::store::{Direction, ProtocolStore};
use crate::types::X25519Secret;
use crate::{
    Error, IdentityKey, PreKeyBundle, PreKeyRecord, PreKeySignalMessage, SessionAddress,
    SessionRecord,
};
use tracing::{debug, warn};

/// Starts a session from a peer's published bundle.
///
/// The new state replaces the current one, which is archived. Outgoing
/// messages carry the handshake fields until the peer replies.
pub(crate) fn process_pre_key_bundle<S: ProtocolStore>(
    store: &S,
    config: &SessionConfig,
    address: &SessionAddress,
    bundle: &PreKeyBundle,
) -> Result<(), Error> {
    let their_identity = bundle.identity_key();
    if !store.is_trusted_identity(address, their_identity, Direction::Sending)? {
        warn!(%address, "Refusing bundle with untrusted identity");
        return Err(Error::UntrustedIdentity(address.to_string()));
    }

    bundle.verify()?;

    let mut record = store.load_session(address)?.unwrap_or_default();
    let our_identity = store.identity_key_pair()?;
    let our_base_key = X25519Secret::generate()?;

    let mut state = initialize_alice_session(&AliceParameters {
        our_identity: &our_identity,
        our_base_key: &our_base_key,
        their_identity: *their_identity,
        their_signed_pre_key: bundle.signed_pre_key(),
        their_one_time_pre_key: bundle.pre_key().map(|(_, key)| key),
        their_ratchet_key: bundle.signed_pre_key(),
    })?;
    state.pending_pre_key = Some(PendingPreKey {
        pre_key_id: bundle.pre_key().map(|(id, _)| id),
        signed_pre_key_id: bundle.signed_pre_key_id(),
        base_key: our_base_key.public_key(),
    });
    state.local_registration_id = store.local_registration_id()?;
    state.remote_registration_id = bundle.registration_id();

    record.promote_state(state, config.max_archived_states);

    store_pinned_session(store, address, their_identity, &record)?;

    debug!(
        %address,
        one_time_pre_key = bundle.pre_key().is_some(),
        "Created outgoing session"
    );
    Ok(())
}

/// Pins `identity` for `address` and writes `record`.
///
/// If the record cannot be written, a different identity that was pinned
/// before is put back.
pub(crate) fn store_pinned_session<S: ProtocolStore>(
    store: &S,
    address: &SessionAddress,
    identity: &IdentityKey,
    record: &SessionRecord,
) -> Result<(), Error> {
    let previous = store.identity(address)?;
    store.save_identity(address, identity)?;

    if let Err(err) = store.store_session(address, record) {
        if let Some(previous) = previous.filter(|previous| previous != identity) {
            if let Err(restore_err) = store.save_identity(address, &previous) {
                warn!(%address, %restore_err, "Failed to restore pinned identity");
            }
        }
        return Err(err);
    }
    Ok(())
}

/// Builds the responder's state for a pre-key message into `record`.
///
/// Returns the one-time pre-key id the handshake consumed. A message whose
/// base key is already known is a retransmission and leaves `record` as is.
pub(crate) fn process_pre_key_message<S: ProtocolStore>(
    store: &S,
    config: &SessionConfig,
    address: &SessionAddress,
    record: &mut SessionRecord,
    message: &PreKeySignalMessage,
) -> Result<Option<u32>, Error> {
    let their_identity = message.identity_key();
    if !store.is_trusted_identity(address, their_identity, Direction::Receiving)? {
        warn!(%address, "Refusing pre-key message with untrusted identity");
        return Err(Error::UntrustedIdentity(address.to_string()));
    }

    if record.has_session_state(message.version(), message.base_key()) {
        debug!(%address, "Pre-key message for an existing session");
        return Ok(None);
    }

    let signed_pre_key = store
        .signed_pre_key(message.signed_pre_key_id())?
        .ok_or(Error::MissingSignedPreKey(message.signed_pre_key_id()))?;
    let one_time_pre_key = match message.pre_key_id() {
        Some(id) => Some(store.pre_key(id)?.ok_or(Error::MissingPreKey(id))?),
        None => None,
    };

    let our_identity = store.identity_key_pair()?;
    let mut state = initialize_bob_session(&BobParameters {
        our_identity: &our_identity,
        our_signed_pre_key: signed_pre_key.key_pair(),
        our_one_time_pre_key: one_time_pre_key.as_ref().map(PreKeyRecord::key_pair),
        our_ratchet_key: signed_pre_key.key_pair(),
        their_identity: *their_identity,
        their_base_key: *message.base_key(),
    })?;
    state.local_registration_id = store.local_registration_id()?;
    state.remote_registration_id = message.registration_id();

    record.promote_state(state, config.max_archived_states);

    debug!(%address, "Created incoming session");
    Ok(message.pre_key_id())
}
