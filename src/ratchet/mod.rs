mod chain;
mod message;
mod record;
mod state;

pub(crate) use chain::{ChainKey, MessageKeys, RootKey};
pub(crate) use message::{parse_version, with_version};
pub use message::{
    CIPHERTEXT_MESSAGE_CURRENT_VERSION, MAC_LENGTH, PreKeySignalMessage, SignalMessage,
};
pub use record::SessionRecord;
pub(crate) use state::{ReceiverChain, SenderChain};
pub use state::{PendingPreKey, SessionState};

use crate::types::{X25519PublicKey, X25519Secret};
use crate::x3dh::X3DH;
use crate::{Error, IdentityKey, IdentityKeyPair};
use tracing::debug;

/// Key material available to the initiator of a session.
pub(crate) struct AliceParameters<'a> {
    pub(crate) our_identity: &'a IdentityKeyPair,
    pub(crate) our_base_key: &'a X25519Secret,
    pub(crate) their_identity: IdentityKey,
    pub(crate) their_signed_pre_key: X25519PublicKey,
    pub(crate) their_one_time_pre_key: Option<X25519PublicKey>,
    pub(crate) their_ratchet_key: X25519PublicKey,
}

/// Key material available to the responder of a session.
pub(crate) struct BobParameters<'a> {
    pub(crate) our_identity: &'a IdentityKeyPair,
    pub(crate) our_signed_pre_key: &'a X25519Secret,
    pub(crate) our_one_time_pre_key: Option<&'a X25519Secret>,
    pub(crate) our_ratchet_key: &'a X25519Secret,
    pub(crate) their_identity: IdentityKey,
    pub(crate) their_base_key: X25519PublicKey,
}

/// Initializes the initiator's state.
///
/// The agreement output seeds a receiving chain for the responder's signed
/// pre-key; the initiator then ratchets once with a fresh key so its first
/// message already carries a new ratchet public key.
pub(crate) fn initialize_alice_session(
    parameters: &AliceParameters<'_>,
) -> Result<SessionState, Error> {
    let secret = X3DH::initiate_for_alice(
        parameters.our_identity,
        parameters.our_base_key,
        &parameters.their_identity,
        &parameters.their_signed_pre_key,
        parameters.their_one_time_pre_key.as_ref(),
    )?;

    let root_key = RootKey::new(secret.root_key.clone());
    let receiving_chain = ChainKey::new(secret.chain_key.clone(), 0);

    let sending_ratchet_key = X25519Secret::generate()?;
    let (sending_root, sending_chain) =
        root_key.create_chain(&parameters.their_ratchet_key, &sending_ratchet_key)?;

    let mut state = SessionState::new(
        CIPHERTEXT_MESSAGE_CURRENT_VERSION,
        parameters.our_identity.public_key(),
        parameters.their_identity,
        sending_root,
        parameters.our_base_key.public_key(),
    );
    state.add_receiver_chain(parameters.their_ratchet_key, receiving_chain, 1);
    state.set_sender_chain(sending_ratchet_key, sending_chain);

    debug!("Initialized initiator session state");
    Ok(state)
}

/// Initializes the responder's state. Its ratchet key is the signed pre-key.
pub(crate) fn initialize_bob_session(
    parameters: &BobParameters<'_>,
) -> Result<SessionState, Error> {
    let secret = X3DH::initiate_for_bob(
        parameters.our_identity,
        parameters.our_signed_pre_key,
        parameters.our_one_time_pre_key,
        &parameters.their_identity,
        &parameters.their_base_key,
    )?;

    let mut state = SessionState::new(
        CIPHERTEXT_MESSAGE_CURRENT_VERSION,
        parameters.our_identity.public_key(),
        parameters.their_identity,
        RootKey::new(secret.root_key.clone()),
        parameters.their_base_key,
    );
    state.set_sender_chain(
        parameters.our_ratchet_key.clone(),
        ChainKey::new(secret.chain_key.clone(), 0),
    );

    debug!("Initialized responder session state");
    Ok(state)
}
