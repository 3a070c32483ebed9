use crate::config::SessionConfig;
use crate::crypto::{aes_cbc_decrypt, aes_cbc_encrypt};
use crate::group::chain::SenderMessageKey;
use crate::group::state::SenderKeyState;
use crate::ratchet::CIPHERTEXT_MESSAGE_CURRENT_VERSION;
use crate::store::SenderKeyStore;
use crate::{Error, SenderKeyMessage, SenderKeyName};
use tracing::{debug, warn};

pub(crate) fn group_encrypt<S: SenderKeyStore>(
    store: &S,
    name: &SenderKeyName,
    plaintext: &[u8],
) -> Result<SenderKeyMessage, Error> {
    let mut record = store
        .load_sender_key(name)?
        .ok_or(Error::NoSenderKeyState)?;
    let state = record
        .sender_key_state_mut()
        .ok_or(Error::NoSenderKeyState)?;

    let signing_key = state
        .signing_key_private()
        .ok_or_else(|| Error::InvalidKey(format!("No signing key for sender key {name}")))?;
    let message_key = state.chain_key().sender_message_key()?;
    let ciphertext = aes_cbc_encrypt(message_key.cipher_key(), message_key.iv(), plaintext)?;

    let message = SenderKeyMessage::new(
        CIPHERTEXT_MESSAGE_CURRENT_VERSION,
        state.key_id(),
        message_key.iteration(),
        ciphertext,
        signing_key,
    );

    let next = state.chain_key().next()?;
    state.set_chain_key(next);
    store.store_sender_key(name, &record)?;

    Ok(message)
}

pub(crate) fn group_decrypt<S: SenderKeyStore>(
    store: &S,
    config: &SessionConfig,
    name: &SenderKeyName,
    message: &SenderKeyMessage,
) -> Result<Vec<u8>, Error> {
    let mut record = store
        .load_sender_key(name)?
        .ok_or(Error::NoSenderKeyState)?;
    let state = record
        .sender_key_state_for_key_id(message.key_id())
        .ok_or(Error::NoSenderKeyState)?;

    if !message.verify_signature(state.signing_key_public())? {
        warn!(%name, key_id = message.key_id(), "Sender key message signature mismatch");
        return Err(Error::InvalidSignature);
    }

    let message_key = sender_message_key(state, message.iteration(), config)?;
    let plaintext = aes_cbc_decrypt(message_key.cipher_key(), message_key.iv(), message.ciphertext())?;

    store.store_sender_key(name, &record)?;
    Ok(plaintext)
}

/// Message key for `iteration`, caching the keys of any skipped iterations.
fn sender_message_key(
    state: &mut SenderKeyState,
    iteration: u32,
    config: &SessionConfig,
) -> Result<SenderMessageKey, Error> {
    let current = state.chain_key().iteration();

    if current > iteration {
        return state
            .remove_message_key(iteration)
            .ok_or(Error::StaleCounter {
                current,
                requested: iteration,
            });
    }

    if iteration - current > config.max_skipped_messages {
        return Err(Error::TooFarInFuture {
            current,
            requested: iteration,
            limit: config.max_skipped_messages,
        });
    }

    let mut chain_key = state.chain_key().clone();
    while chain_key.iteration() < iteration {
        state.add_message_key(chain_key.sender_message_key()?, config.max_message_keys);
        chain_key = chain_key.next()?;
    }
    if iteration > current {
        debug!(skipped = iteration - current, "Cached skipped sender message keys");
    }

    state.set_chain_key(chain_key.next()?);
    chain_key.sender_message_key()
}
