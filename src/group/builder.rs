use crate::config::SessionConfig;
use crate::crypto::{generate_random_seed, random_key_id};
use crate::group::chain::SenderChainKey;
use crate::group::state::SenderKeyState;
use crate::ratchet::CIPHERTEXT_MESSAGE_CURRENT_VERSION;
use crate::store::SenderKeyStore;
use crate::{Error, SenderKeyDistributionMessage, SenderKeyName};
use ed25519_dalek::SigningKey;
use tracing::debug;
use zeroize::Zeroize;

/// Returns the distribution message for our own chain in `name`'s group,
/// creating the chain on first use.
pub(crate) fn create_sender_key_distribution<S: SenderKeyStore>(
    store: &S,
    config: &SessionConfig,
    name: &SenderKeyName,
) -> Result<SenderKeyDistributionMessage, Error> {
    let mut record = store.load_sender_key(name)?.unwrap_or_default();

    if record.is_empty() {
        let key_id = random_key_id()?;
        let seed = generate_random_seed()?;
        let mut signing_seed = generate_random_seed()?;
        let signing_key = SigningKey::from_bytes(&*signing_seed);
        signing_seed.zeroize();

        record.add_sender_key_state(
            SenderKeyState::new(
                key_id,
                SenderChainKey::new(0, seed),
                signing_key.verifying_key(),
                Some(Box::new(signing_key)),
            ),
            config.max_sender_key_states,
        );
        store.store_sender_key(name, &record)?;
        debug!(%name, key_id, "Created sender key");
    }

    let state = record.sender_key_state().ok_or(Error::NoSenderKeyState)?;
    let chain_key = state.chain_key();

    Ok(SenderKeyDistributionMessage::new(
        CIPHERTEXT_MESSAGE_CURRENT_VERSION,
        state.key_id(),
        chain_key.iteration(),
        *chain_key.seed(),
        *state.signing_key_public(),
    ))
}

/// Installs a peer's chain so its group messages can be decrypted.
pub(crate) fn process_sender_key_distribution<S: SenderKeyStore>(
    store: &S,
    config: &SessionConfig,
    name: &SenderKeyName,
    message: &SenderKeyDistributionMessage,
) -> Result<(), Error> {
    let mut record = store.load_sender_key(name)?.unwrap_or_default();

    record.add_sender_key_state(
        SenderKeyState::new(
            message.key_id(),
            SenderChainKey::new(message.iteration(), Box::new(*message.chain_key())),
            *message.signing_key(),
            None,
        ),
        config.max_sender_key_states,
    );

    store.store_sender_key(name, &record)?;
    debug!(%name, key_id = message.key_id(), iteration = message.iteration(), "Processed sender key distribution");
    Ok(())
}
