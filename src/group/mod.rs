//! Sender keys: one hash ratchet per sender and group, distributed over
//! pairwise sessions and authenticated with a per-chain Ed25519 key.

mod builder;
mod chain;
mod cipher;
mod message;
mod state;

pub(crate) use builder::{create_sender_key_distribution, process_sender_key_distribution};
pub(crate) use chain::{SenderChainKey, SenderMessageKey};
pub(crate) use cipher::{group_decrypt, group_encrypt};
pub use message::{SIGNATURE_LENGTH, SenderKeyDistributionMessage, SenderKeyMessage};
pub(crate) use state::SenderKeyState;
pub use state::SenderKeyRecord;
