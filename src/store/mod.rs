//! Boundary to the key store that owns identities, pre-keys and records.
//!
//! Every method returns `Result` so that persistence failures surface as
//! [`Error::Storage`](crate::Error::Storage) instead of being swallowed.

mod in_memory;
pub use in_memory::InMemoryKeyStore;

use crate::{
    Error, IdentityKey, IdentityKeyPair, PreKeyRecord, SenderKeyName, SenderKeyRecord,
    SessionAddress, SessionRecord, SignedPreKeyRecord,
};

/// Whether an identity is being checked for an outgoing or incoming message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Sending,
    Receiving,
}

pub trait IdentityKeyStore {
    fn identity_key_pair(&self) -> Result<IdentityKeyPair, Error>;

    fn local_registration_id(&self) -> Result<u32, Error>;

    /// Trust decision for `identity` at `address`.
    fn is_trusted_identity(
        &self,
        address: &SessionAddress,
        identity: &IdentityKey,
        direction: Direction,
    ) -> Result<bool, Error>;

    /// Pins `identity` for `address`. Returns `true` if a different key was replaced.
    fn save_identity(&self, address: &SessionAddress, identity: &IdentityKey)
    -> Result<bool, Error>;

    fn identity(&self, address: &SessionAddress) -> Result<Option<IdentityKey>, Error>;
}

pub trait PreKeyStore {
    fn pre_key(&self, id: u32) -> Result<Option<PreKeyRecord>, Error>;

    fn save_pre_key(&self, id: u32, record: &PreKeyRecord) -> Result<(), Error>;

    fn remove_pre_key(&self, id: u32) -> Result<(), Error>;
}

pub trait SignedPreKeyStore {
    fn signed_pre_key(&self, id: u32) -> Result<Option<SignedPreKeyRecord>, Error>;

    fn save_signed_pre_key(&self, id: u32, record: &SignedPreKeyRecord) -> Result<(), Error>;
}

pub trait SessionStore {
    fn load_session(&self, address: &SessionAddress) -> Result<Option<SessionRecord>, Error>;

    fn store_session(&self, address: &SessionAddress, record: &SessionRecord)
    -> Result<(), Error>;

    fn delete_session(&self, address: &SessionAddress) -> Result<(), Error>;
}

pub trait SenderKeyStore {
    fn load_sender_key(&self, name: &SenderKeyName) -> Result<Option<SenderKeyRecord>, Error>;

    fn store_sender_key(&self, name: &SenderKeyName, record: &SenderKeyRecord)
    -> Result<(), Error>;
}

/// Everything the session layer needs from the key store.
pub trait ProtocolStore:
    IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore + SenderKeyStore
{
}

impl<T> ProtocolStore for T where
    T: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore + SenderKeyStore
{
}
