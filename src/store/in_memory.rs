use crate::crypto::generate_registration_id;
use crate::store::{
    Direction, IdentityKeyStore, PreKeyStore, SenderKeyStore, SessionStore, SignedPreKeyStore,
};
use crate::types::X25519PublicKey;
use crate::{
    Error, IdentityKey, IdentityKeyPair, PreKeyBundle, PreKeyRecord, SenderKeyName,
    SenderKeyRecord, SessionAddress, SessionRecord, SignedPreKeyRecord,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

struct PreKeyPool<T> {
    keys: BTreeMap<u32, T>,
    next_id: u32,
}

impl<T> PreKeyPool<T> {
    fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        // Pre-key ids are 24-bit on the wire.
        self.next_id = if self.next_id >= 0x00ff_ffff {
            1
        } else {
            self.next_id + 1
        };
        id
    }
}

/// Key store that keeps everything in memory.
///
/// Identities are trusted on first use: the first key seen for an address is
/// pinned and any later, different key is rejected.
pub struct InMemoryKeyStore {
    identity: IdentityKeyPair,
    registration_id: u32,
    identities: RwLock<HashMap<SessionAddress, IdentityKey>>,
    pre_keys: RwLock<PreKeyPool<PreKeyRecord>>,
    signed_pre_keys: RwLock<PreKeyPool<SignedPreKeyRecord>>,
    sessions: RwLock<HashMap<SessionAddress, SessionRecord>>,
    sender_keys: RwLock<HashMap<SenderKeyName, SenderKeyRecord>>,
}

impl InMemoryKeyStore {
    pub fn new(identity: IdentityKeyPair, registration_id: u32) -> Self {
        Self {
            identity,
            registration_id,
            identities: RwLock::new(HashMap::new()),
            pre_keys: RwLock::new(PreKeyPool::new()),
            signed_pre_keys: RwLock::new(PreKeyPool::new()),
            sessions: RwLock::new(HashMap::new()),
            sender_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store with a fresh identity, registration id and signed pre-key.
    pub fn generate() -> Result<Self, Error> {
        let store = Self::new(IdentityKeyPair::generate()?, generate_registration_id()?);
        store.rotate_signed_pre_key()?;
        Ok(store)
    }

    /// Generates `count` one-time pre-keys and returns their public halves.
    pub fn generate_pre_keys(&self, count: usize) -> Result<Vec<(u32, X25519PublicKey)>, Error> {
        let mut pool = self.pre_keys.write();
        let mut public_keys = Vec::with_capacity(count);
        for _ in 0..count {
            let id = pool.allocate_id();
            let record = PreKeyRecord::generate(id)?;
            public_keys.push((id, record.public_key()));
            pool.keys.insert(id, record);
        }

        debug!(count, "Generated one-time pre-keys");
        Ok(public_keys)
    }

    /// Generates and signs a new signed pre-key; it becomes the one published.
    pub fn rotate_signed_pre_key(&self) -> Result<u32, Error> {
        let mut pool = self.signed_pre_keys.write();
        let id = pool.allocate_id();
        pool.keys
            .insert(id, SignedPreKeyRecord::generate(id, &self.identity)?);
        Ok(id)
    }

    pub fn pre_key_count(&self) -> usize {
        self.pre_keys.read().keys.len()
    }

    /// Builds the bundle a peer needs to start a session with this device.
    pub fn pre_key_bundle(&self, device_id: u32) -> Result<PreKeyBundle, Error> {
        let signed_pre_keys = self.signed_pre_keys.read();
        let (_, signed_pre_key) = signed_pre_keys
            .keys
            .iter()
            .max_by_key(|(_, record)| (record.timestamp(), record.id()))
            .ok_or_else(|| Error::Storage("No signed pre-key available".to_string()))?;

        let pre_key = self
            .pre_keys
            .read()
            .keys
            .values()
            .next()
            .map(|record| (record.id(), record.public_key()));

        Ok(PreKeyBundle::new(
            self.registration_id,
            device_id,
            pre_key,
            (signed_pre_key.id(), signed_pre_key.public_key()),
            signed_pre_key.signature().to_vec(),
            self.identity.public_key(),
        ))
    }
}

impl IdentityKeyStore for InMemoryKeyStore {
    fn identity_key_pair(&self) -> Result<IdentityKeyPair, Error> {
        Ok(self.identity.clone())
    }

    fn local_registration_id(&self) -> Result<u32, Error> {
        Ok(self.registration_id)
    }

    fn is_trusted_identity(
        &self,
        address: &SessionAddress,
        identity: &IdentityKey,
        direction: Direction,
    ) -> Result<bool, Error> {
        match self.identities.read().get(address) {
            None => Ok(true),
            Some(pinned) if pinned == identity => Ok(true),
            Some(pinned) => {
                warn!(
                    %address,
                    ?direction,
                    pinned = %pinned.fingerprint(),
                    presented = %identity.fingerprint(),
                    "Identity key does not match pinned key"
                );
                Ok(false)
            }
        }
    }

    fn save_identity(
        &self,
        address: &SessionAddress,
        identity: &IdentityKey,
    ) -> Result<bool, Error> {
        let previous = self.identities.write().insert(address.clone(), *identity);
        Ok(previous.is_some_and(|previous| previous != *identity))
    }

    fn identity(&self, address: &SessionAddress) -> Result<Option<IdentityKey>, Error> {
        Ok(self.identities.read().get(address).copied())
    }
}

impl PreKeyStore for InMemoryKeyStore {
    fn pre_key(&self, id: u32) -> Result<Option<PreKeyRecord>, Error> {
        Ok(self.pre_keys.read().keys.get(&id).cloned())
    }

    fn save_pre_key(&self, id: u32, record: &PreKeyRecord) -> Result<(), Error> {
        self.pre_keys.write().keys.insert(id, record.clone());
        Ok(())
    }

    fn remove_pre_key(&self, id: u32) -> Result<(), Error> {
        self.pre_keys.write().keys.remove(&id);
        Ok(())
    }
}

impl SignedPreKeyStore for InMemoryKeyStore {
    fn signed_pre_key(&self, id: u32) -> Result<Option<SignedPreKeyRecord>, Error> {
        Ok(self.signed_pre_keys.read().keys.get(&id).cloned())
    }

    fn save_signed_pre_key(&self, id: u32, record: &SignedPreKeyRecord) -> Result<(), Error> {
        self.signed_pre_keys.write().keys.insert(id, record.clone());
        Ok(())
    }
}

impl SessionStore for InMemoryKeyStore {
    fn load_session(&self, address: &SessionAddress) -> Result<Option<SessionRecord>, Error> {
        Ok(self.sessions.read().get(address).cloned())
    }

    fn store_session(&self, address: &SessionAddress, record: &SessionRecord) -> Result<(), Error> {
        self.sessions.write().insert(address.clone(), record.clone());
        Ok(())
    }

    fn delete_session(&self, address: &SessionAddress) -> Result<(), Error> {
        self.sessions.write().remove(address);
        Ok(())
    }
}

impl SenderKeyStore for InMemoryKeyStore {
    fn load_sender_key(&self, name: &SenderKeyName) -> Result<Option<SenderKeyRecord>, Error> {
        Ok(self.sender_keys.read().get(name).cloned())
    }

    fn store_sender_key(&self, name: &SenderKeyName, record: &SenderKeyRecord) -> Result<(), Error> {
        self.sender_keys.write().insert(name.clone(), record.clone());
        Ok(())
    }
}
