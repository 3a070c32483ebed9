#[cfg(test)]
mod integration_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use whisper_session::store::{
        Direction, IdentityKeyStore, PreKeyStore, SenderKeyStore, SessionStore, SignedPreKeyStore,
    };
    use whisper_session::{
        CiphertextMessage, CiphertextMessageType, Error, Handshake, IdentityKey, IdentityKeyPair,
        InMemoryKeyStore, PreKeyBundle, PreKeyRecord, PreKeySignalMessage, Role,
        SenderKeyDistributionMessage, SenderKeyName, SenderKeyRecord, SessionAddress,
        SessionConfig, SessionManager, SessionRecord, SignedPreKeyRecord,
    };
    use whisper_session::types::X25519Secret;

    fn manager() -> SessionManager<InMemoryKeyStore> {
        SessionManager::new(InMemoryKeyStore::generate().unwrap(), SessionConfig::default())
    }

    fn alice_address() -> SessionAddress {
        SessionAddress::new("alice", 1)
    }

    fn bob_address() -> SessionAddress {
        SessionAddress::new("bob", 1)
    }

    /// Alice starts a session with Bob and they exchange one message each, so
    /// both sides send plain whisper messages from then on.
    fn established_pair() -> (
        SessionManager<InMemoryKeyStore>,
        SessionManager<InMemoryKeyStore>,
    ) {
        let alice = manager();
        let bob = manager();
        bob.store().generate_pre_keys(5).unwrap();

        let bundle = bob.store().pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();

        let hello = alice.cipher(&bob_address(), b"hello").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &hello).unwrap(), b"hello");
        let reply = bob.cipher(&alice_address(), b"hi").unwrap();
        assert_eq!(alice.decipher(&bob_address(), &reply).unwrap(), b"hi");

        (alice, bob)
    }

    fn counter(message: &CiphertextMessage) -> Option<u32> {
        match message {
            CiphertextMessage::Whisper(message) => Some(message.counter()),
            CiphertextMessage::PreKey(message) => Some(message.message().counter()),
            CiphertextMessage::SenderKey(_) | CiphertextMessage::SenderKeyDistribution(_) => None,
        }
    }

    #[test]
    fn test_full_protocol_flow() {
        println!("Step 1: Creating stores for Alice and Bob...");
        let alice = manager();
        let bob = manager();
        let published = bob.store().generate_pre_keys(10).unwrap();
        assert_eq!(published.len(), 10);

        println!("Step 2: Bob publishes his pre-key bundle...");
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        assert!(bundle.verify().is_ok(), "Bundle verification failed");

        println!("Step 3: Alice creates an outgoing session to Bob...");
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        assert!(alice.has_session(&bob_address()).unwrap());
        assert_eq!(alice.session_version(&bob_address()).unwrap(), 3);
        assert_eq!(
            alice.remote_registration_id(&bob_address()).unwrap(),
            bob.store().local_registration_id().unwrap()
        );

        println!("Step 4: Alice sends her first message...");
        let first = alice
            .cipher(&bob_address(), b"Hey Bob, this is a secure message!")
            .unwrap();
        assert_eq!(first.message_type(), CiphertextMessageType::PreKey);
        let context = first.pre_key_context().unwrap();
        assert_eq!(context.pre_key_id, bundle.pre_key().map(|(id, _)| id));
        assert_eq!(context.identity_key, &alice.store().identity_key_pair().unwrap().public_key());

        println!("Step 5: The message crosses the wire as bytes...");
        let wire = CiphertextMessage::deserialize(first.message_type(), first.serialized()).unwrap();
        assert_eq!(wire, first);

        println!("Step 6: Bob decrypts Alice's first message...");
        assert_eq!(
            bob.decipher(&alice_address(), &wire).unwrap(),
            b"Hey Bob, this is a secure message!"
        );
        assert_eq!(
            bob.remote_registration_id(&alice_address()).unwrap(),
            alice.store().local_registration_id().unwrap()
        );

        println!("Step 7: Bob replies to Alice...");
        let reply = bob
            .cipher(&alice_address(), b"Hi Alice! I received your secure message.")
            .unwrap();
        assert_eq!(reply.message_type(), CiphertextMessageType::Whisper);

        println!("Step 8: Alice decrypts Bob's reply...");
        assert_eq!(
            alice.decipher(&bob_address(), &reply).unwrap(),
            b"Hi Alice! I received your secure message."
        );

        println!("Step 9: Alice's next message no longer carries the handshake...");
        let second = alice.cipher(&bob_address(), b"How's the weather there?").unwrap();
        assert!(second.pre_key_context().is_none());
        assert_eq!(
            bob.decipher(&alice_address(), &second).unwrap(),
            b"How's the weather there?"
        );

        println!("Step 10: Several round trips ratchet both sides forward...");
        for round in 0..5 {
            let text = format!("ping {round}");
            let message = alice.cipher(&bob_address(), text.as_bytes()).unwrap();
            assert_eq!(bob.decipher(&alice_address(), &message).unwrap(), text.as_bytes());

            let text = format!("pong {round}");
            let message = bob.cipher(&alice_address(), text.as_bytes()).unwrap();
            assert_eq!(alice.decipher(&bob_address(), &message).unwrap(), text.as_bytes());
        }
    }

    #[test]
    fn test_out_of_order_delivery_and_replay() {
        let (alice, bob) = established_pair();

        println!("Step 1: Alice sends three messages...");
        let messages: Vec<_> = ["zero", "one", "two"]
            .iter()
            .map(|text| alice.cipher(&bob_address(), text.as_bytes()).unwrap())
            .collect();

        println!("Step 2: Bob receives them as 2, 0, 1...");
        assert_eq!(bob.decipher(&alice_address(), &messages[2]).unwrap(), b"two");
        assert_eq!(bob.decipher(&alice_address(), &messages[0]).unwrap(), b"zero");
        assert_eq!(bob.decipher(&alice_address(), &messages[1]).unwrap(), b"one");

        println!("Step 3: Redelivering message 0 is rejected...");
        assert!(matches!(
            bob.decipher(&alice_address(), &messages[0]),
            Err(Error::StaleCounter { .. })
        ));

        println!("Step 4: The session keeps working after the replay...");
        let next = alice.cipher(&bob_address(), b"three").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &next).unwrap(), b"three");
    }

    #[test]
    fn test_skip_bound() {
        let alice = manager();
        let config = SessionConfig {
            max_skipped_messages: 5,
            ..SessionConfig::default()
        };
        let bob = SessionManager::new(InMemoryKeyStore::generate().unwrap(), config);
        bob.store().generate_pre_keys(1).unwrap();
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();

        let first = alice.cipher(&bob_address(), b"first").unwrap();
        bob.decipher(&alice_address(), &first).unwrap();

        let mut messages: Vec<_> = (0..7)
            .map(|i| alice.cipher(&bob_address(), format!("{i}").as_bytes()).unwrap())
            .collect();
        let far = messages.pop().unwrap();
        assert_eq!(counter(&far), Some(7));

        println!("Step 1: A gap larger than the bound is refused...");
        assert!(matches!(
            bob.decipher(&alice_address(), &far),
            Err(Error::TooFarInFuture { limit: 5, .. })
        ));

        println!("Step 2: A gap within the bound is accepted...");
        let near = messages.pop().unwrap();
        assert_eq!(bob.decipher(&alice_address(), &near).unwrap(), b"5");
        assert_eq!(bob.decipher(&alice_address(), &far).unwrap(), b"6");
        assert_eq!(bob.decipher(&alice_address(), &messages[0]).unwrap(), b"0");
    }

    #[test]
    fn test_archived_state_fallback() {
        let (alice, bob) = established_pair();

        println!("Step 1: Alice sends a message on the first session and holds it back...");
        let delayed = alice.cipher(&bob_address(), b"from the old session").unwrap();
        assert_eq!(delayed.message_type(), CiphertextMessageType::Whisper);

        println!("Step 2: Alice starts over with a fresh bundle...");
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        let restart = alice.cipher(&bob_address(), b"new session").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &restart).unwrap(), b"new session");

        println!("Step 3: The delayed message decrypts with Bob's archived state...");
        assert_eq!(
            bob.decipher(&alice_address(), &delayed).unwrap(),
            b"from the old session"
        );

        println!("Step 4: Redelivery fails against every state...");
        assert!(bob.decipher(&alice_address(), &delayed).is_err());
    }

    #[test]
    fn test_pre_key_lifecycle() {
        let alice = manager();
        let bob = manager();
        bob.store().generate_pre_keys(1).unwrap();
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        let (pre_key_id, _) = bundle.pre_key().unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();

        let message = alice.cipher(&bob_address(), b"first").unwrap();
        let pre_key_message = PreKeySignalMessage::try_from(message.serialized()).unwrap();

        println!("Step 1: Building the session keeps the one-time pre-key...");
        assert_eq!(
            bob.create_incoming_session(&alice_address(), &pre_key_message).unwrap(),
            Some(pre_key_id)
        );
        assert_eq!(bob.store().pre_key_count(), 1);

        println!("Step 2: A retransmitted handshake changes nothing...");
        assert_eq!(
            bob.create_incoming_session(&alice_address(), &pre_key_message).unwrap(),
            None
        );

        println!("Step 3: Decrypting consumes the one-time pre-key...");
        assert_eq!(bob.decipher(&alice_address(), &message).unwrap(), b"first");
        assert_eq!(bob.store().pre_key_count(), 0);
        assert!(bob.store().pre_key(pre_key_id).unwrap().is_none());

        println!("Step 4: Later pre-key messages on the same session still decrypt...");
        let second = alice.cipher(&bob_address(), b"second").unwrap();
        assert_eq!(second.message_type(), CiphertextMessageType::PreKey);
        assert_eq!(bob.decipher(&alice_address(), &second).unwrap(), b"second");

        println!("Step 5: A replayed pre-key message is stale but harmless...");
        assert!(matches!(
            bob.decipher(&alice_address(), &message),
            Err(Error::StaleCounter { .. })
        ));
        let third = alice.cipher(&bob_address(), b"third").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &third).unwrap(), b"third");
    }

    #[test]
    fn test_missing_pre_keys() {
        let alice = manager();
        let bob = manager();
        bob.store().generate_pre_keys(1).unwrap();
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        let (pre_key_id, _) = bundle.pre_key().unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        let message = alice.cipher(&bob_address(), b"first").unwrap();

        bob.store().remove_pre_key(pre_key_id).unwrap();
        assert_eq!(
            bob.decipher(&alice_address(), &message),
            Err(Error::MissingPreKey(pre_key_id))
        );
        assert!(!bob.has_session(&alice_address()).unwrap());
    }

    #[test]
    fn test_bundle_without_one_time_pre_key() {
        let alice = manager();
        let bob = manager();
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        assert!(bundle.pre_key().is_none());

        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        let message = alice.cipher(&bob_address(), b"no one-time key").unwrap();
        assert_eq!(message.pre_key_context().unwrap().pre_key_id, None);
        assert_eq!(
            bob.decipher(&alice_address(), &message).unwrap(),
            b"no one-time key"
        );
    }

    #[test]
    fn test_bundle_with_bad_signature() {
        let alice = manager();
        let bob = manager();
        let bundle = bob.store().pre_key_bundle(1).unwrap();

        let mut signature = bundle.signed_pre_key_signature().to_vec();
        signature[10] ^= 0x01;
        let forged = PreKeyBundle::new(
            bundle.registration_id(),
            bundle.device_id(),
            bundle.pre_key(),
            (bundle.signed_pre_key_id(), bundle.signed_pre_key()),
            signature,
            *bundle.identity_key(),
        );

        assert_eq!(
            alice.create_outgoing_session(&bob_address(), &forged),
            Err(Error::InvalidSignature)
        );
        assert!(!alice.has_session(&bob_address()).unwrap());
    }

    #[test]
    fn test_identity_pinning() {
        let (alice, _bob) = established_pair();

        println!("Step 1: An impostor publishes a bundle for Bob's address...");
        let impostor = manager();
        let bundle = impostor.store().pre_key_bundle(1).unwrap();

        println!("Step 2: Alice refuses it...");
        assert!(matches!(
            alice.create_outgoing_session(&bob_address(), &bundle),
            Err(Error::UntrustedIdentity(_))
        ));

        println!("Step 3: The impostor's first message is refused too...");
        let alice_bundle = alice.store().pre_key_bundle(1).unwrap();
        impostor
            .create_outgoing_session(&alice_address(), &alice_bundle)
            .unwrap();
        let message = impostor.cipher(&alice_address(), b"trust me").unwrap();
        assert!(matches!(
            alice.decipher(&bob_address(), &message),
            Err(Error::UntrustedIdentity(_))
        ));

        println!("Step 4: The genuine session is untouched...");
        let still_ok = alice.cipher(&bob_address(), b"still talking to Bob").unwrap();
        assert_eq!(still_ok.message_type(), CiphertextMessageType::Whisper);
    }

    #[test]
    fn test_delete_session() {
        let (alice, bob) = established_pair();

        alice.delete_session(&bob_address()).unwrap();
        assert!(!alice.has_session(&bob_address()).unwrap());
        assert!(matches!(
            alice.cipher(&bob_address(), b"gone"),
            Err(Error::NoSession(_))
        ));

        println!("Resetting the session needs a new handshake...");
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        let message = alice.cipher(&bob_address(), b"again").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &message).unwrap(), b"again");
    }

    #[test]
    fn test_sender_key_messages_are_rejected_by_pairwise_decipher() {
        let (alice, bob) = established_pair();
        let name = SenderKeyName::new("group", alice_address());
        alice.create_sender_key_distribution(&name).unwrap();
        let group_message = alice.group_cipher(&name, b"hello group").unwrap();

        assert!(matches!(
            bob.decipher(&alice_address(), &CiphertextMessage::SenderKey(group_message)),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_group_messaging() {
        let (alice, bob) = established_pair();
        let carol = manager();
        let name = SenderKeyName::new("friends", alice_address());

        println!("Step 1: Alice creates her sender key and distributes it over a session...");
        let distribution = alice.create_sender_key_distribution(&name).unwrap();
        let wrapped = alice.cipher(&bob_address(), distribution.serialized()).unwrap();
        let unwrapped = bob.decipher(&alice_address(), &wrapped).unwrap();
        let received = SenderKeyDistributionMessage::try_from(unwrapped.as_slice()).unwrap();
        assert_eq!(received, distribution);
        bob.process_sender_key_distribution(&name, &received).unwrap();
        carol.process_sender_key_distribution(&name, &distribution).unwrap();

        println!("Step 2: Alice broadcasts...");
        let messages: Vec<_> = (0..4)
            .map(|i| alice.group_cipher(&name, format!("group {i}").as_bytes()).unwrap())
            .collect();

        println!("Step 3: Members decrypt in any order...");
        assert_eq!(bob.group_decipher(&name, &messages[3]).unwrap(), b"group 3");
        assert_eq!(bob.group_decipher(&name, &messages[1]).unwrap(), b"group 1");
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(
                carol.group_decipher(&name, message).unwrap(),
                format!("group {i}").as_bytes()
            );
        }

        println!("Step 4: Iteration 1 is accepted once only...");
        assert!(matches!(
            bob.group_decipher(&name, &messages[1]),
            Err(Error::StaleCounter { .. })
        ));
        assert_eq!(bob.group_decipher(&name, &messages[0]).unwrap(), b"group 0");

        println!("Step 5: Reprocessing the same distribution does not rewind...");
        bob.process_sender_key_distribution(&name, &received).unwrap();
        assert_eq!(bob.group_decipher(&name, &messages[2]).unwrap(), b"group 2");
        assert!(bob.group_decipher(&name, &messages[2]).is_err());
    }

    /// Store wrapper whose session, sender key and pre-key removal writes
    /// can be made to fail.
    struct FlakyStore {
        inner: InMemoryKeyStore,
        fail_writes: AtomicBool,
        fail_pre_key_removal: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryKeyStore::generate().unwrap(),
                fail_writes: AtomicBool::new(false),
                fail_pre_key_removal: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), Error> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".to_string()));
            }
            Ok(())
        }
    }

    impl IdentityKeyStore for FlakyStore {
        fn identity_key_pair(&self) -> Result<IdentityKeyPair, Error> {
            self.inner.identity_key_pair()
        }

        fn local_registration_id(&self) -> Result<u32, Error> {
            self.inner.local_registration_id()
        }

        fn is_trusted_identity(
            &self,
            address: &SessionAddress,
            identity: &IdentityKey,
            direction: Direction,
        ) -> Result<bool, Error> {
            self.inner.is_trusted_identity(address, identity, direction)
        }

        fn save_identity(
            &self,
            address: &SessionAddress,
            identity: &IdentityKey,
        ) -> Result<bool, Error> {
            self.inner.save_identity(address, identity)
        }

        fn identity(&self, address: &SessionAddress) -> Result<Option<IdentityKey>, Error> {
            self.inner.identity(address)
        }
    }

    impl PreKeyStore for FlakyStore {
        fn pre_key(&self, id: u32) -> Result<Option<PreKeyRecord>, Error> {
            self.inner.pre_key(id)
        }

        fn save_pre_key(&self, id: u32, record: &PreKeyRecord) -> Result<(), Error> {
            self.inner.save_pre_key(id, record)
        }

        fn remove_pre_key(&self, id: u32) -> Result<(), Error> {
            if self.fail_pre_key_removal.load(Ordering::SeqCst) {
                return Err(Error::Storage("pre-key table locked".to_string()));
            }
            self.inner.remove_pre_key(id)
        }
    }

    impl SignedPreKeyStore for FlakyStore {
        fn signed_pre_key(&self, id: u32) -> Result<Option<SignedPreKeyRecord>, Error> {
            self.inner.signed_pre_key(id)
        }

        fn save_signed_pre_key(&self, id: u32, record: &SignedPreKeyRecord) -> Result<(), Error> {
            self.inner.save_signed_pre_key(id, record)
        }
    }

    impl SessionStore for FlakyStore {
        fn load_session(&self, address: &SessionAddress) -> Result<Option<SessionRecord>, Error> {
            self.inner.load_session(address)
        }

        fn store_session(
            &self,
            address: &SessionAddress,
            record: &SessionRecord,
        ) -> Result<(), Error> {
            self.check()?;
            self.inner.store_session(address, record)
        }

        fn delete_session(&self, address: &SessionAddress) -> Result<(), Error> {
            self.inner.delete_session(address)
        }
    }

    impl SenderKeyStore for FlakyStore {
        fn load_sender_key(&self, name: &SenderKeyName) -> Result<Option<SenderKeyRecord>, Error> {
            self.inner.load_sender_key(name)
        }

        fn store_sender_key(
            &self,
            name: &SenderKeyName,
            record: &SenderKeyRecord,
        ) -> Result<(), Error> {
            self.check()?;
            self.inner.store_sender_key(name, record)
        }
    }

    #[test]
    fn test_storage_failure_leaves_records_unchanged() {
        let alice = SessionManager::new(FlakyStore::new(), SessionConfig::default());
        let bob = manager();
        bob.store().generate_pre_keys(1).unwrap();
        let bundle = bob.store().pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();

        println!("Step 1: A failed commit does not advance the sending chain...");
        let before = alice.store().load_session(&bob_address()).unwrap().unwrap();
        alice.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            alice.cipher(&bob_address(), b"lost"),
            Err(Error::Storage(_))
        ));
        let after = alice.store().load_session(&bob_address()).unwrap().unwrap();
        assert_eq!(after.serialize().unwrap(), before.serialize().unwrap());

        alice.store().fail_writes.store(false, Ordering::SeqCst);
        let message = alice.cipher(&bob_address(), b"delivered").unwrap();
        assert_eq!(counter(&message), Some(0));
        assert_eq!(bob.decipher(&alice_address(), &message).unwrap(), b"delivered");

        println!("Step 2: A failed commit on receive leaves the message decryptable...");
        let reply = bob.cipher(&alice_address(), b"reply").unwrap();
        alice.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            alice.decipher(&bob_address(), &reply),
            Err(Error::Storage(_))
        ));
        alice.store().fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(alice.decipher(&bob_address(), &reply).unwrap(), b"reply");

        println!("Step 3: The same holds for sender keys...");
        let name = SenderKeyName::new("group", alice_address());
        alice.create_sender_key_distribution(&name).unwrap();
        alice.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(alice.group_cipher(&name, b"lost").is_err());
        alice.store().fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(alice.group_cipher(&name, b"sent").unwrap().iteration(), 0);
    }

    #[test]
    fn test_pre_key_message_commit_is_atomic() {
        let alice = manager();
        let bob = SessionManager::new(FlakyStore::new(), SessionConfig::default());
        let published = bob.store().inner.generate_pre_keys(1).unwrap();
        let pre_key_id = published[0].0;
        let bundle = bob.store().inner.pre_key_bundle(1).unwrap();
        alice.create_outgoing_session(&bob_address(), &bundle).unwrap();
        let hello = alice.cipher(&bob_address(), b"hello").unwrap();

        println!("Step 1: Failing pre-key removal leaves no session behind...");
        bob.store().fail_pre_key_removal.store(true, Ordering::SeqCst);
        assert!(matches!(
            bob.decipher(&alice_address(), &hello),
            Err(Error::Storage(_))
        ));
        assert!(!bob.has_session(&alice_address()).unwrap());
        assert!(bob.store().pre_key(pre_key_id).unwrap().is_some());
        bob.store().fail_pre_key_removal.store(false, Ordering::SeqCst);

        println!("Step 2: Failing the session write puts the pre-key back...");
        bob.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            bob.decipher(&alice_address(), &hello),
            Err(Error::Storage(_))
        ));
        assert!(!bob.has_session(&alice_address()).unwrap());
        assert!(bob.store().pre_key(pre_key_id).unwrap().is_some());
        bob.store().fail_writes.store(false, Ordering::SeqCst);

        println!("Step 3: Redelivery succeeds once storage recovers...");
        assert_eq!(bob.decipher(&alice_address(), &hello).unwrap(), b"hello");
        assert!(bob.store().pre_key(pre_key_id).unwrap().is_none());
    }

    #[test]
    fn test_message_from_previous_chain_decrypts_once() {
        let (alice, bob) = established_pair();

        println!("Step 1: Bob sends on his current chain but the message is delayed...");
        let old = bob.cipher(&alice_address(), b"old chain").unwrap();

        println!("Step 2: A round trip moves Bob to a new ratchet key...");
        let ping = alice.cipher(&bob_address(), b"ping").unwrap();
        assert_eq!(bob.decipher(&alice_address(), &ping).unwrap(), b"ping");
        let new = bob.cipher(&alice_address(), b"new chain").unwrap();
        let ratchet_key = |message: &CiphertextMessage| match message {
            CiphertextMessage::Whisper(message) => Some(*message.sender_ratchet_key()),
            _ => None,
        };
        assert!(ratchet_key(&old).is_some());
        assert_ne!(ratchet_key(&old), ratchet_key(&new));

        println!("Step 3: Alice ratchets forward, then the delayed message arrives...");
        assert_eq!(alice.decipher(&bob_address(), &new).unwrap(), b"new chain");
        assert_eq!(alice.decipher(&bob_address(), &old).unwrap(), b"old chain");

        println!("Step 4: Redelivery of the delayed message is rejected...");
        assert!(matches!(
            alice.decipher(&bob_address(), &old),
            Err(Error::StaleCounter { .. })
        ));
    }

    #[test]
    fn test_transport_handshake() {
        println!("Step 1: Both sides run the XX pattern...");
        let prologue = b"WA\x06\x03";
        let mut client = Handshake::new(Role::Initiator, prologue);
        let mut server = Handshake::new(Role::Responder, prologue);

        let client_ephemeral = X25519Secret::generate().unwrap();
        let client_static = X25519Secret::generate().unwrap();
        let server_ephemeral = X25519Secret::generate().unwrap();
        let server_static = X25519Secret::generate().unwrap();

        client.authenticate(client_ephemeral.public_key().as_bytes());
        server.authenticate(client_ephemeral.public_key().as_bytes());
        client.authenticate(server_ephemeral.public_key().as_bytes());
        server.authenticate(server_ephemeral.public_key().as_bytes());

        client
            .mix_shared_secret(&client_ephemeral, &server_ephemeral.public_key())
            .unwrap();
        server
            .mix_shared_secret(&server_ephemeral, &client_ephemeral.public_key())
            .unwrap();
        let sealed = server.cipher(server_static.public_key().as_bytes(), true).unwrap();
        assert_eq!(
            client.cipher(&sealed, false).unwrap(),
            server_static.public_key().as_bytes()
        );

        client
            .mix_shared_secret(&client_ephemeral, &server_static.public_key())
            .unwrap();
        server
            .mix_shared_secret(&server_static, &client_ephemeral.public_key())
            .unwrap();
        let sealed = client.cipher(client_static.public_key().as_bytes(), true).unwrap();
        assert_eq!(
            server.cipher(&sealed, false).unwrap(),
            client_static.public_key().as_bytes()
        );

        client
            .mix_shared_secret(&client_static, &server_ephemeral.public_key())
            .unwrap();
        server
            .mix_shared_secret(&server_ephemeral, &client_static.public_key())
            .unwrap();
        let sealed = client.cipher(b"client payload", true).unwrap();
        assert_eq!(server.cipher(&sealed, false).unwrap(), b"client payload");

        println!("Step 2: Finishing yields swapped transport keys...");
        let client_keys = client.finish().unwrap();
        let server_keys = server.finish().unwrap();
        assert_eq!(client_keys.write_key(), server_keys.read_key());
        assert_eq!(client_keys.read_key(), server_keys.write_key());

        println!("Step 3: Frames flow both ways...");
        let (mut client_writer, mut client_reader) = client_keys.split();
        let (mut server_writer, mut server_reader) = server_keys.split();
        for frame in [b"frame one".as_slice(), b"frame two"] {
            let sealed = client_writer.encrypt(frame).unwrap();
            assert_eq!(server_reader.decrypt(&sealed).unwrap(), frame);
        }
        let sealed = server_writer.encrypt(b"server frame").unwrap();
        assert_eq!(client_reader.decrypt(&sealed).unwrap(), b"server frame");
    }
}
