#[macro_use]
extern crate afl;
use whisper_session::{
    CiphertextMessage, CiphertextMessageType, InMemoryKeyStore, SessionAddress, SessionConfig,
    SessionManager,
};

fn get_manager() -> (SessionManager<InMemoryKeyStore>, SessionAddress) {
    // The victim
    let victim = SessionManager::new(
        InMemoryKeyStore::generate().expect("Setup failed"),
        SessionConfig::default(),
    );
    victim.store().generate_pre_keys(1).expect("Setup failed");

    // The attacker context
    let attacker = SessionManager::new(
        InMemoryKeyStore::generate().expect("Setup failed"),
        SessionConfig::default(),
    );
    let victim_address = SessionAddress::new("victim", 1);
    let bundle = victim.store().pre_key_bundle(1).expect("Setup failed");
    attacker
        .create_outgoing_session(&victim_address, &bundle)
        .expect("Setup failed");
    let hello = attacker
        .cipher(&victim_address, b"hello")
        .expect("Setup failed");

    let attacker_address = SessionAddress::new("attacker", 1);
    victim
        .decipher(&attacker_address, &hello)
        .expect("Setup failed");
    (victim, attacker_address)
}

fn main() {
    let (victim, attacker_address) = get_manager();

    fuzz!(|data: &[u8]| {
        for message_type in [CiphertextMessageType::Whisper, CiphertextMessageType::PreKey] {
            if let Ok(message) = CiphertextMessage::deserialize(message_type, data) {
                let _ = victim.decipher(&attacker_address, &message);
            }
        }
    });
}
