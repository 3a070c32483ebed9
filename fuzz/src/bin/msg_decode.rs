#[macro_use]
extern crate afl;
use whisper_session::{CiphertextMessage, CiphertextMessageType};

fn main() {
    fuzz!(|data: &[u8]| {
        for message_type in [
            CiphertextMessageType::Whisper,
            CiphertextMessageType::PreKey,
            CiphertextMessageType::SenderKey,
            CiphertextMessageType::SenderKeyDistribution,
        ] {
            let _ = CiphertextMessage::deserialize(message_type, data);
        }
    });
}
