pub mod crypto;
pub mod types;

mod address;
pub use address::{SenderKeyName, SessionAddress};

mod error;
pub use error::Error;

mod config;
pub use config::*;

mod x3dh;
pub use x3dh::*;

mod ratchet;
pub use ratchet::*;

mod group;
pub use group::*;

mod message;
pub use message::*;

mod proto;

pub mod store;
pub use store::{InMemoryKeyStore, ProtocolStore};

mod session;
pub use session::SessionManager;

mod handshake;
pub use handshake::*;
