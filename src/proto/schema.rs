//! Protobuf messages for the wire formats and for persisted records.

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SignalMessageProto {
    #[prost(bytes = "vec", tag = "1")]
    pub(crate) ratchet_key: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub(crate) counter: u32,
    #[prost(uint32, tag = "3")]
    pub(crate) previous_counter: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) ciphertext: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PreKeySignalMessageProto {
    #[prost(uint32, optional, tag = "1")]
    pub(crate) pre_key_id: Option<u32>,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) base_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) identity_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) message: Vec<u8>,
    #[prost(uint32, tag = "5")]
    pub(crate) registration_id: u32,
    #[prost(uint32, tag = "6")]
    pub(crate) signed_pre_key_id: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderKeyMessageProto {
    #[prost(uint32, tag = "1")]
    pub(crate) id: u32,
    #[prost(uint32, tag = "2")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) ciphertext: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderKeyDistributionMessageProto {
    #[prost(uint32, tag = "1")]
    pub(crate) id: u32,
    #[prost(uint32, tag = "2")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) chain_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) signing_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct ChainKeyProto {
    #[prost(uint32, tag = "1")]
    pub(crate) index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct MessageKeyProto {
    #[prost(uint32, tag = "1")]
    pub(crate) index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) cipher_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) mac_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) iv: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct ChainProto {
    #[prost(bytes = "vec", tag = "1")]
    pub(crate) sender_ratchet_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) sender_ratchet_key_private: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub(crate) chain_key: Option<ChainKeyProto>,
    #[prost(message, repeated, tag = "4")]
    pub(crate) message_keys: Vec<MessageKeyProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PendingPreKeyProto {
    #[prost(uint32, optional, tag = "1")]
    pub(crate) pre_key_id: Option<u32>,
    #[prost(uint32, tag = "2")]
    pub(crate) signed_pre_key_id: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) base_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SessionStructureProto {
    #[prost(uint32, tag = "1")]
    pub(crate) session_version: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) local_identity: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) remote_identity: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) root_key: Vec<u8>,
    #[prost(uint32, tag = "5")]
    pub(crate) previous_counter: u32,
    #[prost(message, optional, tag = "6")]
    pub(crate) sender_chain: Option<ChainProto>,
    #[prost(message, repeated, tag = "7")]
    pub(crate) receiver_chains: Vec<ChainProto>,
    #[prost(message, optional, tag = "8")]
    pub(crate) pending_pre_key: Option<PendingPreKeyProto>,
    #[prost(uint32, tag = "9")]
    pub(crate) remote_registration_id: u32,
    #[prost(uint32, tag = "10")]
    pub(crate) local_registration_id: u32,
    #[prost(bytes = "vec", tag = "11")]
    pub(crate) base_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct RecordStructureProto {
    #[prost(message, optional, tag = "1")]
    pub(crate) current_session: Option<SessionStructureProto>,
    #[prost(message, repeated, tag = "2")]
    pub(crate) previous_sessions: Vec<SessionStructureProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderChainKeyProto {
    #[prost(uint32, tag = "1")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) seed: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderKeyStateProto {
    #[prost(uint32, tag = "1")]
    pub(crate) key_id: u32,
    #[prost(message, optional, tag = "2")]
    pub(crate) chain_key: Option<SenderChainKeyProto>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) signing_key_public: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub(crate) signing_key_private: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "5")]
    pub(crate) message_keys: Vec<SenderChainKeyProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderKeyRecordProto {
    #[prost(message, repeated, tag = "1")]
    pub(crate) states: Vec<SenderKeyStateProto>,
}
