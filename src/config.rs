/// Largest forward gap a receiving chain may be advanced in one step.
pub const MAX_SKIPPED_MESSAGES: u32 = 2000;

/// Maximum number of skipped message keys cached per chain.
pub const MAX_MESSAGE_KEYS: usize = 2000;

/// Maximum number of receiving chains kept per session state.
pub const MAX_RECEIVER_CHAINS: usize = 5;

/// Maximum number of archived session states kept per record.
pub const MAX_ARCHIVED_STATES: usize = 40;

/// Maximum number of sender key states kept per group and sender.
pub const MAX_SENDER_KEY_STATES: usize = 5;

/// Tunable bounds for session and sender-key bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Largest forward gap accepted on a receiving chain.
    pub max_skipped_messages: u32,
    /// Skipped message keys cached per chain; the oldest are evicted.
    pub max_message_keys: usize,
    /// Receiving chains kept per state; the oldest are evicted.
    pub max_receiver_chains: usize,
    /// Previous session states kept for fallback decryption.
    pub max_archived_states: usize,
    /// Sender key states kept per group and sender.
    pub max_sender_key_states: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_skipped_messages: MAX_SKIPPED_MESSAGES,
            max_message_keys: MAX_MESSAGE_KEYS,
            max_receiver_chains: MAX_RECEIVER_CHAINS,
            max_archived_states: MAX_ARCHIVED_STATES,
            max_sender_key_states: MAX_SENDER_KEY_STATES,
        }
    }
}
