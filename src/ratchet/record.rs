use crate::ratchet::SessionState;
use crate::types::X25519PublicKey;
use std::collections::VecDeque;
use tracing::debug;

/// The current session with a device plus the states it replaced.
///
/// Archived states stay decryptable for messages that were in flight when a
/// new session was negotiated. The archive is ordered most recent first.
#[derive(Clone, Default)]
pub struct SessionRecord {
    pub(crate) current: Option<SessionState>,
    pub(crate) previous: VecDeque<SessionState>,
}

impl SessionRecord {
    pub fn new(state: SessionState) -> Self {
        Self {
            current: Some(state),
            previous: VecDeque::new(),
        }
    }

    pub fn session_state(&self) -> Option<&SessionState> {
        self.current.as_ref()
    }

    pub fn previous_states(&self) -> impl Iterator<Item = &SessionState> {
        self.previous.iter()
    }

    pub(crate) fn set_session_state(&mut self, state: SessionState) {
        self.current = Some(state);
    }

    /// Whether any state in the record was created by the handshake with `base_key`.
    pub fn has_session_state(&self, version: u8, base_key: &X25519PublicKey) -> bool {
        self.current
            .iter()
            .chain(self.previous.iter())
            .any(|state| state.session_version() == version && state.base_key() == base_key)
    }

    /// Moves the current state into the archive.
    pub(crate) fn archive_current_state(&mut self, max_archived: usize) {
        if let Some(state) = self.current.take() {
            self.previous.push_front(state);
            if self.previous.len() > max_archived {
                self.previous.truncate(max_archived);
                debug!(max_archived, "Dropped oldest archived session state");
            }
        }
    }

    /// Archives the current state and installs `state`.
    pub(crate) fn promote_state(&mut self, state: SessionState, max_archived: usize) {
        self.archive_current_state(max_archived);
        self.current = Some(state);
    }

    /// Replaces the archived state at `index` with `updated` and makes it current.
    pub(crate) fn promote_old_session(
        &mut self,
        index: usize,
        updated: SessionState,
        max_archived: usize,
    ) {
        self.previous.remove(index);
        self.promote_state(updated, max_archived);
    }
}
