use std::fmt;

use dashmap::{DashMap, Entry};
use nanoid::nanoid;
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, instrument, warn};

use crate::{
    chat::{MessageId, Requester},
    score::ScoreEvent,
    session::{Selection, SessionInput},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct SessionHandle {
    pub requester: Requester,
    pub message: MessageId,
    pub started: Instant,
    inputs: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    /// False once the session task has dropped its receiver.
    pub fn is_active(&self) -> bool {
        !self.inputs.is_closed()
    }
}

/// Every running session, keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self, inputs))]
    pub fn register(
        &self,
        requester: Requester,
        message: MessageId,
        inputs: mpsc::UnboundedSender<SessionInput>,
    ) -> SessionId {
        let mut id_length = 5;
        let max_attempts_per_length = 10;
        let mut handle = Some(SessionHandle {
            requester,
            message,
            started: Instant::now(),
            inputs,
        });

        loop {
            for _ in 0..max_attempts_per_length {
                let id = SessionId(nanoid!(id_length));
                match self.sessions.entry(id.clone()) {
                    Entry::Occupied(_) => {
                        debug!("Session ID collision, trying another: {}", id);
                        continue;
                    }
                    Entry::Vacant(entry) => {
                        if let Some(handle) = handle.take() {
                            entry.insert(handle);
                        }
                        info!("Registered session {}", id);
                        return id;
                    }
                }
            }

            warn!(
                "Exhausted ID attempts at length {}, increasing to {}",
                id_length,
                id_length + 1
            );
            id_length += 1;
        }
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!("Removed session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Forwards a reaction to the session that published `message`.
    pub fn deliver(&self, message: MessageId, selection: Selection) -> bool {
        let Some(entry) = self
            .sessions
            .iter()
            .find(|entry| entry.value().message == message)
        else {
            debug!("No session owns message {}", message);
            return false;
        };

        entry
            .value()
            .inputs
            .send(SessionInput::Selection(selection))
            .is_ok()
    }

    /// Forwards a score event to the requester's most recent active session
    /// so it shows up in that session's tally.
    pub fn route_score(&self, requester: &Requester, event: ScoreEvent) -> bool {
        let newest = self
            .sessions
            .iter()
            .filter(|entry| &entry.value().requester == requester && entry.value().is_active())
            .max_by_key(|entry| entry.value().started);

        match newest {
            Some(entry) => entry.value().inputs.send(SessionInput::Score(event)).is_ok(),
            None => false,
        }
    }

    /// Drops sessions whose task ended without deregistering.
    pub fn sweep_closed(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|id, handle| {
            let keep = handle.is_active();
            if !keep {
                debug!("Cleaned up session: {}", id);
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }
}
