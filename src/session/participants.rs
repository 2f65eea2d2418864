use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::{RemoteAudioReason, RemoteAudioState};

/// A remote user in the joined channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteParticipant {
    pub uid: u32,

    /// Current state of the user's audio stream
    pub audio_state: RemoteAudioState,

    /// Reason given with the last audio state change
    pub last_reason: RemoteAudioReason,

    pub joined_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RemoteParticipant {
    fn new(uid: u32) -> Self {
        let now = Utc::now();
        Self {
            uid,
            audio_state: RemoteAudioState::Stopped,
            last_reason: RemoteAudioReason::Internal,
            joined_at: now,
            updated_at: now,
        }
    }
}

/// Remote participants of one joined session, keyed by uid
#[derive(Debug, Default, Clone)]
pub struct ParticipantRegistry {
    participants: HashMap<u32, RemoteParticipant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant; returns false if the uid is already present
    pub fn insert(&mut self, uid: u32) -> bool {
        if self.participants.contains_key(&uid) {
            return false;
        }
        self.participants.insert(uid, RemoteParticipant::new(uid));
        true
    }

    /// Record an audio state change; returns false for unknown uids
    pub fn update_audio(
        &mut self,
        uid: u32,
        state: RemoteAudioState,
        reason: RemoteAudioReason,
    ) -> bool {
        match self.participants.get_mut(&uid) {
            Some(participant) => {
                participant.audio_state = state;
                participant.last_reason = reason;
                participant.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Remove a participant; removing an unknown uid is a no-op
    pub fn remove(&mut self, uid: u32) -> Option<RemoteParticipant> {
        self.participants.remove(&uid)
    }

    /// Drop every participant; returns true if any were present
    pub fn clear(&mut self) -> bool {
        let had_participants = !self.participants.is_empty();
        self.participants.clear();
        had_participants
    }

    pub fn get(&self, uid: u32) -> Option<&RemoteParticipant> {
        self.participants.get(&uid)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants ordered by uid
    pub fn snapshot(&self) -> Vec<RemoteParticipant> {
        let mut participants: Vec<RemoteParticipant> =
            self.participants.values().cloned().collect();
        participants.sort_by_key(|p| p.uid);
        participants
    }
}
