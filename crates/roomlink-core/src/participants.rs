use crate::events::TrackKind;
use crate::session::{ParticipantState, PublicationInfo};

/// Read-only view of a participant at the time it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    pub identity: String,
    pub name: Option<String>,
    pub metadata: Option<String>,
    pub is_speaking: bool,
    pub audio_publications: Vec<PublicationInfo>,
    pub video_publications: Vec<PublicationInfo>,
}

impl From<ParticipantState> for ParticipantSnapshot {
    fn from(state: ParticipantState) -> Self {
        let (audio_publications, video_publications) = state
            .publications
            .into_iter()
            .partition(|p| p.kind == TrackKind::Audio);
        Self {
            identity: state.identity,
            name: non_empty(state.name),
            metadata: non_empty(state.metadata),
            is_speaking: state.is_speaking,
            audio_publications,
            video_publications,
        }
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
