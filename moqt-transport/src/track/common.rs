use crate::coding::TrackNamespace;

use super::{FullTrackName, ObjectHeaders, TrackMetrics};

/// Status shared by every handler kind; which values apply depends on the
/// direction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HandlerStatus {
    #[default]
    NotConnected,
    /// Publisher only: no ANNOUNCE_OK / PUBLISH_OK yet covers this track.
    NotAnnounced,
    /// Request sent, awaiting the peer's response.
    Pending,
    Ok,
    Error,
    NotAuthorized,
    Done,
    /// Local cancellation in flight; user-visible callbacks are suppressed.
    SendingUnsubscribe,
    SendingUnannounce,
    /// Back-pressure: the outbound queue is above its high-watermark.
    Paused,
}

impl HandlerStatus {
    /// Whether user-visible callbacks are suppressed in this state.
    pub fn callbacks_suppressed(&self) -> bool {
        matches!(
            self,
            HandlerStatus::SendingUnsubscribe | HandlerStatus::SendingUnannounce
        )
    }
}

/// State every track handler carries regardless of direction.
#[derive(Clone, Debug, Default)]
pub struct TrackCommon {
    pub full_track_name: FullTrackName,
    pub status: HandlerStatus,
    pub metrics: TrackMetrics,

    /// The session-assigned request id, set once the request is sent or
    /// received.
    pub request_id: Option<u64>,
}

impl TrackCommon {
    pub fn new(full_track_name: FullTrackName) -> Self {
        Self {
            full_track_name,
            ..Default::default()
        }
    }

    pub fn track_alias(&self) -> Option<u64> {
        self.full_track_name.track_alias
    }

    pub fn set_track_alias(&mut self, track_alias: u64) {
        self.full_track_name.track_alias = Some(track_alias);
    }
}

/// The minimal capability set a handler needs from the application.
///
/// One trait covers publish, subscribe and subscribe-announces handlers; the
/// default no-op bodies let an implementor supply only what its direction
/// uses.
pub trait TrackDelegate: Send {
    /// A complete object arrived for a subscribed or fetched track.
    fn object_received(&mut self, headers: &ObjectHeaders, payload: bytes::Bytes);

    /// The handler's status changed (response received, cancelled, paused...).
    fn status_changed(&mut self, status: HandlerStatus);

    /// A peer announce matched this handler's namespace prefix.
    fn matching_namespace_received(&mut self, _namespace: &TrackNamespace) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_suppresses_callbacks() {
        assert!(HandlerStatus::SendingUnsubscribe.callbacks_suppressed());
        assert!(HandlerStatus::SendingUnannounce.callbacks_suppressed());
        assert!(!HandlerStatus::Ok.callbacks_suppressed());
        assert!(!HandlerStatus::Pending.callbacks_suppressed());
    }
}
