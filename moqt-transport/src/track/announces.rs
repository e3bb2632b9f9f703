use crate::coding::TrackNamespace;

use super::HandlerStatus;

/// Subscriber-side handler bound to a namespace prefix.
///
/// Receives a `matching_namespace_received` callback whenever the peer
/// announces a namespace that has this prefix.
#[derive(Debug, Clone)]
pub struct SubscribeAnnouncesHandler {
    pub prefix: TrackNamespace,
    pub status: HandlerStatus,
    pub request_id: Option<u64>,
}

impl SubscribeAnnouncesHandler {
    pub fn new(prefix: TrackNamespace) -> Self {
        Self {
            prefix,
            status: HandlerStatus::NotConnected,
            request_id: None,
        }
    }

    /// Whether an announced namespace falls under this handler's prefix.
    pub fn matches(&self, namespace: &TrackNamespace) -> bool {
        self.prefix.is_prefix_of(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let handler =
            SubscribeAnnouncesHandler::new(TrackNamespace::from_utf8_path("example/chat555"));

        assert!(handler.matches(&TrackNamespace::from_utf8_path("example/chat555")));
        assert!(handler.matches(&TrackNamespace::from_utf8_path("example/chat555/user1")));
        assert!(!handler.matches(&TrackNamespace::from_utf8_path("example/chat556")));
        assert!(!handler.matches(&TrackNamespace::from_utf8_path("example")));
    }
}
