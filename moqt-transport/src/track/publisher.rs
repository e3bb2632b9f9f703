use bytes::Bytes;

use super::{FullTrackName, HandlerStatus, ObjectHeaders, TrackCommon, TrackMode};

/// Failure modes of [`PublishTrackHandler::publish_object`], returned
/// synchronously; none of these are fatal to the session.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum PublishObjectError {
    #[error("track is not announced")]
    NotAnnounced,

    #[error("not connected")]
    NotConnected,

    /// The engine's outbound queue is above its high-watermark; drop or
    /// defer the object and retry later.
    #[error("pause requested")]
    PauseRequested,

    #[error("internal error")]
    InternalError,
}

/// Everything the engine needs to put one object on the wire.
#[derive(Debug, Clone)]
pub struct ObjectEmit {
    pub priority: u8,
    pub ttl_ms: u32,

    /// The effective track mode after any per-object override.
    pub track_mode: TrackMode,

    /// Whether a new stream (and stream header) must be opened first.
    pub stream_header_needed: bool,

    pub group_id: u64,
    pub subgroup_id: u64,
    pub object_id: u64,

    pub headers: ObjectHeaders,
    pub payload: Bytes,
}

/// Publisher-side handler for one track.
///
/// Decides, per the track mode, when a new stream header must be emitted,
/// then hands the object to the engine-supplied emit hook.
#[derive(Debug)]
pub struct PublishTrackHandler {
    pub common: TrackCommon,

    /// Default mode; an object's `track_mode` header overrides it.
    pub track_mode: TrackMode,

    /// Defaults applied when an object does not carry its own.
    pub priority: u8,
    pub ttl_ms: u32,

    prev_group_id: Option<u64>,
    sent_track_header: bool,
}

impl PublishTrackHandler {
    pub fn new(
        full_track_name: FullTrackName,
        track_mode: TrackMode,
        priority: u8,
        ttl_ms: u32,
    ) -> Self {
        Self {
            common: TrackCommon::new(full_track_name),
            track_mode,
            priority,
            ttl_ms,
            prev_group_id: None,
            sent_track_header: false,
        }
    }

    pub fn status(&self) -> HandlerStatus {
        self.common.status
    }

    pub fn set_status(&mut self, status: HandlerStatus) {
        self.common.status = status;
    }

    /// Whether publishing this object must open a new stream first.
    fn stream_header_needed(&self, group_id: u64) -> bool {
        match self.track_mode {
            TrackMode::Datagram => false,
            TrackMode::StreamPerObject => true,
            TrackMode::StreamPerGroup => self.prev_group_id != Some(group_id),
            TrackMode::StreamPerTrack => !self.sent_track_header,
        }
    }

    /// Publish one object. The emit hook is supplied by the engine and does
    /// the actual queueing onto QUIC.
    pub fn publish_object<F>(
        &mut self,
        headers: &ObjectHeaders,
        payload: Bytes,
        emit: F,
    ) -> Result<(), PublishObjectError>
    where
        F: FnOnce(ObjectEmit) -> Result<(), PublishObjectError>,
    {
        match self.common.status {
            HandlerStatus::NotConnected => return Err(PublishObjectError::NotConnected),
            HandlerStatus::NotAnnounced
            | HandlerStatus::Pending
            | HandlerStatus::NotAuthorized => return Err(PublishObjectError::NotAnnounced),
            HandlerStatus::Paused => return Err(PublishObjectError::PauseRequested),
            _ => {}
        }

        if let Some(mode) = headers.track_mode {
            self.track_mode = mode;
        }

        let stream_header_needed = self.stream_header_needed(headers.group_id);

        let emit_args = ObjectEmit {
            priority: headers.priority.unwrap_or(self.priority),
            ttl_ms: headers.ttl_ms.unwrap_or(self.ttl_ms),
            track_mode: self.track_mode,
            stream_header_needed,
            group_id: headers.group_id,
            subgroup_id: headers.subgroup_id,
            object_id: headers.object_id,
            headers: headers.clone(),
            payload: payload.clone(),
        };

        match emit(emit_args) {
            Ok(()) => {
                self.prev_group_id = Some(headers.group_id);
                self.sent_track_header = true;

                self.common.metrics.objects_published += 1;
                self.common.metrics.bytes_published += payload.len() as u64;
                if stream_header_needed {
                    self.common.metrics.stream_headers_sent += 1;
                }
                Ok(())
            }
            Err(err) => {
                self.common.metrics.publish_drops += 1;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(mode: TrackMode) -> PublishTrackHandler {
        let mut handler = PublishTrackHandler::new(
            FullTrackName::from_utf8("test/path", "video"),
            mode,
            64,
            2000,
        );
        handler.set_status(HandlerStatus::Ok);
        handler
    }

    fn publish(handler: &mut PublishTrackHandler, group_id: u64, object_id: u64) -> bool {
        let headers = ObjectHeaders::available(group_id, object_id);
        let mut needed = false;
        handler
            .publish_object(&headers, Bytes::from_static(b"x"), |emit| {
                needed = emit.stream_header_needed;
                Ok(())
            })
            .unwrap();
        needed
    }

    #[test]
    fn stream_per_group_emits_header_on_group_change() {
        let mut h = handler(TrackMode::StreamPerGroup);

        assert!(publish(&mut h, 0, 0));
        assert!(!publish(&mut h, 0, 1));
        assert!(publish(&mut h, 1, 0));
        assert!(!publish(&mut h, 1, 1));
    }

    #[test]
    fn stream_per_object_always_emits_header() {
        let mut h = handler(TrackMode::StreamPerObject);

        assert!(publish(&mut h, 0, 0));
        assert!(publish(&mut h, 0, 1));
    }

    #[test]
    fn stream_per_track_emits_header_once() {
        let mut h = handler(TrackMode::StreamPerTrack);

        assert!(publish(&mut h, 0, 0));
        assert!(!publish(&mut h, 1, 0));
        assert!(!publish(&mut h, 2, 5));
    }

    #[test]
    fn datagram_never_emits_header() {
        let mut h = handler(TrackMode::Datagram);

        assert!(!publish(&mut h, 0, 0));
        assert!(!publish(&mut h, 1, 0));
    }

    #[test]
    fn object_mode_override_is_sticky() {
        let mut h = handler(TrackMode::StreamPerGroup);
        assert!(publish(&mut h, 0, 0));

        let mut headers = ObjectHeaders::available(0, 1);
        headers.track_mode = Some(TrackMode::StreamPerObject);
        let mut needed = false;
        h.publish_object(&headers, Bytes::new(), |emit| {
            needed = emit.stream_header_needed;
            Ok(())
        })
        .unwrap();
        assert!(needed);
        assert_eq!(h.track_mode, TrackMode::StreamPerObject);
    }

    #[test]
    fn status_gates_publishing() {
        let mut h = handler(TrackMode::StreamPerGroup);

        h.set_status(HandlerStatus::NotConnected);
        let err = h
            .publish_object(&ObjectHeaders::available(0, 0), Bytes::new(), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, PublishObjectError::NotConnected);

        h.set_status(HandlerStatus::Pending);
        let err = h
            .publish_object(&ObjectHeaders::available(0, 0), Bytes::new(), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, PublishObjectError::NotAnnounced);

        h.set_status(HandlerStatus::Paused);
        let err = h
            .publish_object(&ObjectHeaders::available(0, 0), Bytes::new(), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, PublishObjectError::PauseRequested);
    }

    #[test]
    fn metrics_track_published_objects() {
        let mut h = handler(TrackMode::StreamPerGroup);
        publish(&mut h, 0, 0);
        publish(&mut h, 0, 1);

        assert_eq!(h.common.metrics.objects_published, 2);
        assert_eq!(h.common.metrics.bytes_published, 2);
        assert_eq!(h.common.metrics.stream_headers_sent, 1);
    }
}
