use bytes::Bytes;

use crate::coding::DecodeError;
use crate::message::GroupOrder;

use super::{
    FullTrackName, HandlerStatus, ObjectHeaders, PublishObjectError, PublishTrackHandler,
    SubscribeTrackHandler, TrackDelegate, TrackMode,
};

/// Publisher-side handler answering one FETCH.
///
/// A publisher variant that emits one fetch stream header on its first
/// object, then keeps every subsequent object on the same stream regardless
/// of group changes.
#[derive(Debug)]
pub struct PublishFetchHandler {
    pub publisher: PublishTrackHandler,
    pub group_order: GroupOrder,
}

impl PublishFetchHandler {
    pub fn new(
        full_track_name: FullTrackName,
        priority: u8,
        request_id: u64,
        group_order: GroupOrder,
        ttl_ms: u32,
    ) -> Self {
        let mut publisher = PublishTrackHandler::new(
            full_track_name,
            TrackMode::StreamPerTrack,
            priority,
            ttl_ms,
        );
        publisher.common.request_id = Some(request_id);

        Self {
            publisher,
            group_order,
        }
    }

    pub fn status(&self) -> HandlerStatus {
        self.publisher.status()
    }

    pub fn set_status(&mut self, status: HandlerStatus) {
        self.publisher.set_status(status);
    }

    pub fn publish_object<F>(
        &mut self,
        headers: &ObjectHeaders,
        payload: Bytes,
        emit: F,
    ) -> Result<(), PublishObjectError>
    where
        F: FnOnce(super::ObjectEmit) -> Result<(), PublishObjectError>,
    {
        // Per-object mode overrides don't apply to fetch streams.
        let mut headers = headers.clone();
        headers.track_mode = None;
        self.publisher.publish_object(&headers, payload, emit)
    }
}

/// Subscriber-side handler for a joining fetch.
///
/// Parses objects with the fetch-stream framing, then forwards each one up
/// to the subscribe handler's delegate so the application sees one seamless
/// feed across the fetched range and the live subscription.
#[derive(Debug)]
pub struct JoiningFetchHandler {
    pub handler: SubscribeTrackHandler,

    /// The request id of the subscription this fetch joins.
    pub joining_request_id: u64,
}

impl JoiningFetchHandler {
    /// Clone the joined subscription's identity so objects surface under the
    /// same track.
    pub fn new(joined: &SubscribeTrackHandler, joining_request_id: u64) -> Self {
        Self {
            handler: SubscribeTrackHandler::new(
                joined.common.full_track_name.clone(),
                joined.priority,
                joined.group_order,
                joined.filter_type,
            ),
            joining_request_id,
        }
    }

    pub fn stream_data_recv(
        &mut self,
        is_start: bool,
        data: Bytes,
        delegate: &mut dyn TrackDelegate,
    ) -> Result<(), DecodeError> {
        self.handler.stream_data_recv(is_start, data, delegate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::Encode;
    use crate::data::{FetchHeader, FetchObject, ObjectStatus, StreamHeaderType};
    use crate::message::FilterType;
    use bytes::BytesMut;

    #[test]
    fn fetch_emits_single_header_across_groups() {
        let mut h = PublishFetchHandler::new(
            FullTrackName::from_utf8("test/path", "video"),
            64,
            17,
            GroupOrder::Ascending,
            2000,
        );
        h.set_status(HandlerStatus::Ok);

        let mut headers_needed = Vec::new();
        for (group, object) in [(0u64, 0u64), (0, 1), (1, 0), (2, 0)] {
            let obj = ObjectHeaders::available(group, object);
            h.publish_object(&obj, Bytes::new(), |emit| {
                headers_needed.push(emit.stream_header_needed);
                Ok(())
            })
            .unwrap();
        }

        assert_eq!(headers_needed, vec![true, false, false, false]);
    }

    #[test]
    fn fetch_ignores_mode_overrides() {
        let mut h = PublishFetchHandler::new(
            FullTrackName::from_utf8("test/path", "video"),
            64,
            17,
            GroupOrder::Ascending,
            2000,
        );
        h.set_status(HandlerStatus::Ok);

        let mut obj = ObjectHeaders::available(0, 0);
        obj.track_mode = Some(TrackMode::StreamPerObject);
        h.publish_object(&obj, Bytes::new(), |_| Ok(())).unwrap();

        let obj = ObjectHeaders::available(5, 0);
        let mut needed = true;
        h.publish_object(&obj, Bytes::new(), |emit| {
            needed = emit.stream_header_needed;
            Ok(())
        })
        .unwrap();
        assert!(!needed);
    }

    #[derive(Default)]
    struct Recorder {
        objects: Vec<ObjectHeaders>,
    }

    impl TrackDelegate for Recorder {
        fn object_received(&mut self, headers: &ObjectHeaders, _payload: Bytes) {
            self.objects.push(headers.clone());
        }

        fn status_changed(&mut self, _status: HandlerStatus) {}
    }

    #[test]
    fn joining_fetch_parses_fetch_framing() {
        let subscribe = SubscribeTrackHandler::new(
            FullTrackName::from_utf8("test/path", "video"),
            127,
            GroupOrder::Publisher,
            FilterType::LatestObject,
        );
        let mut joining = JoiningFetchHandler::new(&subscribe, 3);
        joining.handler.set_status(HandlerStatus::Ok);

        let mut buf = BytesMut::new();
        StreamHeaderType::Fetch.encode(&mut buf).unwrap();
        FetchHeader { request_id: 5 }.encode(&mut buf).unwrap();

        for (group, object, payload) in [(1u64, 0u64, &b"aa"[..]), (2, 0, &b"bb"[..])] {
            FetchObject {
                group_id: group,
                subgroup_id: 0,
                object_id: object,
                publisher_priority: 8,
                payload_length: payload.len(),
                status: ObjectStatus::Available,
                extension_headers: Default::default(),
                immutable_extension_headers: Default::default(),
            }
            .encode(&mut buf)
            .unwrap();
            buf.extend_from_slice(payload);
        }

        let mut recorder = Recorder::default();
        joining
            .stream_data_recv(true, buf.freeze(), &mut recorder)
            .unwrap();

        assert_eq!(recorder.objects.len(), 2);
        assert_eq!(recorder.objects[0].group_id, 1);
        assert_eq!(recorder.objects[1].group_id, 2);
    }
}
