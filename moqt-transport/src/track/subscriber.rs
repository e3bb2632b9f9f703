use std::collections::HashMap;

use bytes::Bytes;

use crate::coding::DecodeError;
use crate::data::{
    Datagram, FetchObject, ObjectStatus, StreamHeader, SubgroupHeader, SubgroupObject,
    SubgroupObjectExt,
};
use crate::message::{FilterType, GroupOrder};
use crate::storage::StreamBuffer;

use super::{
    Extensions, FullTrackName, HandlerStatus, ObjectHeaders, TrackCommon, TrackDelegate,
    TrackMode,
};

/// What the stream parser expects next.
///
/// A fresh stream starts in `ExpectingHeader`; once the stream header is
/// parsed the slot alternates between `ExpectingObject` and
/// `ExpectingPayload` until the stream ends.
#[derive(Debug, Default)]
pub enum StreamParse {
    #[default]
    NoneExpected,
    ExpectingHeader,
    ExpectingObject(StreamHeader),
    ExpectingPayload(StreamHeader, ObjectHeaders),
}

fn subgroup_id_of(header: &SubgroupHeader, object_id: u64) -> u64 {
    match header.subgroup_id {
        Some(subgroup_id) => subgroup_id,
        // Implied: either zero or the first object id, per the header type.
        None => match header.header_type {
            crate::data::StreamHeaderType::SubgroupFirstObjectId
            | crate::data::StreamHeaderType::SubgroupFirstObjectIdExt => object_id,
            _ => 0,
        },
    }
}

/// Subscriber-side handler for one track.
///
/// Incoming unidirectional streams push their bytes here; as many complete
/// objects as are buffered get parsed and delivered to the delegate.
#[derive(Debug)]
pub struct SubscribeTrackHandler {
    pub common: TrackCommon,

    pub priority: u8,
    pub group_order: GroupOrder,
    pub filter_type: FilterType,

    stream_buffer: StreamBuffer<StreamParse>,

    /// Largest object id seen per (group, subgroup), to hold the
    /// non-decreasing delivery order within a subgroup.
    largest_objects: HashMap<(u64, u64), u64>,
}

impl SubscribeTrackHandler {
    pub fn new(
        full_track_name: FullTrackName,
        priority: u8,
        group_order: GroupOrder,
        filter_type: FilterType,
    ) -> Self {
        Self {
            common: TrackCommon::new(full_track_name),
            priority,
            group_order,
            filter_type,
            stream_buffer: StreamBuffer::new(),
            largest_objects: HashMap::new(),
        }
    }

    pub fn status(&self) -> HandlerStatus {
        self.common.status
    }

    pub fn set_status(&mut self, status: HandlerStatus) {
        self.common.status = status;
    }

    /// Feed bytes arriving on this track's current data stream.
    ///
    /// `is_start` means a new stream: buffered state from the previous one is
    /// dropped and a stream header is expected first.
    pub fn stream_data_recv(
        &mut self,
        is_start: bool,
        data: Bytes,
        delegate: &mut dyn TrackDelegate,
    ) -> Result<(), DecodeError> {
        if is_start {
            self.stream_buffer.clear();
            self.stream_buffer.set_slot(StreamParse::ExpectingHeader);
        }
        self.stream_buffer.push(data);

        self.process(delegate)
    }

    fn process(&mut self, delegate: &mut dyn TrackDelegate) -> Result<(), DecodeError> {
        loop {
            match std::mem::take(self.stream_buffer.slot_mut()) {
                StreamParse::NoneExpected => {
                    // Bytes with no stream start; nothing we can do with them.
                    log::warn!(
                        "discarding {} bytes received before a stream header",
                        self.stream_buffer.size()
                    );
                    return Ok(());
                }

                StreamParse::ExpectingHeader => {
                    match self.stream_buffer.try_decode::<StreamHeader>()? {
                        Some(header) => {
                            log::trace!("parsed stream header: type={}", header.header_type);
                            self.stream_buffer
                                .set_slot(StreamParse::ExpectingObject(header));
                        }
                        None => {
                            self.stream_buffer.set_slot(StreamParse::ExpectingHeader);
                            return Ok(());
                        }
                    }
                }

                StreamParse::ExpectingObject(header) => {
                    let object = self.parse_object(&header)?;
                    match object {
                        Some(object) => {
                            self.stream_buffer
                                .set_slot(StreamParse::ExpectingPayload(header, object));
                        }
                        None => {
                            self.stream_buffer
                                .set_slot(StreamParse::ExpectingObject(header));
                            return Ok(());
                        }
                    }
                }

                StreamParse::ExpectingPayload(header, object) => {
                    match self.stream_buffer.try_read(object.payload_length) {
                        Some(payload) => {
                            self.deliver(&object, Bytes::from(payload), delegate);
                            self.stream_buffer
                                .set_slot(StreamParse::ExpectingObject(header));
                        }
                        None => {
                            self.stream_buffer
                                .set_slot(StreamParse::ExpectingPayload(header, object));
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Parse the next object's headers using the framing the stream header
    /// selected. Returns None when more bytes are needed.
    fn parse_object(
        &mut self,
        header: &StreamHeader,
    ) -> Result<Option<ObjectHeaders>, DecodeError> {
        if header.header_type.is_fetch() {
            let object = match self.stream_buffer.try_decode::<FetchObject>()? {
                Some(object) => object,
                None => return Ok(None),
            };

            return Ok(Some(ObjectHeaders {
                group_id: object.group_id,
                object_id: object.object_id,
                subgroup_id: object.subgroup_id,
                payload_length: object.payload_length,
                status: object.status,
                priority: Some(object.publisher_priority),
                ttl_ms: None,
                track_mode: None,
                extensions: match object.extension_headers.is_empty() {
                    true => None,
                    false => Some(Extensions::from(&object.extension_headers)),
                },
                immutable_extensions: match object.immutable_extension_headers.is_empty() {
                    true => None,
                    false => Some(Extensions::from(&object.immutable_extension_headers)),
                },
            }));
        }

        let subgroup = match &header.subgroup {
            Some(subgroup) => subgroup.clone(),
            None => return Err(DecodeError::InvalidHeaderType),
        };

        let (object_id, payload_length, status, extensions) =
            match header.header_type.has_extension_headers() {
                true => match self.stream_buffer.try_decode::<SubgroupObjectExt>()? {
                    Some(object) => (
                        object.object_id,
                        object.payload_length,
                        object.status,
                        match object.extension_headers.is_empty() {
                            true => None,
                            false => Some(Extensions::from(&object.extension_headers)),
                        },
                    ),
                    None => return Ok(None),
                },
                false => match self.stream_buffer.try_decode::<SubgroupObject>()? {
                    Some(object) => (object.object_id, object.payload_length, object.status, None),
                    None => return Ok(None),
                },
            };

        Ok(Some(ObjectHeaders {
            group_id: subgroup.group_id,
            object_id,
            subgroup_id: subgroup_id_of(&subgroup, object_id),
            payload_length,
            status,
            priority: Some(subgroup.publisher_priority),
            ttl_ms: None,
            track_mode: Some(TrackMode::StreamPerGroup),
            extensions,
            immutable_extensions: None,
        }))
    }

    fn deliver(
        &mut self,
        object: &ObjectHeaders,
        payload: Bytes,
        delegate: &mut dyn TrackDelegate,
    ) {
        // Within a (group, subgroup), object ids never go backwards.
        let key = (object.group_id, object.subgroup_id);
        if let Some(&largest) = self.largest_objects.get(&key) {
            if object.object_id < largest {
                log::warn!(
                    "dropping out-of-order object: group={} subgroup={} object={} largest={}",
                    object.group_id,
                    object.subgroup_id,
                    object.object_id,
                    largest
                );
                self.common.metrics.objects_dropped += 1;
                return;
            }
        }
        self.largest_objects.insert(key, object.object_id);

        self.common.metrics.objects_received += 1;
        self.common.metrics.bytes_received += payload.len() as u64;

        if self.common.status.callbacks_suppressed() {
            return;
        }

        delegate.object_received(object, payload);
    }

    /// A complete object arrived as a datagram.
    pub fn datagram_recv(&mut self, datagram: &Datagram, delegate: &mut dyn TrackDelegate) {
        let payload = datagram.payload.clone().unwrap_or_default();

        let headers = ObjectHeaders {
            group_id: datagram.group_id,
            object_id: datagram.object_id,
            subgroup_id: 0,
            payload_length: payload.len(),
            status: datagram.status.unwrap_or(ObjectStatus::Available),
            priority: Some(datagram.publisher_priority),
            ttl_ms: None,
            track_mode: Some(TrackMode::Datagram),
            extensions: datagram
                .extension_headers
                .as_ref()
                .map(Extensions::from),
            immutable_extensions: None,
        };

        self.common.metrics.objects_received += 1;
        self.common.metrics.bytes_received += payload.len() as u64;

        if self.common.status.callbacks_suppressed() {
            return;
        }

        delegate.object_received(&headers, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::Encode;
    use crate::data::StreamHeaderType;
    use bytes::BytesMut;

    #[derive(Default)]
    struct Recorder {
        objects: Vec<(ObjectHeaders, Bytes)>,
        statuses: Vec<HandlerStatus>,
    }

    impl TrackDelegate for Recorder {
        fn object_received(&mut self, headers: &ObjectHeaders, payload: Bytes) {
            self.objects.push((headers.clone(), payload));
        }

        fn status_changed(&mut self, status: HandlerStatus) {
            self.statuses.push(status);
        }
    }

    fn handler() -> SubscribeTrackHandler {
        let mut handler = SubscribeTrackHandler::new(
            FullTrackName::from_utf8("test/path", "video"),
            127,
            GroupOrder::Publisher,
            FilterType::LatestGroup,
        );
        handler.set_status(HandlerStatus::Ok);
        handler
    }

    fn subgroup_stream(objects: &[(u64, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupId,
            track_alias: 9,
            group_id: 4,
            subgroup_id: Some(1),
            publisher_priority: 32,
        };
        header.encode(&mut buf).unwrap();

        for (object_id, payload) in objects {
            let object = SubgroupObject {
                object_id: *object_id,
                payload_length: payload.len(),
                status: ObjectStatus::Available,
            };
            object.encode(&mut buf).unwrap();
            buf.extend_from_slice(payload);
        }

        buf.to_vec()
    }

    #[test]
    fn parses_objects_from_one_push() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        let stream = subgroup_stream(&[(0, b"one"), (1, b"two!"), (2, b"")]);
        h.stream_data_recv(true, stream.into(), &mut recorder)
            .unwrap();

        assert_eq!(recorder.objects.len(), 3);
        let (headers, payload) = &recorder.objects[0];
        assert_eq!(headers.group_id, 4);
        assert_eq!(headers.subgroup_id, 1);
        assert_eq!(headers.object_id, 0);
        assert_eq!(payload.as_ref(), b"one");
        assert_eq!(recorder.objects[1].1.as_ref(), b"two!");
        assert_eq!(h.common.metrics.objects_received, 3);
    }

    #[test]
    fn parses_objects_across_fragmented_pushes() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        let stream = subgroup_stream(&[(0, b"hello"), (1, b"world")]);

        // One byte at a time: every prefix is a valid truncation.
        h.stream_data_recv(true, vec![stream[0]].into(), &mut recorder)
            .unwrap();
        for byte in &stream[1..] {
            h.stream_data_recv(false, vec![*byte].into(), &mut recorder)
                .unwrap();
        }

        assert_eq!(recorder.objects.len(), 2);
        assert_eq!(recorder.objects[0].1.as_ref(), b"hello");
        assert_eq!(recorder.objects[1].1.as_ref(), b"world");
    }

    #[test]
    fn drops_backwards_object_ids() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        let stream = subgroup_stream(&[(5, b"a"), (3, b"b"), (6, b"c")]);
        h.stream_data_recv(true, stream.into(), &mut recorder)
            .unwrap();

        let ids: Vec<u64> = recorder.objects.iter().map(|(h, _)| h.object_id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(h.common.metrics.objects_dropped, 1);
    }

    #[test]
    fn suppresses_callbacks_while_unsubscribing() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        h.set_status(HandlerStatus::SendingUnsubscribe);
        let stream = subgroup_stream(&[(0, b"quiet")]);
        h.stream_data_recv(true, stream.into(), &mut recorder)
            .unwrap();

        assert!(recorder.objects.is_empty());
        // Still counted, just not surfaced.
        assert_eq!(h.common.metrics.objects_received, 1);
    }

    #[test]
    fn datagram_delivery() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        let datagram = Datagram {
            datagram_type: crate::data::DatagramType::ObjectNoExtensions,
            track_alias: 9,
            group_id: 2,
            object_id: 7,
            publisher_priority: 16,
            extension_headers: None,
            status: None,
            payload: Some(Bytes::from_static(b"dgram")),
        };
        h.datagram_recv(&datagram, &mut recorder);

        assert_eq!(recorder.objects.len(), 1);
        let (headers, payload) = &recorder.objects[0];
        assert_eq!(headers.track_mode, Some(TrackMode::Datagram));
        assert_eq!(headers.group_id, 2);
        assert_eq!(payload.as_ref(), b"dgram");
    }

    #[test]
    fn poisoned_stream_reports_error() {
        let mut h = handler();
        let mut recorder = Recorder::default();

        // An invalid stream header type poisons the buffer.
        let mut buf = BytesMut::new();
        0x3fu64.encode(&mut buf).unwrap();
        assert!(h
            .stream_data_recv(true, buf.freeze(), &mut recorder)
            .is_err());
    }
}
