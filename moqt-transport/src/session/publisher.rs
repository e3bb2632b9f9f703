use std::collections::{hash_map, HashMap};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, Notify};

use crate::cache::Cache;
use crate::coding::{Encode, Location, ReasonPhrase, TrackNamespace};
use crate::data::{
    Datagram, DatagramType, FetchHeader, FetchObject, StreamHeader, StreamHeaderType,
    SubgroupHeader, SubgroupObject, SubgroupObjectExt,
};
use crate::message::{self, Message, SubscribeErrorCode};
use crate::queue::{PriorityQueue, QueueMetrics};
use crate::tick::TickService;
use crate::track::{
    FullTrackName, HandlerStatus, ObjectEmit, ObjectHeaders, PublishFetchHandler,
    PublishObjectError, PublishTrackHandler, TrackHash, TrackMode,
};

use super::{
    RequestIds, SessionCallbacks, SessionConfig, SessionError, SubscribeFilter, FilterError,
    Writer,
};

/// Priority bands of the outbound data queue; object priorities map directly.
const DATA_BANDS: usize = 256;

/// One frame waiting to be written to QUIC.
pub(super) enum QueuedData {
    Datagram(Bytes),
    Stream {
        key: StreamKey,
        /// Open a fresh unidirectional stream before writing.
        open_new: bool,
        /// Transport priority hint for a newly opened stream.
        priority: u8,
        /// Encoded stream header, written once per stream.
        header: Bytes,
        /// Encoded object headers plus payload.
        frame: Bytes,
    },
}

/// Identity of an open outbound data stream.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub(super) enum StreamKey {
    Subgroup {
        track_alias: u64,
        group_id: u64,
        subgroup_id: u64,
    },
    Fetch {
        request_id: u64,
    },
}

impl StreamKey {
    fn track_alias(&self) -> Option<u64> {
        match self {
            Self::Subgroup { track_alias, .. } => Some(*track_alias),
            Self::Fetch { .. } => None,
        }
    }
}

/// A cached published object, retained briefly for fetch replay.
#[derive(Clone)]
struct CachedObject {
    headers: ObjectHeaders,
    payload: Bytes,
}

/// An inbound subscription (or accepted PUBLISH) we are feeding.
struct PublishEntry {
    handler: PublishTrackHandler,
    filter: SubscribeFilter,
    group_order: message::GroupOrder,
}

/// An announce we originated.
struct AnnounceEntry {
    namespace: TrackNamespace,
    request_id: u64,
    status: HandlerStatus,
}

#[derive(Default)]
struct PublisherState {
    /// Our announces, keyed by namespace hash.
    announces: HashMap<u64, AnnounceEntry>,

    /// Active subscriptions from the peer, keyed by request id.
    publishes: HashMap<u64, PublishEntry>,

    /// Track alias to request id; each alias maps to exactly one track.
    alias_to_request: HashMap<u64, u64>,

    /// Fetches we are answering, keyed by request id.
    fetches: HashMap<u64, PublishFetchHandler>,

    /// Announce prefixes the peer subscribed to, keyed by prefix hash.
    peer_announce_prefixes: HashMap<u64, TrackNamespace>,

    /// Largest published location per full-track-name hash.
    largest: HashMap<u64, Location>,

    /// Recently published objects per full-track-name hash, for fetch replay.
    caches: HashMap<u64, Cache<Location, CachedObject>>,
}

/// The publisher half of a session: answers subscribes and fetches, owns the
/// outbound object queue.
#[derive(Clone)]
pub struct Publisher {
    session: web_transport::Session,
    outgoing: mpsc::UnboundedSender<Message>,
    state: Arc<Mutex<PublisherState>>,
    request_ids: Arc<RequestIds>,
    callbacks: Arc<Mutex<dyn SessionCallbacks>>,
    config: Arc<SessionConfig>,
    tick: Arc<dyn TickService>,

    data_queue: Arc<Mutex<PriorityQueue<QueuedData, DATA_BANDS>>>,
    data_notify: Arc<Notify>,
}

impl Publisher {
    pub(super) fn new(
        session: web_transport::Session,
        outgoing: mpsc::UnboundedSender<Message>,
        request_ids: Arc<RequestIds>,
        callbacks: Arc<Mutex<dyn SessionCallbacks>>,
        config: Arc<SessionConfig>,
        tick: Arc<dyn TickService>,
    ) -> Self {
        let data_queue = PriorityQueue::new(
            config.queue_duration_ms,
            config.queue_interval_ms,
            tick.clone(),
            config.queue_capacity,
        );

        Self {
            session,
            outgoing,
            state: Default::default(),
            request_ids,
            callbacks,
            config,
            tick,
            data_queue: Arc::new(Mutex::new(data_queue)),
            data_notify: Arc::new(Notify::new()),
        }
    }

    fn send_message<M: Into<Message>>(&self, msg: M) {
        let msg = msg.into();
        log::debug!("sending message: {:?}", msg);
        // The session is tearing down if this fails; nothing to do here.
        let _ = self.outgoing.send(msg);
    }

    /// Counters of the outbound object queue.
    pub fn queue_metrics(&self) -> QueueMetrics {
        self.data_queue.lock().unwrap().metrics()
    }

    /// Announce that we will serve a namespace. Completion arrives via
    /// ANNOUNCE_OK or ANNOUNCE_ERROR.
    pub fn announce(&mut self, namespace: TrackNamespace) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;
        let namespace_hash = namespace.hash_value();

        {
            let mut state = self.state.lock().unwrap();
            match state.announces.entry(namespace_hash) {
                hash_map::Entry::Occupied(_) => return Err(SessionError::Duplicate),
                hash_map::Entry::Vacant(entry) => entry.insert(AnnounceEntry {
                    namespace: namespace.clone(),
                    request_id,
                    status: HandlerStatus::Pending,
                }),
            };
        }

        self.send_message(message::Announce {
            id: request_id,
            track_namespace: namespace,
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Withdraw an announce. The entry is removed iff present.
    pub fn unannounce(&mut self, namespace: &TrackNamespace) {
        let namespace_hash = namespace.hash_value();

        let removed = {
            let mut state = self.state.lock().unwrap();
            state.announces.remove(&namespace_hash).is_some()
        };

        if removed {
            self.send_message(message::Unannounce {
                track_namespace: namespace.clone(),
            });
        }
    }

    /// Status of an announce, if it exists.
    pub fn announce_status(&self, namespace: &TrackNamespace) -> Option<HandlerStatus> {
        self.state
            .lock()
            .unwrap()
            .announces
            .get(&namespace.hash_value())
            .map(|entry| entry.status)
    }

    fn next_request_id(&self) -> Result<u64, SessionError> {
        match self.request_ids.next() {
            Ok(id) => Ok(id),
            Err(err) => {
                if let Some(max) = self.request_ids.take_blocked_signal() {
                    self.send_message(message::RequestsBlocked {
                        max_request_id: max,
                    });
                }
                Err(err)
            }
        }
    }

    /// Publish one object on an active subscription.
    ///
    /// Filtering, caching and track-mode stream policy all apply here; the
    /// object ends up in the priority/time queue for the data driver.
    pub fn publish_object(
        &mut self,
        request_id: u64,
        headers: &ObjectHeaders,
        payload: Bytes,
    ) -> Result<(), PublishObjectError> {
        // Back-pressure: refuse above the high-watermark.
        if self.data_queue.lock().unwrap().size() >= self.config.queue_high_watermark {
            return Err(PublishObjectError::PauseRequested);
        }

        let location = Location::new(headers.group_id, headers.object_id);

        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let entry = state
            .publishes
            .get_mut(&request_id)
            .ok_or(PublishObjectError::NotAnnounced)?;

        let track_hash = TrackHash::new(&entry.handler.common.full_track_name);
        let fullname_hash = track_hash.track_fullname_hash;

        // Track production state and retain for fetch replay.
        let largest = state.largest.entry(fullname_hash).or_default();
        if location > *largest {
            *largest = location;
        }
        let cache = state
            .caches
            .entry(fullname_hash)
            .or_insert_with(|| Cache::new(self.tick.clone()));
        cache.insert(
            location,
            CachedObject {
                headers: headers.clone(),
                payload: payload.clone(),
            },
            headers.ttl_ms.unwrap_or(self.config.default_ttl_ms) as u64,
        );

        // Outside the subscription's filter: accepted but not forwarded.
        if !entry.filter.admits(location) {
            return Ok(());
        }

        let track_alias = entry
            .handler
            .common
            .track_alias()
            .ok_or(PublishObjectError::InternalError)?;

        let queue = &self.data_queue;
        let notify = &self.data_notify;
        entry.handler.publish_object(headers, payload, |emit| {
            let item = encode_subscription_frame(track_alias, &emit)?;
            queue.lock().unwrap().push(emit.priority, item, emit.ttl_ms as u64);
            notify.notify_one();
            Ok(())
        })
    }

    /// The group order a subscription asked for, shaping the publisher's
    /// stream-creation schedule.
    pub fn subscription_group_order(&self, request_id: u64) -> Option<message::GroupOrder> {
        self.state
            .lock()
            .unwrap()
            .publishes
            .get(&request_id)
            .map(|entry| entry.group_order)
    }

    /// Largest published location for a track, if any.
    pub fn largest_location(&self, full_track_name: &FullTrackName) -> Option<Location> {
        let hash = TrackHash::new(full_track_name).track_fullname_hash;
        self.state.lock().unwrap().largest.get(&hash).copied()
    }

    /// Whether any peer announce-subscription covers this namespace.
    pub fn peer_interested(&self, namespace: &TrackNamespace) -> bool {
        self.state
            .lock()
            .unwrap()
            .peer_announce_prefixes
            .values()
            .any(|prefix| prefix.is_prefix_of(namespace))
    }

    /// Receive a message from the subscriber via the control stream.
    pub(super) fn recv_message(&mut self, msg: message::Subscriber) -> Result<(), SessionError> {
        match msg {
            message::Subscriber::Subscribe(msg) => self.recv_subscribe(msg),
            message::Subscriber::SubscribeUpdate(msg) => self.recv_subscribe_update(msg),
            message::Subscriber::Unsubscribe(msg) => self.recv_unsubscribe(msg),
            message::Subscriber::AnnounceOk(msg) => self.recv_announce_ok(msg),
            message::Subscriber::AnnounceError(msg) => self.recv_announce_error(msg),
            message::Subscriber::AnnounceCancel(msg) => self.recv_announce_cancel(msg),
            message::Subscriber::SubscribeAnnounces(msg) => self.recv_subscribe_announces(msg),
            message::Subscriber::UnsubscribeAnnounces(msg) => {
                self.recv_unsubscribe_announces(msg)
            }
            message::Subscriber::Fetch(msg) => self.recv_fetch(msg),
            message::Subscriber::FetchCancel(msg) => self.recv_fetch_cancel(msg),
            message::Subscriber::TrackStatusRequest(msg) => self.recv_track_status_request(msg),
            message::Subscriber::PublishOk(msg) => self.recv_publish_ok(msg),
            message::Subscriber::PublishError(msg) => self.recv_publish_error(msg),
            message::Subscriber::NewGroupRequest(msg) => self.recv_new_group_request(msg),
        }
    }

    fn track_not_exist_code(&self) -> SubscribeErrorCode {
        if self.config.use_legacy_track_not_exist {
            SubscribeErrorCode::LegacyTrackNotExist
        } else {
            SubscribeErrorCode::TrackDoesNotExist
        }
    }

    fn recv_subscribe(&mut self, msg: message::Subscribe) -> Result<(), SessionError> {
        let authorized = self.callbacks.lock().unwrap().subscribe_received(&msg);
        if !authorized {
            self.send_message(message::SubscribeError {
                id: msg.id,
                error_code: SubscribeErrorCode::Unauthorized,
                reason_phrase: ReasonPhrase("not authorized".to_string()),
                track_alias: 0,
            });
            return Ok(());
        }

        let full_track_name = FullTrackName::new(
            msg.track_namespace.clone(),
            msg.track_name.as_bytes().to_vec(),
        );
        let fullname_hash = TrackHash::new(&full_track_name).track_fullname_hash;

        let (largest, covered) = {
            let state = self.state.lock().unwrap();
            let largest = state.largest.get(&fullname_hash).copied();
            // Once we announce, subscribes outside every announced namespace
            // name tracks we do not serve.
            let covered = state.announces.is_empty()
                || state
                    .announces
                    .values()
                    .any(|entry| entry.namespace.is_prefix_of(&msg.track_namespace));
            (largest, covered)
        };

        if !covered {
            self.send_message(message::SubscribeError {
                id: msg.id,
                error_code: self.track_not_exist_code(),
                reason_phrase: ReasonPhrase("track does not exist".to_string()),
                track_alias: 0,
            });
            return Ok(());
        }

        let filter = match SubscribeFilter::from_subscribe(&msg, largest) {
            Ok(filter) => filter,
            Err(FilterError::InvalidRange) => {
                self.send_message(message::SubscribeError {
                    id: msg.id,
                    error_code: SubscribeErrorCode::InvalidRange,
                    reason_phrase: ReasonPhrase("range already passed".to_string()),
                    track_alias: 0,
                });
                return Ok(());
            }
            Err(FilterError::MissingBounds) => {
                return Err(SessionError::Decode(
                    crate::coding::DecodeError::InvalidContents("missing filter bounds".into()),
                ))
            }
        };

        let track_alias = match msg.track_alias {
            0 => fullname_hash,
            alias => alias,
        };

        let mut state = self.state.lock().unwrap();

        // A track alias maps to exactly one track within the session.
        match state.alias_to_request.entry(track_alias) {
            hash_map::Entry::Occupied(entry) if *entry.get() != msg.id => {
                return Err(SessionError::Duplicate);
            }
            hash_map::Entry::Occupied(_) => {}
            hash_map::Entry::Vacant(entry) => {
                entry.insert(msg.id);
            }
        }

        let mut handler = PublishTrackHandler::new(
            full_track_name,
            TrackMode::StreamPerGroup,
            msg.subscriber_priority,
            self.config.default_ttl_ms,
        );
        handler.common.request_id = Some(msg.id);
        handler.common.set_track_alias(track_alias);
        handler.set_status(HandlerStatus::Ok);

        state.publishes.insert(
            msg.id,
            PublishEntry {
                handler,
                filter,
                group_order: msg.group_order,
            },
        );
        drop(state);

        self.send_message(message::SubscribeOk {
            id: msg.id,
            track_alias,
            expires: 0,
            group_order: msg.group_order,
            content_exists: largest.is_some(),
            largest_location: largest,
            params: Default::default(),
        });

        Ok(())
    }

    fn recv_subscribe_update(&mut self, msg: message::SubscribeUpdate) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.publishes.get_mut(&msg.id) {
            entry.handler.priority = msg.subscriber_priority;

            // On the wire 0 means open-ended, otherwise end group + 1.
            let end_group_id = match msg.end_group_id {
                0 => u64::MAX >> 2,
                n => n - 1,
            };
            match SubscribeFilter::evaluate(
                message::FilterType::AbsoluteRange,
                Some(msg.start_location),
                Some(end_group_id),
                None,
                None,
            ) {
                Ok(filter) => entry.filter = filter,
                Err(err) => log::warn!("ignoring bad subscribe update: {}", err),
            }
        }

        Ok(())
    }

    fn recv_unsubscribe(&mut self, msg: message::Unsubscribe) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.publishes.remove(&msg.id) {
            if let Some(alias) = entry.handler.common.track_alias() {
                state.alias_to_request.remove(&alias);
            }
            drop(state);

            self.callbacks.lock().unwrap().unsubscribe_received(msg.id);

            self.send_message(message::SubscribeDone {
                id: msg.id,
                status_code: 0x0,
                stream_count: 0,
                reason_phrase: ReasonPhrase("unsubscribed".to_string()),
            });
        }

        Ok(())
    }

    fn recv_announce_ok(&mut self, msg: message::AnnounceOk) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        for entry in state.announces.values_mut() {
            if entry.request_id == msg.id {
                entry.status = HandlerStatus::Ok;
                return Ok(());
            }
        }

        log::debug!("ANNOUNCE_OK for unknown request: id={}", msg.id);
        Ok(())
    }

    fn recv_announce_error(&mut self, msg: message::AnnounceError) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        let namespace_hash = state
            .announces
            .iter()
            .find(|(_, entry)| entry.request_id == msg.id)
            .map(|(hash, _)| *hash);

        if let Some(hash) = namespace_hash {
            let entry = state.announces.remove(&hash);
            drop(state);
            if let Some(entry) = entry {
                log::warn!(
                    "announce rejected: namespace={} code={} reason={:?}",
                    entry.namespace.to_utf8_path(),
                    msg.error_code,
                    msg.reason_phrase
                );
            }
        }

        Ok(())
    }

    fn recv_announce_cancel(&mut self, msg: message::AnnounceCancel) -> Result<(), SessionError> {
        let namespace_hash = msg.track_namespace.hash_value();
        self.state.lock().unwrap().announces.remove(&namespace_hash);
        Ok(())
    }

    fn recv_subscribe_announces(
        &mut self,
        msg: message::SubscribeAnnounces,
    ) -> Result<(), SessionError> {
        let prefix_hash = msg.track_namespace_prefix.hash_value();

        // Insert if absent; a duplicate prefix subscription is acknowledged
        // again without a new entry.
        self.state
            .lock()
            .unwrap()
            .peer_announce_prefixes
            .entry(prefix_hash)
            .or_insert_with(|| msg.track_namespace_prefix.clone());

        self.send_message(message::SubscribeAnnouncesOk { id: msg.id });
        Ok(())
    }

    fn recv_unsubscribe_announces(
        &mut self,
        msg: message::UnsubscribeAnnounces,
    ) -> Result<(), SessionError> {
        let prefix_hash = msg.track_namespace_prefix.hash_value();

        // Erase iff present.
        self.state
            .lock()
            .unwrap()
            .peer_announce_prefixes
            .remove(&prefix_hash);
        Ok(())
    }

    fn recv_fetch(&mut self, msg: message::Fetch) -> Result<(), SessionError> {
        let authorized = self.callbacks.lock().unwrap().fetch_received(&msg);
        if !authorized {
            self.send_message(message::FetchError {
                id: msg.id,
                error_code: 0x1,
                reason_phrase: ReasonPhrase("not authorized".to_string()),
            });
            return Ok(());
        }

        let (full_track_name, start, end) = match self.resolve_fetch_range(&msg) {
            Ok(resolved) => resolved,
            Err(error_code) => {
                self.send_message(message::FetchError {
                    id: msg.id,
                    error_code,
                    reason_phrase: ReasonPhrase("bad fetch range".to_string()),
                });
                return Ok(());
            }
        };

        let fullname_hash = TrackHash::new(&full_track_name).track_fullname_hash;

        let mut objects = {
            let state = self.state.lock().unwrap();
            match state.caches.get(&fullname_hash) {
                Some(cache) => match cache.get_range(&start, &end) {
                    Ok(objects) => objects,
                    Err(_) => {
                        drop(state);
                        self.send_message(message::FetchError {
                            id: msg.id,
                            error_code: 0x5,
                            reason_phrase: ReasonPhrase("invalid range".to_string()),
                        });
                        return Ok(());
                    }
                },
                None => Vec::new(),
            }
        };

        // Groups descending on request; objects within a group stay ascending.
        if msg.group_order == message::GroupOrder::Descending {
            objects.sort_by(|a, b| {
                b.headers
                    .group_id
                    .cmp(&a.headers.group_id)
                    .then(a.headers.object_id.cmp(&b.headers.object_id))
            });
        }

        if objects.is_empty() {
            self.send_message(message::FetchError {
                id: msg.id,
                error_code: 0x4,
                reason_phrase: ReasonPhrase("no objects".to_string()),
            });
            return Ok(());
        }

        let end_location = objects
            .iter()
            .map(|o| Location::new(o.headers.group_id, o.headers.object_id))
            .max()
            .unwrap_or_default();

        let mut handler = PublishFetchHandler::new(
            full_track_name,
            msg.subscriber_priority,
            msg.id,
            msg.group_order,
            self.config.default_ttl_ms,
        );
        handler.set_status(HandlerStatus::Ok);

        self.send_message(message::FetchOk {
            id: msg.id,
            group_order: msg.group_order,
            end_of_track: false,
            end_location,
            params: Default::default(),
        });

        // Replay the cached range onto the fetch stream, in order.
        let queue = self.data_queue.clone();
        let notify = self.data_notify.clone();
        for object in &objects {
            let result = handler.publish_object(
                &object.headers,
                object.payload.clone(),
                |emit| {
                    let item = encode_fetch_frame(msg.id, &emit)?;
                    queue
                        .lock()
                        .unwrap()
                        .push(emit.priority, item, emit.ttl_ms as u64);
                    notify.notify_one();
                    Ok(())
                },
            );
            if let Err(err) = result {
                log::warn!("fetch replay aborted: id={} err={}", msg.id, err);
                break;
            }
        }

        self.state.lock().unwrap().fetches.insert(msg.id, handler);
        Ok(())
    }

    /// Resolve the (track, start, end) of a fetch; end is exclusive.
    fn resolve_fetch_range(
        &self,
        msg: &message::Fetch,
    ) -> Result<(FullTrackName, Location, Location), u64> {
        match msg.fetch_type {
            message::FetchType::Standalone => {
                let standalone = msg.standalone_fetch.as_ref().ok_or(0x5u64)?;
                let full_track_name = FullTrackName::new(
                    standalone.track_namespace.clone(),
                    standalone.track_name.as_bytes().to_vec(),
                );

                // An end object id of 0 means the entire end group.
                let end = match standalone.end_location.object_id {
                    0 => Location::new(standalone.end_location.group_id + 1, 0),
                    object_id => Location::new(standalone.end_location.group_id, object_id),
                };

                Ok((full_track_name, standalone.start_location, end))
            }
            message::FetchType::RelativeJoining | message::FetchType::AbsoluteJoining => {
                let joining = msg.joining_fetch.as_ref().ok_or(0x5u64)?;

                let state = self.state.lock().unwrap();
                let entry = state
                    .publishes
                    .get(&joining.joining_request_id)
                    .ok_or(0x4u64)?;
                let full_track_name = entry.handler.common.full_track_name.clone();
                let fullname_hash = TrackHash::new(&full_track_name).track_fullname_hash;
                let largest = state
                    .largest
                    .get(&fullname_hash)
                    .copied()
                    .ok_or(0x4u64)?;

                let start_group = match msg.fetch_type {
                    // Relative: this many groups before the current one.
                    message::FetchType::RelativeJoining => {
                        largest.group_id.saturating_sub(joining.joining_start)
                    }
                    // Absolute: from this group id.
                    _ => joining.joining_start,
                };

                Ok((
                    full_track_name,
                    Location::new(start_group, 0),
                    Location::new(largest.group_id, largest.object_id + 1),
                ))
            }
        }
    }

    fn recv_fetch_cancel(&mut self, msg: message::FetchCancel) -> Result<(), SessionError> {
        self.state.lock().unwrap().fetches.remove(&msg.id);
        Ok(())
    }

    fn recv_track_status_request(
        &mut self,
        msg: message::TrackStatusRequest,
    ) -> Result<(), SessionError> {
        let full_track_name = FullTrackName::new(
            msg.track_namespace.clone(),
            msg.track_name.as_bytes().to_vec(),
        );
        let fullname_hash = TrackHash::new(&full_track_name).track_fullname_hash;
        let largest = self
            .state
            .lock()
            .unwrap()
            .largest
            .get(&fullname_hash)
            .copied();

        let reply = match largest {
            Some(largest) => message::TrackStatus {
                id: msg.id,
                status_code: message::TrackStatusCode::InProgress,
                largest_location: Some(largest),
                params: Default::default(),
            },
            None => message::TrackStatus {
                id: msg.id,
                status_code: message::TrackStatusCode::DoesNotExist,
                largest_location: None,
                params: Default::default(),
            },
        };
        self.send_message(reply);

        Ok(())
    }

    fn recv_publish_ok(&mut self, msg: message::PublishOk) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.publishes.get_mut(&msg.id) {
            entry.handler.priority = msg.subscriber_priority;
            entry.handler.set_status(HandlerStatus::Ok);
        }
        Ok(())
    }

    fn recv_publish_error(&mut self, msg: message::PublishError) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.publishes.remove(&msg.id) {
            if let Some(alias) = entry.handler.common.track_alias() {
                state.alias_to_request.remove(&alias);
            }
            log::warn!(
                "publish rejected: id={} code={} reason={:?}",
                msg.id,
                msg.error_code,
                msg.reason_phrase
            );
        }
        Ok(())
    }

    fn recv_new_group_request(&mut self, msg: message::NewGroupRequest) -> Result<(), SessionError> {
        self.callbacks
            .lock()
            .unwrap()
            .new_group_requested(msg.id, msg.track_alias);
        Ok(())
    }

    /// Push an outbound PUBLISH, offering a track without waiting for a
    /// SUBSCRIBE. The entry becomes publishable once PUBLISH_OK arrives.
    pub fn publish(
        &mut self,
        full_track_name: FullTrackName,
        group_order: message::GroupOrder,
    ) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;
        let track_hash = TrackHash::new(&full_track_name);
        let track_alias = track_hash.track_fullname_hash;
        let largest = self
            .state
            .lock()
            .unwrap()
            .largest
            .get(&track_hash.track_fullname_hash)
            .copied();

        let mut handler = PublishTrackHandler::new(
            full_track_name.clone(),
            TrackMode::StreamPerGroup,
            self.config.default_priority,
            self.config.default_ttl_ms,
        );
        handler.common.request_id = Some(request_id);
        handler.common.set_track_alias(track_alias);
        handler.set_status(HandlerStatus::Pending);

        let filter = SubscribeFilter::evaluate(
            message::FilterType::LatestObject,
            None,
            None,
            None,
            largest,
        )
        .map_err(|err| SessionError::Internal(err.to_string()))?;

        {
            let mut state = self.state.lock().unwrap();
            state.alias_to_request.insert(track_alias, request_id);
            state.publishes.insert(
                request_id,
                PublishEntry {
                    handler,
                    filter,
                    group_order,
                },
            );
        }

        self.send_message(message::Publish {
            id: request_id,
            track_namespace: full_track_name.namespace.clone(),
            track_name: full_track_name.name_utf8(),
            track_alias,
            group_order,
            largest_location: largest,
            forward: true,
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Tear down every handler with a NotConnected status and drop any
    /// queued data.
    pub(super) fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        for entry in state.publishes.values_mut() {
            entry.handler.set_status(HandlerStatus::NotConnected);
        }
        for handler in state.fetches.values_mut() {
            handler.set_status(HandlerStatus::NotConnected);
        }
        for entry in state.announces.values_mut() {
            entry.status = HandlerStatus::NotConnected;
        }
        drop(state);

        self.data_queue.lock().unwrap().clear();
    }

    /// Drive the outbound data queue onto QUIC streams and datagrams.
    pub(super) async fn run_data(mut self) -> Result<(), SessionError> {
        let mut streams: HashMap<StreamKey, Writer> = HashMap::new();

        loop {
            let item = self.data_queue.lock().unwrap().pop_front();

            let item = match item {
                Some(item) => item,
                None => {
                    self.data_notify.notified().await;
                    continue;
                }
            };

            match item {
                QueuedData::Datagram(bytes) => {
                    self.session.send_datagram(bytes).await?;
                }
                QueuedData::Stream {
                    key,
                    open_new,
                    priority,
                    header,
                    frame,
                } => {
                    if open_new {
                        // A new stream for this track finishes its predecessors.
                        if let Some(track_alias) = key.track_alias() {
                            streams.retain(|k, _| k.track_alias() != Some(track_alias));
                        }

                        let send = self.session.open_uni().await?;
                        let mut writer = Writer::new(send);
                        writer.set_priority(priority as i32);
                        writer.write(&header).await?;
                        streams.insert(key, writer);
                    }

                    match streams.get_mut(&key) {
                        Some(writer) => writer.write(&frame).await?,
                        // The stream was dropped (e.g. unsubscribe raced); skip.
                        None => log::debug!("no open stream for {:?}, dropping frame", key),
                    }
                }
            }
        }
    }
}

/// Encode a subscription object per its track mode into a queue item.
fn encode_subscription_frame(
    track_alias: u64,
    emit: &ObjectEmit,
) -> Result<QueuedData, PublishObjectError> {
    let headers = &emit.headers;
    let internal = |_| PublishObjectError::InternalError;

    if emit.track_mode == TrackMode::Datagram {
        let datagram = Datagram {
            datagram_type: match &headers.extensions {
                Some(_) => DatagramType::ObjectWithExtensions,
                None => DatagramType::ObjectNoExtensions,
            },
            track_alias,
            group_id: emit.group_id,
            object_id: emit.object_id,
            publisher_priority: emit.priority,
            extension_headers: headers.extensions.as_ref().map(|e| e.to_wire()),
            status: None,
            payload: Some(emit.payload.clone()),
        };

        let mut buf = BytesMut::new();
        datagram.encode(&mut buf).map_err(internal)?;
        return Ok(QueuedData::Datagram(buf.freeze()));
    }

    let has_extensions = headers.extensions.is_some();
    let header_type = match has_extensions {
        true => StreamHeaderType::SubgroupIdExt,
        false => StreamHeaderType::SubgroupId,
    };

    let mut header = BytesMut::new();
    StreamHeader {
        header_type,
        subgroup: Some(SubgroupHeader {
            header_type,
            track_alias,
            group_id: emit.group_id,
            subgroup_id: Some(emit.subgroup_id),
            publisher_priority: emit.priority,
        }),
        fetch: None,
    }
    .encode(&mut header)
    .map_err(internal)?;

    let mut frame = BytesMut::new();
    match has_extensions {
        true => SubgroupObjectExt {
            object_id: emit.object_id,
            payload_length: emit.payload.len(),
            status: headers.status,
            extension_headers: headers
                .extensions
                .as_ref()
                .map(|e| e.to_wire())
                .unwrap_or_default(),
        }
        .encode(&mut frame)
        .map_err(internal)?,
        false => SubgroupObject {
            object_id: emit.object_id,
            payload_length: emit.payload.len(),
            status: headers.status,
        }
        .encode(&mut frame)
        .map_err(internal)?,
    }
    frame.extend_from_slice(&emit.payload);

    Ok(QueuedData::Stream {
        key: StreamKey::Subgroup {
            track_alias,
            group_id: emit.group_id,
            subgroup_id: emit.subgroup_id,
        },
        open_new: emit.stream_header_needed,
        priority: emit.priority,
        header: header.freeze(),
        frame: frame.freeze(),
    })
}

/// Encode a fetch-replay object into a queue item.
fn encode_fetch_frame(request_id: u64, emit: &ObjectEmit) -> Result<QueuedData, PublishObjectError> {
    let internal = |_| PublishObjectError::InternalError;
    let headers = &emit.headers;

    let mut header = BytesMut::new();
    StreamHeader {
        header_type: StreamHeaderType::Fetch,
        subgroup: None,
        fetch: Some(FetchHeader { request_id }),
    }
    .encode(&mut header)
    .map_err(internal)?;

    let mut frame = BytesMut::new();
    FetchObject {
        group_id: emit.group_id,
        subgroup_id: emit.subgroup_id,
        object_id: emit.object_id,
        publisher_priority: emit.priority,
        payload_length: emit.payload.len(),
        status: headers.status,
        extension_headers: headers
            .extensions
            .as_ref()
            .map(|e| e.to_wire())
            .unwrap_or_default(),
        immutable_extension_headers: headers
            .immutable_extensions
            .as_ref()
            .map(|e| e.to_wire())
            .unwrap_or_default(),
    }
    .encode(&mut frame)
    .map_err(internal)?;
    frame.extend_from_slice(&emit.payload);

    Ok(QueuedData::Stream {
        key: StreamKey::Fetch { request_id },
        open_new: emit.stream_header_needed,
        priority: emit.priority,
        header: header.freeze(),
        frame: frame.freeze(),
    })
}
