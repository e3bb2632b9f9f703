use std::collections::{hash_map, HashMap};
use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::coding::{Decode, Location, ReasonPhrase, TrackNamespace};
use crate::data;
use crate::message::{self, FilterType, GroupOrder, Message, SubscribeErrorCode};
use crate::track::{
    FullTrackName, HandlerStatus, JoiningFetchHandler, SubscribeAnnouncesHandler,
    SubscribeTrackHandler, TrackDelegate, TrackHash,
};

use crate::tick::TickService;

use super::{Reader, RequestIds, SessionCallbacks, SessionError};

/// Parameters of an outgoing subscribe.
#[derive(Clone, Debug)]
pub struct SubscribeOptions {
    pub priority: u8,
    pub group_order: GroupOrder,
    pub filter_type: FilterType,
    pub start_location: Option<Location>,
    pub end_group_id: Option<u64>,
    pub end_object_id: Option<u64>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            // Mid value, neither favored nor starved.
            priority: 127,
            group_order: GroupOrder::Publisher,
            filter_type: FilterType::LatestObject,
            start_location: None,
            end_group_id: None,
            end_object_id: None,
        }
    }
}

struct SubscribeEntry {
    handler: SubscribeTrackHandler,
    delegate: Box<dyn TrackDelegate>,

    /// While Pending or Sending*, the tick at which we give up waiting for
    /// the peer.
    deadline_ms: Option<u64>,
}

enum FetchEntry {
    /// A standalone fetch delivers to its own delegate.
    Standalone {
        handler: SubscribeTrackHandler,
        delegate: Box<dyn TrackDelegate>,
        deadline_ms: Option<u64>,
    },
    /// A joining fetch delivers to the joined subscription's delegate.
    Joining(JoiningFetchHandler),
}

#[derive(Default)]
struct SubscriberState {
    /// Subscribes waiting for the peer to raise MAX_REQUEST_ID.
    blocked: Vec<(FullTrackName, SubscribeOptions, Box<dyn TrackDelegate>)>,

    /// Outgoing subscribes, keyed by request id.
    subscribes: HashMap<u64, SubscribeEntry>,

    /// Track alias to subscribe request id.
    alias_to_request: HashMap<u64, u64>,

    /// Outgoing fetches, keyed by request id.
    fetches: HashMap<u64, FetchEntry>,

    /// Outgoing announce-prefix subscriptions, keyed by prefix hash.
    announce_prefixes: HashMap<u64, SubscribeAnnouncesHandler>,

    /// Namespaces the peer has announced, keyed by namespace hash.
    peer_announces: HashMap<u64, TrackNamespace>,
}

/// The subscriber half of a session: originates subscribes and fetches,
/// routes inbound object streams and datagrams to their handlers.
#[derive(Clone)]
pub struct Subscriber {
    outgoing: mpsc::UnboundedSender<Message>,
    state: Arc<Mutex<SubscriberState>>,
    request_ids: Arc<RequestIds>,
    callbacks: Arc<Mutex<dyn SessionCallbacks>>,
    config: Arc<super::SessionConfig>,
    tick: Arc<dyn TickService>,
}

impl Subscriber {
    pub(super) fn new(
        outgoing: mpsc::UnboundedSender<Message>,
        request_ids: Arc<RequestIds>,
        callbacks: Arc<Mutex<dyn SessionCallbacks>>,
        config: Arc<super::SessionConfig>,
        tick: Arc<dyn TickService>,
    ) -> Self {
        Self {
            outgoing,
            state: Default::default(),
            request_ids,
            callbacks,
            config,
            tick,
        }
    }

    fn send_message<M: Into<Message>>(&self, msg: M) {
        let msg = msg.into();
        log::debug!("sending message: {:?}", msg);
        let _ = self.outgoing.send(msg);
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

    /// Subscribe to a track. Objects and status changes arrive through the
    /// delegate; the returned request id cancels via [`Self::unsubscribe`].
    ///
    /// When request ids are exhausted the configuration decides: either the
    /// subscribe is queued behind a REQUESTS_BLOCKED (returning `None` until
    /// the peer raises the ceiling) or the call fails.
    pub fn subscribe(
        &mut self,
        full_track_name: FullTrackName,
        options: SubscribeOptions,
        delegate: Box<dyn TrackDelegate>,
    ) -> Result<Option<u64>, SessionError> {
        let request_id = match self.next_request_id() {
            Ok(request_id) => request_id,
            Err(SessionError::RequestIdExhausted) if self.config.queue_blocked_requests => {
                self.state
                    .lock()
                    .unwrap()
                    .blocked
                    .push((full_track_name, options, delegate));
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        self.start_subscribe(request_id, full_track_name, options, delegate);
        Ok(Some(request_id))
    }

    fn start_subscribe(
        &mut self,
        request_id: u64,
        full_track_name: FullTrackName,
        options: SubscribeOptions,
        delegate: Box<dyn TrackDelegate>,
    ) {
        let track_alias = TrackHash::new(&full_track_name).track_fullname_hash;

        let mut handler = SubscribeTrackHandler::new(
            full_track_name.clone(),
            options.priority,
            options.group_order,
            options.filter_type,
        );
        handler.common.request_id = Some(request_id);
        handler.common.set_track_alias(track_alias);
        handler.set_status(HandlerStatus::Pending);

        let deadline_ms = Some(self.tick.milliseconds() + self.config.request_timeout_ms);
        self.state.lock().unwrap().subscribes.insert(
            request_id,
            SubscribeEntry {
                handler,
                delegate,
                deadline_ms,
            },
        );

        self.send_message(message::Subscribe {
            id: request_id,
            track_alias,
            track_namespace: full_track_name.namespace.clone(),
            track_name: full_track_name.name_utf8(),
            subscriber_priority: options.priority,
            group_order: options.group_order,
            forward: true,
            filter_type: options.filter_type,
            start_location: options.start_location,
            end_group_id: options.end_group_id,
            end_object_id: options.end_object_id,
            params: Default::default(),
        });
    }

    /// Re-issue queued subscribes after the peer raised MAX_REQUEST_ID.
    pub(super) fn flush_blocked(&mut self) {
        loop {
            let next = {
                let mut state = self.state.lock().unwrap();
                if state.blocked.is_empty() {
                    return;
                }
                match self.request_ids.next() {
                    Ok(request_id) => Some((request_id, state.blocked.remove(0))),
                    Err(_) => None,
                }
            };

            match next {
                Some((request_id, (full_track_name, options, delegate))) => {
                    self.start_subscribe(request_id, full_track_name, options, delegate);
                }
                None => return,
            }
        }
    }

    /// Cancel a subscription. Callbacks are suppressed from here on; the
    /// entry is removed when the publisher acknowledges with SUBSCRIBE_DONE
    /// or the grace deadline lapses.
    pub fn unsubscribe(&mut self, request_id: u64) {
        let deadline_ms = Some(self.tick.milliseconds() + self.config.request_timeout_ms);

        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.subscribes.get_mut(&request_id) {
            entry.handler.set_status(HandlerStatus::SendingUnsubscribe);
            entry.deadline_ms = deadline_ms;
            self.send_message(message::Unsubscribe { id: request_id });
        }
    }

    /// Fetch a past range of a track on a dedicated stream.
    pub fn fetch(
        &mut self,
        full_track_name: FullTrackName,
        start: Location,
        end_group_id: u64,
        end_object_id: Option<u64>,
        options: SubscribeOptions,
        delegate: Box<dyn TrackDelegate>,
    ) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;

        let mut handler = SubscribeTrackHandler::new(
            full_track_name.clone(),
            options.priority,
            options.group_order,
            options.filter_type,
        );
        handler.common.request_id = Some(request_id);
        handler.set_status(HandlerStatus::Pending);

        let deadline_ms = Some(self.tick.milliseconds() + self.config.request_timeout_ms);
        self.state.lock().unwrap().fetches.insert(
            request_id,
            FetchEntry::Standalone {
                handler,
                delegate,
                deadline_ms,
            },
        );

        // An absent end object maps to 0, meaning the entire end group.
        let end_location = Location::new(end_group_id, end_object_id.map_or(0, |o| o + 1));

        self.send_message(message::Fetch {
            id: request_id,
            subscriber_priority: options.priority,
            group_order: options.group_order,
            fetch_type: message::FetchType::Standalone,
            standalone_fetch: Some(message::StandaloneFetch {
                track_namespace: full_track_name.namespace.clone(),
                track_name: full_track_name.name_utf8(),
                start_location: start,
                end_location,
            }),
            joining_fetch: None,
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Fetch the recent past of an active subscription, delivering through
    /// the subscription's own delegate.
    pub fn joining_fetch(
        &mut self,
        joining_request_id: u64,
        preceding_groups: u64,
    ) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;

        {
            let mut state = self.state.lock().unwrap();
            let joined = state
                .subscribes
                .get(&joining_request_id)
                .ok_or(SessionError::NotFound)?;

            let handler = JoiningFetchHandler::new(&joined.handler, joining_request_id);
            state
                .fetches
                .insert(request_id, FetchEntry::Joining(handler));
        }

        self.send_message(message::Fetch {
            id: request_id,
            subscriber_priority: 127,
            group_order: GroupOrder::Ascending,
            fetch_type: message::FetchType::RelativeJoining,
            standalone_fetch: None,
            joining_fetch: Some(message::JoiningFetch {
                joining_request_id,
                joining_start: preceding_groups,
            }),
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Abandon a fetch.
    pub fn fetch_cancel(&mut self, request_id: u64) {
        let mut state = self.state.lock().unwrap();
        if state.fetches.remove(&request_id).is_some() {
            self.send_message(message::FetchCancel { id: request_id });
        }
    }

    /// Be notified of announces under a namespace prefix.
    pub fn subscribe_announces(
        &mut self,
        prefix: TrackNamespace,
    ) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;
        let prefix_hash = prefix.hash_value();

        {
            let mut state = self.state.lock().unwrap();
            // Insert if absent: a duplicate prefix keeps the original entry.
            match state.announce_prefixes.entry(prefix_hash) {
                hash_map::Entry::Occupied(_) => return Err(SessionError::Duplicate),
                hash_map::Entry::Vacant(slot) => {
                    let mut handler = SubscribeAnnouncesHandler::new(prefix.clone());
                    handler.status = HandlerStatus::Pending;
                    handler.request_id = Some(request_id);
                    slot.insert(handler);
                }
            }
        }

        self.send_message(message::SubscribeAnnounces {
            id: request_id,
            track_namespace_prefix: prefix,
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Stop being notified for a prefix. The entry is erased iff present.
    pub fn unsubscribe_announces(&mut self, prefix: &TrackNamespace) {
        let prefix_hash = prefix.hash_value();

        let removed = {
            let mut state = self.state.lock().unwrap();
            state.announce_prefixes.remove(&prefix_hash).is_some()
        };

        if removed {
            self.send_message(message::UnsubscribeAnnounces {
                track_namespace_prefix: prefix.clone(),
            });
        }
    }

    /// Ask about a track without subscribing.
    pub fn track_status_request(
        &mut self,
        full_track_name: &FullTrackName,
    ) -> Result<u64, SessionError> {
        let request_id = self.next_request_id()?;

        self.send_message(message::TrackStatusRequest {
            id: request_id,
            track_namespace: full_track_name.namespace.clone(),
            track_name: full_track_name.name_utf8(),
            params: Default::default(),
        });

        Ok(request_id)
    }

    /// Ask the publisher to start a new group on a subscribed track.
    pub fn request_new_group(&mut self, request_id: u64) -> Result<(), SessionError> {
        let state = self.state.lock().unwrap();
        let entry = state
            .subscribes
            .get(&request_id)
            .ok_or(SessionError::NotFound)?;
        let track_alias = entry
            .handler
            .common
            .track_alias()
            .ok_or(SessionError::NotFound)?;
        drop(state);

        self.send_message(message::NewGroupRequest {
            id: request_id,
            track_alias,
        });

        Ok(())
    }

    /// Receive a message from the publisher via the control stream.
    pub(super) fn recv_message(&mut self, msg: message::Publisher) -> Result<(), SessionError> {
        match msg {
            message::Publisher::Announce(msg) => self.recv_announce(msg),
            message::Publisher::Unannounce(msg) => self.recv_unannounce(msg),
            message::Publisher::Publish(msg) => self.recv_publish(msg),
            message::Publisher::SubscribeOk(msg) => self.recv_subscribe_ok(msg),
            message::Publisher::SubscribeError(msg) => self.recv_subscribe_error(msg),
            message::Publisher::SubscribeDone(msg) => self.recv_subscribe_done(msg),
            message::Publisher::TrackStatus(msg) => self.recv_track_status(msg),
            message::Publisher::FetchOk(msg) => self.recv_fetch_ok(msg),
            message::Publisher::FetchError(msg) => self.recv_fetch_error(msg),
            message::Publisher::SubscribeAnnouncesOk(msg) => self.recv_subscribe_announces_ok(msg),
            message::Publisher::SubscribeAnnouncesError(msg) => {
                self.recv_subscribe_announces_error(msg)
            }
        }
    }

    fn recv_announce(&mut self, msg: message::Announce) -> Result<(), SessionError> {
        let namespace_hash = msg.track_namespace.hash_value();

        {
            let mut state = self.state.lock().unwrap();
            match state.peer_announces.entry(namespace_hash) {
                hash_map::Entry::Occupied(_) => return Err(SessionError::Duplicate),
                hash_map::Entry::Vacant(entry) => entry.insert(msg.track_namespace.clone()),
            };
        }

        let authorized = self
            .callbacks
            .lock()
            .unwrap()
            .announce_received(&msg.track_namespace);

        if !authorized {
            self.state
                .lock()
                .unwrap()
                .peer_announces
                .remove(&namespace_hash);
            self.send_message(message::AnnounceError {
                id: msg.id,
                error_code: 0x1,
                reason_phrase: ReasonPhrase("not authorized".to_string()),
            });
            return Ok(());
        }

        self.send_message(message::AnnounceOk { id: msg.id });

        // A new announce matches every currently-subscribed prefix.
        let matching: Vec<TrackNamespace> = {
            let state = self.state.lock().unwrap();
            state
                .announce_prefixes
                .values()
                .filter(|handler| {
                    handler.matches(&msg.track_namespace)
                        && !handler.status.callbacks_suppressed()
                })
                .map(|handler| handler.prefix.clone())
                .collect()
        };

        let mut callbacks = self.callbacks.lock().unwrap();
        for prefix in matching {
            log::debug!(
                "announce matches prefix: namespace={} prefix={}",
                msg.track_namespace.to_utf8_path(),
                prefix.to_utf8_path()
            );
            callbacks.matching_namespace_received(&prefix, &msg.track_namespace);
        }

        Ok(())
    }

    fn recv_unannounce(&mut self, msg: message::Unannounce) -> Result<(), SessionError> {
        let namespace_hash = msg.track_namespace.hash_value();
        self.state
            .lock()
            .unwrap()
            .peer_announces
            .remove(&namespace_hash);

        self.callbacks
            .lock()
            .unwrap()
            .unannounce_received(&msg.track_namespace);
        Ok(())
    }

    fn recv_publish(&mut self, msg: message::Publish) -> Result<(), SessionError> {
        let authorized = self.callbacks.lock().unwrap().publish_received(&msg);
        if !authorized {
            self.send_message(message::PublishError {
                id: msg.id,
                error_code: 0x1,
                reason_phrase: ReasonPhrase("not accepted".to_string()),
            });
            return Ok(());
        }

        let full_track_name = FullTrackName::new(
            msg.track_namespace.clone(),
            msg.track_name.as_bytes().to_vec(),
        );

        let mut handler = SubscribeTrackHandler::new(
            full_track_name,
            127,
            msg.group_order,
            FilterType::LatestObject,
        );
        handler.common.request_id = Some(msg.id);
        handler.common.set_track_alias(msg.track_alias);
        handler.set_status(HandlerStatus::Ok);

        let delegate = self
            .callbacks
            .lock()
            .unwrap()
            .publish_delegate(&handler.common.full_track_name);

        {
            let mut state = self.state.lock().unwrap();
            match state.alias_to_request.entry(msg.track_alias) {
                hash_map::Entry::Occupied(_) => return Err(SessionError::Duplicate),
                hash_map::Entry::Vacant(entry) => entry.insert(msg.id),
            };
            state.subscribes.insert(
                msg.id,
                SubscribeEntry {
                    handler,
                    delegate,
                    deadline_ms: None,
                },
            );
        }

        self.send_message(message::PublishOk {
            id: msg.id,
            forward: true,
            subscriber_priority: 127,
            group_order: msg.group_order,
            filter_type: FilterType::LatestObject,
            start_location: None,
            end_group_id: None,
            params: Default::default(),
        });

        Ok(())
    }

    fn recv_subscribe_ok(&mut self, msg: message::SubscribeOk) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();

        // The alias maps to exactly one subscription.
        match state.alias_to_request.entry(msg.track_alias) {
            hash_map::Entry::Occupied(entry) if *entry.get() != msg.id => {
                return Err(SessionError::Duplicate);
            }
            hash_map::Entry::Occupied(_) => {}
            hash_map::Entry::Vacant(entry) => {
                entry.insert(msg.id);
            }
        }

        if let Some(entry) = state.subscribes.get_mut(&msg.id) {
            entry.handler.common.set_track_alias(msg.track_alias);

            // An unsubscribe already in flight keeps callbacks suppressed.
            if !entry.handler.status().callbacks_suppressed() {
                entry.handler.set_status(HandlerStatus::Ok);
                entry.deadline_ms = None;
                entry.delegate.status_changed(HandlerStatus::Ok);
            }
        }

        Ok(())
    }

    fn remove_subscribe(&mut self, request_id: u64) -> Option<SubscribeEntry> {
        let mut state = self.state.lock().unwrap();
        let entry = state.subscribes.remove(&request_id)?;
        if let Some(alias) = entry.handler.common.track_alias() {
            state.alias_to_request.remove(&alias);
        }
        Some(entry)
    }

    fn recv_subscribe_error(&mut self, msg: message::SubscribeError) -> Result<(), SessionError> {
        if let Some(mut entry) = self.remove_subscribe(msg.id) {
            log::warn!(
                "subscribe failed: id={} code={:?} reason={:?}",
                msg.id,
                msg.error_code,
                msg.reason_phrase
            );

            let suppressed = entry.handler.status().callbacks_suppressed();
            let status = match msg.error_code {
                SubscribeErrorCode::Unauthorized => HandlerStatus::NotAuthorized,
                _ => HandlerStatus::Error,
            };
            entry.handler.set_status(status);
            if !suppressed {
                entry.delegate.status_changed(status);
            }
        }

        Ok(())
    }

    fn recv_subscribe_done(&mut self, msg: message::SubscribeDone) -> Result<(), SessionError> {
        if let Some(mut entry) = self.remove_subscribe(msg.id) {
            let suppressed = entry.handler.status().callbacks_suppressed();
            entry.handler.set_status(HandlerStatus::Done);
            if !suppressed {
                entry.delegate.status_changed(HandlerStatus::Done);
            }
        }

        Ok(())
    }

    fn recv_track_status(&mut self, msg: message::TrackStatus) -> Result<(), SessionError> {
        self.callbacks.lock().unwrap().track_status_received(&msg);
        Ok(())
    }

    fn recv_fetch_ok(&mut self, msg: message::FetchOk) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        match state.fetches.get_mut(&msg.id) {
            Some(FetchEntry::Standalone {
                handler,
                delegate,
                deadline_ms,
            }) => {
                handler.set_status(HandlerStatus::Ok);
                *deadline_ms = None;
                delegate.status_changed(HandlerStatus::Ok);
            }
            Some(FetchEntry::Joining(joining)) => {
                joining.handler.set_status(HandlerStatus::Ok);
            }
            None => log::debug!("FETCH_OK for unknown request: id={}", msg.id),
        }

        Ok(())
    }

    fn recv_fetch_error(&mut self, msg: message::FetchError) -> Result<(), SessionError> {
        let entry = self.state.lock().unwrap().fetches.remove(&msg.id);
        if let Some(FetchEntry::Standalone { mut delegate, .. }) = entry {
            log::warn!(
                "fetch failed: id={} code={} reason={:?}",
                msg.id,
                msg.error_code,
                msg.reason_phrase
            );
            delegate.status_changed(HandlerStatus::Error);
        }

        Ok(())
    }

    fn recv_subscribe_announces_ok(
        &mut self,
        msg: message::SubscribeAnnouncesOk,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        for handler in state.announce_prefixes.values_mut() {
            if handler.request_id == Some(msg.id) {
                handler.status = HandlerStatus::Ok;
                break;
            }
        }

        Ok(())
    }

    fn recv_subscribe_announces_error(
        &mut self,
        msg: message::SubscribeAnnouncesError,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        let prefix_hash = state
            .announce_prefixes
            .iter()
            .find(|(_, handler)| handler.request_id == Some(msg.id))
            .map(|(hash, _)| *hash);

        if let Some(hash) = prefix_hash {
            state.announce_prefixes.remove(&hash);
            log::warn!(
                "subscribe announces failed: id={} code={} reason={:?}",
                msg.id,
                msg.error_code,
                msg.reason_phrase
            );
        }

        Ok(())
    }

    /// Handle a new unidirectional stream from the peer: parse enough to
    /// route it, then pump its bytes into the owning handler.
    pub(super) async fn recv_stream(
        mut self,
        stream: web_transport::RecvStream,
    ) -> Result<(), SessionError> {
        let mut reader = Reader::new(stream);

        let header: data::StreamHeader = reader.decode().await?;
        log::debug!("new data stream: type={}", header.header_type);

        // Re-encode the header so the handler's parser sees the whole stream.
        let mut first = bytes::BytesMut::new();
        {
            use crate::coding::Encode;
            header.encode(&mut first)?;
        }

        let route = match (&header.subgroup, &header.fetch) {
            (Some(subgroup), _) => StreamRoute::Subscribe(subgroup.track_alias),
            (_, Some(fetch)) => StreamRoute::Fetch(fetch.request_id),
            _ => return Err(SessionError::Decode(crate::coding::DecodeError::InvalidHeaderType)),
        };

        self.route_stream_data(&route, true, first.freeze())?;

        while let Some(chunk) = reader.read_chunk(usize::MAX).await? {
            self.route_stream_data(&route, false, chunk)?;
        }

        Ok(())
    }

    fn route_stream_data(
        &mut self,
        route: &StreamRoute,
        is_start: bool,
        data: Bytes,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();

        match route {
            StreamRoute::Subscribe(track_alias) => {
                let request_id = *state
                    .alias_to_request
                    .get(track_alias)
                    .ok_or(SessionError::NotFound)?;
                let entry = state
                    .subscribes
                    .get_mut(&request_id)
                    .ok_or(SessionError::NotFound)?;
                entry
                    .handler
                    .stream_data_recv(is_start, data, entry.delegate.as_mut())?;
            }
            StreamRoute::Fetch(request_id) => {
                let state = &mut *state;

                // Where the fetch delivers: its own delegate, or the joined
                // subscription's.
                let joining_id = match state.fetches.get(request_id) {
                    Some(FetchEntry::Joining(joining)) => Some(joining.joining_request_id),
                    Some(FetchEntry::Standalone { .. }) => None,
                    None => return Err(SessionError::NotFound),
                };

                match joining_id {
                    None => {
                        if let Some(FetchEntry::Standalone {
                            handler, delegate, ..
                        }) = state.fetches.get_mut(request_id)
                        {
                            handler.stream_data_recv(is_start, data, delegate.as_mut())?;
                        }
                    }
                    Some(joining_id) => {
                        let joined = state
                            .subscribes
                            .get_mut(&joining_id)
                            .ok_or(SessionError::NotFound)?;
                        if let Some(FetchEntry::Joining(joining)) =
                            state.fetches.get_mut(request_id)
                        {
                            joining.stream_data_recv(
                                is_start,
                                data,
                                joined.delegate.as_mut(),
                            )?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle an incoming datagram.
    pub(super) fn recv_datagram(&mut self, datagram: Bytes) -> Result<(), SessionError> {
        let mut cursor = io::Cursor::new(datagram);
        let datagram = data::Datagram::decode(&mut cursor)?;

        let mut state = self.state.lock().unwrap();
        let request_id = match state.alias_to_request.get(&datagram.track_alias) {
            Some(request_id) => *request_id,
            None => {
                log::warn!(
                    "datagram for unknown track alias: alias={} group={} object={}",
                    datagram.track_alias,
                    datagram.group_id,
                    datagram.object_id
                );
                return Ok(());
            }
        };

        if let Some(entry) = state.subscribes.get_mut(&request_id) {
            entry
                .handler
                .datagram_recv(&datagram, entry.delegate.as_mut());
        }

        Ok(())
    }

    /// Fail or retire entries whose response deadline has lapsed: pending
    /// requests time out locally, and cancellations the peer never
    /// acknowledged are dropped.
    pub(super) fn sweep_deadlines(&mut self) {
        let now = self.tick.milliseconds();
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let expired: Vec<u64> = state
            .subscribes
            .iter()
            .filter(|(_, entry)| matches!(entry.deadline_ms, Some(deadline) if now >= deadline))
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            if let Some(mut entry) = state.subscribes.remove(&id) {
                if let Some(alias) = entry.handler.common.track_alias() {
                    state.alias_to_request.remove(&alias);
                }

                let suppressed = entry.handler.status().callbacks_suppressed();
                log::warn!("request deadline lapsed: id={}", id);
                entry.handler.set_status(HandlerStatus::Error);
                if !suppressed {
                    entry.delegate.status_changed(HandlerStatus::Error);
                }
            }
        }

        let expired: Vec<u64> = state
            .fetches
            .iter()
            .filter(|(_, entry)| {
                matches!(
                    entry,
                    FetchEntry::Standalone {
                        deadline_ms: Some(deadline),
                        ..
                    } if now >= *deadline
                )
            })
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            if let Some(FetchEntry::Standalone { mut delegate, .. }) = state.fetches.remove(&id) {
                log::warn!("fetch deadline lapsed: id={}", id);
                delegate.status_changed(HandlerStatus::Error);
            }
        }
    }

    /// Tear down every handler with a NotConnected status.
    pub(super) fn close(&mut self) {
        let mut state = self.state.lock().unwrap();

        for entry in state.subscribes.values_mut() {
            entry.handler.set_status(HandlerStatus::NotConnected);
            entry.delegate.status_changed(HandlerStatus::NotConnected);
        }
        for entry in state.fetches.values_mut() {
            if let FetchEntry::Standalone {
                handler, delegate, ..
            } = entry
            {
                handler.set_status(HandlerStatus::NotConnected);
                delegate.status_changed(HandlerStatus::NotConnected);
            }
        }
        for handler in state.announce_prefixes.values_mut() {
            handler.status = HandlerStatus::NotConnected;
        }
    }
}

enum StreamRoute {
    Subscribe(u64),
    Fetch(u64),
}
