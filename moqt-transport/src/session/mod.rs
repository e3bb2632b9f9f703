//! The session engine: the control-message state machine running on the
//! bidirectional control stream of one QUIC connection.

mod connect;
mod error;
mod filter;
mod publisher;
mod reader;
mod requests;
mod subscriber;
mod writer;

pub use connect::*;
pub use error::*;
pub use filter::*;
pub use publisher::*;
pub use requests::*;
pub use subscriber::*;

use reader::*;
use writer::*;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{stream::FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::coding::TrackNamespace;
use crate::message::{self, Message};
use crate::setup::{self, ParameterType};
use crate::tick::{ThreadedTickService, TickService};
use crate::track::{FullTrackName, ObjectHeaders, TrackDelegate};

/// Lifecycle of one connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionStatus {
    /// The QUIC connection is being established; no application traffic.
    Connecting,
    /// Control stream open, SETUP exchange in flight.
    Setup,
    /// Control messages flow and tracks are live.
    Ready,
    /// GOAWAY received: in-flight requests may finish, no new ones start.
    Draining,
    Closed,
}

/// Everything the application receives from the session.
///
/// Every method has a default so an implementation only supplies what it
/// cares about; the authorize hooks default to accepting.
pub trait SessionCallbacks: Send {
    fn connection_status_changed(&mut self, _status: ConnectionStatus) {}

    /// Server side: a connection was accepted and assigned an id, before any
    /// SETUP exchange.
    fn new_connection(&mut self, _connection_id: u64) {}

    fn client_setup_received(&mut self, _setup: &setup::Client) {}
    fn server_setup_received(&mut self, _setup: &setup::Server) {}

    /// Authorize an inbound announce.
    fn announce_received(&mut self, _namespace: &TrackNamespace) -> bool {
        true
    }
    fn unannounce_received(&mut self, _namespace: &TrackNamespace) {}

    /// Authorize an inbound subscribe.
    fn subscribe_received(&mut self, _msg: &message::Subscribe) -> bool {
        true
    }
    fn unsubscribe_received(&mut self, _request_id: u64) {}

    /// Authorize an inbound fetch.
    fn fetch_received(&mut self, _msg: &message::Fetch) -> bool {
        true
    }

    /// Authorize an inbound publish (push).
    fn publish_received(&mut self, _msg: &message::Publish) -> bool {
        true
    }

    /// Supply the delegate for a track accepted via PUBLISH.
    fn publish_delegate(&mut self, _track: &FullTrackName) -> Box<dyn TrackDelegate> {
        Box::new(NullDelegate)
    }

    /// An announce matched one of our subscribed prefixes.
    fn matching_namespace_received(
        &mut self,
        _prefix: &TrackNamespace,
        _namespace: &TrackNamespace,
    ) {
    }

    fn track_status_received(&mut self, _msg: &message::TrackStatus) {}

    fn new_group_requested(&mut self, _request_id: u64, _track_alias: u64) {}

    fn goaway_received(&mut self, _uri: &str) {}

    fn requests_blocked_received(&mut self, _max_request_id: u64) {}
}

/// Delegate that ignores everything, for tracks the application accepted but
/// has not wired up.
pub struct NullDelegate;

impl TrackDelegate for NullDelegate {
    fn object_received(&mut self, _headers: &ObjectHeaders, _payload: bytes::Bytes) {}
    fn status_changed(&mut self, _status: crate::track::HandlerStatus) {}
}

/// Tunables for one session.
pub struct SessionConfig {
    /// A name identifying this endpoint in the peer's logs.
    pub endpoint_id: String,

    /// Supported protocol versions, preferred first.
    pub versions: setup::Versions,

    /// How many request ids we grant the peer up front.
    pub initial_max_request_id: u64,

    /// Assumed peer grant before the SETUP parameter arrives.
    pub default_peer_max_request_id: u64,

    /// Send the pre-draft 0xF0 code instead of TRACK_DOES_NOT_EXIST (0x4).
    pub use_legacy_track_not_exist: bool,

    /// Queue subscribes behind REQUESTS_BLOCKED when request ids run out,
    /// instead of failing them with RequestIdExhausted.
    pub queue_blocked_requests: bool,

    /// How long in-flight work may continue after GOAWAY.
    pub goaway_grace_ms: u64,

    /// How long a request may stay pending (or a cancellation
    /// unacknowledged) before it fails locally.
    pub request_timeout_ms: u64,

    pub default_priority: u8,
    pub default_ttl_ms: u32,

    /// Outbound object queue shape.
    pub queue_duration_ms: u64,
    pub queue_interval_ms: u64,
    pub queue_capacity: usize,
    pub queue_high_watermark: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint_id: uuid::Uuid::new_v4().to_string(),
            versions: [setup::Version::DRAFT_14].into(),
            initial_max_request_id: 256,
            default_peer_max_request_id: 64,
            use_legacy_track_not_exist: false,
            queue_blocked_requests: true,
            goaway_grace_ms: 5000,
            request_timeout_ms: 10_000,
            default_priority: 127,
            default_ttl_ms: 2000,
            queue_duration_ms: 30_000,
            queue_interval_ms: 1,
            queue_capacity: 2000,
            queue_high_watermark: 1500,
        }
    }
}

#[must_use = "run() must be called"]
pub struct Session {
    webtransport: web_transport::Session,

    sender: Writer,
    recver: Reader,

    publisher: Publisher,
    subscriber: Subscriber,

    outgoing: mpsc::UnboundedReceiver<Message>,
    outgoing_tx: mpsc::UnboundedSender<Message>,

    status: Arc<watch::Sender<ConnectionStatus>>,
    callbacks: Arc<Mutex<dyn SessionCallbacks>>,
    request_ids: Arc<RequestIds>,
    config: Arc<SessionConfig>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    fn new(
        webtransport: web_transport::Session,
        sender: Writer,
        recver: Reader,
        is_client: bool,
        peer_max_request_id: u64,
        config: Arc<SessionConfig>,
        callbacks: Arc<Mutex<dyn SessionCallbacks>>,
        status: Arc<watch::Sender<ConnectionStatus>>,
    ) -> (Self, Publisher, Subscriber) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let request_ids = Arc::new(RequestIds::new(is_client, peer_max_request_id));
        let tick: Arc<dyn TickService> = Arc::new(ThreadedTickService::new());

        let publisher = Publisher::new(
            webtransport.clone(),
            outgoing_tx.clone(),
            request_ids.clone(),
            callbacks.clone(),
            config.clone(),
            tick.clone(),
        );
        let subscriber = Subscriber::new(
            outgoing_tx.clone(),
            request_ids.clone(),
            callbacks.clone(),
            config.clone(),
            tick,
        );

        let session = Self {
            webtransport,
            sender,
            recver,
            publisher: publisher.clone(),
            subscriber: subscriber.clone(),
            outgoing: outgoing_rx,
            outgoing_tx,
            status,
            callbacks,
            request_ids,
            config,
        };

        (session, publisher, subscriber)
    }

    fn set_status(
        status: &watch::Sender<ConnectionStatus>,
        callbacks: &Arc<Mutex<dyn SessionCallbacks>>,
        value: ConnectionStatus,
    ) {
        if *status.borrow() == value {
            return;
        }
        log::info!("connection status: {:?}", value);
        let _ = status.send(value);
        callbacks.lock().unwrap().connection_status_changed(value);
    }

    /// Open an outbound session: create the control stream and run the
    /// CLIENT_SETUP / SERVER_SETUP exchange.
    pub async fn connect<C: SessionCallbacks + 'static>(
        mut session: web_transport::Session,
        config: SessionConfig,
        callbacks: C,
    ) -> Result<(Session, Publisher, Subscriber), SessionError> {
        let config = Arc::new(config);
        let callbacks: Arc<Mutex<dyn SessionCallbacks>> = Arc::new(Mutex::new(callbacks));
        let (status, _) = watch::channel(ConnectionStatus::Closed);
        let status = Arc::new(status);
        Self::set_status(&status, &callbacks, ConnectionStatus::Connecting);

        let control = session.open_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);
        Self::set_status(&status, &callbacks, ConnectionStatus::Setup);

        let mut params = crate::coding::KeyValuePairs::new();
        params.set_intvalue(
            ParameterType::MaxRequestId.into(),
            config.initial_max_request_id,
        );

        let client = setup::Client {
            versions: config.versions.clone(),
            role: setup::Role::Both,
            path: None,
            endpoint_id: config.endpoint_id.clone(),
            params,
        };
        log::debug!("sending CLIENT_SETUP: {:?}", client);
        sender.encode(&client).await?;

        let server: setup::Server = recver.decode().await?;
        log::debug!("received SERVER_SETUP: {:?}", server);

        if !config.versions.contains(&server.version) {
            Self::set_status(&status, &callbacks, ConnectionStatus::Closed);
            return Err(SessionError::Version(
                config.versions.clone(),
                [server.version].into(),
            ));
        }

        callbacks.lock().unwrap().server_setup_received(&server);

        let peer_max = server
            .params
            .get_int(ParameterType::MaxRequestId.into())
            .unwrap_or(config.default_peer_max_request_id);

        let session = Self::new(
            session, sender, recver, true, peer_max, config, callbacks, status,
        );
        Self::set_status(&session.0.status, &session.0.callbacks, ConnectionStatus::Ready);
        Ok(session)
    }

    /// Accept an inbound session: await the CLIENT_SETUP and answer it.
    pub async fn accept<C: SessionCallbacks + 'static>(
        mut session: web_transport::Session,
        config: SessionConfig,
        callbacks: C,
    ) -> Result<(Session, Publisher, Subscriber), SessionError> {
        let config = Arc::new(config);
        let callbacks: Arc<Mutex<dyn SessionCallbacks>> = Arc::new(Mutex::new(callbacks));
        let (status, _) = watch::channel(ConnectionStatus::Closed);
        let status = Arc::new(status);
        Self::set_status(&status, &callbacks, ConnectionStatus::Connecting);

        let connection_id = uuid::Uuid::new_v4().as_u128() as u64;
        callbacks.lock().unwrap().new_connection(connection_id);

        let control = session.accept_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);
        Self::set_status(&status, &callbacks, ConnectionStatus::Setup);

        let client: setup::Client = recver.decode().await?;
        log::debug!("received CLIENT_SETUP: {:?}", client);

        // Pick our most preferred version the client also supports.
        let version = config
            .versions
            .iter()
            .copied()
            .find(|version| client.versions.contains(version));
        let version = match version {
            Some(version) => version,
            None => {
                Self::set_status(&status, &callbacks, ConnectionStatus::Closed);
                return Err(SessionError::Version(
                    client.versions.clone(),
                    config.versions.clone(),
                ));
            }
        };

        callbacks.lock().unwrap().client_setup_received(&client);

        let peer_max = client
            .params
            .get_int(ParameterType::MaxRequestId.into())
            .unwrap_or(config.default_peer_max_request_id);

        let mut params = crate::coding::KeyValuePairs::new();
        params.set_intvalue(
            ParameterType::MaxRequestId.into(),
            config.initial_max_request_id,
        );

        let server = setup::Server {
            version,
            endpoint_id: config.endpoint_id.clone(),
            params,
        };
        log::debug!("sending SERVER_SETUP: {:?}", server);
        sender.encode(&server).await?;

        let session = Self::new(
            session, sender, recver, false, peer_max, config, callbacks, status,
        );
        Self::set_status(&session.0.status, &session.0.callbacks, ConnectionStatus::Ready);
        Ok(session)
    }

    /// Grant the peer more request ids.
    pub fn grant_requests(&mut self, max_request_id: u64) {
        let msg = message::MaxRequestId {
            request_id: max_request_id,
        };
        let _ = self.outgoing_tx.send(msg.into());
    }

    /// Drive the session until it closes or fails. All handlers transition
    /// to NotConnected either way.
    pub async fn run(self) -> Result<(), SessionError> {
        let status = self.status.clone();
        let callbacks = self.callbacks.clone();
        let mut publisher = self.publisher.clone();
        let mut subscriber = self.subscriber.clone();

        let result = tokio::select! {
            res = Self::run_send(self.sender, self.outgoing) => res,
            res = Self::run_recv(
                self.recver,
                self.publisher,
                self.subscriber,
                self.request_ids,
                &status,
                &callbacks,
            ) => res,
            res = Self::run_streams(self.webtransport.clone(), subscriber.clone()) => res,
            res = Self::run_datagrams(self.webtransport, subscriber.clone()) => res,
            res = publisher.clone().run_data() => res,
            res = Self::run_sweep(subscriber.clone()) => res,
            res = Self::run_drain(status.subscribe(), self.config.goaway_grace_ms) => res,
        };

        // Teardown, whatever path got us here.
        Self::set_status(&status, &callbacks, ConnectionStatus::Closed);
        subscriber.close();
        publisher.close();

        if let Err(err) = &result {
            log::warn!("session terminated: code={} err={}", err.code(), err);
        }
        result
    }

    async fn run_send(
        mut sender: Writer,
        mut outgoing: mpsc::UnboundedReceiver<Message>,
    ) -> Result<(), SessionError> {
        while let Some(msg) = outgoing.recv().await {
            log::debug!("sending message: {:?}", msg);
            sender.encode(&msg).await?;
        }

        Ok(())
    }

    async fn run_recv(
        mut recver: Reader,
        mut publisher: Publisher,
        mut subscriber: Subscriber,
        request_ids: Arc<RequestIds>,
        status: &watch::Sender<ConnectionStatus>,
        callbacks: &Arc<Mutex<dyn SessionCallbacks>>,
    ) -> Result<(), SessionError> {
        loop {
            let msg: Message = recver.decode().await?;
            log::debug!("received message: {:?}", msg);

            // A message that fails validation is a protocol violation.
            msg.validate()?;

            // Session-level messages first.
            let msg = match msg {
                Message::GoAway(msg) => {
                    log::info!("GOAWAY received: uri={:?}", msg.new_session_uri);
                    request_ids.freeze();
                    Self::set_status(status, callbacks, ConnectionStatus::Draining);
                    callbacks
                        .lock()
                        .unwrap()
                        .goaway_received(&msg.new_session_uri);
                    continue;
                }
                Message::MaxRequestId(msg) => {
                    request_ids.grant(msg.request_id);
                    subscriber.flush_blocked();
                    continue;
                }
                Message::RequestsBlocked(msg) => {
                    log::debug!("peer blocked at max_request_id={}", msg.max_request_id);
                    callbacks
                        .lock()
                        .unwrap()
                        .requests_blocked_received(msg.max_request_id);
                    continue;
                }
                msg => msg,
            };

            // Messages a publisher sends are handled by our subscriber half.
            let msg = match TryInto::<message::Publisher>::try_into(msg) {
                Ok(msg) => {
                    subscriber.recv_message(msg)?;
                    continue;
                }
                Err(msg) => msg,
            };

            // Messages a subscriber sends are handled by our publisher half.
            match TryInto::<message::Subscriber>::try_into(msg) {
                Ok(msg) => publisher.recv_message(msg)?,
                Err(msg) => {
                    log::warn!("unroutable message: {:?}", msg);
                    return Err(SessionError::RoleViolation);
                }
            }
        }
    }

    async fn run_streams(
        mut webtransport: web_transport::Session,
        subscriber: Subscriber,
    ) -> Result<(), SessionError> {
        let mut tasks = FuturesUnordered::new();

        loop {
            tokio::select! {
                res = webtransport.accept_uni() => {
                    let stream = res?;
                    let subscriber = subscriber.clone();

                    tasks.push(async move {
                        if let Err(err) = subscriber.recv_stream(stream).await {
                            log::warn!("failed to serve stream: {}", err);
                        };
                    });
                },
                _ = tasks.next(), if !tasks.is_empty() => {},
            };
        }
    }

    async fn run_datagrams(
        mut webtransport: web_transport::Session,
        mut subscriber: Subscriber,
    ) -> Result<(), SessionError> {
        loop {
            let datagram = webtransport.recv_datagram().await?;
            subscriber.recv_datagram(datagram)?;
        }
    }

    /// Periodically fail requests whose response deadline has lapsed.
    async fn run_sweep(mut subscriber: Subscriber) -> Result<(), SessionError> {
        let mut interval = tokio::time::interval(Duration::from_millis(1000));
        loop {
            interval.tick().await;
            subscriber.sweep_deadlines();
        }
    }

    /// End the session once the GOAWAY grace period lapses.
    async fn run_drain(
        mut status: watch::Receiver<ConnectionStatus>,
        grace_ms: u64,
    ) -> Result<(), SessionError> {
        loop {
            if *status.borrow() == ConnectionStatus::Draining {
                break;
            }
            if status.changed().await.is_err() {
                return Ok(());
            }
        }

        tokio::time::sleep(Duration::from_millis(grace_ms)).await;
        log::info!("drain grace period elapsed, closing");
        Ok(())
    }
}
