//! An implementation of Media over QUIC Transport (MoQT).
//!
//! Producers announce namespaced tracks, consumers subscribe to or fetch
//! ranges of them, and groups of ordered objects flow over dedicated QUIC
//! streams or datagrams with per-object priority and TTL.
//!
//! The layers, bottom up:
//!
//! - [`coding`]: varints, parameter maps and the other primitive codecs.
//! - [`storage`]: the chunked byte store and the stream framing buffer.
//! - [`tick`], [`queue`], [`cache`]: the clock, the priority/TTL queues
//!   pacing outbound objects, and the replay cache behind fetches.
//! - [`message`], [`data`], [`setup`]: the wire format.
//! - [`track`]: publisher- and subscriber-side track handlers.
//! - [`session`]: the engine tying it all to a QUIC connection.

pub mod cache;
pub mod coding;
pub mod data;
pub mod message;
pub mod queue;
pub mod session;
pub mod setup;
pub mod storage;
pub mod tick;
pub mod track;
