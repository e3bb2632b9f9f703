//! Low-level control messages sent over the wire.
//!
//! All of these messages are sent over the bidirectional control stream.
//! This introduces some head-of-line blocking but preserves ordering.
//! Objects are the exception: they are sent over dedicated QUIC streams or
//! datagrams (see the `data` module).

mod announce;
mod announce_cancel;
mod announce_error;
mod announce_ok;
mod fetch;
mod fetch_cancel;
mod fetch_error;
mod fetch_ok;
mod fetch_type;
mod filter_type;
mod go_away;
mod group_order;
mod max_request_id;
mod new_group_request;
mod publish;
mod publish_error;
mod publish_ok;
mod publisher;
mod requests_blocked;
mod subscribe;
mod subscribe_announces;
mod subscribe_announces_error;
mod subscribe_announces_ok;
mod subscribe_done;
mod subscribe_error;
mod subscribe_ok;
mod subscribe_update;
mod subscriber;
mod track_status;
mod track_status_request;
mod unannounce;
mod unsubscribe;
mod unsubscribe_announces;

pub use announce::*;
pub use announce_cancel::*;
pub use announce_error::*;
pub use announce_ok::*;
pub use fetch::*;
pub use fetch_cancel::*;
pub use fetch_error::*;
pub use fetch_ok::*;
pub use fetch_type::*;
pub use filter_type::*;
pub use go_away::*;
pub use group_order::*;
pub use max_request_id::*;
pub use new_group_request::*;
pub use publish::*;
pub use publish_error::*;
pub use publish_ok::*;
pub use publisher::*;
pub use requests_blocked::*;
pub use subscribe::*;
pub use subscribe_announces::*;
pub use subscribe_announces_error::*;
pub use subscribe_announces_ok::*;
pub use subscribe_done::*;
pub use subscribe_error::*;
pub use subscribe_ok::*;
pub use subscribe_update::*;
pub use subscriber::*;
pub use track_status::*;
pub use track_status_request::*;
pub use unannounce::*;
pub use unsubscribe::*;
pub use unsubscribe_announces::*;

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use bytes::Buf;
use std::fmt;

// Use a macro to generate the message types rather than copy-paste.
// This implements a decode/encode method that uses the specified type.
macro_rules! message_types {
    {$($name:ident = $val:expr,)*} => {
		/// All supported message types.
		#[derive(Clone)]
		pub enum Message {
			$($name($name)),*
		}

		impl Decode for Message {
			fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
				let t = u64::decode(r)?;
				let len = usize::decode(r)?;

				// Wait until the full payload has been buffered.
				Self::decode_remaining(r, len)?;

				// Decode the payload from its exact slice so a short or long
				// message is caught instead of corrupting the framing.
				let mut payload = vec![0; len];
				r.copy_to_slice(&mut payload);
				let mut payload = bytes::Bytes::from(payload);

				let msg = match t {
					$($val => {
						let msg = $name::decode(&mut payload)?;
						Self::$name(msg)
					})*
					_ => return Err(DecodeError::InvalidMessage(t)),
				};

				if payload.has_remaining() {
					return Err(DecodeError::LengthMismatch);
				}

				Ok(msg)
			}
		}

		impl Encode for Message {
			fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
				match self {
					$(Self::$name(ref m) => {
						self.id().encode(w)?;

						// Encode into a buffer first to learn the payload length.
						let mut buf = Vec::new();
						m.encode(&mut buf)?;
						buf.len().encode(w)?;

						Self::encode_remaining(w, buf.len())?;
						w.put_slice(&buf);
						Ok(())
					},)*
				}
			}
		}

		impl Message {
			pub fn id(&self) -> u64 {
				match self {
					$(Self::$name(_) => {
						$val
					},)*
				}
			}

			pub fn name(&self) -> &'static str {
				match self {
					$(Self::$name(_) => {
						stringify!($name)
					},)*
				}
			}
		}

		$(impl From<$name> for Message {
			fn from(m: $name) -> Self {
				Message::$name(m)
			}
		})*

		impl fmt::Debug for Message {
			// Delegate to the message formatter
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				match self {
					$(Self::$name(ref m) => m.fmt(f),)*
				}
			}
		}
    }
}

// Each message is prefixed with the given VarInt type.
message_types! {
    // NOTE: Setup messages are in another module.
    // SetupClient = 0x20
    // SetupServer = 0x21

    // Misc
    GoAway = 0x10,
    MaxRequestId = 0x15,
    RequestsBlocked = 0x1a,
    NewGroupRequest = 0x1b,

    // SUBSCRIBE family, sent by subscriber
    SubscribeUpdate = 0x2,
    Subscribe = 0x3,
    Unsubscribe = 0xa,
    // SUBSCRIBE family, sent by publisher
    SubscribeOk = 0x4,
    SubscribeError = 0x5,
    SubscribeDone = 0xb,

    // ANNOUNCE family, sent by publisher
    Announce = 0x6,
    Unannounce = 0x9,
    // ANNOUNCE family, sent by subscriber
    AnnounceOk = 0x7,
    AnnounceError = 0x8,
    AnnounceCancel = 0xc,

    // TRACK_STATUS family, sent by subscriber
    TrackStatusRequest = 0xd,
    // TRACK_STATUS family, sent by publisher
    TrackStatus = 0xe,

    // SUBSCRIBE_ANNOUNCES family, sent by subscriber
    SubscribeAnnounces = 0x11,
    UnsubscribeAnnounces = 0x14,
    // SUBSCRIBE_ANNOUNCES family, sent by publisher
    SubscribeAnnouncesOk = 0x12,
    SubscribeAnnouncesError = 0x13,

    // FETCH family, sent by subscriber
    Fetch = 0x16,
    FetchCancel = 0x17,
    // FETCH family, sent by publisher
    FetchOk = 0x18,
    FetchError = 0x19,

    // PUBLISH family, sent by publisher
    Publish = 0x1d,
    // PUBLISH family, sent by subscriber
    PublishOk = 0x1e,
    PublishError = 0x1f,
}

impl Message {
    /// Post-decode validation. Failure is a protocol violation and terminates
    /// the session.
    pub fn validate(&self) -> Result<(), DecodeError> {
        match self {
            Self::Subscribe(msg) => msg.validate(),
            Self::Fetch(msg) => msg.validate(),
            _ => Ok(()),
        }
    }
}
