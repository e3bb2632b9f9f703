//! Track handlers: the publisher- and subscriber-side objects that sit
//! between the session engine and the application.

mod announces;
mod common;
mod fetch;
mod full_name;
mod metrics;
mod object;
mod publisher;
mod subscriber;

pub use announces::*;
pub use common::*;
pub use fetch::*;
pub use full_name::*;
pub use metrics::*;
pub use object::*;
pub use publisher::*;
pub use subscriber::*;

/// A handler of any direction, dispatched on by the session engine.
#[derive(Debug)]
pub enum TrackHandler {
    Publish(PublishTrackHandler),
    PublishFetch(PublishFetchHandler),
    Subscribe(SubscribeTrackHandler),
    JoiningFetch(JoiningFetchHandler),
}

impl TrackHandler {
    pub fn common(&self) -> &TrackCommon {
        match self {
            Self::Publish(h) => &h.common,
            Self::PublishFetch(h) => &h.publisher.common,
            Self::Subscribe(h) => &h.common,
            Self::JoiningFetch(h) => &h.handler.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut TrackCommon {
        match self {
            Self::Publish(h) => &mut h.common,
            Self::PublishFetch(h) => &mut h.publisher.common,
            Self::Subscribe(h) => &mut h.common,
            Self::JoiningFetch(h) => &mut h.handler.common,
        }
    }

    pub fn set_status(&mut self, status: HandlerStatus) {
        self.common_mut().status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{FilterType, GroupOrder};

    #[test]
    fn dispatch_by_tag() {
        let name = FullTrackName::from_utf8("test/path", "video");

        let mut handlers = vec![
            TrackHandler::Publish(PublishTrackHandler::new(
                name.clone(),
                TrackMode::StreamPerGroup,
                64,
                2000,
            )),
            TrackHandler::PublishFetch(PublishFetchHandler::new(
                name.clone(),
                64,
                9,
                GroupOrder::Ascending,
                2000,
            )),
            TrackHandler::Subscribe(SubscribeTrackHandler::new(
                name.clone(),
                127,
                GroupOrder::Publisher,
                FilterType::LatestObject,
            )),
        ];

        for handler in &mut handlers {
            assert_eq!(handler.common().full_track_name.namespace, name.namespace);
            handler.set_status(HandlerStatus::Ok);
            assert_eq!(handler.common().status, HandlerStatus::Ok);
        }
    }
}
