/// Per-handler counters, sampled by the application or a relay.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrackMetrics {
    pub objects_published: u64,
    pub bytes_published: u64,
    pub stream_headers_sent: u64,
    pub publish_drops: u64,

    pub objects_received: u64,
    pub bytes_received: u64,
    /// Objects discarded for violating per-subgroup ordering.
    pub objects_dropped: u64,
}
