use crate::coding::{hash_bytes, TrackNamespace};

/// The full name of a track: namespace tuple plus name bytes.
///
/// The track alias is assigned by the session once the track is active and
/// becomes the wire handle for objects on this track.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FullTrackName {
    pub namespace: TrackNamespace,
    pub name: Vec<u8>,
    pub track_alias: Option<u64>,
}

impl FullTrackName {
    pub fn new(namespace: TrackNamespace, name: Vec<u8>) -> Self {
        Self {
            namespace,
            name,
            track_alias: None,
        }
    }

    pub fn from_utf8(namespace_path: &str, name: &str) -> Self {
        Self::new(
            TrackNamespace::from_utf8_path(namespace_path),
            name.as_bytes().to_vec(),
        )
    }

    pub fn name_utf8(&self) -> String {
        String::from_utf8_lossy(&self.name).to_string()
    }
}

/// Derived hashes of a full track name, used as table keys by the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrackHash {
    /// 64bit hash of the namespace tuple.
    pub track_namespace_hash: u64,

    /// 64bit hash of the name bytes.
    pub track_name_hash: u64,

    /// 62bit combined hash of namespace+name, safe to carry in a varint.
    pub track_fullname_hash: u64,
}

impl TrackHash {
    pub fn new(ftn: &FullTrackName) -> Self {
        let track_namespace_hash = ftn.namespace.hash_value();
        let track_name_hash = hash_bytes(&ftn.name);

        // Combine and strip to 62 bits for uintvar-sized handles.
        let track_fullname_hash =
            (track_namespace_hash ^ (track_name_hash << 1)) << 1 >> 2;

        Self {
            track_namespace_hash,
            track_name_hash,
            track_fullname_hash,
        }
    }
}

impl From<&FullTrackName> for TrackHash {
    fn from(ftn: &FullTrackName) -> Self {
        Self::new(ftn)
    }
}
