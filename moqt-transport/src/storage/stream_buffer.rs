use bytes::{Buf, Bytes};

use crate::coding::{Decode, DecodeError};

use super::DataStorage;

/// Framing buffer for one unidirectional stream.
///
/// Bytes arrive in arbitrary chunks; [`StreamBuffer::try_decode`] attempts a
/// typed parse against the unread bytes. On truncation the cursor does not
/// move and the caller retries once more data is pushed. Any other codec
/// error poisons the buffer: further parse attempts fail until an explicit
/// [`StreamBuffer::clear`].
///
/// `S` is the slot for the in-progress parse state of the stream, owned by
/// the caller (typically a tagged "what do I expect next" variant).
#[derive(Default, Debug)]
pub struct StreamBuffer<S = ()> {
    storage: DataStorage,

    /// Absolute offset of the first unread byte.
    read: u64,

    poisoned: bool,

    slot: S,
}

impl<S: Default> StreamBuffer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all buffered bytes and parse state, clearing any poison.
    pub fn clear(&mut self) {
        self.storage = DataStorage::new();
        self.read = 0;
        self.poisoned = false;
        self.slot = S::default();
    }

    /// Install a fresh default parse state.
    pub fn reset_slot(&mut self) {
        self.slot = S::default();
    }
}

impl<S> StreamBuffer<S> {
    pub fn push<B: Into<Bytes>>(&mut self, data: B) {
        self.storage.push(data);
    }

    /// Unread byte count.
    pub fn size(&self) -> usize {
        (self.storage.end_offset() - self.read) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut S {
        &mut self.slot
    }

    pub fn set_slot(&mut self, slot: S) {
        self.slot = slot;
    }

    /// Attempt to parse a `T` from the unread bytes.
    ///
    /// Returns `Ok(Some(..))` and consumes exactly the parsed bytes on
    /// success, `Ok(None)` without consuming anything on truncation, and
    /// `Err` (poisoning the buffer) on any other codec failure.
    pub fn try_decode<T: Decode>(&mut self) -> Result<Option<T>, DecodeError> {
        if self.poisoned {
            return Err(DecodeError::InvalidContents(
                "stream buffer poisoned".to_string(),
            ));
        }

        let mut reader = self.storage.reader(self.read);
        match T::decode(&mut reader) {
            Ok(value) => {
                self.read = reader.position();
                self.compact();
                Ok(Some(value))
            }
            Err(DecodeError::More(_)) => Ok(None),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Take exactly `len` raw bytes if buffered, without any framing.
    pub fn try_read(&mut self, len: usize) -> Option<Vec<u8>> {
        if self.poisoned || self.size() < len {
            return None;
        }

        let mut reader = self.storage.reader(self.read);
        let mut buf = vec![0; len];
        reader.copy_to_slice(&mut buf);
        self.read = reader.position();
        self.compact();
        Some(buf)
    }

    /// Release fully-consumed chunks back to the allocator.
    fn compact(&mut self) {
        let consumed = (self.read - self.storage.front_offset()) as usize;
        self.storage.erase_front(consumed);
    }
}
