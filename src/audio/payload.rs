//! Encoded speech audio as returned by the synthesis service.

use std::fmt;
use std::sync::Arc;

/// An immutable, cheaply clonable buffer of encoded audio (MP3 by default).
///
/// Cloning shares the underlying bytes, so the sequencer can hand a payload
/// to the player without copying it out of the shared session state.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload {
    bytes: Arc<[u8]>,
}

impl AudioPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for AudioPayload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for AudioPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioPayload({} bytes)", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_bytes() {
        let a = AudioPayload::new(vec![1u8, 2, 3]);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.as_bytes(), b.as_bytes()));
    }

    #[test]
    fn debug_hides_contents() {
        let payload = AudioPayload::from(vec![0u8; 42]);
        assert_eq!(format!("{payload:?}"), "AudioPayload(42 bytes)");
    }

    #[test]
    fn payload_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AudioPayload>();
    }
}
