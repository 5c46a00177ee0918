use bytes::Bytes;

/// An opaque payload keyed by a topic name.
///
/// The bus never interprets `payload` — it's stored and replayed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Box<str>,
    pub payload: Bytes,
}

impl Message {
    pub fn new(key: impl Into<Box<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }
}
