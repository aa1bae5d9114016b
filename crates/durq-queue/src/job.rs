//! Job definition and payload encoding.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error returned by a payload codec.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Store-assigned job identifier.
///
/// Ids are handed out by the store at insert time, increase monotonically
/// and are never reused, so ascending id order is FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Wrap a raw row id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job<P> {
    /// Store-assigned id.
    pub id: JobId,
    /// Caller payload.
    pub payload: P,
}

impl<P> Job<P> {
    /// Create a job from its parts.
    pub fn new(id: JobId, payload: P) -> Self {
        Self { id, payload }
    }
}

/// Text encoding of a job payload.
///
/// Payload searches compare encoded text, so `encode` must be deterministic:
/// equal payloads have to produce identical strings.
pub trait JobPayload: Clone + Send + Sync + 'static {
    /// Encode the payload for storage.
    fn encode(&self) -> Result<String, CodecError>;

    /// Decode a stored payload.
    fn decode(raw: &str) -> Result<Self, CodecError>;
}

impl<T> JobPayload for T
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(raw: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Email {
        to: String,
        subject: String,
    }

    #[test]
    fn test_job_id_order() {
        assert!(JobId::new(1) < JobId::new(2));
        assert_eq!(JobId::from(7).get(), 7);
        assert_eq!(JobId::new(12).to_string(), "12");
    }

    #[test]
    fn test_struct_payload() {
        let email = Email {
            to: "ops@example.com".to_string(),
            subject: "disk full".to_string(),
        };
        let raw = email.encode().unwrap();
        assert_eq!(Email::decode(&raw).unwrap(), email);
    }

    #[test]
    fn test_object_keys_encode_deterministically() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(Email::decode("{not json").is_err());
        assert!(Email::decode(r#"{"to": "x"}"#).is_err());
    }

    #[test]
    fn test_unrepresentable_payload() {
        let mut map: HashMap<(u8, u8), u8> = HashMap::new();
        map.insert((1, 2), 3);
        assert!(map.encode().is_err());
    }

    #[test]
    fn test_job_serializes_flat_id() {
        let job = Job::new(JobId::new(3), "X".to_string());
        assert_eq!(serde_json::to_value(&job).unwrap(), json!({"id": 3, "payload": "X"}));
    }
}
