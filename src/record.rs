//! Client record model and byte codec.
//!
//! Records are stored as a JSON byte encoding keyed by the external client
//! id. The id itself is never part of the encoded value; it is re-attached
//! when a record leaves the service.

use serde::{Deserialize, Serialize};

/// A client's stored profile plus a generated score.
///
/// Wire field names are the short forms used by the stored encoding
/// (`fname`, `lname`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "fname")]
    pub first_name: String,
    #[serde(rename = "lname")]
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub iban: String,
    pub ssn: String,
    pub email: String,
    /// Assigned at creation, uniform in [0, 1).
    pub score: f64,
}

impl ClientRecord {
    /// Encode the record for storage.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a stored record.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// A record as it leaves the service, with the store key attached.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: ClientRecord,
}
