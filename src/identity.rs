//! Task identities.
//!
//! Every task carries a UUIDv7 identity, persisted in one of two forms:
//!
//! - **long**: canonical hyphenated hex (`0192da75-c158-7d7f-be3c-d5b647bf7fa8`),
//!   stored in the `uuid` tag
//! - **short**: the 16 raw bytes as 22 characters of unpadded base64 over a
//!   URL-safe alphabet rotated to start at `t`, stored in the `id` tag
//!
//! The short alphabet never produces `+`, `/`, `=`, `:` or whitespace, so the
//! value survives a todo.txt `key:value` token unescaped.

use std::fmt;
use std::str::FromStr;

use base64::alphabet::Alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Length of the canonical hyphenated form.
pub const LONG_LEN: usize = 36;

/// Length of the short form for 16 bytes at 6 bits per character.
pub const SHORT_LEN: usize = 22;

const SHORT_ALPHABET: Alphabet =
    match Alphabet::new("tuvwxyz0123456789-_ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrs") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("short identity alphabet must be 64 unique printable characters"),
    };

const SHORT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &SHORT_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Textual form of an identity, detected from the shape of the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityForm {
    Short,
    Long,
}

impl IdentityForm {
    /// A 36-character string is long form; anything else is treated as short.
    pub fn detect(value: &str) -> Self {
        if value.len() == LONG_LEN {
            IdentityForm::Long
        } else {
            IdentityForm::Short
        }
    }

    /// Tag key the form is persisted under.
    pub fn tag(self) -> &'static str {
        match self {
            IdentityForm::Short => crate::task::TAG_ID,
            IdentityForm::Long => crate::task::TAG_UUID,
        }
    }
}

/// A 128-bit, time-ordered task identity.
///
/// Ordering follows the byte order of the underlying UUIDv7, which sorts by
/// creation time first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(Uuid);

impl Identity {
    /// Generate a new identity.
    ///
    /// Identities generated by one process are strictly increasing.
    pub fn new() -> Self {
        Identity(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Identity(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Canonical 36-character hyphenated hex form.
    pub fn encode_long(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// Compact 22-character form.
    pub fn encode_short(&self) -> String {
        SHORT_ENGINE.encode(self.0.as_bytes())
    }

    pub fn encode(&self, form: IdentityForm) -> String {
        match form {
            IdentityForm::Short => self.encode_short(),
            IdentityForm::Long => self.encode_long(),
        }
    }

    /// Decode either textual form.
    pub fn decode(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::InvalidIdentity("empty identity string".to_string()));
        }

        match IdentityForm::detect(value) {
            IdentityForm::Long => Uuid::parse_str(value).map(Identity).map_err(|err| {
                Error::InvalidIdentity(format!("'{value}' is not a hyphenated UUID: {err}"))
            }),
            IdentityForm::Short => {
                let bytes = SHORT_ENGINE.decode(value).map_err(|err| {
                    Error::InvalidIdentity(format!("'{value}' is not a short identity: {err}"))
                })?;
                let raw: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
                    Error::InvalidIdentity(format!(
                        "'{value}' decodes to {} bytes, expected 16",
                        bytes.len()
                    ))
                })?;
                Ok(Identity(Uuid::from_bytes(raw)))
            }
        }
    }

    /// Creation time embedded in the identity, if it is a time-based UUID.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Identity(uuid)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Identity::decode(s)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_short())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.encode_short())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Identity::decode(&raw).map_err(serde::de::Error::custom)
    }
}
