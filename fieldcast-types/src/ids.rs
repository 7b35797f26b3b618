//! Identifier types used throughout the FieldCast core.
//!
//! Object identifiers are time-ordered and lexicographically sortable: a
//! 48-bit millisecond timestamp followed by 80 bits of randomness that only
//! ever increases within one generator, rendered as 26 characters of
//! Crockford base32.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::unix_millis;
use crate::{Error, Result};

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Reverse lookup for [`ALPHABET`], accepting lower-case input. 0xFF marks an
/// invalid byte.
const DECODE: [u8; 256] = {
    let mut table = [0xFFu8; 256];
    let mut i = 0;
    while i < 32 {
        let c = ALPHABET[i];
        table[c as usize] = i as u8;
        if c.is_ascii_uppercase() {
            table[c.to_ascii_lowercase() as usize] = i as u8;
        }
        i += 1;
    }
    table
};

const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1 << RANDOM_BITS) - 1;
const TIMESTAMP_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// A 128-bit sortable identifier: 48-bit millisecond timestamp in the high
/// bits, 80 bits of per-generator monotonic randomness in the low bits.
///
/// The `Ord` impl and the rendered text sort identically, so identifiers
/// order by creation time across processes (within clock accuracy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ulid(u128);

impl Ulid {
    /// Length of the rendered text form.
    pub const ENCODED_LEN: usize = 26;

    /// Builds an identifier from a millisecond timestamp and a random
    /// component. Out-of-range bits are masked off.
    #[must_use]
    pub const fn from_parts(millis: u64, random: u128) -> Self {
        Self((((millis & TIMESTAMP_MASK) as u128) << RANDOM_BITS) | (random & RANDOM_MASK))
    }

    /// Returns the embedded millisecond timestamp.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        (self.0 >> RANDOM_BITS) as u64
    }

    /// Returns the raw 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Parses the 26-character text form. Accepts lower-case input.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != Self::ENCODED_LEN {
            return Err(Error::InvalidLength {
                expected: Self::ENCODED_LEN,
                got: bytes.len(),
            });
        }

        // 26 base32 digits carry 130 bits; the leading digit may only use 3.
        let first = DECODE[bytes[0] as usize];
        if first == 0xFF {
            return Err(Error::InvalidChar(bytes[0] as char));
        }
        if first > 7 {
            return Err(Error::Overflow);
        }

        let mut value: u128 = 0;
        for &b in bytes {
            let digit = DECODE[b as usize];
            if digit == 0xFF {
                return Err(Error::InvalidChar(b as char));
            }
            value = (value << 5) | u128::from(digit);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; Self::ENCODED_LEN];
        for (i, slot) in buf.iter_mut().enumerate() {
            let shift = 5 * (Self::ENCODED_LEN - 1 - i);
            *slot = ALPHABET[((self.0 >> shift) & 0x1F) as usize];
        }
        let rendered = std::str::from_utf8(&buf).map_err(|_| fmt::Error)?;
        f.write_str(rendered)
    }
}

impl FromStr for Ulid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Mints [`Ulid`]s that are strictly increasing for this generator instance.
///
/// Calls within the same millisecond (or after the clock steps backwards)
/// increment the previous random component instead of redrawing it, so the
/// produced sequence never ties or reorders. Fresh randomness is drawn every
/// time the clock advances. The generator carries no persisted state.
#[derive(Debug, Default)]
pub struct UlidGenerator {
    last_millis: u64,
    last_random: u128,
}

impl UlidGenerator {
    /// Creates a generator seeded from the process entropy source on first
    /// use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier, strictly greater than every identifier
    /// this generator has produced.
    pub fn generate(&mut self) -> Ulid {
        let now = unix_millis();
        if now > self.last_millis {
            self.last_millis = now;
            self.last_random = random_component();
        } else {
            self.last_random = (self.last_random + 1) & RANDOM_MASK;
            if self.last_random == 0 {
                // Random component exhausted within one millisecond; borrow
                // the next one.
                self.last_millis += 1;
                self.last_random = random_component();
            }
        }
        Ulid::from_parts(self.last_millis, self.last_random)
    }
}

fn random_component() -> u128 {
    use rand::RngCore;

    let mut bytes = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.into_iter().fold(0u128, |acc, b| (acc << 8) | u128::from(b))
}

/// Identifier of a replicated object: `<prefix>:<26-character sortable id>`.
///
/// The prefix names the object family (for example `user`); the suffix is a
/// [`Ulid`] minted by the process that first saved the object. The rendered
/// form is used verbatim as the store key and the wire identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObjectId {
    prefix: String,
    ulid: Ulid,
}

impl ObjectId {
    /// Mints a fresh identifier under `prefix`.
    #[must_use]
    pub fn generate(prefix: impl Into<String>, ids: &mut UlidGenerator) -> Self {
        Self {
            prefix: prefix.into(),
            ulid: ids.generate(),
        }
    }

    /// Rebuilds an identifier from its parts.
    #[must_use]
    pub fn from_parts(prefix: impl Into<String>, ulid: Ulid) -> Self {
        Self {
            prefix: prefix.into(),
            ulid,
        }
    }

    /// Parses the `<prefix>:<sortable-id>` rendered form.
    pub fn parse(s: &str) -> Result<Self> {
        let (prefix, suffix) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::MissingPrefix(s.to_string()))?;
        if prefix.is_empty() {
            return Err(Error::EmptyPrefix(s.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            ulid: Ulid::parse(suffix)?,
        })
    }

    /// Returns the object-family prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the sortable component.
    #[must_use]
    pub const fn ulid(&self) -> Ulid {
        self.ulid
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.ulid)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ObjectId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}
