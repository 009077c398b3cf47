use rand::RngCore;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::num::ParseIntError;

// Each call site gets its own small CSPRNG rather than locking a shared
// generator; this mirrors the thread-local RNG used for span/trace ids.
thread_local! {
    static RNG: RefCell<rand::rngs::SmallRng> = RefCell::new(rand::SeedableRng::from_os_rng());
}

fn random_u128() -> u128 {
    RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        let low = rng.next_u64() as u128;
        let high = rng.next_u64() as u128;
        low | (high << 64)
    })
}

fn random_u64() -> u64 {
    RNG.with(|rng| rng.borrow_mut().next_u64())
}

macro_rules! hex128 {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u128);

        impl $name {
            /// The all-zero identifier. Never produced by [`Self::new`]; used as a sentinel.
            pub const INVALID: $name = $name(0);

            /// Construct from a raw 128-bit value.
            pub const fn from_u128(value: u128) -> Self {
                $name(value)
            }

            /// The raw 128-bit value.
            pub const fn as_u128(self) -> u128 {
                self.0
            }

            /// Construct from a big-endian byte array.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                $name(u128::from_be_bytes(bytes))
            }

            /// Big-endian byte representation.
            pub const fn to_bytes(self) -> [u8; 16] {
                self.0.to_be_bytes()
            }

            /// Parse 32 lowercase or uppercase hex characters (no separators, no prefix).
            pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
                u128::from_str_radix(hex, 16).map($name)
            }

            pub fn is_nil(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:032x}", self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:032x}", self.0)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }

        impl Serialize for $name {
            /// Wire form: the 32-hex-character string, same as [`fmt::Display`].
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(self)
            }
        }
    };
}

hex128!(
    EventId,
    "128-bit event/trace identifier, wire-encoded as 32 lowercase hex characters."
);
hex128!(CheckInId, "128-bit monitor check-in identifier.");
hex128!(SessionId, "128-bit session identifier.");

impl EventId {
    /// Generate a new identifier from the process CSPRNG with the version
    /// and variant bits of a v4 UUID set, so it remains a valid UUID when
    /// rendered with dashes even though the wire format never adds them.
    pub fn new() -> Self {
        let mut bytes = random_u128().to_be_bytes();
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        EventId(u128::from_be_bytes(bytes))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckInId {
    pub fn new() -> Self {
        CheckInId(random_u128())
    }
}

impl Default for CheckInId {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionId {
    pub fn new() -> Self {
        SessionId(random_u128())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// 64-bit span identifier, wire-encoded as 16 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    pub const INVALID: SpanId = SpanId(0);

    pub fn new() -> Self {
        SpanId(random_u64())
    }

    pub const fn from_u64(value: u64) -> Self {
        SpanId(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(u64::from_be_bytes(bytes))
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }

    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Serialize for SpanId {
    /// Wire form: the 16-hex-character string, same as [`fmt::Display`].
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_round_trips_through_hex() {
        let id = EventId::new();
        let hex = format!("{id:032x}");
        assert_eq!(hex.len(), 32);
        assert_eq!(EventId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn event_id_has_v4_variant_bits() {
        let id = EventId::new();
        let bytes = id.to_bytes();
        assert_eq!(bytes[6] & 0xf0, 0x40);
        assert_eq!(bytes[8] & 0xc0, 0x80);
    }

    #[test]
    fn span_id_from_bytes_round_trips() {
        let bytes = [76, 114, 27, 243, 62, 60, 175, 143];
        let id = SpanId::from_bytes(bytes);
        assert_eq!(format!("{id}"), "4c721bf33e3caf8f");
        assert_eq!(id.to_bytes(), bytes);
    }

    #[test]
    fn span_id_from_hex_rejects_garbage() {
        assert!(SpanId::from_hex("not_hex").is_err());
    }

    #[test]
    fn new_identifiers_are_not_nil() {
        assert!(!EventId::new().is_nil());
        assert!(!SpanId::new().is_nil());
        assert!(!CheckInId::new().is_nil());
        assert!(!SessionId::new().is_nil());
    }
}
