//! Strongly typed identifiers shared across the engine.
//!
//! Trip points are addressed by opaque string identifiers while transit graph
//! vertices and edges use dense numeric identifiers.
//!
//! # Examples
//! ```
//! use wayfarer_core::{GeoPointId, PointId};
//!
//! let point = PointId::from("museum");
//! assert_eq!(point.as_str(), "museum");
//! assert_eq!(GeoPointId::new(7).get(), 7);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw identifier.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a trip point.
    PointId
);

string_id!(
    /// Identifier of a trip.
    TripId
);

numeric_id!(
    /// Identifier of a transit graph vertex.
    GeoPointId
);

numeric_id!(
    /// Identifier of an original transit graph edge.
    EdgeId
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn string_ids_display_raw_value() {
        assert_eq!(PointId::from("a").to_string(), "a");
        assert_eq!(TripId::new(String::from("t-1")).to_string(), "t-1");
    }

    #[rstest]
    fn numeric_ids_order_by_value() {
        assert!(GeoPointId::new(1) < GeoPointId::new(2));
        assert_eq!(EdgeId::from(9).get(), 9);
    }
}
