//! Strongly typed record identifiers.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw integer identifier.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw integer identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

record_id! {
    /// Identifier of a [`Location`](crate::Location) in the graph.
    ///
    /// # Examples
    /// ```
    /// use dispatch_core::LocationId;
    ///
    /// let id: LocationId = "7".parse().expect("numeric id");
    /// assert_eq!(id.get(), 7);
    /// ```
    LocationId
}

record_id! {
    /// Identifier of an [`Order`](crate::Order).
    OrderId
}

record_id! {
    /// Identifier of a [`Driver`](crate::Driver).
    DriverId
}
