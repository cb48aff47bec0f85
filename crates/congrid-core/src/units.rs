//! Strongly-typed quantities used throughout the harness. All units are
//! integer-backed; fractional intermediate values only appear in derived
//! metrics ([`crate::stats`]).

macro_rules! unit {
    ($name: ident, $suffix: literal) => {
        #[allow(missing_docs)]
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub const fn into_usize(self) -> usize {
                self.0 as usize
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }

            /// Multiplies by `factor`, rounding to the nearest whole unit.
            pub fn scale_by(self, factor: f64) -> Self {
                Self::new((self.0 as f64 * factor).round() as u64)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!("{}", $suffix), self.0)
            }
        }
    };
}

macro_rules! convert {
    ($from: ty => $to: ty, $factor: expr) => {
        impl From<$from> for $to {
            fn from(value: $from) -> Self {
                Self::new(value.into_u64() * $factor)
            }
        }
    };
}

unit!(Bytes, "B");

unit!(Packets, "p");

unit!(Nanosecs, "ns");
unit!(Microsecs, "us");
unit!(Millisecs, "ms");
unit!(Secs, "s");

convert!(Secs => Millisecs, 1_000);
convert!(Secs => Microsecs, 1_000_000);
convert!(Secs => Nanosecs, 1_000_000_000);
convert!(Millisecs => Microsecs, 1_000);
convert!(Millisecs => Nanosecs, 1_000_000);
convert!(Microsecs => Nanosecs, 1_000);

unit!(BitsPerSec, "bps");
unit!(Mbps, "Mbps");
unit!(Gbps, "Gbps");

convert!(Mbps => BitsPerSec, 1_000_000);
convert!(Gbps => BitsPerSec, 1_000_000_000);
convert!(Gbps => Mbps, 1_000);

impl Nanosecs {
    /// This quantity in seconds.
    pub fn into_secs_f64(self) -> f64 {
        self.into_f64() / 1e9
    }
}

impl BitsPerSec {
    /// The time taken to serialize `size` bytes onto a channel at this rate.
    pub fn length(self, size: Bytes) -> Nanosecs {
        if self == Self::ZERO {
            return Nanosecs::ZERO;
        }
        let secs = size.into_f64() * 8.0 / self.into_f64();
        Nanosecs::new((secs * 1e9).round() as u64)
    }
}
