//! Opaque ID newtypes for clock graph entities.
//!
//! [`SynthesizerId`] is a thin `u32` wrapper handed out in allocation order,
//! so the same composition always produces the same ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one synthesizer (PLL/MMCM) instance within a clock graph.
    SynthesizerId,
    "pll"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(SynthesizerId::from_raw(3).as_raw(), 3);
    }

    #[test]
    fn display_prefix() {
        assert_eq!(SynthesizerId::from_raw(1).to_string(), "pll1");
    }

    #[test]
    fn ordered_by_allocation() {
        let set: BTreeSet<_> = [2, 0, 1].into_iter().map(SynthesizerId::from_raw).collect();
        let raw: Vec<u32> = set.into_iter().map(SynthesizerId::as_raw).collect();
        assert_eq!(raw, vec![0, 1, 2]);
    }

    #[test]
    fn serde_roundtrip() {
        let id = SynthesizerId::from_raw(9);
        let json = serde_json::to_string(&id).unwrap();
        let back: SynthesizerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
