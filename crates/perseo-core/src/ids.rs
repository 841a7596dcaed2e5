//! Newtype index wrappers.
//!
//! Every cross-reference in the simulator (population, neuron, connectivity
//! entry, delay layer) is by index, never by pointer, so each gets its own
//! newtype to keep the indices from being accidentally interchanged.

use std::fmt;

macro_rules! index_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Wraps a raw index.
            pub fn new(raw: u32) -> Self {
                $name(raw)
            }

            /// Returns the raw index.
            pub fn raw(self) -> u32 {
                self.0
            }

            /// Returns the index as `usize` for slice indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl From<usize> for $name {
            fn from(raw: usize) -> Self {
                $name(raw as u32)
            }
        }
    };
}

index_id!(PopulationId, "Identifies a population among the configured set.");
index_id!(NeuronId, "Identifies a neuron, global across all populations.");
index_id!(ConnectivityId, "Identifies a (post population, pre population) connectivity entry.");
index_id!(DelayLayerId, "Identifies one of the `L` discrete delay layers.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        let id = NeuronId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42usize);
    }

    #[test]
    fn displays_as_raw_number() {
        assert_eq!(format!("{}", PopulationId::new(3)), "3");
    }
}
