//! The `Slot` and `Epoch` types are defined as new types over u64 to enforce type-safety between
//! the two types.
//!
//! `Slot` and `Epoch` have implementations which permit conversion, comparison and math operations
//! between each and `u64`, however specifically not between each other.
//!
//! All math operations on `Slot` and `Epoch` are saturating, they never wrap. Use the `safe_*`
//! methods where an overflow must be reported rather than clamped.
use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Rem, Sub, SubAssign};
use tree_hash::{PackedEncoding, TreeHash};

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(#[serde(with = "serde_utils::quoted_u64")] u64);

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

macro_rules! impl_common {
    ($main: ident) => {
        impl $main {
            pub const fn new(n: u64) -> $main {
                $main(n)
            }

            pub const fn max_value() -> $main {
                $main(u64::MAX)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

        }

        impl SafeArith<u64> for $main {
            const ZERO: Self = $main(0);
            const ONE: Self = $main(1);

            fn safe_add(&self, other: u64) -> safe_arith::Result<Self> {
                self.0.checked_add(other).map($main).ok_or(ArithError::Overflow)
            }

            fn safe_sub(&self, other: u64) -> safe_arith::Result<Self> {
                self.0.checked_sub(other).map($main).ok_or(ArithError::Overflow)
            }

            fn safe_mul(&self, other: u64) -> safe_arith::Result<Self> {
                self.0.checked_mul(other).map($main).ok_or(ArithError::Overflow)
            }

            fn safe_div(&self, other: u64) -> safe_arith::Result<Self> {
                self.0
                    .checked_div(other)
                    .map($main)
                    .ok_or(ArithError::DivisionByZero)
            }

            fn safe_rem(&self, other: u64) -> safe_arith::Result<Self> {
                self.0
                    .checked_rem(other)
                    .map($main)
                    .ok_or(ArithError::DivisionByZero)
            }

            fn safe_shl(&self, other: u32) -> safe_arith::Result<Self> {
                self.0.checked_shl(other).map($main).ok_or(ArithError::Overflow)
            }

            fn safe_shr(&self, other: u32) -> safe_arith::Result<Self> {
                self.0.checked_shr(other).map($main).ok_or(ArithError::Overflow)
            }
        }

        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(value: $main) -> u64 {
                value.0
            }
        }

        impl PartialEq<u64> for $main {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $main {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                Some(self.0.cmp(other))
            }
        }

        impl Add<u64> for $main {
            type Output = $main;

            fn add(self, other: u64) -> $main {
                $main(self.0.saturating_add(other))
            }
        }

        impl AddAssign<u64> for $main {
            fn add_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_add(other);
            }
        }

        impl Sub<u64> for $main {
            type Output = $main;

            fn sub(self, other: u64) -> $main {
                $main(self.0.saturating_sub(other))
            }
        }

        impl SubAssign<u64> for $main {
            fn sub_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_sub(other);
            }
        }

        impl Rem<u64> for $main {
            type Output = $main;

            fn rem(self, modulus: u64) -> $main {
                $main(self.0 % modulus)
            }
        }

        impl TreeHash for $main {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }

        impl fmt::Display for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($main), self.0)
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch(self.0.checked_div(slots_per_epoch).unwrap_or(0))
    }
}

impl Epoch {
    /// The first slot in the epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// The last slot in the epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_mul(slots_per_epoch)
                .saturating_add(slots_per_epoch.saturating_sub(1)),
        )
    }
}
