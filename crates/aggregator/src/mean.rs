//! Overflow-safe incremental mean over 256-bit words.
//!
//! The mean is updated per value as `m := m + (v - m) / (k + 1)` instead of
//! summing everything first, so no intermediate ever leaves the 256-bit
//! domain. The part of each update lost to integer division is carried in
//! `remainder` (always below the count), which keeps `m` equal to the
//! floor of the true mean: `16, 17, 18` gives `17`, and three `U256::MAX`
//! give `U256::MAX`.

use concord_core::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningMean {
    mean: U256,
    /// Invariant: `sum == mean * count + remainder` and `remainder < count`
    /// (or zero when empty).
    remainder: U256,
    count: u64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: U256) {
        let n = U256::from(self.count + 1);

        if value >= self.mean {
            let delta = value - self.mean;
            let mut step = delta / n;
            // Both terms are below n, so this cannot overflow.
            let carried = delta % n + self.remainder;
            step += carried / n;
            self.remainder = carried % n;
            self.mean += step;
        } else {
            let delta = self.mean - value;
            if self.remainder >= delta {
                self.remainder -= delta;
            } else {
                let deficit = delta - self.remainder;
                let mut step = deficit / n;
                let partial = deficit % n;
                if partial.is_zero() {
                    self.remainder = U256::zero();
                } else {
                    step += U256::one();
                    self.remainder = n - partial;
                }
                self.mean -= step;
            }
        }

        self.count += 1;
    }

    /// Floor of the mean of everything pushed so far; zero when empty.
    pub fn value(&self) -> U256 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
