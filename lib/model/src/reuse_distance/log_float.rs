// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::iter::Sum;
use std::ops::{Add, Mul};

/// Non-negative real stored as its natural logarithm.
///
/// Binomial coefficients for rows in the tens of thousands have thousands of
/// decimal digits while the matching probability powers underflow `f64`. In the
/// log domain both stay representable and their product lands back in range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct LogFloat {
    ln: f64,
}

impl LogFloat {
    pub const ZERO: Self = Self {
        ln: f64::NEG_INFINITY,
    };
    pub const ONE: Self = Self { ln: 0.0 };

    /// Negative and NaN inputs clamp to zero.
    pub fn from_f64(value: f64) -> Self {
        if value > 0.0 {
            Self { ln: value.ln() }
        } else {
            Self::ZERO
        }
    }

    pub fn from_ln(ln: f64) -> Self {
        Self { ln }
    }

    pub fn ln(self) -> f64 {
        self.ln
    }

    pub fn is_zero(self) -> bool {
        self.ln == f64::NEG_INFINITY
    }

    /// Back to `f64`; underflows to 0.0 and overflows to infinity.
    pub fn to_f64(self) -> f64 {
        self.ln.exp()
    }

    /// `self^exp`, with `0^0 == 1`.
    pub fn powu(self, exp: u64) -> Self {
        if exp == 0 {
            Self::ONE
        } else if self.is_zero() {
            Self::ZERO
        } else {
            Self {
                ln: self.ln * exp as f64,
            }
        }
    }
}

impl Add for LogFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (hi, lo) = if self.ln >= rhs.ln {
            (self, rhs)
        } else {
            (rhs, self)
        };
        if lo.is_zero() {
            return hi;
        }
        Self {
            ln: hi.ln + (lo.ln - hi.ln).exp().ln_1p(),
        }
    }
}

impl Mul for LogFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::ZERO;
        }
        Self {
            ln: self.ln + rhs.ln,
        }
    }
}

impl Sum for LogFloat {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_arithmetic_matches_f64() {
        let a = LogFloat::from_f64(3.5);
        let b = LogFloat::from_f64(0.25);
        assert!(close((a + b).to_f64(), 3.75));
        assert!(close((a * b).to_f64(), 0.875));
        assert!(close(b.powu(3).to_f64(), 0.015625));
    }

    #[test]
    fn test_zero_identities() {
        let x = LogFloat::from_f64(7.0);
        assert_eq!(x + LogFloat::ZERO, x);
        assert_eq!(LogFloat::ZERO + x, x);
        assert!((x * LogFloat::ZERO).is_zero());
        assert_eq!(LogFloat::ZERO.powu(0), LogFloat::ONE);
        assert!(LogFloat::ZERO.powu(5).is_zero());
        assert!(LogFloat::from_f64(-1.0).is_zero());
        assert!(LogFloat::from_f64(f64::NAN).is_zero());
    }

    #[test]
    fn test_out_of_f64_range() {
        // 2^5000 * 2^-5000
        let big = LogFloat::from_f64(2.0).powu(5000);
        let tiny = LogFloat::from_f64(0.5).powu(5000);
        assert!(big.to_f64().is_infinite());
        assert_eq!(tiny.to_f64(), 0.0);
        assert!(close((big * tiny).to_f64(), 1.0));
        assert!(close((big + big).ln(), big.ln() + 2f64.ln()));
    }

    #[test]
    fn test_sum() {
        let total: LogFloat = (1..=4).map(|v| LogFloat::from_f64(v as f64)).sum();
        assert!(close(total.to_f64(), 10.0));
    }
}
