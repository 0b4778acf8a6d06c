//! Fixed-point numbers scaled by SCALE_FACTOR (10^7).
//!
//! Every operation truncates toward zero, the same way integer division
//! does, so payouts are bit-exact and never round up past the escrow.

use crate::error::BracketError;
use crate::storage::SCALE_FACTOR;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub struct Fixed(i128);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(SCALE_FACTOR);

    pub const fn from_raw(raw: i128) -> Self {
        Fixed(raw)
    }

    pub const fn raw(self) -> i128 {
        self.0
    }

    pub fn from_int(value: i128) -> Result<Self, BracketError> {
        value
            .checked_mul(SCALE_FACTOR)
            .map(Fixed)
            .ok_or(BracketError::Overflow)
    }

    /// `numerator / denominator` as a fixed-point value.
    pub fn ratio(numerator: i128, denominator: i128) -> Result<Self, BracketError> {
        Fixed(numerator).checked_div(Fixed(denominator))
    }

    pub fn checked_add(self, other: Fixed) -> Result<Self, BracketError> {
        self.0
            .checked_add(other.0)
            .map(Fixed)
            .ok_or(BracketError::Overflow)
    }

    pub fn checked_sub(self, other: Fixed) -> Result<Self, BracketError> {
        self.0
            .checked_sub(other.0)
            .map(Fixed)
            .ok_or(BracketError::Overflow)
    }

    pub fn checked_div(self, other: Fixed) -> Result<Self, BracketError> {
        self.0
            .checked_mul(SCALE_FACTOR)
            .ok_or(BracketError::Overflow)?
            .checked_div(other.0)
            .map(Fixed)
            .ok_or(BracketError::Overflow)
    }

    /// Portion above 1.0, zero for multipliers at or below baseline.
    pub fn excess(self) -> Fixed {
        if self.0 > SCALE_FACTOR {
            Fixed(self.0 - SCALE_FACTOR)
        } else {
            Fixed::ZERO
        }
    }
}
