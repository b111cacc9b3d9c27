// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(
    clippy::arithmetic_side_effects,
    clippy::float_cmp,
    clippy::as_conversions,
    clippy::pattern_type_mismatch
)]

use core::cmp::Ordering;
use core::fmt::{Debug, Formatter};
use core::str::FromStr;

use anyhow::{bail, Result};
use serde::ser::Serializer;
use serde::Serialize;

// Largest magnitude at which every integer is exactly representable in f64 (2^53).
const F64_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Numeric scalar of the expression language.
///
/// Whole numbers are kept as `i64` so that counters and scores survive
/// round-trips through JSON without picking up a fractional part. Arithmetic
/// that overflows `i64`, or that involves a fractional operand, is carried
/// out in `f64`.
#[derive(Clone)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Collapses a float back into `Int` when it holds an exact integer.
    pub(crate) fn normalize_float(value: f64) -> Number {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= F64_SAFE_INTEGER {
            let candidate = value as i64;
            if (candidate as f64) == value {
                return Number::Int(candidate);
            }
        }
        Number::Float(value)
    }

    fn to_f64_lossy(&self) -> f64 {
        match self {
            Number::Int(v) => *v as f64,
            Number::Float(v) => *v,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Number::Int(0) => true,
            Number::Float(f) => *f == 0.0,
            _ => false,
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Number::Int(v) => serializer.serialize_i64(*v),
            Number::Float(f) if !f.is_finite() => serializer.serialize_unit(),
            Number::Float(f) => {
                if let Number::Int(v) = Number::normalize_float(*f) {
                    serializer.serialize_i64(v)
                } else {
                    serializer.serialize_f64(*f)
                }
            }
        }
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Number::Int(v),
            Err(_) => Number::Float(value as f64),
        }
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from(value as u64)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseNumberError;

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseNumberError);
        }

        let normalized = if let Some(rest) = trimmed.strip_prefix("-.") {
            format!("-0.{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("+.") {
            format!("+0.{rest}")
        } else if let Some(rest) = trimmed.strip_prefix('.') {
            format!("0.{rest}")
        } else {
            trimmed.to_string()
        };

        let normalized_ref = normalized.as_str();
        let is_integer_literal = !normalized_ref.contains('.')
            && !normalized_ref.contains('e')
            && !normalized_ref.contains('E');

        if is_integer_literal {
            if let Ok(v) = normalized_ref
                .strip_prefix('+')
                .unwrap_or(normalized_ref)
                .parse::<i64>()
            {
                return Ok(Number::Int(v));
            }
        }

        normalized_ref
            .parse::<f64>()
            .map(Number::normalize_float)
            .map_err(|_| ParseNumberError)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            return a == b;
        }

        let a = self.to_f64_lossy();
        let b = other.to_f64_lossy();
        if a.is_nan() || b.is_nan() {
            return false;
        }
        a == b
    }
}

impl Eq for Number {}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            return a.cmp(b);
        }

        self.to_f64_lossy()
            .partial_cmp(&other.to_f64_lossy())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Number {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(*v),
            Number::Float(f) => {
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f <= i64::MAX as f64
                {
                    let candidate = *f as i64;
                    if (candidate as f64) == *f {
                        return Some(candidate);
                    }
                }
                None
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.to_f64_lossy()
    }

    pub fn is_integer(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    pub fn add(&self, rhs: &Self) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(*b) {
                Some(sum) => Ok(Number::Int(sum)),
                None => Ok(Number::normalize_float(*a as f64 + *b as f64)),
            },
            _ => Ok(Number::normalize_float(
                self.to_f64_lossy() + rhs.to_f64_lossy(),
            )),
        }
    }

    pub fn sub(&self, rhs: &Self) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_sub(*b) {
                Some(diff) => Ok(Number::Int(diff)),
                None => Ok(Number::normalize_float(*a as f64 - *b as f64)),
            },
            _ => Ok(Number::normalize_float(
                self.to_f64_lossy() - rhs.to_f64_lossy(),
            )),
        }
    }

    pub fn mul(&self, rhs: &Self) -> Result<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(*b) {
                Some(prod) => Ok(Number::Int(prod)),
                None => Ok(Number::normalize_float(*a as f64 * *b as f64)),
            },
            _ => Ok(Number::normalize_float(
                self.to_f64_lossy() * rhs.to_f64_lossy(),
            )),
        }
    }

    pub fn divide(&self, rhs: &Self) -> Result<Number> {
        if rhs.is_zero() {
            bail!("division by zero");
        }

        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match (a.checked_div(*b), a.checked_rem(*b)) {
                (Some(quotient), Some(0)) => Ok(Number::Int(quotient)),
                _ => Ok(Number::normalize_float(*a as f64 / *b as f64)),
            },
            _ => Ok(Number::normalize_float(
                self.to_f64_lossy() / rhs.to_f64_lossy(),
            )),
        }
    }

    pub fn modulo(&self, rhs: &Self) -> Result<Number> {
        if rhs.is_zero() {
            bail!("modulo by zero");
        }

        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_rem(*b) {
                Some(rem) => Ok(Number::Int(rem)),
                None => Ok(Number::normalize_float(*a as f64 % *b as f64)),
            },
            _ => Ok(Number::normalize_float(
                self.to_f64_lossy() % rhs.to_f64_lossy(),
            )),
        }
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Int(v) => match v.checked_neg() {
                Some(n) => Number::Int(n),
                None => Number::normalize_float(-(*v as f64)),
            },
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub fn truncate(&self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(*v),
            Number::Float(f) if f.is_finite() => {
                let t = f.trunc();
                if t.abs() <= F64_SAFE_INTEGER {
                    Some(t as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn format_decimal(&self) -> String {
        match self {
            Number::Int(v) => v.to_string(),
            Number::Float(f) => {
                if let Number::Int(v) = Number::normalize_float(*f) {
                    v.to_string()
                } else {
                    f.to_string()
                }
            }
        }
    }
}
