use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Numeric Type System
// ============================================================================

/// Numbers as the structured-text notation models them: 64-bit integers with
/// an IEEE double fallback. Arithmetic stays in `Int` while the result is
/// exactly representable and promotes to `Float` otherwise.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    let sign = if *x > 0.0 { "Infinity" } else { "-Infinity" };
                    write!(f, "{sign}")
                } else {
                    write!(f, "{x}")
                }
            }
        }
    }
}

// ============================================================================
// Equality and Comparison
// ============================================================================

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        use Number::*;

        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) => (*a as f64) == *b,
            (Float(a), Int(b)) => *a == (*b as f64),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Number::*;

        match (self, other) {
            (Int(a), Int(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
        }
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Number {
    /// Convert to float (may lose precision above 2^53).
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Float(x) => *x,
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Number::Float(x) if x.is_nan())
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(x) => x.is_finite(),
        }
    }

    /// Zero and NaN are the falsy numbers.
    pub fn is_truthy(&self) -> bool {
        match self {
            Number::Int(n) => *n != 0,
            Number::Float(x) => *x != 0.0 && !x.is_nan(),
        }
    }

    pub fn add(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(*b) {
                Some(n) => Number::Int(n),
                None => Number::Float(*a as f64 + *b as f64),
            },
            _ => Number::Float(self.to_f64() + other.to_f64()),
        }
    }

    pub fn sub(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_sub(*b) {
                Some(n) => Number::Int(n),
                None => Number::Float(*a as f64 - *b as f64),
            },
            _ => Number::Float(self.to_f64() - other.to_f64()),
        }
    }

    pub fn mul(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(*b) {
                Some(n) => Number::Int(n),
                None => Number::Float(*a as f64 * *b as f64),
            },
            _ => Number::Float(self.to_f64() * other.to_f64()),
        }
    }

    /// Division stays integral only when it divides exactly; otherwise the
    /// result follows IEEE semantics, including division by zero.
    pub fn div(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if *b != 0 && a % b == 0 => Number::Int(a / b),
            _ => Number::Float(self.to_f64() / other.to_f64()),
        }
    }

    pub fn rem(&self, other: &Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if *b != 0 => Number::Int(a % b),
            _ => Number::Float(self.to_f64() % other.to_f64()),
        }
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Int(n) => match n.checked_neg() {
                Some(m) => Number::Int(m),
                None => Number::Float(-(*n as f64)),
            },
            Number::Float(x) => Number::Float(-x),
        }
    }

    /// Largest integer not greater than the value, as an `i64`. NaN and
    /// values outside the `i64` range clamp to zero and the range bounds
    /// respectively.
    pub fn floor_i64(&self) -> i64 {
        match self {
            Number::Int(n) => *n,
            Number::Float(x) => {
                if x.is_nan() {
                    0
                } else {
                    x.floor() as i64
                }
            }
        }
    }

    /// 32-bit signed conversion used by the bitwise operators: truncate,
    /// then wrap modulo 2^32.
    pub fn to_i32(&self) -> i32 {
        self.to_u32() as i32
    }

    /// 32-bit unsigned conversion used by the unsigned shift operator.
    pub fn to_u32(&self) -> u32 {
        let x = self.to_f64();
        if !x.is_finite() {
            return 0;
        }
        let m = x.trunc() % 4_294_967_296.0;
        let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
        m as u64 as u32
    }
}

// ============================================================================
// Tests
// ============================================================================
