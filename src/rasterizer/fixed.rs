//! Fixed-point math and trigonometry tables
//!
//! The scanline rasterizer walks edges and spans with 16.16 integer
//! fixed-point deltas. Reducing the fractional width changes the banding at
//! triangle edges, so [`FIXED_SHIFT`] is not a tuning knob.
//!
//! Angles are integers in units of 1/[`ANGLE_PRECISION`] degree and wrap at
//! [`FULL_TURN`]. Sine and cosine come from tables generated at compile time.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::constants::{ANGLE_PRECISION, FIXED_SHIFT, FULL_TURN};

// =============================================================================
// 16.16 fixed-point
// =============================================================================

/// Fixed-point number in 16.16 format
/// - 16 integer bits (signed)
/// - 16 fractional bits (precision: 1/65536)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(pub i32);

const ONE_RAW: i32 = 1 << FIXED_SHIFT;
const FRAC_MASK: i32 = ONE_RAW - 1;

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(ONE_RAW);
    pub const HALF: Fixed = Fixed(ONE_RAW / 2);
    pub const MAX: Fixed = Fixed(i32::MAX);

    /// Create from integer
    #[inline]
    pub fn from_int(n: i32) -> Self {
        Fixed(n.wrapping_shl(FIXED_SHIFT))
    }

    /// Create from f32 (truncates toward zero, saturates at the i32 range)
    #[inline]
    pub fn from_f32(f: f32) -> Self {
        Fixed((f * ONE_RAW as f32) as i32)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / ONE_RAW as f32
    }

    /// Largest integer <= self
    #[inline]
    pub fn floor(self) -> i32 {
        self.0 >> FIXED_SHIFT
    }

    /// Smallest integer >= self
    #[inline]
    pub fn ceil(self) -> i32 {
        ((self.0 as i64 + FRAC_MASK as i64) >> FIXED_SHIFT) as i32
    }

    /// Fixed-point multiplication (16.16 * 16.16 -> 16.16)
    #[inline]
    pub fn mul_fixed(self, other: Self) -> Self {
        Fixed(((self.0 as i64 * other.0 as i64) >> FIXED_SHIFT) as i32)
    }

    /// Fixed-point division. Division by zero yields zero.
    #[inline]
    pub fn div_fixed(self, divisor: Self) -> Self {
        if divisor.0 == 0 {
            return Fixed::ZERO;
        }
        let q = ((self.0 as i64) << FIXED_SHIFT) / divisor.0 as i64;
        Fixed(q.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Per-step delta when moving from `self` to `end` in `steps` integer steps
    #[inline]
    pub fn delta_to(self, end: Self, steps: i32) -> Self {
        if steps == 0 {
            return Fixed::ZERO;
        }
        Fixed(((end.0 as i64 - self.0 as i64) / steps as i64) as i32)
    }
}

impl Add for Fixed {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Fixed(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Fixed {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Fixed(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Mul for Fixed {
    type Output = Self;
    #[inline]
    fn mul(self, other: Self) -> Self {
        self.mul_fixed(other)
    }
}

impl Neg for Fixed {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Fixed(self.0.wrapping_neg())
    }
}

// =============================================================================
// Sin/Cos/Tan lookup tables
// =============================================================================

/// Number of entries in each trig table (one per angle unit)
pub const TRIG_TABLE_SIZE: usize = FULL_TURN as usize;

/// Pre-computed sine table, index = angle in units
pub static SIN_TABLE: [f32; TRIG_TABLE_SIZE] = generate_sin_table();

/// Pre-computed cosine table
pub static COS_TABLE: [f32; TRIG_TABLE_SIZE] = generate_cos_table();

/// Pre-computed tangent table (huge but finite at 90° and 270°)
pub static TAN_TABLE: [f32; TRIG_TABLE_SIZE] = generate_tan_table();

const PI: f64 = 3.14159265358979323846;

const fn unit_to_radians(i: usize) -> f64 {
    (i as f64) * 2.0 * PI / (TRIG_TABLE_SIZE as f64)
}

/// sin(x) for any x, reduced to [-π/2, π/2] so the series converges fast
const fn const_sin(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    // sin(π - a) == sin(a)
    if a > PI / 2.0 {
        a = PI - a;
    } else if a < -PI / 2.0 {
        a = -PI - a;
    }
    taylor_sin(a)
}

const fn taylor_sin(x: f64) -> f64 {
    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    let x7 = x5 * x2;
    let x9 = x7 * x2;
    let x11 = x9 * x2;
    let x13 = x11 * x2;
    x - x3 / 6.0 + x5 / 120.0 - x7 / 5040.0 + x9 / 362880.0 - x11 / 39916800.0
        + x13 / 6227020800.0
}

const fn generate_sin_table() -> [f32; TRIG_TABLE_SIZE] {
    let mut table = [0.0f32; TRIG_TABLE_SIZE];
    let mut i = 0;
    while i < TRIG_TABLE_SIZE {
        table[i] = const_sin(unit_to_radians(i)) as f32;
        i += 1;
    }
    table
}

const fn generate_cos_table() -> [f32; TRIG_TABLE_SIZE] {
    let mut table = [0.0f32; TRIG_TABLE_SIZE];
    let mut i = 0;
    while i < TRIG_TABLE_SIZE {
        table[i] = const_sin(unit_to_radians(i) + PI / 2.0) as f32;
        i += 1;
    }
    table
}

const fn generate_tan_table() -> [f32; TRIG_TABLE_SIZE] {
    let mut table = [0.0f32; TRIG_TABLE_SIZE];
    let mut i = 0;
    while i < TRIG_TABLE_SIZE {
        let a = unit_to_radians(i);
        let c = const_sin(a + PI / 2.0);
        let s = const_sin(a);
        table[i] = if c > -1e-12 && c < 1e-12 {
            if s > 0.0 { f32::MAX } else { f32::MIN }
        } else {
            (s / c) as f32
        };
        i += 1;
    }
    table
}

/// Wrap an angle into `[0, FULL_TURN)`
#[inline]
pub fn normalize_angle(angle: i32) -> i32 {
    angle.rem_euclid(FULL_TURN)
}

/// Convert degrees to angle units, wrapped
#[inline]
pub fn degrees_to_angle(degrees: f32) -> i32 {
    normalize_angle((degrees * ANGLE_PRECISION as f32).round() as i32)
}

#[inline]
pub fn sine(angle: i32) -> f32 {
    SIN_TABLE[normalize_angle(angle) as usize]
}

#[inline]
pub fn cosine(angle: i32) -> f32 {
    COS_TABLE[normalize_angle(angle) as usize]
}

#[inline]
pub fn tangent(angle: i32) -> f32 {
    TAN_TABLE[normalize_angle(angle) as usize]
}
