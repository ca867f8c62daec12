use fixed::types::I32F32;

/// Q32.32 fixed-point used for every energy quantity.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Zero energy.
pub const ZERO: Fixed64 = Fixed64::ZERO;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Smallest of three fixed-point values.
#[inline]
pub fn min3(a: Fixed64, b: Fixed64, c: Fixed64) -> Fixed64 {
    a.min(b).min(c)
}
