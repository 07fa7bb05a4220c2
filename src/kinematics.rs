//! # Relativistic Kinematics
//!
//! Pure functions for the Lorentz factor and the photon energy Doppler factor,
//! in natural units (`c = 1`).
//!
//! None of these functions fail. Superluminal inputs produce `f64::INFINITY`
//! from [`lorentz_factor`] and callers are expected to check for it.

/// Largest flow speed accepted by [`effective_temperature`].
pub const MAX_BLUE_SHIFT_SPEED: f64 = 0.99;

/// Lorentz factor `γ = 1 / √(1 − v²)`.
///
/// Returns `f64::INFINITY` when `|v| >= 1` or `v` is not finite.
pub fn lorentz_factor(v: f64) -> f64 {
    if !v.is_finite() {
        return f64::INFINITY;
    }
    let v2 = v * v;
    if v2 >= 1.0 {
        return f64::INFINITY;
    }
    1.0 / (1.0 - v2).sqrt()
}

/// Doppler factor `f = γ(v) · (1 − v·cosθ)`.
///
/// A photon emitted with rest-frame energy `E` is observed along `θ` with
/// energy `E · f`. The factor is finite for `|v| < 1`. Results that are not
/// strictly positive must be discarded by the caller.
pub fn doppler_factor(v: f64, cos_theta: f64) -> f64 {
    lorentz_factor(v) * (1.0 - v * cos_theta)
}

/// Blue-shifted apparent temperature `T · √((1 + v) / (1 − v))`.
///
/// `v` is clamped to `[0, MAX_BLUE_SHIFT_SPEED]` so the result is always finite.
pub fn effective_temperature(t_local: f64, v: f64) -> f64 {
    let v = if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, MAX_BLUE_SHIFT_SPEED)
    };
    t_local * ((1.0 + v) / (1.0 - v)).sqrt()
}
