// Utility functions for feed-ranking

/// Min-max normalize `value` into [0, 1] against the pool range `[min, max]`.
///
/// A degenerate range (every candidate scored the same) has no spread to
/// normalize against, so the raw value is clamped instead.
pub fn normalize_score(value: f64, min: f64, max: f64) -> f64 {
    if max - min < f64::EPSILON {
        value.clamp(0.0, 1.0)
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Half-life decay: 1.0 at age 0, 0.5 at `half_life`, 0.25 at twice that.
pub fn exponential_decay(age: f64, half_life: f64) -> f64 {
    (-age.max(0.0) / half_life * std::f64::consts::LN_2).exp()
}
