//! Statistics primitives for A/B test evaluation.
//!
//! Everything here is pure: no I/O, no shared state. Degenerate inputs
//! (empty samples, zero baselines) return explicit zeros so NaN and
//! infinity never reach a caller.

use cartboost_core::types::{StatusLabel, CONTROL_VARIANT_NAME};

/// Non-control variants below this many impressions are still collecting.
pub const MIN_IMPRESSIONS: u64 = 5;
/// Confidence at which a variant is declared winning or losing.
pub const SIGNIFICANT_CONFIDENCE: f64 = 95.0;
/// Confidence at which a variant is flagged as a likely mover.
pub const TRENDING_CONFIDENCE: f64 = 70.0;

// Abramowitz & Stegun 7.1.26
const P: f64 = 0.3275911;
const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;

/// Round `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Standard normal CDF approximation (max abs error ~1.5e-7).
///
/// Saturates to exactly 0 below -8 and exactly 1 above 8.
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let t = 1.0 / (1.0 + P * x.abs());
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let y = 1.0 - poly * (-x * x / 2.0).exp();

    0.5 * (1.0 + sign * y)
}

/// Two-proportion z-test expressed as a 0-100 confidence score,
/// rounded to one decimal.
pub fn compute_confidence(
    control_impressions: u64,
    control_conversions: u64,
    variant_impressions: u64,
    variant_conversions: u64,
) -> f64 {
    if control_impressions == 0 || variant_impressions == 0 {
        return 0.0;
    }

    let n_c = control_impressions as f64;
    let n_t = variant_impressions as f64;
    let p_c = control_conversions as f64 / n_c;
    let p_t = variant_conversions as f64 / n_t;

    let pooled = (control_conversions + variant_conversions) as f64 / (n_c + n_t);
    if pooled == 0.0 || pooled == 1.0 {
        return 0.0;
    }

    let se = (pooled * (1.0 - pooled) * (1.0 / n_c + 1.0 / n_t)).sqrt();
    // Conversions above impressions push pooled past 1 and the radicand negative.
    if se == 0.0 || !se.is_finite() {
        return 0.0;
    }

    let z = (p_t - p_c).abs() / se;
    round_to((normal_cdf(z) - 0.5) * 2.0 * 100.0, 1)
}

/// Relative change of `conversion_rate` against the control's rate, in
/// percent. Zero for the control itself and when the baseline is zero.
pub fn compute_lift(conversion_rate: f64, control_conversion_rate: f64, is_control: bool) -> f64 {
    if is_control || control_conversion_rate == 0.0 {
        return 0.0;
    }
    round_to(
        (conversion_rate - control_conversion_rate) / control_conversion_rate * 100.0,
        1,
    )
}

/// Classify a variant. Rules are checked in order; the first match wins.
pub fn compute_status(variant_name: &str, lift: f64, confidence: f64, impressions: u64) -> StatusLabel {
    if variant_name == CONTROL_VARIANT_NAME {
        return StatusLabel::Control;
    }
    if impressions < MIN_IMPRESSIONS {
        return StatusLabel::Collecting;
    }
    if confidence >= SIGNIFICANT_CONFIDENCE {
        return if lift > 0.0 {
            StatusLabel::Winning
        } else {
            StatusLabel::Losing
        };
    }
    if confidence >= TRENDING_CONFIDENCE {
        return if lift > 0.0 {
            StatusLabel::Promising
        } else {
            StatusLabel::Underperforming
        };
    }
    StatusLabel::Stable
}

/// Conversion rate in percent, two decimals; zero when there is no traffic.
pub fn conversion_rate(impressions: u64, conversions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    round_to(conversions as f64 / impressions as f64 * 100.0, 2)
}
