//! Context-dependent scaling of authored metric changes.
//!
//! The same nominal delta lands differently depending on where a metric
//! currently sits:
//!
//! ```text
//!   higher-is-better, d > 0 :  d × (1 − 0.5c)    diminishing returns near the ceiling
//!   higher-is-better, d < 0 :  d × (0.5 + 0.5c)  regressions hurt more from the top
//!   lower-is-better,  d < 0 :  d × (0.5 + 0.5c)  improvements bite harder when bad
//!   lower-is-better,  d > 0 :  d × (1 − 0.5c)    worsening hits harder when good
//! ```
//!
//! where `c` is the current value normalised into `[0, 1]`.

use crate::state::{MetricKey, Metrics, Polarity, WELFARE_ADOPTION_CEILING};

/// Scale factor at the "cheap" end of the curve.
const HALF: f64 = 0.5;

/// Scale a raw delta by the current value of its metric.
///
/// `max_value` normalises `current` before scaling; the result is the
/// effective change to add to the metric.
#[must_use]
pub fn scale_by_context(delta: f64, current: f64, polarity: Polarity, max_value: f64) -> f64 {
    if delta == 0.0 {
        return 0.0;
    }
    let c = (current / max_value).clamp(0.0, 1.0);
    let diminishing = 1.0 - c * HALF;
    let amplifying = HALF + c * HALF;

    let factor = match polarity {
        Polarity::HigherIsBetter if delta > 0.0 => diminishing,
        Polarity::HigherIsBetter => amplifying,
        Polarity::LowerIsBetter if delta < 0.0 => amplifying,
        Polarity::LowerIsBetter => diminishing,
    };
    delta * factor
}

/// Effective change for `key` given the current metrics.
///
/// Adoption is first brought onto the unit scale (`min(1, v / 3)`) and then
/// handed to [`scale_by_context`] with the 3.0 ceiling, so its scaling stays
/// gentle across the whole 0–3 range.
#[must_use]
pub fn effective_change(key: MetricKey, delta: f64, metrics: &Metrics) -> f64 {
    let current = metrics.get(key);
    match key {
        MetricKey::WelfareStandardAdoption => scale_by_context(
            delta,
            (current / WELFARE_ADOPTION_CEILING).min(1.0),
            key.polarity(),
            WELFARE_ADOPTION_CEILING,
        ),
        _ => scale_by_context(delta, current, key.polarity(), 1.0),
    }
}
