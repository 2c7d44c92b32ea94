//! Provider scale → HMPI conversions.
//!
//! These are banding approximations, not physical derivations: an air-quality
//! category is mapped onto the HMPI band of matching severity. Each provider
//! has exactly one pure conversion function.

/// Piecewise-linear interpolation over ascending `(x, y)` breakpoints,
/// clamped to the first and last `y`.
fn interpolate(breakpoints: &[(f64, f64)], x: f64) -> f64 {
    let (Some(first), Some(last)) = (breakpoints.first(), breakpoints.last()) else {
        return 0.0;
    };
    if !x.is_finite() || x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    breakpoints
        .windows(2)
        .find(|w| x <= w[1].0)
        .map(|w| {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            y0 + (x - x0) / (x1 - x0) * (y1 - y0)
        })
        .unwrap_or(last.1)
}

/// US AQI (WAQI) breakpoints: Good → Safe, Moderate → Moderate,
/// Unhealthy → High, Very Unhealthy → Critical, Hazardous → beyond.
const WAQI_BREAKPOINTS: &[(f64, f64)] = &[
    (0.0, 0.0),
    (50.0, 30.0),
    (100.0, 50.0),
    (200.0, 75.0),
    (300.0, 100.0),
    (500.0, 150.0),
];

/// Indian AQI (SAFAR) breakpoints: Good, Satisfactory, Moderate, Poor,
/// Very Poor, Severe.
const SAFAR_BREAKPOINTS: &[(f64, f64)] = &[
    (0.0, 0.0),
    (50.0, 25.0),
    (100.0, 40.0),
    (200.0, 60.0),
    (300.0, 80.0),
    (400.0, 110.0),
    (500.0, 150.0),
];

/// WAQI AQI → HMPI. Clamped to `[0, 150]`.
pub fn waqi_aqi_to_hmpi(aqi: f64) -> f64 {
    interpolate(WAQI_BREAKPOINTS, aqi)
}

/// SAFAR AQI → HMPI. Clamped to `[0, 150]`.
pub fn safar_aqi_to_hmpi(aqi: f64) -> f64 {
    interpolate(SAFAR_BREAKPOINTS, aqi)
}

/// PM2.5 (μg/m³) → HMPI: 60 μg/m³, the Indian 24h standard, maps to 50.
pub fn pm25_to_hmpi(pm25: f64) -> f64 {
    (pm25 / 60.0 * 50.0).max(0.0)
}

/// PM10 (μg/m³) → HMPI: 100 μg/m³, the Indian 24h standard, maps to 50.
pub fn pm10_to_hmpi(pm10: f64) -> f64 {
    (pm10 / 100.0 * 50.0).max(0.0)
}

/// Pollutant sub-index → metal it drives when apportioning.
pub const POLLUTANT_DRIVERS: [(&str, &str); 5] = [
    ("pm10", "Lead"),
    ("pm25", "Cadmium"),
    ("so2", "Arsenic"),
    ("no2", "Chromium"),
    ("co", "Mercury"),
];
