use crate::structs::{
    AnalysisConfig, AnomalyCheck, CitySummary, Observation, RollingPoint, Season, SeasonalProfile,
};
use chrono::Datelike;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

/// Half-width of the normal band, in standard deviations.
const BAND_SIGMA: f64 = 2.0;

/// Days used to annualize a fitted per-day slope.
const DAYS_PER_YEAR: f64 = 365.0;

const CANNOT_CLASSIFY: AnomalyCheck = AnomalyCheck {
    is_normal: false,
    lower_bound: 0.0,
    upper_bound: 0.0,
};

/// Computes per-(city, season) baseline statistics over the whole dataset.
///
/// Missing temperatures are excluded row-wise; a group whose readings are
/// all missing yields no profile. Per-group statistics run in parallel, and
/// the result is sorted by city then season, so identical input in any row
/// order produces identical output.
pub fn season_profiles(observations: &[Observation]) -> Vec<SeasonalProfile> {
    let mut groups: HashMap<(String, Season), Vec<f64>> = HashMap::new();
    for obs in observations {
        if let Some(temp) = obs.temperature {
            groups
                .entry((obs.city.clone(), obs.season))
                .or_default()
                .push(temp);
        }
    }
    debug!("Aggregating {} (city, season) groups", groups.len());

    let entries: Vec<_> = groups.into_iter().collect();
    let mut profiles: Vec<SeasonalProfile> = entries
        .into_par_iter()
        .map(|((city, season), temps)| {
            let mean = temps.iter().sum::<f64>() / temps.len() as f64;
            SeasonalProfile {
                city,
                season,
                mean_temperature: mean,
                std_temperature: sample_std(&temps, mean),
                count: temps.len() as u32,
            }
        })
        .collect();

    profiles.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.season.cmp(&b.season)));
    profiles
}

/// Sample standard deviation (n - 1 divisor); `None` below two values.
fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Tests a reading against its seasonal baseline band (mean ± 2σ, inclusive
/// on both ends).
///
/// Without a matching profile, or with an undefined std, the reading cannot
/// be classified and the degraded zero-band result is returned.
pub fn check_anomaly(
    city: &str,
    temperature: f64,
    profiles: &[SeasonalProfile],
    season: Season,
) -> AnomalyCheck {
    let profile = profiles
        .iter()
        .find(|p| p.city == city && p.season == season);
    match profile.and_then(|p| p.std_temperature.map(|std| (p.mean_temperature, std))) {
        Some((mean, std)) => {
            let lower = mean - BAND_SIGMA * std;
            let upper = mean + BAND_SIGMA * std;
            AnomalyCheck {
                is_normal: (lower..=upper).contains(&temperature),
                lower_bound: lower,
                upper_bound: upper,
            }
        }
        None => CANNOT_CLASSIFY,
    }
}

/// Fits a linear trend over one city's full history and returns °C/year.
///
/// Ordinary least squares of temperature on the proleptic-Gregorian day
/// ordinal, annualized by 365. Missing temperatures are dropped; an empty or
/// degenerate (single-day) series yields 0.0. One global fit, no outlier
/// rejection, so existing anomalies bias the coefficient.
pub fn annual_trend(observations: &[Observation]) -> f64 {
    let points: Vec<(f64, f64)> = observations
        .iter()
        .filter_map(|obs| {
            obs.temperature
                .map(|temp| (obs.date.num_days_from_ce() as f64, temp))
        })
        .collect();
    if points.is_empty() {
        return 0.0;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    // Centered form of the OLS closed-form solution. Day ordinals sit near
    // 7e5, where the raw sum-of-squares form loses precision.
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in &points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx.abs() < 1e-10 {
        return 0.0;
    }
    (sxy / sxx) * DAYS_PER_YEAR
}

/// Annotates one city's series with rolling local baselines, anomaly flags,
/// and the centered long-trend overlay.
///
/// The input is sorted chronologically first. Rolling aggregates cover up to
/// `rolling_window` trailing positions and use only the non-missing readings
/// inside the window: the mean needs one valid value, the std two. A point
/// is anomalous only when its own reading falls strictly outside a fully
/// defined band; an undefined bound never flags anything.
pub fn annotate_city(observations: &[Observation], config: &AnalysisConfig) -> Vec<RollingPoint> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|obs| obs.date);

    let temps: Vec<Option<f64>> = sorted.iter().map(|obs| obs.temperature).collect();

    sorted
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let start = (i + 1).saturating_sub(config.rolling_window);
            let window = valid_values(&temps[start..=i]);

            let rolling_mean =
                (!window.is_empty()).then(|| window.iter().sum::<f64>() / window.len() as f64);
            let rolling_std = rolling_mean.and_then(|mean| sample_std(&window, mean));
            let (lower_bound, upper_bound) = match (rolling_mean, rolling_std) {
                (Some(mean), Some(std)) => {
                    (Some(mean - BAND_SIGMA * std), Some(mean + BAND_SIGMA * std))
                }
                _ => (None, None),
            };
            let is_anomaly = match (obs.temperature, lower_bound, upper_bound) {
                (Some(temp), Some(lower), Some(upper)) => temp < lower || temp > upper,
                _ => false,
            };
            let trend_long =
                centered_mean(&temps, i, config.long_window, config.long_min_periods);

            RollingPoint {
                city: obs.city.clone(),
                date: obs.date,
                season: obs.season,
                temperature: obs.temperature,
                rolling_mean,
                rolling_std,
                lower_bound,
                upper_bound,
                is_anomaly,
                trend_long,
            }
        })
        .collect()
}

fn valid_values(window: &[Option<f64>]) -> Vec<f64> {
    window.iter().filter_map(|value| *value).collect()
}

/// Centered rolling mean over `window` positions, `None` below `min_periods`
/// valid readings in range. The window extends (window - 1) / 2 positions
/// ahead of the label and the remainder behind it, clipped at the series
/// edges.
fn centered_mean(
    temps: &[Option<f64>],
    i: usize,
    window: usize,
    min_periods: usize,
) -> Option<f64> {
    let after = (window - 1) / 2;
    let before = window - 1 - after;
    let start = i.saturating_sub(before);
    let end = (i + after).min(temps.len() - 1);
    let values = valid_values(&temps[start..=end]);
    (values.len() >= min_periods).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Flags each of one city's readings that falls strictly outside its own
/// seasonal ±2σ band. Missing readings and unclassifiable seasons are never
/// flagged.
pub fn seasonal_outliers(observations: &[Observation], profiles: &[SeasonalProfile]) -> Vec<bool> {
    observations
        .iter()
        .map(|obs| {
            let Some(temp) = obs.temperature else {
                return false;
            };
            let Some(profile) = profiles
                .iter()
                .find(|p| p.city == obs.city && p.season == obs.season)
            else {
                return false;
            };
            let Some(std) = profile.std_temperature else {
                return false;
            };
            let lower = profile.mean_temperature - BAND_SIGMA * std;
            let upper = profile.mean_temperature + BAND_SIGMA * std;
            temp < lower || temp > upper
        })
        .collect()
}

/// Descriptive statistics over one city's non-missing readings; `None` when
/// the city has no usable data. Percentiles use linear interpolation.
pub fn summarize_city(observations: &[Observation]) -> Option<CitySummary> {
    let city = observations.first()?.city.clone();
    let temps: Vec<f64> = observations
        .iter()
        .filter_map(|obs| obs.temperature)
        .collect();
    if temps.is_empty() {
        return None;
    }

    let mean = temps.iter().sum::<f64>() / temps.len() as f64;
    let min = temps.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = temps.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    Some(CitySummary {
        city,
        count: temps.len() as u32,
        mean,
        std: sample_std(&temps, mean),
        min,
        p25: percentile(&temps, 25.0),
        median: percentile(&temps, 50.0),
        p75: percentile(&temps, 75.0),
        max,
    })
}

/// Percentile by linear interpolation over the sorted values.
fn percentile(data: &[f64], pct: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted_data = data.to_vec();
    sorted_data.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let index = (pct / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}
