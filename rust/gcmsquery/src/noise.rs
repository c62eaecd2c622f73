use std::collections::HashSet;

use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::errors::{
    InsufficientDataError,
    ParameterError,
    Result,
};
use crate::models::IonChromatogram;
use crate::utils::stats::scaled_mad;
use crate::utils::time::TimeSpec;

/// Window length either in scans or in retention time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowSize {
    #[serde(rename = "points")]
    Points(usize),
    #[serde(rename = "time")]
    Time(TimeSpec),
}

impl WindowSize {
    /// Number of scans the window spans on this chromatogram.
    pub fn points_for(&self, ic: &IonChromatogram) -> Result<usize> {
        let points = match self {
            WindowSize::Points(n) => *n,
            WindowSize::Time(t) => {
                let step = ic.time_step();
                if step <= 0.0 {
                    return Err(InsufficientDataError::TooFewPoints {
                        real: ic.len(),
                        expected: 2,
                        context: "converting a time window needs a scan interval".to_string(),
                    }
                    .into());
                }
                (t.seconds() / step).round() as usize
            }
        };
        if points == 0 {
            return Err(ParameterError::ExpectedPositive {
                parameter: "window",
                value: 0.0,
                context: "noise window spans no scans".to_string(),
            }
            .into());
        }
        Ok(points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub window: WindowSize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            window: WindowSize::Points(16),
        }
    }
}

/// Noise from the spread of window minima.
///
/// The chromatogram is cut into non-overlapping windows (a trailing
/// partial window is ignored), the minimum of each is taken as a trough,
/// and the noise is the MAD of the troughs scaled to a standard deviation.
///
/// ```
/// use gcmsquery::models::{ChromatogramKind, IonChromatogram};
/// use gcmsquery::noise::{trough_noise, NoiseConfig, WindowSize};
///
/// let times: Vec<f64> = (0..8).map(|x| x as f64).collect();
/// let ic = IonChromatogram::new(
///     vec![5.0, 1.0, 9.0, 2.0, 7.0, 3.0, 8.0, 4.0],
///     times,
///     ChromatogramKind::Tic,
/// ).unwrap();
/// // Troughs are [1, 2, 3, 4], MAD = 1.
/// let noise = trough_noise(&ic, &NoiseConfig { window: WindowSize::Points(2) }).unwrap();
/// assert!((noise - 1.0 / 0.6745).abs() < 1e-9);
/// ```
pub fn trough_noise(ic: &IonChromatogram, config: &NoiseConfig) -> Result<f64> {
    let points = config
        .window
        .points_for(ic)
        .map_err(|e| e.append_to_context("trough_noise"))?;

    let troughs: Vec<f64> = ic
        .intensities()
        .chunks_exact(points)
        .map(|w| w.iter().copied().fold(f64::INFINITY, f64::min))
        .collect();

    if troughs.len() < 2 {
        return Err(InsufficientDataError::TooFewPoints {
            real: troughs.len(),
            expected: 2,
            context: format!(
                "trough_noise needs two full windows of {} scans, chromatogram has {}",
                points,
                ic.len()
            ),
        }
        .into());
    }

    let noise = scaled_mad(&troughs).ok_or_else(|| InsufficientDataError::NoUsableValues {
        context: "trough_noise".to_string(),
    })?;
    debug!(
        "Trough noise {:.3} from {} windows of {} scans",
        noise,
        troughs.len(),
        points
    );
    Ok(noise)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowNoiseConfig {
    pub window: WindowSize,
    pub n_windows: usize,
    pub seed: u64,
}

impl Default for WindowNoiseConfig {
    fn default() -> Self {
        Self {
            window: WindowSize::Points(256),
            n_windows: 1024,
            seed: 42,
        }
    }
}

/// Noise as the smallest scaled MAD among randomly placed windows.
///
/// Window start positions are drawn from a ChaCha8 generator seeded with
/// `config.seed`, so the estimate is reproducible. Repeated positions are
/// only evaluated once.
pub fn window_noise(ic: &IonChromatogram, config: &WindowNoiseConfig) -> Result<f64> {
    if config.n_windows == 0 {
        return Err(ParameterError::ExpectedPositive {
            parameter: "n_windows",
            value: 0.0,
            context: "window_noise".to_string(),
        }
        .into());
    }
    let points = config
        .window
        .points_for(ic)
        .map_err(|e| e.append_to_context("window_noise"))?;
    let values = ic.intensities();
    if values.len() < points {
        return Err(InsufficientDataError::TooFewPoints {
            real: values.len(),
            expected: points,
            context: "window_noise chromatogram shorter than one window".to_string(),
        }
        .into());
    }

    let max_start = values.len() - points;
    let highest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut noise = (highest - lowest).abs();

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut seen = HashSet::new();
    for _ in 0..config.n_windows {
        let start = rng.gen_range(0..=max_start);
        if !seen.insert(start) {
            continue;
        }
        if let Some(mad) = scaled_mad(&values[start..start + points]) {
            if mad < noise {
                noise = mad;
            }
        }
    }

    debug!(
        "Window noise {:.3} from {} distinct windows of {} scans",
        noise,
        seen.len(),
        points
    );
    Ok(noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GcmsQueryError;
    use crate::models::ChromatogramKind;

    fn chromatogram(values: Vec<f64>) -> IonChromatogram {
        let times = (0..values.len()).map(|i| i as f64 * 0.5).collect();
        IonChromatogram::new(values, times, ChromatogramKind::Tic).unwrap()
    }

    #[test]
    fn test_flat_signal_has_zero_noise() {
        let ic = chromatogram(vec![10.0; 64]);
        assert_eq!(trough_noise(&ic, &NoiseConfig::default()).unwrap(), 0.0);
        let config = WindowNoiseConfig {
            window: WindowSize::Points(8),
            n_windows: 16,
            seed: 1,
        };
        assert_eq!(window_noise(&ic, &config).unwrap(), 0.0);
    }

    #[test]
    fn test_too_short_is_an_error() {
        let ic = chromatogram(vec![1.0; 20]);
        assert!(matches!(
            trough_noise(&ic, &NoiseConfig::default()),
            Err(GcmsQueryError::InsufficientData(_))
        ));
        assert!(matches!(
            window_noise(&ic, &WindowNoiseConfig::default()),
            Err(GcmsQueryError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_time_window() -> Result<()> {
        // 0.5 s per scan, 2 s window -> 4 scans
        let ic = chromatogram((0..16).map(|x| (x % 4) as f64).collect());
        let config = NoiseConfig {
            window: WindowSize::Time(TimeSpec::Seconds(2.0)),
        };
        assert_eq!(config.window.points_for(&ic)?, 4);
        assert_eq!(trough_noise(&ic, &config)?, 0.0);
        Ok(())
    }

    #[test]
    fn test_window_noise_is_reproducible() -> Result<()> {
        let values: Vec<f64> = (0..300)
            .map(|i| ((i * 7919) % 101) as f64 + if i > 150 { 50.0 } else { 0.0 })
            .collect();
        let ic = chromatogram(values);
        let config = WindowNoiseConfig {
            window: WindowSize::Points(32),
            n_windows: 64,
            seed: 7,
        };
        let a = window_noise(&ic, &config)?;
        let b = window_noise(&ic, &config)?;
        assert_eq!(a, b);
        assert!(a > 0.0);
        Ok(())
    }
}
