//! Feature extraction pipeline with fit/transform separation
//!
//! A configuration-selected transform chain converting windows into feature
//! vectors. Normalization statistics are computed from training windows only
//! and frozen for test and online windows; the online path runs in
//! transform-only mode against restored statistics.

use bci_core::{BciError, BciResult};
use ndarray::{Array1, Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Volts to microvolts, applied before any transform when scaling is enabled.
pub const MICROVOLT_SCALE: f32 = 1e6;

/// Recognized feature transform kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Identity pass-through of the flattened window, with optional
    /// channel-wise standardization
    Raw,
    /// Waveform length, zero crossings, slope-sign changes and RMS per
    /// channel, concatenated
    TimeDomainStats,
    /// Average spectral power in one band, per channel
    AvgFftPower { fft_low: f32, fft_high: f32 },
    /// A bank of adjacent narrow bands between `fft_low` and `fft_high`
    FftRange {
        fft_low: f32,
        fft_high: f32,
        fft_step: f32,
        fft_width: f32,
    },
    /// Concatenated average power over several caller-chosen bands
    MultiAvgFftPower { fft_ranges: Vec<(f32, f32)> },
    /// Caller-supplied transform object
    Custom,
}

impl FeatureKind {
    /// Stable configuration name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Raw => "raw",
            FeatureKind::TimeDomainStats => "time_stats",
            FeatureKind::AvgFftPower { .. } => "avg_fft_pow",
            FeatureKind::FftRange { .. } => "fft_range",
            FeatureKind::MultiAvgFftPower { .. } => "multi_avg_fft_pow",
            FeatureKind::Custom => "user",
        }
    }

    /// Spectral kinds need a sampling rate at pipeline construction
    pub fn is_spectral(&self) -> bool {
        matches!(
            self,
            FeatureKind::AvgFftPower { .. }
                | FeatureKind::FftRange { .. }
                | FeatureKind::MultiAvgFftPower { .. }
        )
    }

    /// Frequency bands covered by a spectral kind
    fn bands(&self) -> Vec<(f32, f32)> {
        match self {
            FeatureKind::AvgFftPower { fft_low, fft_high } => vec![(*fft_low, *fft_high)],
            FeatureKind::MultiAvgFftPower { fft_ranges } => fft_ranges.clone(),
            FeatureKind::FftRange {
                fft_low,
                fft_high,
                fft_step,
                fft_width,
            } => fft_band_edges(*fft_low, *fft_high, *fft_step, *fft_width),
            _ => Vec::new(),
        }
    }
}

/// Expand a range definition into a bank of adjacent narrow bands:
/// `(low, low+width), (low+step, low+step+width), ...` up to `high`.
pub fn fft_band_edges(fft_low: f32, fft_high: f32, fft_step: f32, fft_width: f32) -> Vec<(f32, f32)> {
    let mut bands = Vec::new();
    let mut lo = fft_low;
    while lo + fft_width <= fft_high + 1e-6 {
        bands.push((lo, lo + fft_width));
        lo += fft_step;
    }
    bands
}

/// Feature pipeline configuration as read from experiment files.
///
/// The kind is selected by name; unknown names fail at construction, never
/// mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Feature kind name: "raw", "time_stats", "avg_fft_pow", "fft_range",
    /// "multi_avg_fft_pow" or "user"
    pub feature_type: String,
    #[serde(default)]
    pub fft_low: Option<f32>,
    #[serde(default)]
    pub fft_high: Option<f32>,
    #[serde(default)]
    pub fft_step: Option<f32>,
    #[serde(default)]
    pub fft_width: Option<f32>,
    #[serde(default)]
    pub fft_ranges: Option<Vec<(f32, f32)>>,
    /// Apply volts to microvolts scaling before the transform
    #[serde(default = "default_true")]
    pub scale_to_microvolts: bool,
    /// Standardize features with statistics fitted on training data
    #[serde(default)]
    pub normalize: bool,
}

fn default_true() -> bool {
    true
}

impl FeatureConfig {
    pub fn raw() -> Self {
        Self::named("raw")
    }

    pub fn time_stats() -> Self {
        Self::named("time_stats")
    }

    pub fn avg_fft_power(fft_low: f32, fft_high: f32) -> Self {
        FeatureConfig {
            fft_low: Some(fft_low),
            fft_high: Some(fft_high),
            ..Self::named("avg_fft_pow")
        }
    }

    pub fn fft_range(fft_low: f32, fft_high: f32, fft_step: f32, fft_width: f32) -> Self {
        FeatureConfig {
            fft_low: Some(fft_low),
            fft_high: Some(fft_high),
            fft_step: Some(fft_step),
            fft_width: Some(fft_width),
            ..Self::named("fft_range")
        }
    }

    pub fn multi_avg_fft_power(fft_ranges: Vec<(f32, f32)>) -> Self {
        FeatureConfig {
            fft_ranges: Some(fft_ranges),
            ..Self::named("multi_avg_fft_pow")
        }
    }

    fn named(feature_type: &str) -> Self {
        FeatureConfig {
            feature_type: feature_type.to_string(),
            fft_low: None,
            fft_high: None,
            fft_step: None,
            fft_width: None,
            fft_ranges: None,
            scale_to_microvolts: true,
            normalize: false,
        }
    }

    /// Resolve the configured kind, validating kind-specific parameters.
    pub fn kind(&self) -> BciResult<FeatureKind> {
        match self.feature_type.as_str() {
            "raw" => Ok(FeatureKind::Raw),
            "time_stats" => Ok(FeatureKind::TimeDomainStats),
            "avg_fft_pow" => Ok(FeatureKind::AvgFftPower {
                fft_low: require(self.fft_low, "fft_low")?,
                fft_high: require(self.fft_high, "fft_high")?,
            }),
            "fft_range" => Ok(FeatureKind::FftRange {
                fft_low: require(self.fft_low, "fft_low")?,
                fft_high: require(self.fft_high, "fft_high")?,
                fft_step: self.fft_step.unwrap_or(2.0),
                fft_width: self.fft_width.unwrap_or(2.0),
            }),
            "multi_avg_fft_pow" => {
                let ranges = self.fft_ranges.clone().ok_or(BciError::InvalidParameter {
                    name: "fft_ranges",
                    reason: "required for multi_avg_fft_pow".to_string(),
                })?;
                if ranges.is_empty() {
                    return Err(BciError::InvalidParameter {
                        name: "fft_ranges",
                        reason: "at least one band is required".to_string(),
                    });
                }
                Ok(FeatureKind::MultiAvgFftPower { fft_ranges: ranges })
            }
            "user" => Ok(FeatureKind::Custom),
            other => Err(BciError::UnknownFeatureType {
                name: other.to_string(),
            }),
        }
    }
}

fn require(value: Option<f32>, name: &'static str) -> BciResult<f32> {
    value.ok_or(BciError::InvalidParameter {
        name,
        reason: "required for the selected feature type".to_string(),
    })
}

/// Capability contract for caller-supplied transforms
pub trait FeatureTransform: Send {
    /// Fit any internal statistics on training windows and transform them
    fn fit_transform(&mut self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>>;
    /// Transform with frozen statistics
    fn transform(&self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>>;
}

/// Frozen standardization statistics, one entry per feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub mean: Array1<f32>,
    pub std: Array1<f32>,
}

impl NormStats {
    /// Per-column mean and standard deviation of a feature matrix.
    fn fit(features: &Array2<f32>) -> Self {
        let n = features.nrows().max(1) as f32;
        let mean = features.sum_axis(ndarray::Axis(0)) / n;
        let mut var = Array1::<f32>::zeros(features.ncols());
        for row in features.rows() {
            let diff = &row - &mean;
            var = var + &diff * &diff;
        }
        let std = (var / n).mapv(|v| {
            let s = v.sqrt();
            if s > 0.0 {
                s
            } else {
                1.0
            }
        });
        NormStats { mean, std }
    }

    /// Channel-wise statistics for flattened raw windows: one mean/std per
    /// channel computed across windows and time, expanded to column form.
    fn fit_channel_blocks(features: &Array2<f32>, channel_count: usize) -> Self {
        let block = features.ncols() / channel_count.max(1);
        let mut mean = Array1::<f32>::zeros(features.ncols());
        let mut std = Array1::<f32>::ones(features.ncols());

        for ch in 0..channel_count {
            let cols = ch * block..(ch + 1) * block;
            let slab = features.slice(ndarray::s![.., cols.clone()]);
            let n = (slab.len()).max(1) as f32;
            let m = slab.sum() / n;
            let v = slab.mapv(|x| (x - m) * (x - m)).sum() / n;
            let s = if v.sqrt() > 0.0 { v.sqrt() } else { 1.0 };
            mean.slice_mut(ndarray::s![cols.clone()]).fill(m);
            std.slice_mut(ndarray::s![cols]).fill(s);
        }
        NormStats { mean, std }
    }

    /// Apply the frozen statistics to a feature matrix.
    fn apply(&self, features: &Array2<f32>) -> Array2<f32> {
        (features - &self.mean) / &self.std
    }
}

/// Configurable per-window transform chain.
///
/// `fit_transform` is for training windows only; `transform` applies frozen
/// statistics and never refits.
pub struct FeaturePipeline {
    kind: FeatureKind,
    sampling_rate: Option<f32>,
    scale_to_microvolts: bool,
    normalize: bool,
    fitted: Option<NormStats>,
    custom: Option<Box<dyn FeatureTransform>>,
}

impl FeaturePipeline {
    /// Build a pipeline from configuration.
    ///
    /// Spectral kinds fail here without a sampling rate; selecting the
    /// "user" kind through configuration fails because no transform object
    /// can be supplied this way — use [`FeaturePipeline::with_custom`].
    pub fn new(config: &FeatureConfig, sampling_rate: Option<f32>) -> BciResult<Self> {
        let kind = config.kind()?;
        if kind.is_spectral() && sampling_rate.is_none() {
            return Err(BciError::MissingSamplingRate {
                feature: kind.name().to_string(),
            });
        }
        if kind == FeatureKind::Custom {
            return Err(BciError::InvalidPipelineObject {
                reason: "user pipeline selected but no transform supplied".to_string(),
            });
        }

        Ok(FeaturePipeline {
            kind,
            sampling_rate,
            scale_to_microvolts: config.scale_to_microvolts,
            normalize: config.normalize,
            fitted: None,
            custom: None,
        })
    }

    /// Build a pipeline around a caller-supplied transform object.
    pub fn with_custom(transform: Box<dyn FeatureTransform>) -> Self {
        FeaturePipeline {
            kind: FeatureKind::Custom,
            sampling_rate: None,
            scale_to_microvolts: false,
            normalize: false,
            fitted: None,
            custom: Some(transform),
        }
    }

    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// Frozen fit-time statistics, if fitted
    pub fn fitted_stats(&self) -> Option<&NormStats> {
        self.fitted.as_ref()
    }

    /// Restore statistics persisted at training time (online path).
    pub fn restore_stats(&mut self, stats: NormStats) {
        self.fitted = Some(stats);
    }

    /// Fit normalization statistics on training windows and transform them.
    pub fn fit_transform(&mut self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>> {
        if let Some(custom) = self.custom.as_mut() {
            return custom.fit_transform(windows);
        }
        let channel_count = validate_windows(windows)?;
        let features = self.extract(windows)?;
        if !self.normalize {
            return Ok(features);
        }

        let stats = match self.kind {
            FeatureKind::Raw => NormStats::fit_channel_blocks(&features, channel_count),
            _ => NormStats::fit(&features),
        };
        let out = stats.apply(&features);
        self.fitted = Some(stats);
        Ok(out)
    }

    /// Transform windows with frozen statistics; never refits.
    pub fn transform(&self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>> {
        if let Some(custom) = self.custom.as_ref() {
            return custom.transform(windows);
        }
        validate_windows(windows)?;
        let features = self.extract(windows)?;
        if !self.normalize {
            return Ok(features);
        }
        match self.fitted.as_ref() {
            Some(stats) => Ok(stats.apply(&features)),
            None => Err(BciError::InvalidPipelineObject {
                reason: "normalization requested but no fitted statistics; \
                         fit on training windows or restore persisted statistics"
                    .to_string(),
            }),
        }
    }

    fn extract(&self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>> {
        let scale = if self.scale_to_microvolts {
            MICROVOLT_SCALE
        } else {
            1.0
        };

        let rows: Vec<Vec<f32>> = match &self.kind {
            FeatureKind::Raw => windows
                .iter()
                .map(|w| w.iter().map(|&x| x * scale).collect())
                .collect(),
            FeatureKind::TimeDomainStats => windows
                .iter()
                .map(|w| time_domain_stats(w, scale))
                .collect(),
            kind if kind.is_spectral() => {
                // Checked at construction.
                let fs = self.sampling_rate.ok_or(BciError::MissingSamplingRate {
                    feature: kind.name().to_string(),
                })?;
                let bands = kind.bands();
                windows
                    .iter()
                    .map(|w| band_powers(w, fs, &bands, scale))
                    .collect()
            }
            _ => {
                return Err(BciError::InvalidPipelineObject {
                    reason: "custom kind reached the built-in extractor".to_string(),
                })
            }
        };

        let n_features = rows[0].len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((windows.len(), n_features), flat).map_err(|e| {
            BciError::InvalidParameter {
                name: "windows",
                reason: e.to_string(),
            }
        })
    }
}

fn validate_windows(windows: &[ArrayView2<'_, f32>]) -> BciResult<usize> {
    let first = windows.first().ok_or_else(|| BciError::EmptyDataset {
        reason: "no windows to transform".to_string(),
    })?;
    for window in windows {
        if window.dim() != first.dim() {
            return Err(BciError::ChannelMismatch {
                expected: first.nrows(),
                actual: window.nrows(),
            });
        }
    }
    Ok(first.nrows())
}

/// Waveform length, zero crossings, slope-sign changes and RMS, computed per
/// channel and concatenated feature-major.
fn time_domain_stats(window: &ArrayView2<'_, f32>, scale: f32) -> Vec<f32> {
    let channels = window.nrows();
    let mut waveform_length = Vec::with_capacity(channels);
    let mut zero_crossings = Vec::with_capacity(channels);
    let mut slope_sign_changes = Vec::with_capacity(channels);
    let mut rms = Vec::with_capacity(channels);

    for row in window.rows() {
        let data: Vec<f32> = row.iter().map(|&x| x * scale).collect();
        let n = data.len() as f32;

        waveform_length.push(data.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>());

        let mut zc = 0u32;
        for pair in data.windows(2) {
            if (pair[1] >= 0.0) != (pair[0] >= 0.0) {
                zc += 1;
            }
        }
        zero_crossings.push(zc as f32);

        let mut ssc = 0u32;
        if data.len() > 2 {
            let mut prev_rising = data[1] > data[0];
            for pair in data[1..].windows(2) {
                let rising = pair[1] > pair[0];
                if rising != prev_rising {
                    ssc += 1;
                }
                prev_rising = rising;
            }
        }
        slope_sign_changes.push(ssc as f32);

        rms.push((data.iter().map(|x| x * x).sum::<f32>() / n).sqrt());
    }

    let mut out = waveform_length;
    out.extend(zero_crossings);
    out.extend(slope_sign_changes);
    out.extend(rms);
    out
}

/// Average spectral power per band and channel, band-major.
fn band_powers(
    window: &ArrayView2<'_, f32>,
    sampling_rate: f32,
    bands: &[(f32, f32)],
    scale: f32,
) -> Vec<f32> {
    let fft_size = window.ncols().next_power_of_two();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let freq_resolution = sampling_rate / fft_size as f32;

    // One power spectrum per channel (positive frequencies only).
    let spectra: Vec<Vec<f32>> = window
        .rows()
        .into_iter()
        .map(|row| {
            let mut buffer: Vec<Complex<f32>> = row
                .iter()
                .map(|&x| Complex::new(x * scale, 0.0))
                .collect();
            buffer.resize(fft_size, Complex::new(0.0, 0.0));
            fft.process(&mut buffer);
            buffer[..fft_size / 2].iter().map(|c| c.norm_sqr()).collect()
        })
        .collect();

    let mut out = Vec::with_capacity(bands.len() * spectra.len());
    for &(low, high) in bands {
        for spectrum in &spectra {
            let high_bin = ((high / freq_resolution) as usize).min(spectrum.len() - 1);
            let low_bin = ((low / freq_resolution) as usize).min(high_bin);
            let band = &spectrum[low_bin..=high_bin];
            out.push(band.iter().sum::<f32>() / band.len() as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, ArrayView2};

    fn sine_window(channels: usize, samples: usize, freq: f32, fs: f32) -> Array2<f32> {
        Array2::from_shape_fn((channels, samples), |(_, t)| {
            (2.0 * std::f32::consts::PI * freq * t as f32 / fs).sin()
        })
    }

    fn views(windows: &[Array2<f32>]) -> Vec<ArrayView2<'_, f32>> {
        windows.iter().map(|w| w.view()).collect()
    }

    #[test]
    fn test_unknown_feature_type() {
        let config = FeatureConfig::named("wavelet");
        assert!(matches!(
            FeaturePipeline::new(&config, Some(100.0)),
            Err(BciError::UnknownFeatureType { .. })
        ));
    }

    #[test]
    fn test_spectral_requires_sampling_rate() {
        let config = FeatureConfig::avg_fft_power(7.0, 14.0);
        assert!(matches!(
            FeaturePipeline::new(&config, None),
            Err(BciError::MissingSamplingRate { .. })
        ));
    }

    #[test]
    fn test_user_kind_requires_transform_object() {
        let config = FeatureConfig::named("user");
        assert!(matches!(
            FeaturePipeline::new(&config, None),
            Err(BciError::InvalidPipelineObject { .. })
        ));
    }

    #[test]
    fn test_fft_band_edges() {
        let bands = fft_band_edges(2.0, 30.0, 2.0, 2.0);
        assert_eq!(bands.len(), 14);
        assert_eq!(bands[0], (2.0, 4.0));
        assert_eq!(bands[13], (28.0, 30.0));
    }

    #[test]
    fn test_raw_passthrough_shape() {
        let mut config = FeatureConfig::raw();
        config.scale_to_microvolts = false;
        let mut pipeline = FeaturePipeline::new(&config, None).unwrap();

        let windows = vec![sine_window(3, 64, 10.0, 128.0); 5];
        let features = pipeline.fit_transform(&views(&windows)).unwrap();
        assert_eq!(features.dim(), (5, 3 * 64));
        assert_eq!(features[[0, 0]], windows[0][[0, 0]]);
    }

    #[test]
    fn test_time_domain_stats_shape_and_rms() {
        let mut config = FeatureConfig::time_stats();
        config.scale_to_microvolts = false;
        let mut pipeline = FeaturePipeline::new(&config, None).unwrap();

        let windows = vec![sine_window(2, 256, 8.0, 256.0)];
        let features = pipeline.fit_transform(&views(&windows)).unwrap();

        // 4 statistics x 2 channels
        assert_eq!(features.dim(), (1, 8));
        // RMS of a sine is ~1/sqrt(2); RMS block is the last two columns.
        assert!((features[[0, 6]] - 0.707).abs() < 0.05);
        // A full 8 Hz second has zero crossings.
        assert!(features[[0, 2]] > 0.0);
    }

    #[test]
    fn test_band_power_finds_oscillation() {
        let fs = 128.0;
        let mut config = FeatureConfig::multi_avg_fft_power(vec![(8.0, 12.0), (28.0, 32.0)]);
        config.scale_to_microvolts = false;
        let mut pipeline = FeaturePipeline::new(&config, Some(fs)).unwrap();

        // 10 Hz oscillation: alpha band power dwarfs the 30 Hz band.
        let windows = vec![sine_window(1, 128, 10.0, fs)];
        let features = pipeline.fit_transform(&views(&windows)).unwrap();
        assert_eq!(features.dim(), (1, 2));
        assert!(features[[0, 0]] > 10.0 * features[[0, 1]]);
    }

    #[test]
    fn test_fit_statistics_frozen_across_transform() {
        let fs = 128.0;
        let mut config = FeatureConfig::avg_fft_power(8.0, 12.0);
        config.scale_to_microvolts = false;
        config.normalize = true;
        let mut pipeline = FeaturePipeline::new(&config, Some(fs)).unwrap();

        let train = vec![
            sine_window(2, 128, 10.0, fs),
            sine_window(2, 128, 11.0, fs),
            sine_window(2, 128, 9.0, fs),
        ];
        pipeline.fit_transform(&views(&train)).unwrap();
        let fitted = pipeline.fitted_stats().unwrap().clone();

        // Transforming test windows with a very different distribution must
        // not shift the recorded fit-time statistics.
        let test = vec![sine_window(2, 128, 30.0, fs); 4];
        pipeline.transform(&views(&test)).unwrap();
        assert_eq!(pipeline.fitted_stats().unwrap(), &fitted);
    }

    #[test]
    fn test_transform_without_fit_fails_when_normalizing() {
        let mut config = FeatureConfig::avg_fft_power(8.0, 12.0);
        config.normalize = true;
        let pipeline = FeaturePipeline::new(&config, Some(128.0)).unwrap();

        let windows = vec![sine_window(2, 128, 10.0, 128.0)];
        assert!(matches!(
            pipeline.transform(&views(&windows)),
            Err(BciError::InvalidPipelineObject { .. })
        ));
    }

    #[test]
    fn test_restored_stats_enable_transform() {
        let fs = 128.0;
        let mut config = FeatureConfig::avg_fft_power(8.0, 12.0);
        config.scale_to_microvolts = false;
        config.normalize = true;

        let train = vec![
            sine_window(1, 128, 10.0, fs),
            sine_window(1, 128, 9.0, fs),
        ];
        let mut fitted = FeaturePipeline::new(&config, Some(fs)).unwrap();
        let expected = fitted.fit_transform(&views(&train)).unwrap();
        let stats = fitted.fitted_stats().unwrap().clone();

        let mut restored = FeaturePipeline::new(&config, Some(fs)).unwrap();
        restored.restore_stats(stats);
        let out = restored.transform(&views(&train)).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_raw_channel_wise_standardization() {
        let mut config = FeatureConfig::raw();
        config.scale_to_microvolts = false;
        config.normalize = true;
        let mut pipeline = FeaturePipeline::new(&config, None).unwrap();

        // Channel 0 takes values 1/3 across windows, channel 1 takes 10/14;
        // each channel standardizes with its own mean and deviation.
        let low = ndarray::arr2(&[[1.0f32, 1.0], [10.0, 10.0]]);
        let high = ndarray::arr2(&[[3.0f32, 3.0], [14.0, 14.0]]);
        let features = pipeline
            .fit_transform(&[low.view(), high.view()])
            .unwrap();

        // Channel 0: mean 2, std 1 -> -1 / +1.
        assert!((features[[0, 0]] - (-1.0)).abs() < 1e-5);
        assert!((features[[1, 0]] - 1.0).abs() < 1e-5);
        // Channel 1: mean 12, std 2 -> -1 / +1.
        assert!((features[[0, 2]] - (-1.0)).abs() < 1e-5);
        assert!((features[[1, 2]] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_custom_transform_object() {
        struct WindowMean;

        impl FeatureTransform for WindowMean {
            fn fit_transform(
                &mut self,
                windows: &[ArrayView2<'_, f32>],
            ) -> BciResult<Array2<f32>> {
                self.transform(windows)
            }

            fn transform(&self, windows: &[ArrayView2<'_, f32>]) -> BciResult<Array2<f32>> {
                let rows: Vec<f32> = windows
                    .iter()
                    .map(|w| w.sum() / w.len() as f32)
                    .collect();
                Array2::from_shape_vec((windows.len(), 1), rows).map_err(|e| {
                    BciError::InvalidParameter {
                        name: "windows",
                        reason: e.to_string(),
                    }
                })
            }
        }

        let mut pipeline = FeaturePipeline::with_custom(Box::new(WindowMean));
        let windows = vec![Array2::from_elem((2, 10), 3.0)];
        let features = pipeline.fit_transform(&views(&windows)).unwrap();
        assert_eq!(features.dim(), (1, 1));
        assert!((features[[0, 0]] - 3.0).abs() < 1e-6);
    }
}
