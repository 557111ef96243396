//! # Forensic Feature Extraction
//!
//! Computes the acoustic markers used to separate synthetic speech from
//! natural speech:
//!
//! - **Spectral centroid trajectory**: the frequency-weighted center of mass
//!   of each short analysis window, in Hz. Its variance over time is the
//!   forensic signal consumed by the classifier; synthetic voices tend to
//!   hold an unnaturally stable centroid.
//! - **Cepstral coefficients**: 13 MFCCs per window (log-mel energies
//!   followed by a DCT-II), summarised as a frame-to-frame stability
//!   statistic. Not consumed by the reference decision policy, but kept in
//!   the summary so richer policies can use it without a contract change.
//!
//! Extraction is a pure function of the waveform: the same input always
//! produces a bit-identical summary. All FFT state is request-local.

use crate::detection::decoder::Waveform;
use crate::error::{AppError, AppResult};
use rustfft::{num_complex::Complex, FftPlanner};

/// Windowing and cepstral parameters for spectral analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// STFT window length in samples.
    pub fft_size: usize,

    /// Hop between consecutive analysis windows in samples.
    pub hop_size: usize,

    /// Number of triangular mel filters applied to each magnitude frame.
    pub mel_bands: usize,

    /// Number of cepstral coefficients kept per frame.
    pub mfcc_coefficients: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            mel_bands: 40,
            mfcc_coefficients: 13,
        }
    }
}

/// Scalar statistics derived from one waveform.
///
/// Produced once per request and consumed once by the classifier. The
/// centroid variance is the only statistic the reference policy reads;
/// `sample_count` is the duration proxy and `mfcc_stability` is carried for
/// future policies.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    /// Population variance of the spectral-centroid series, in Hz squared.
    /// Always a non-negative finite number.
    pub centroid_variance: f64,

    /// Total number of waveform samples analyzed.
    pub sample_count: usize,

    /// Mean Euclidean distance between consecutive MFCC frames. Zero for
    /// single-frame clips.
    pub mfcc_stability: f64,
}

/// Extract the feature summary from a decoded waveform.
///
/// ## Failure modes:
/// `DegenerateSignal` when the waveform is empty, shorter than one analysis
/// window, or silent in a way that leaves the centroid variance undefined
/// (NaN). The undefined statistic is propagated as an error instead of being
/// coerced to zero.
pub fn extract(waveform: &Waveform, config: &AnalysisConfig) -> AppResult<FeatureSummary> {
    if waveform.samples.is_empty() {
        return Err(AppError::DegenerateSignal("waveform contains no samples".to_string()));
    }
    if waveform.sample_rate == 0 {
        return Err(AppError::DegenerateSignal("waveform reports a zero sample rate".to_string()));
    }
    if waveform.samples.len() < config.fft_size {
        return Err(AppError::DegenerateSignal(format!(
            "waveform too short for windowed analysis ({} samples, window is {})",
            waveform.samples.len(),
            config.fft_size
        )));
    }

    let spectrogram = magnitude_spectrogram(&waveform.samples, config);

    let centroids = centroid_series(&spectrogram, waveform.sample_rate, config.fft_size);
    let centroid_variance = population_variance(&centroids);
    if !centroid_variance.is_finite() {
        return Err(AppError::DegenerateSignal(
            "silent input produced an undefined spectral-centroid variance".to_string(),
        ));
    }

    let cepstra = mfcc_frames(&spectrogram, waveform.sample_rate, config);
    let mfcc_stability = frame_stability(&cepstra);

    Ok(FeatureSummary {
        centroid_variance,
        sample_count: waveform.samples.len(),
        mfcc_stability,
    })
}

/// Compute the magnitude spectrogram: one frame of `fft_size / 2 + 1`
/// magnitude bins per analysis window.
///
/// Uses a periodic Hann window; the FFT plan and scratch buffers live on the
/// stack of this call, so concurrent extractions never share state.
fn magnitude_spectrogram(samples: &[f32], config: &AnalysisConfig) -> Vec<Vec<f32>> {
    let fft_size = config.fft_size;
    let hop_size = config.hop_size;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];
    let mut frame = vec![Complex::new(0.0f32, 0.0); fft_size];

    // Periodic Hann window (divides by N, not N-1) to avoid the boundary
    // discontinuity when frames overlap.
    let window: Vec<f32> = (0..fft_size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos()))
        .collect();

    let num_frames = (samples.len() - fft_size) / hop_size + 1;
    let num_bins = fft_size / 2 + 1;
    let mut spectrogram = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;

        for i in 0..fft_size {
            frame[i] = Complex::new(samples[start + i] * window[i], 0.0);
        }

        fft.process_with_scratch(&mut frame, &mut scratch);

        let magnitudes: Vec<f32> = frame[..num_bins]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect();

        spectrogram.push(magnitudes);
    }

    spectrogram
}

/// Spectral centroid of each frame, in Hz.
///
/// A frame with zero spectral mass has no defined centroid and yields NaN;
/// the caller decides what an undefined statistic means.
fn centroid_series(spectrogram: &[Vec<f32>], sample_rate: u32, fft_size: usize) -> Vec<f64> {
    let bin_hz = sample_rate as f64 / fft_size as f64;

    spectrogram
        .iter()
        .map(|frame| {
            let mut weighted = 0.0f64;
            let mut total = 0.0f64;
            for (bin, &magnitude) in frame.iter().enumerate() {
                weighted += bin as f64 * bin_hz * magnitude as f64;
                total += magnitude as f64;
            }
            weighted / total
        })
        .collect()
}

/// Population variance (mean squared deviation) of a series.
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

/// MFCC frames: log-mel filterbank energies followed by a DCT-II, keeping
/// the configured number of coefficients.
fn mfcc_frames(spectrogram: &[Vec<f32>], sample_rate: u32, config: &AnalysisConfig) -> Vec<Vec<f64>> {
    let num_bins = config.fft_size / 2 + 1;
    let filterbank = mel_filterbank(sample_rate, config.fft_size, config.mel_bands);

    spectrogram
        .iter()
        .map(|frame| {
            // Log-scaled mel energies, floored to keep the log finite.
            let mut log_mel = vec![0.0f64; config.mel_bands];
            for m in 0..config.mel_bands {
                let mut energy = 0.0f64;
                for b in 0..num_bins {
                    energy += frame[b] as f64 * filterbank[m * num_bins + b] as f64;
                }
                log_mel[m] = energy.max(1e-10).ln();
            }

            dct_ii(&log_mel, config.mfcc_coefficients)
        })
        .collect()
}

/// DCT-II of `input`, truncated to the first `coefficients` terms.
fn dct_ii(input: &[f64], coefficients: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..coefficients)
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos())
                .sum()
        })
        .collect()
}

/// Mean Euclidean distance between consecutive coefficient frames.
fn frame_stability(frames: &[Vec<f64>]) -> f64 {
    if frames.len() < 2 {
        return 0.0;
    }
    let total: f64 = frames
        .windows(2)
        .map(|pair| {
            pair[0]
                .iter()
                .zip(pair[1].iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt()
        })
        .sum();
    total / (frames.len() - 1) as f64
}

/// Convert frequency in Hz to the mel scale.
#[inline]
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel back to Hz.
#[inline]
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank matrix, `mel_bands` x `fft_size / 2 + 1`.
fn mel_filterbank(sample_rate: u32, fft_size: usize, mel_bands: usize) -> Vec<f32> {
    let num_bins = fft_size / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(nyquist);

    let mel_points: Vec<f32> = (0..mel_bands + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (mel_bands + 1) as f32)
        .collect();

    let bin_points: Vec<f32> = mel_points
        .iter()
        .map(|&m| mel_to_hz(m) * fft_size as f32 / sample_rate as f32)
        .collect();

    let mut filterbank = vec![0.0f32; mel_bands * num_bins];

    for m in 0..mel_bands {
        let left = bin_points[m];
        let center = bin_points[m + 1];
        let right = bin_points[m + 2];

        for b in 0..num_bins {
            let freq = b as f32;
            let weight = if freq >= left && freq <= center {
                (freq - left) / (center - left + 1e-10)
            } else if freq > center && freq <= right {
                (right - freq) / (right - center + 1e-10)
            } else {
                0.0
            };
            filterbank[m * num_bins + b] = weight;
        }
    }

    filterbank
}
