use indicatif::ProgressBar;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use serde::Serialize;

use super::bin::{frame_count, BinFrame, SlidingSpectralBin};
use super::moving_average::DEFAULT_WINDOW;
use super::plan::{samples_per_frame, BinPlan};
use crate::error::{Error, Result};
use crate::Matrix;

/// Moving average sizes shared by every bin in a bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmoothingWindows {
    pub amplitude: usize,
    pub sample: usize,
}

impl Default for SmoothingWindows {
    fn default() -> Self {
        Self {
            amplitude: DEFAULT_WINDOW,
            sample: DEFAULT_WINDOW,
        }
    }
}

/// A monitored key. `index` is its position in the requested frequency list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Key {
    pub index: usize,
    pub frequency: f64,
}

/// One sliding DFT bin per key, all at the same sample rate and output rate.
pub struct KeyBank {
    keys: Vec<Key>,
    bins: Vec<SlidingSpectralBin>,
    sample_rate: u32,
    output_rate: u32,
    hop: usize,
    progress: ProgressBar,
}

/// Frame-major results of [`KeyBank::analyze`]. Column `j` of each matrix belongs to `keys[j]`.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub keys: Vec<Key>,
    pub plans: Vec<BinPlan>,
    pub sample_rate: u32,
    pub output_rate: u32,
    /// smoothed X_k. Its norm is the key's level
    pub amplitudes: Matrix<Complex<f64>>,
    /// smoothed samples recovered through each key's recurrence
    pub reconstructed: Matrix<Complex<f64>>,
    /// |X_k sliding - X_k exact| for each key's final window
    pub drift: Vec<f64>,
}

impl KeyBank {
    /// Resolve a bin for every frequency.
    ///
    /// Keys that no window can represent are skipped with a warning. Fails only if the
    /// rates are unusable or every key was skipped.
    pub fn new(
        frequencies: &[f64],
        sample_rate: u32,
        output_rate: u32,
        windows: SmoothingWindows,
    ) -> Result<Self> {
        let hop = samples_per_frame(sample_rate, output_rate)?;

        let mut keys = Vec::with_capacity(frequencies.len());
        let mut bins = Vec::with_capacity(frequencies.len());

        for (index, &frequency) in frequencies.iter().enumerate() {
            match BinPlan::resolve(frequency, sample_rate, output_rate) {
                Ok(plan) => {
                    keys.push(Key { index, frequency });
                    bins.push(SlidingSpectralBin::new(plan, windows.amplitude, windows.sample));
                }
                Err(err @ Error::InfeasibleFrequency { .. }) => {
                    log::warn!("skipping key {}: {}", index, err);
                }
                Err(err) => return Err(err),
            }
        }

        if bins.is_empty() {
            return Err(Error::NoFeasibleKeys(frequencies.len()));
        }

        log::info!(
            "Key bank: {}/{} keys, {} samples per frame",
            bins.len(),
            frequencies.len(),
            hop
        );

        Ok(Self {
            keys,
            bins,
            sample_rate,
            output_rate,
            hop,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report each finished key on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(self.bins.len() as u64);
        self.progress = progress;
        self
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn plans(&self) -> impl Iterator<Item = &BinPlan> {
        self.bins.iter().map(|bin| bin.plan())
    }

    /// Run the whole waveform through every bin and transpose to frame-major matrices.
    ///
    /// `samples` must be recorded at the bank's sample rate. That is not checked.
    pub fn analyze(self, samples: &[f64]) -> Analysis {
        let plans: Vec<BinPlan> = self.plans().cloned().collect();
        let progress = self.progress;

        let per_key: Vec<(Vec<BinFrame>, f64)> = self
            .bins
            .into_par_iter()
            .map(|bin| {
                let mut parse = bin.parse(samples.iter().copied());
                let frames: Vec<BinFrame> = parse.by_ref().collect();
                let drift = parse.into_inner().drift();

                progress.inc(1);

                (frames, drift)
            })
            .collect();

        progress.finish_and_clear();

        let rows = frame_count(samples.len(), self.hop);
        debug_assert!(per_key.iter().all(|(frames, _)| frames.len() == rows));

        let mut amplitudes = vec![Vec::with_capacity(per_key.len()); rows];
        let mut reconstructed = vec![Vec::with_capacity(per_key.len()); rows];

        for (frames, _) in &per_key {
            for (t, frame) in frames.iter().enumerate() {
                amplitudes[t].push(frame.amplitude);
                reconstructed[t].push(frame.sample);
            }
        }

        log::info!("Analyzed {} frames x {} keys", rows, per_key.len());

        Analysis {
            keys: self.keys,
            plans,
            sample_rate: self.sample_rate,
            output_rate: self.output_rate,
            amplitudes,
            reconstructed,
            drift: per_key.into_iter().map(|(_, drift)| drift).collect(),
        }
    }
}

/// Build a bank for `frequencies` and analyze `samples` with it.
pub fn analyze(
    samples: &[f64],
    frequencies: &[f64],
    sample_rate: u32,
    output_rate: u32,
    windows: SmoothingWindows,
) -> Result<Analysis> {
    Ok(KeyBank::new(frequencies, sample_rate, output_rate, windows)?.analyze(samples))
}
