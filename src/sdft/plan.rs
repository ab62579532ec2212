use serde::Serialize;

use crate::error::{Error, Result};

/// Where one key's frequency lands in a sliding DFT.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinPlan {
    /// the requested frequency in Hz
    pub frequency: f64,
    /// analysis window length (N)
    pub window_len: usize,
    /// bin index inside the window (k)
    pub bin: usize,
    /// `frequency` rounded down onto the window's bin spacing
    pub effective_frequency: f64,
    /// raw samples per output frame. also the (exclusive) ceiling on `window_len`
    pub hop: usize,
}

impl BinPlan {
    /// Find the shortest window whose bin spacing divides `frequency` most evenly.
    ///
    /// Candidate windows run from 1 up to (not including) `sample_rate / output_rate`.
    /// Ties keep the shorter window.
    pub fn resolve(frequency: f64, sample_rate: u32, output_rate: u32) -> Result<Self> {
        let hop = samples_per_frame(sample_rate, output_rate)?;

        let infeasible = || Error::InfeasibleFrequency {
            frequency,
            sample_rate,
            output_rate,
        };

        if !frequency.is_finite() || frequency < 0.0 {
            return Err(infeasible());
        }

        let fs = sample_rate as f64;

        let mut best: Option<(usize, f64)> = None;
        for n in 1..hop {
            let resolution = fs / n as f64;
            let error = frequency % resolution;

            if best.map_or(true, |(_, min)| error < min) {
                best = Some((n, error));
            }
        }

        let (window_len, error) = best.ok_or_else(infeasible)?;

        let effective_frequency = frequency - error;
        let effective_bandwidth = (sample_rate as usize / window_len) as f64;
        let bin = (effective_frequency / effective_bandwidth).floor() as usize;

        if bin >= window_len {
            return Err(infeasible());
        }

        log::debug!(
            "{:.3}Hz -> N = {}, k = {} (effective {:.3}Hz)",
            frequency,
            window_len,
            bin,
            effective_frequency
        );

        Ok(Self {
            frequency,
            window_len,
            bin,
            effective_frequency,
            hop,
        })
    }
}

/// Raw samples between output frames (N_max).
pub fn samples_per_frame(sample_rate: u32, output_rate: u32) -> Result<usize> {
    let invalid = Error::InvalidRate {
        sample_rate,
        output_rate,
    };

    if output_rate == 0 {
        return Err(invalid);
    }

    let hop = (sample_rate / output_rate) as usize;

    // need at least one candidate window below the hop
    if hop < 2 {
        return Err(invalid);
    }

    Ok(hop)
}
