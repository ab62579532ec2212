//! Naive alternative to the decay scheduler: press whenever a key got louder.

use rayon::prelude::*;

use super::{transpose, KeyEvent};
use crate::levels::peak;
use crate::Matrix;

pub const DEFAULT_RISING_THRESHOLD: f64 = 0.05;

/// Press a key at frame `n` when its amplitude rose since frame `n - 1` and is
/// more than `threshold` of the loudest amplitude anywhere in the matrix.
///
/// Strength is relative to that loudest amplitude. Releases are never emitted, and
/// frame 0 never presses.
pub fn rising_note_matrix(amplitudes: &Matrix<f64>, threshold: f64) -> Matrix<KeyEvent> {
    let rows = amplitudes.len();
    let width = amplitudes.first().map_or(0, |row| row.len());

    let loudest = peak(amplitudes);
    if rows < 2 || loudest == 0.0 {
        return vec![vec![KeyEvent::Steady; width]; rows];
    }

    let per_key: Vec<Vec<KeyEvent>> = (0..width)
        .into_par_iter()
        .map(|key| {
            let mut events = vec![KeyEvent::Steady; rows];

            for n in 1..rows {
                let previous = amplitudes[n - 1][key].abs();
                let current = amplitudes[n][key].abs();

                if current > previous {
                    let strength = current / loudest;
                    if strength > threshold {
                        events[n] = KeyEvent::Press(strength);
                    }
                }
            }

            events
        })
        .collect();

    transpose(per_key, rows)
}
