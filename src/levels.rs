//! Conversions from raw bin amplitudes to the scales the tables and the scheduler use.

use rustfft::num_complex::Complex;

use crate::Matrix;

/// Full scale of a signed 16-bit sample.
pub const DEFAULT_REFERENCE_AMPLITUDE: f64 = 32767.0;

/// `100 * |a| / reference` for every cell.
pub fn percent_matrix(amplitudes: &Matrix<Complex<f64>>, reference: f64) -> Matrix<f64> {
    amplitudes
        .iter()
        .map(|row| row.iter().map(|a| 100.0 * a.norm() / reference).collect())
        .collect()
}

/// Volumes in `[0, 1]` for the scheduler.
///
/// Cells under `floor` percent are zeroed first. The rest become fractions and are
/// scaled so the loudest surviving cell is 1.0. If nothing survives the matrix is all zeros.
pub fn volume_matrix(percent: &Matrix<f64>, floor: f64) -> Matrix<f64> {
    let gated: Matrix<f64> = percent
        .iter()
        .map(|row| {
            row.iter()
                .map(|&p| if p >= floor { p / 100.0 } else { 0.0 })
                .collect()
        })
        .collect();

    let peak = peak(&gated);
    if peak == 0.0 {
        return gated;
    }

    gated
        .into_iter()
        .map(|row| row.into_iter().map(|v| v / peak).collect())
        .collect()
}

/// Largest absolute value in the matrix, or 0 for an empty one.
pub fn peak(matrix: &Matrix<f64>) -> f64 {
    matrix
        .iter()
        .flatten()
        .fold(0.0f64, |max, v| max.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_reference() {
        let amplitudes = vec![
            vec![Complex::new(0.0, 0.0), Complex::new(32767.0, 0.0)],
            vec![Complex::new(-16383.5, 0.0), Complex::new(0.0, 3276.7)],
        ];

        let percent = percent_matrix(&amplitudes, DEFAULT_REFERENCE_AMPLITUDE);

        assert_eq!(percent[0], [0.0, 100.0]);
        assert!((percent[1][0] - 50.0).abs() < 1e-9);
        assert!((percent[1][1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn volumes_peak_at_one() {
        let percent = vec![vec![10.0, 40.0], vec![20.0, 0.0]];

        let volumes = volume_matrix(&percent, 0.0);

        assert_eq!(volumes, vec![vec![0.25, 1.0], vec![0.5, 0.0]]);
    }

    #[test]
    fn percent_uses_the_norm() {
        let amplitudes = vec![vec![Complex::new(3.0, -4.0)]];

        assert_eq!(percent_matrix(&amplitudes, 10.0), vec![vec![50.0]]);
    }

    #[test]
    fn floor_applies_before_scaling() {
        // 20 survives the floor and becomes the peak, so 10 and 5 are gone
        let percent = vec![vec![10.0, 20.0], vec![5.0, 40.0]];

        let volumes = volume_matrix(&percent, 15.0);

        assert_eq!(volumes, vec![vec![0.0, 0.5], vec![0.0, 1.0]]);
    }

    #[test]
    fn quiet_table_is_silenced() {
        // nothing reaches 8%, so scaling must not lift the 4% cells to full volume
        let percent = vec![vec![4.0, 0.0], vec![0.0, 0.0], vec![4.0, 3.5]];

        let volumes = volume_matrix(&percent, 8.0);

        assert!(volumes.iter().flatten().all(|&v| v == 0.0));
        assert_eq!(volumes.len(), 3);
    }

    #[test]
    fn silent_and_empty() {
        assert_eq!(volume_matrix(&vec![vec![0.0, 0.0]], 8.0), vec![vec![0.0, 0.0]]);
        assert!(volume_matrix(&Vec::new(), 8.0).is_empty());
        assert_eq!(peak(&Vec::new()), 0.0);
    }
}
