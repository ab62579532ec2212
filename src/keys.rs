//! Equal-tempered piano keys, A0 through C8.

pub const KEY_COUNT: usize = 88;

/// Key number (1-based) of A4.
const A4_KEY: i32 = 49;
const A4_HZ: f64 = 440.0;

/// Frequency of key `n` (1-based), rounded to the millihertz.
pub fn key_frequency(n: u32) -> f64 {
    let f = A4_HZ * 2f64.powf((n as i32 - A4_KEY) as f64 / 12.0);

    (f * 1000.0).round() / 1000.0
}

/// All 88 key frequencies, lowest first.
pub fn piano_key_frequencies() -> Vec<f64> {
    (1..=KEY_COUNT as u32).map(key_frequency).collect()
}

/// Column label used in the interchange tables.
///
/// Whole frequencies keep one decimal place (`key48_440.0Hz`) so the headers
/// match tables written by other tools.
pub fn key_label(index: usize, frequency: f64) -> String {
    if frequency.fract() == 0.0 {
        format!("key{index}_{frequency:.1}Hz")
    } else {
        format!("key{index}_{frequency}Hz")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_endpoints() {
        let keys = piano_key_frequencies();

        assert_eq!(keys.len(), KEY_COUNT);
        assert_eq!(keys[0], 27.5);
        assert_eq!(keys[1], 29.135);
        assert_eq!(keys[48], 440.0);
        assert_eq!(keys[87], 4186.009);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn labels() {
        assert_eq!(key_label(0, 27.5), "key0_27.5Hz");
        assert_eq!(key_label(48, 440.0), "key48_440.0Hz");
        assert_eq!(key_label(1, 29.135), "key1_29.135Hz");
    }
}
