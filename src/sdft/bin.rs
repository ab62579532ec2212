use rustfft::{num_complex::Complex, FftPlanner};

use super::moving_average::MovingAverage;
use super::plan::BinPlan;
use super::ring::RingBuffer;
use crate::error::Result;

/// Smoothed outputs of one bin at one output frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BinFrame {
    /// moving average of X_k. Take the norm for a level
    pub amplitude: Complex<f64>,
    /// moving average of the sample recovered from the recurrence
    pub sample: Complex<f64>,
}

/// Streaming state for a single frequency of a sliding DFT.
///
/// `X_k(n) = (X_k(n-1) - x[n-N] + x[n]) * e^(i*2*pi*k/N)`
///
/// The window starts zero-filled. Values from the first N updates are valid but
/// describe a window that is still partly zeros.
#[derive(Clone, Debug)]
pub struct SlidingSpectralBin {
    plan: BinPlan,
    window: RingBuffer<f64>,
    /// e^(i*2*pi*k/N)
    twiddle: Complex<f64>,
    accumulator: Complex<f64>,
    count: usize,
    amplitude: MovingAverage<Complex<f64>>,
    sample: MovingAverage<Complex<f64>>,
}

impl SlidingSpectralBin {
    pub fn new(plan: BinPlan, amplitude_window: usize, sample_window: usize) -> Self {
        let angle = 2.0 * std::f64::consts::PI * plan.bin as f64 / plan.window_len as f64;

        Self {
            window: RingBuffer::new(plan.window_len),
            twiddle: Complex::from_polar(1.0, angle),
            accumulator: Complex::new(0.0, 0.0),
            count: 0,
            amplitude: MovingAverage::new(amplitude_window),
            sample: MovingAverage::new(sample_window),
            plan,
        }
    }

    /// Resolve the plan for `frequency` and build a bin around it.
    pub fn for_frequency(
        frequency: f64,
        sample_rate: u32,
        output_rate: u32,
        amplitude_window: usize,
        sample_window: usize,
    ) -> Result<Self> {
        let plan = BinPlan::resolve(frequency, sample_rate, output_rate)?;

        Ok(Self::new(plan, amplitude_window, sample_window))
    }

    #[inline]
    pub fn plan(&self) -> &BinPlan {
        &self.plan
    }

    #[inline]
    pub fn accumulator(&self) -> Complex<f64> {
        self.accumulator
    }

    /// Samples fed so far.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn frame(&self) -> BinFrame {
        BinFrame {
            amplitude: self.amplitude.average(),
            sample: self.sample.average(),
        }
    }

    pub fn update(&mut self, x: f64) {
        let evicted = self.window.oldest();
        let previous = self.accumulator;

        self.accumulator = (previous - evicted + x) * self.twiddle;

        // run x[n] back out of the recurrence so it carries the same rounding as X_k
        let recovered = self.accumulator * self.twiddle.conj() - previous + evicted;
        self.sample.update(recovered);

        self.window.push(x);
        self.count += 1;

        self.amplitude.update(self.accumulator);
    }

    /// Feed every sample through the bin, yielding a frame after samples 0, hop, 2*hop, ...
    ///
    /// Consumes the bin. Use [`Parse::into_inner`] to get it back afterwards.
    pub fn parse<I>(self, samples: I) -> Parse<I::IntoIter>
    where
        I: IntoIterator<Item = f64>,
    {
        Parse {
            bin: self,
            samples: samples.into_iter(),
        }
    }

    /// Distance between the running accumulator and bin k of the current window
    /// computed from scratch.
    ///
    /// The recurrence never recomputes X_k, so rounding error builds up over long inputs.
    pub fn drift(&self) -> f64 {
        let n = self.plan.window_len;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);

        let mut buffer: Vec<Complex<f64>> =
            self.window.iter().map(|x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        (self.accumulator - buffer[self.plan.bin]).norm()
    }
}

/// Lazy frames from [`SlidingSpectralBin::parse`].
pub struct Parse<I> {
    bin: SlidingSpectralBin,
    samples: I,
}

impl<I> Parse<I> {
    pub fn into_inner(self) -> SlidingSpectralBin {
        self.bin
    }
}

impl<I: Iterator<Item = f64>> Iterator for Parse<I> {
    type Item = BinFrame;

    fn next(&mut self) -> Option<BinFrame> {
        let hop = self.bin.plan.hop;

        for x in self.samples.by_ref() {
            let index = self.bin.count;

            self.bin.update(x);

            if index % hop == 0 {
                return Some(self.bin.frame());
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let hop = self.bin.plan.hop;
        let next = self.bin.count;
        let (low, high) = self.samples.size_hint();

        let frames = |remaining: usize| frames_in(next, remaining, hop);

        (frames(low), high.map(frames))
    }
}

/// Frames emitted when feeding `remaining` samples starting at sample index `next`.
fn frames_in(next: usize, remaining: usize, hop: usize) -> usize {
    if remaining == 0 {
        return 0;
    }

    let last = next + remaining - 1;
    let emitted_before = if next == 0 { 0 } else { (next - 1) / hop + 1 };

    last / hop + 1 - emitted_before
}

/// Frames produced by parsing `len` samples from a fresh bin.
pub fn frame_count(len: usize, hop: usize) -> usize {
    frames_in(0, len, hop)
}

#[cfg(test)]
mod tests {
    use super::{frame_count, SlidingSpectralBin};
    use crate::sdft::moving_average::MovingAverage;
    use crate::sdft::plan::BinPlan;
    use rustfft::num_complex::Complex;

    fn sine(frequency: f64, amplitude: f64, sample_rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                let t = n as f64 / sample_rate as f64;
                amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// 1000Hz at 8kHz lands on N = 8, k = 1 with 800 samples per frame.
    fn small_bin(amplitude_window: usize) -> SlidingSpectralBin {
        let plan = BinPlan::resolve(1000.0, 8_000, 10).unwrap();
        SlidingSpectralBin::new(plan, amplitude_window, amplitude_window)
    }

    #[test]
    fn silence_stays_silent() {
        let frames: Vec<_> = small_bin(16).parse(vec![0.0; 5000]).collect();

        assert_eq!(frames.len(), frame_count(5000, 800));
        assert!(frames.iter().all(|f| f.amplitude.norm() == 0.0));
        assert!(frames.iter().all(|f| f.sample.norm() == 0.0));
    }

    #[test]
    fn frame_counts() {
        for (len, expected) in [(0, 0), (1, 1), (800, 1), (801, 2), (2400, 3), (2401, 4)] {
            let frames = small_bin(4).parse(vec![0.5; len]).count();

            assert_eq!(frames, expected, "len={len}");
            assert_eq!(frame_count(len, 800), expected, "len={len}");
        }
    }

    #[test]
    fn size_hint_matches_output() {
        let mut parse = small_bin(4).parse(vec![1.0; 2000]);

        assert_eq!(parse.size_hint(), (3, Some(3)));
        parse.next();
        assert_eq!(parse.size_hint(), (2, Some(2)));
        assert_eq!(parse.count(), 2);
    }

    #[test]
    fn first_frame_is_the_first_sample() {
        let mut bin = small_bin(1);
        bin.update(2.0);

        // X = 2 * twiddle, so |X| = 2 and the recovered sample is exactly 2
        let frame = bin.frame();
        assert!((frame.amplitude.norm() - 2.0).abs() < 1e-12);
        assert!((frame.sample.re - 2.0).abs() < 1e-12);
        assert!(frame.sample.im.abs() < 1e-12);
    }

    #[test]
    fn pure_tone_converges_after_one_window() {
        let window_len = 8;
        // N/2 * A for a tone sitting exactly on bin k
        let expected = 4.0 * 3.0;

        let mut bin = small_bin(1);
        for (n, x) in sine(1000.0, 3.0, 8_000, 400).into_iter().enumerate() {
            bin.update(x);

            if n + 1 >= window_len {
                let magnitude = bin.accumulator().norm();
                assert!((magnitude - expected).abs() < 1e-9, "n={n}: {magnitude}");
            }
        }
    }

    #[test]
    fn smoothed_amplitude_settles_on_the_tone() {
        let w = 12;
        // X keeps |X| = 12 but turns by pi/4 every sample, so the mean of the last
        // w values has |mean| = 12 * |sin(w*pi/8)| / (w * sin(pi/8))
        let turn = std::f64::consts::PI / 8.0;
        let expected = 12.0 * (w as f64 * turn).sin().abs() / (w as f64 * turn.sin());

        let frames: Vec<_> = small_bin(w)
            .parse(sine(1000.0, 3.0, 8_000, 8_000))
            .collect();

        assert_eq!(frames[0].amplitude.norm(), 0.0);
        for frame in &frames[1..] {
            assert!((frame.amplitude.norm() - expected).abs() < 1e-9, "{frame:?}");
        }
    }

    #[test]
    fn amplitude_is_the_complex_mean_of_the_accumulator() {
        let plan = BinPlan::resolve(440.0, 48_000, 15).unwrap();
        let mut bin = SlidingSpectralBin::new(plan, 3200, 3200);
        let mut mean = MovingAverage::<Complex<f64>>::new(3200);

        for x in sine(440.0, 10_000.0, 48_000, 48_000 * 2) {
            bin.update(x);
            mean.update(bin.accumulator());

            assert_eq!(bin.frame().amplitude, mean.average());
        }

        // |X| = 600 * 10_000, but 3200 samples cover 29 1/3 turns of X, leaving
        // 6e6 * |sin(29 1/3 * pi)| / (3200 * sin(11 * pi / 1200)) ~ 56_393.7
        let level = bin.frame().amplitude.norm();
        assert!((bin.accumulator().norm() / 6.0e6 - 1.0).abs() < 1e-6);
        assert!((level / 56_393.704 - 1.0).abs() < 1e-5, "{level}");
    }

    #[test]
    fn off_bin_tone_is_weaker() {
        let plan = BinPlan::resolve(1000.0, 8_000, 10).unwrap();
        let bin = SlidingSpectralBin::new(plan, 12, 12);

        let on = small_bin(12)
            .parse(sine(1000.0, 1.0, 8_000, 4000))
            .last()
            .unwrap()
            .amplitude
            .norm();
        let off = bin
            .parse(sine(3000.0, 1.0, 8_000, 4000))
            .last()
            .unwrap()
            .amplitude
            .norm();

        assert!(on > 10.0 * off, "on={on} off={off}");
    }

    #[test]
    fn recovers_the_input_sample() {
        let mut bin = small_bin(1);

        for x in sine(440.0, 1000.0, 8_000, 1000) {
            bin.update(x);
            let recovered = bin.frame().sample;

            assert!((recovered.re - x).abs() < 1e-6, "{recovered} vs {x}");
            assert!(recovered.im.abs() < 1e-6);
        }
    }

    #[test_log::test]
    fn drift_is_small_but_measurable() {
        let plan = BinPlan::resolve(440.0, 48_000, 15).unwrap();
        let mut bin = SlidingSpectralBin::new(plan, 16, 16);

        for x in sine(440.0, 32_767.0, 48_000, 48_000 * 2) {
            bin.update(x);
        }

        let drift = bin.drift();
        let magnitude = bin.accumulator().norm();
        log::info!("drift after 2s: {drift:e} against |X| = {magnitude:e}");

        assert!(magnitude > 1.0e6);
        assert!(drift / magnitude < 1e-6);
    }

    #[test]
    fn into_inner_returns_the_fed_bin() {
        let mut parse = small_bin(4).parse(vec![1.0; 10]);
        parse.by_ref().for_each(drop);

        let bin = parse.into_inner();
        assert_eq!(bin.count(), 10);
        assert!(bin.drift() < 1e-9);
    }
}
