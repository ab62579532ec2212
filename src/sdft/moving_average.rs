use std::ops::{Add, Div, Sub};

use super::ring::RingBuffer;

/// Samples averaged by each smoother unless configured otherwise.
pub const DEFAULT_WINDOW: usize = 3200;

/// Streaming mean over the last `W` updates.
///
/// The window starts zero-filled, so the first `W - 1` averages are pulled
/// toward zero. Downstream numbers depend on that warm-up; keep it.
#[derive(Clone, Debug)]
pub struct MovingAverage<T> {
    window: RingBuffer<T>,
    average: T,
}

impl<T> MovingAverage<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Div<f64, Output = T>,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            window: RingBuffer::new(capacity),
            average: T::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    #[inline]
    pub fn average(&self) -> T {
        self.average
    }

    pub fn update(&mut self, value: T) -> T {
        let w = self.window.capacity() as f64;

        let oldest = self.window.push(value);

        self.average = self.average - (oldest / w) + (value / w);

        self.average
    }
}

impl<T> Default for MovingAverage<T>
where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Div<f64, Output = T>,
{
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
