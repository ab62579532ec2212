//! Per-key sliding DFT.

pub mod bank;
pub mod bin;
pub mod moving_average;
pub mod plan;
pub mod ring;

pub use bank::{analyze, Analysis, Key, KeyBank, SmoothingWindows};
pub use bin::{BinFrame, SlidingSpectralBin};
pub use moving_average::MovingAverage;
pub use plan::BinPlan;
pub use ring::RingBuffer;
