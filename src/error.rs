use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No candidate window puts the frequency in a bin with `0 <= k < N`.
    #[error("no analysis window fits {frequency}Hz at {sample_rate}Hz sampled, {output_rate} frames/s")]
    InfeasibleFrequency {
        frequency: f64,
        sample_rate: u32,
        output_rate: u32,
    },
    #[error("output rate {output_rate} leaves no analysis window at sample rate {sample_rate}Hz")]
    InvalidRate { sample_rate: u32, output_rate: u32 },
    #[error("none of the {0} keys could be analyzed")]
    NoFeasibleKeys(usize),
    #[error("table io: {0}")]
    Io(#[from] std::io::Error),
    #[error("table line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("{rows} table rows but {time_stamps} time stamps")]
    TimeStampCount { rows: usize, time_stamps: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
