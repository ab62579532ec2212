//! Tab-separated interchange tables.
//!
//! ```text
//! time_stamp  key0_27.5Hz  key1_29.135Hz  ...
//! 0           0.00         0.00           ...
//! 67          1.25         0.03           ...
//! ```
//!
//! One row per output frame, time stamps in whole milliseconds.

use std::io::{BufRead, Write};

use rustfft::num_complex::Complex;

use crate::error::{Error, Result};
use crate::keys::key_label;
use crate::levels::percent_matrix;
use crate::schedule::KeyEvent;
use crate::sdft::Key;
use crate::Matrix;

pub const TIME_COLUMN: &str = "time_stamp";

/// Milliseconds from the start of the recording to output frame `frame`.
pub fn frame_time_ms(frame: usize, output_rate: u32) -> u64 {
    (frame as f64 / output_rate as f64 * 1000.0).round_ties_even() as u64
}

fn write_header<W: Write>(w: &mut W, keys: &[Key]) -> Result<()> {
    write!(w, "{}", TIME_COLUMN)?;
    for key in keys {
        write!(w, "\t{}", key_label(key.index, key.frequency))?;
    }
    writeln!(w)?;
    Ok(())
}

fn write_rows<W, T, S, F>(w: &mut W, rows: &Matrix<T>, time: S, cell: F) -> Result<()>
where
    W: Write,
    S: Fn(usize) -> u64,
    F: Fn(&mut W, &T) -> std::io::Result<()>,
{
    for (i, row) in rows.iter().enumerate() {
        write!(w, "{}", time(i))?;
        for value in row {
            write!(w, "\t")?;
            cell(&mut *w, value)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Amplitudes as percentages of `reference`, two decimal places.
pub fn write_amplitude_table<W: Write>(
    mut w: W,
    keys: &[Key],
    amplitudes: &Matrix<Complex<f64>>,
    output_rate: u32,
    reference: f64,
) -> Result<()> {
    write_header(&mut w, keys)?;

    let percent = percent_matrix(amplitudes, reference);
    let time = |i| frame_time_ms(i, output_rate);
    write_rows(&mut w, &percent, time, |w, p| write!(w, "{:.2}", p))?;

    w.flush()?;
    Ok(())
}

/// Events as numbers: press velocity, -1 for release, 0 for no change.
pub fn write_event_table<W: Write>(
    mut w: W,
    keys: &[Key],
    events: &Matrix<KeyEvent>,
    output_rate: u32,
) -> Result<()> {
    write_header(&mut w, keys)?;
    let time = |i| frame_time_ms(i, output_rate);
    write_rows(&mut w, events, time, |w, e| write!(w, "{}", e.value()))?;

    w.flush()?;
    Ok(())
}

/// [`write_event_table`] with one given time stamp per row, e.g. those of a table read back.
pub fn write_event_table_at<W: Write>(
    mut w: W,
    keys: &[Key],
    events: &Matrix<KeyEvent>,
    time_stamps: &[u64],
) -> Result<()> {
    if time_stamps.len() != events.len() {
        return Err(Error::TimeStampCount {
            rows: events.len(),
            time_stamps: time_stamps.len(),
        });
    }

    write_header(&mut w, keys)?;
    write_rows(&mut w, events, |i| time_stamps[i], |w, e| write!(w, "{}", e.value()))?;

    w.flush()?;
    Ok(())
}

/// A table read back from text.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub keys: Vec<Key>,
    pub time_stamps: Vec<u64>,
    pub rows: Matrix<f64>,
}

/// Parse `key{index}_{frequency}Hz`.
pub fn parse_key_label(label: &str) -> Option<Key> {
    let rest = label.strip_prefix("key")?.strip_suffix("Hz")?;
    let (index, frequency) = rest.split_once('_')?;

    Some(Key {
        index: index.parse().ok()?,
        frequency: frequency.parse().ok()?,
    })
}

pub fn read_table<R: BufRead>(r: R) -> Result<Table> {
    let mut lines = r.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) => line?,
        None => {
            return Err(Error::Parse {
                line: 1,
                message: "missing header".into(),
            })
        }
    };

    let mut columns = header.trim_end().split('\t');
    if columns.next() != Some(TIME_COLUMN) {
        return Err(Error::Parse {
            line: 1,
            message: format!("first column must be {TIME_COLUMN}"),
        });
    }

    let keys = columns
        .map(|label| {
            parse_key_label(label).ok_or_else(|| Error::Parse {
                line: 1,
                message: format!("bad key column {label:?}"),
            })
        })
        .collect::<Result<Vec<Key>>>()?;

    let mut time_stamps = Vec::new();
    let mut rows = Vec::new();

    for (i, line) in lines {
        let line = line?;
        let number = i + 1;

        if line.trim().is_empty() {
            continue;
        }

        let bad = |message: String| Error::Parse {
            line: number,
            message,
        };

        let mut cells = line.trim_end().split('\t');

        let time = cells.next().unwrap_or_default();
        let time: u64 = time
            .parse()
            .map_err(|_| bad(format!("bad time stamp {time:?}")))?;

        let row = cells
            .map(|cell| {
                cell.trim()
                    .parse::<f64>()
                    .map_err(|_| bad(format!("bad value {cell:?}")))
            })
            .collect::<Result<Vec<f64>>>()?;

        if row.len() != keys.len() {
            return Err(bad(format!(
                "expected {} values, found {}",
                keys.len(),
                row.len()
            )));
        }

        time_stamps.push(time);
        rows.push(row);
    }

    Ok(Table {
        keys,
        time_stamps,
        rows,
    })
}
