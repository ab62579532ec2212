//! Turns per-key volumes over time into press / release decisions.
//!
//! Every key runs its own state machine over its frames in time order. Keys never
//! share state, so they are scheduled in parallel and joined into frame-major rows.

use rayon::prelude::*;

use crate::levels::volume_matrix;
use crate::Matrix;

pub mod rising;

/// What a key should do at one output frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum KeyEvent {
    /// Nothing changes. A held key stays down, an idle key stays up.
    #[default]
    Steady,
    /// Strike (or restrike) the key with this velocity.
    Press(f64),
    Release,
}

impl KeyEvent {
    /// Numeric cell value: the velocity for a press, -1 for a release, 0 otherwise.
    pub fn value(self) -> f64 {
        match self {
            KeyEvent::Steady => 0.0,
            KeyEvent::Press(velocity) => velocity,
            KeyEvent::Release => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleConfig {
    /// λ in `exp(onset_volume * λ)`. Negative.
    pub decay: f64,
    /// Cells quieter than this fraction of the reference amplitude are silence.
    /// Applied to percentages before they are scaled to the loudest cell.
    pub threshold: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            decay: -0.2,
            threshold: 0.08,
        }
    }
}

/// Per-key memory carried from one frame to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KeyState {
    /// frames since the last onset. 0 while the key is up
    pub hold_frames: u32,
    pub onset_volume: f64,
}

impl KeyState {
    /// State and event for a key's first frame.
    pub fn start(volume: f64) -> (Self, KeyEvent) {
        if volume != 0.0 {
            let state = Self {
                hold_frames: 1,
                onset_volume: volume,
            };
            (state, KeyEvent::Press(volume))
        } else {
            (Self::default(), KeyEvent::Steady)
        }
    }

    /// Volume the last onset is still expected to account for.
    ///
    /// NOTE: this does not shrink with `hold_frames`, so it stays constant for as long
    /// as the key is held.
    #[inline]
    pub fn projected_volume(&self, decay: f64) -> f64 {
        (self.onset_volume * decay).exp()
    }

    pub fn step(&mut self, volume: f64, decay: f64) -> KeyEvent {
        if volume != 0.0 {
            if self.projected_volume(decay) < volume {
                // louder than the last onset explains
                self.onset_volume = volume;
                self.hold_frames = 1;
                KeyEvent::Press(volume)
            } else {
                self.hold_frames += 1;
                KeyEvent::Steady
            }
        } else if self.hold_frames != 0 {
            self.hold_frames = 0;
            KeyEvent::Release
        } else {
            KeyEvent::Steady
        }
    }
}

/// Decay-projection scheduler.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoteEventScheduler {
    config: ScheduleConfig,
}

impl NoteEventScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Events for one key's volumes, in time order. Volumes are used as given.
    pub fn schedule_key<I>(&self, volumes: I) -> Vec<KeyEvent>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut volumes = volumes.into_iter();

        let Some(first) = volumes.next() else {
            return Vec::new();
        };

        let (mut state, event) = KeyState::start(first);

        let mut events = Vec::with_capacity(volumes.size_hint().0 + 1);
        events.push(event);
        events.extend(volumes.map(|v| state.step(v, self.config.decay)));

        events
    }

    /// Frame-major events with the same shape as `volumes`.
    pub fn schedule(&self, volumes: &Matrix<f64>) -> Matrix<KeyEvent> {
        let width = volumes.first().map_or(0, |row| row.len());
        debug_assert!(volumes.iter().all(|row| row.len() == width));

        let per_key: Vec<Vec<KeyEvent>> = (0..width)
            .into_par_iter()
            .map(|key| self.schedule_key(volumes.iter().map(|row| row[key])))
            .collect();

        let events = transpose(per_key, volumes.len());

        log::debug!(
            "Scheduled {} presses, {} releases",
            count(&events, |e| matches!(e, KeyEvent::Press(_))),
            count(&events, |e| matches!(e, KeyEvent::Release)),
        );

        events
    }

    /// Gate `percent` at the threshold, scale it to the loudest cell and schedule it.
    pub fn schedule_percent(&self, percent: &Matrix<f64>) -> Matrix<KeyEvent> {
        let volumes = volume_matrix(percent, 100.0 * self.config.threshold);

        self.schedule(&volumes)
    }
}

/// Key-major columns into `rows` frame-major rows.
pub(crate) fn transpose(columns: Vec<Vec<KeyEvent>>, rows: usize) -> Matrix<KeyEvent> {
    let mut matrix = vec![Vec::with_capacity(columns.len()); rows];

    for column in columns {
        for (row, event) in matrix.iter_mut().zip(column) {
            row.push(event);
        }
    }

    matrix
}

fn count(events: &Matrix<KeyEvent>, f: impl Fn(&KeyEvent) -> bool) -> usize {
    events.iter().flatten().filter(|e| f(e)).count()
}

/// Numeric view of an event matrix.
pub fn event_values(events: &Matrix<KeyEvent>) -> Matrix<f64> {
    events
        .iter()
        .map(|row| row.iter().map(|e| e.value()).collect())
        .collect()
}
