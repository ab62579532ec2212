/// Fixed-capacity window over the most recent values, oldest first.
///
/// Starts full of `T::default()` so the length is always the capacity.
/// Pushing a value evicts the oldest one in the same step.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// index of the oldest value. the next push overwrites it
    head: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer needs at least one slot");

        Self {
            slots: vec![T::default(); capacity],
            head: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn oldest(&self) -> T {
        self.slots[self.head]
    }

    /// Overwrite the oldest value with `value` and return what was evicted.
    #[inline]
    pub fn push(&mut self, value: T) -> T {
        let evicted = std::mem::replace(&mut self.slots[self.head], value);

        self.head += 1;
        if self.head == self.slots.len() {
            self.head = 0;
        }

        evicted
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }
}
