use std::collections::VecDeque;

/// Bounded FIFO of the most recent samples, oldest first
#[derive(Debug, Clone)]
pub struct Timeline {
    samples: VecDeque<i64>,
    max_size: usize,
}

impl Timeline {
    pub fn new(max_size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_size + 1),
            max_size,
        }
    }

    /// Append a sample, evicting the oldest once `max_size` is exceeded
    pub fn push(&mut self, value: i64) {
        self.samples.push_back(value);
        if self.samples.len() > self.max_size {
            self.samples.pop_front();
        }
    }

    /// Index from the end: `back(1)` is the latest sample, `back(2)` the one before
    pub fn back(&self, offset: usize) -> Option<i64> {
        if offset == 0 || offset > self.samples.len() {
            return None;
        }
        self.samples.get(self.samples.len() - offset).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.samples.iter()
    }
}
