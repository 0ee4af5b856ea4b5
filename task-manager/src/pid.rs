//! Public PID numbering

/// Lowest public PID; 0 and 1 are never handed out
pub const PID_MIN: i32 = 2;

/// Default highest public PID before numbering wraps to [`PID_MIN`]
pub const PID_MAX: i32 = 32767;

/// Issues public PIDs in increasing order, skipping live ones
///
/// Numbering continues after the last PID handed out and wraps back to the
/// floor past the ceiling. A scan visits every candidate at most once, so
/// allocation fails instead of looping when all candidates are live.
#[derive(Debug, Clone)]
pub struct PidAllocator {
    floor: i32,
    ceiling: i32,
    last: i32,
}

impl PidAllocator {
    pub fn new(ceiling: i32) -> Self {
        let ceiling = ceiling.max(PID_MIN);
        Self {
            floor: PID_MIN,
            ceiling,
            last: PID_MIN - 1,
        }
    }

    /// Number of distinct public PIDs
    pub fn capacity(&self) -> usize {
        (self.ceiling - self.floor + 1) as usize
    }

    /// Next candidate not reported live by `is_live`
    ///
    /// Does not consume the PID; call [`commit`](PidAllocator::commit) once
    /// the task actually exists.
    pub fn next(&self, is_live: impl Fn(i32) -> bool) -> Option<i32> {
        let mut candidate = self.last.saturating_add(1);

        for _ in 0..self.capacity() {
            if candidate < self.floor || candidate > self.ceiling {
                candidate = self.floor;
            }
            if !is_live(candidate) {
                return Some(candidate);
            }
            candidate += 1;
        }

        None
    }

    /// Record `pid` as the most recently issued PID
    pub fn commit(&mut self, pid: i32) {
        self.last = pid;
    }
}
