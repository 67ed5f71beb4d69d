use serde::{Deserialize, Serialize};

/// A value clamped to an integer range.
/// Used for: structure hit points (0 to max), army condition severity
/// (1 to the configured cap), and faction attitude ladder positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedInt {
    value: i32,
    min: i32,
    max: i32,
}

impl BoundedInt {
    pub const fn new(value: i32, min: i32, max: i32) -> Self {
        let value = if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    pub fn get(&self) -> i32 {
        self.value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn add(&mut self, delta: i32) {
        self.value = self.value.saturating_add(delta).clamp(self.min, self.max);
    }

    pub fn set(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Returns a copy moved by `delta`, leaving `self` untouched.
    pub fn shifted(&self, delta: i32) -> Self {
        let mut next = *self;
        next.add(delta);
        next
    }

    pub fn is_at_min(&self) -> bool {
        self.value == self.min
    }

    pub fn is_at_max(&self) -> bool {
        self.value == self.max
    }
}

pub type HitPoints = BoundedInt;
pub type Severity = BoundedInt;

pub const fn new_hit_points(max: i32) -> HitPoints {
    BoundedInt::new(max, 0, max)
}

pub const fn new_severity(value: i32, cap: i32) -> Severity {
    BoundedInt::new(value, 1, cap)
}
