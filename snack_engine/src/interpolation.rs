use serde::{Deserialize, Serialize};

/// Linear transition toward a target over a fixed number of frames.
///
/// The whole state is stored, so a value restored mid-transition continues
/// from where it was rather than restarting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpolation {
    current: f64,
    start: f64,
    target: f64,
    count: u32,
    max_count: u32,
}

impl Interpolation {
    pub fn new(value: f64) -> Self {
        Self {
            current: value,
            start: value,
            target: value,
            count: 0,
            max_count: 0,
        }
    }

    /// Jumps straight to `value`, cancelling any transition.
    pub fn set(&mut self, value: f64) {
        *self = Self::new(value);
    }

    pub fn set_to(&mut self, target: f64, frames: u32) {
        if frames == 0 {
            self.set(target);
            return;
        }
        self.start = self.current;
        self.target = target;
        self.count = frames;
        self.max_count = frames;
    }

    pub fn update(&mut self) {
        if self.count == 0 {
            return;
        }
        self.count -= 1;
        if self.count == 0 {
            self.current = self.target;
            return;
        }
        let remaining = f64::from(self.count) / f64::from(self.max_count);
        self.current = self.target - (self.target - self.start) * remaining;
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn remaining_frames(&self) -> u32 {
        self.count
    }

    pub fn is_animating(&self) -> bool {
        self.count > 0
    }
}

/// Color tint applied to the screen or a picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub red: Interpolation,
    pub green: Interpolation,
    pub blue: Interpolation,
    pub gray: Interpolation,
}

impl Tint {
    pub fn set_to(&mut self, red: i32, green: i32, blue: i32, gray: i32, frames: u32) {
        self.red.set_to(f64::from(red) / 255.0, frames);
        self.green.set_to(f64::from(green) / 255.0, frames);
        self.blue.set_to(f64::from(blue) / 255.0, frames);
        self.gray.set_to(f64::from(gray) / 255.0, frames);
    }

    pub fn update(&mut self) {
        self.red.update();
        self.green.update();
        self.blue.update();
        self.gray.update();
    }

    pub fn is_animating(&self) -> bool {
        self.red.is_animating()
            || self.green.is_animating()
            || self.blue.is_animating()
            || self.gray.is_animating()
    }

    pub fn is_zero(&self) -> bool {
        self.red.current() == 0.0
            && self.green.current() == 0.0
            && self.blue.current() == 0.0
            && self.gray.current() == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_after_requested_frames() {
        let mut value = Interpolation::new(0.0);
        value.set_to(10.0, 4);
        let mut seen = Vec::new();
        for _ in 0..5 {
            value.update();
            seen.push(value.current());
        }
        assert_eq!(seen, vec![2.5, 5.0, 7.5, 10.0, 10.0]);
        assert!(!value.is_animating());
    }

    #[test]
    fn resumes_from_snapshot() {
        let mut value = Interpolation::new(100.0);
        value.set_to(0.0, 10);
        for _ in 0..3 {
            value.update();
        }
        let json = serde_json::to_string(&value).expect("encode");
        let mut restored: Interpolation = serde_json::from_str(&json).expect("decode");
        for _ in 0..7 {
            value.update();
            restored.update();
            assert_eq!(value, restored);
        }
        assert_eq!(restored.current(), 0.0);
    }
}
