use serde::{Deserialize, Serialize};
use snack_data::args::{ShakeDirection, WeatherType};

use crate::interpolation::{Interpolation, Tint};

/// Frames used by transfer transitions.
pub const TRANSITION_FRAMES: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeColor {
    #[default]
    Black,
    White,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shake {
    power: i32,
    speed: i32,
    count: u32,
    direction: ShakeDirection,
    offset: f64,
    forward: bool,
}

impl Shake {
    fn start(&mut self, power: i32, speed: i32, count: u32, direction: ShakeDirection) {
        self.power = power;
        self.speed = speed;
        self.count = count;
        self.direction = direction;
        self.forward = true;
    }

    fn stop(&mut self) {
        self.count = 0;
        self.offset = 0.0;
    }

    fn is_shaking(&self) -> bool {
        self.count > 0 || self.offset != 0.0
    }

    fn update(&mut self) {
        if !self.is_shaking() {
            return;
        }
        let amplitude = f64::from(self.power) * 2.0;
        let delta = f64::from(self.power * self.speed) / 10.0;
        if self.count == 0 && (self.offset.abs() <= delta || amplitude == 0.0) {
            self.offset = 0.0;
            return;
        }
        if self.forward {
            self.offset += delta;
        } else {
            self.offset -= delta;
        }
        if self.offset > amplitude {
            self.forward = false;
        } else if self.offset < -amplitude {
            self.forward = true;
        }
        self.count = self.count.saturating_sub(1);
    }
}

/// Full-screen effects. The renderer reads these; the engine only steps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Screen {
    tint: Tint,
    shake: Shake,
    /// 0 is fully visible, 1 fully covered by `fade_color`.
    fade: Interpolation,
    fade_color: FadeColor,
    weather: WeatherType,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            tint: Tint::default(),
            shake: Shake::default(),
            fade: Interpolation::new(0.0),
            fade_color: FadeColor::Black,
            weather: WeatherType::None,
        }
    }
}

impl Screen {
    pub fn start_tint(&mut self, red: i32, green: i32, blue: i32, gray: i32, frames: u32) {
        self.tint.set_to(red, green, blue, gray, frames);
    }

    pub fn is_changing_tint(&self) -> bool {
        self.tint.is_animating()
    }

    pub fn tint(&self) -> &Tint {
        &self.tint
    }

    pub fn start_shaking(&mut self, power: i32, speed: i32, frames: u32, direction: ShakeDirection) {
        self.shake.start(power, speed, frames, direction);
    }

    pub fn stop_shaking(&mut self) {
        self.shake.stop();
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.is_shaking()
    }

    /// Current shake displacement in pixels along the shake direction.
    pub fn shake_offset(&self) -> (f64, f64) {
        match self.shake.direction {
            ShakeDirection::Horizontal => (self.shake.offset, 0.0),
            ShakeDirection::Vertical => (0.0, self.shake.offset),
        }
    }

    pub fn set_fade_color(&mut self, color: FadeColor) {
        self.fade_color = color;
    }

    pub fn fade_color(&self) -> FadeColor {
        self.fade_color
    }

    pub fn fade_out(&mut self, frames: u32) {
        self.fade.set_to(1.0, frames);
    }

    pub fn fade_in(&mut self, frames: u32) {
        self.fade.set_to(0.0, frames);
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_animating()
    }

    pub fn is_faded_out(&self) -> bool {
        !self.fade.is_animating() && self.fade.current() >= 1.0
    }

    pub fn fade_level(&self) -> f64 {
        self.fade.current()
    }

    pub fn set_weather(&mut self, weather: WeatherType) {
        self.weather = weather;
    }

    pub fn weather(&self) -> WeatherType {
        self.weather
    }

    pub fn update(&mut self) {
        self.tint.update();
        self.shake.update();
        self.fade.update();
    }
}
