/// Input gathered by the host for one tick. Everything is already mapped to
/// tiles or screen pixels; device polling lives outside the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    /// A tap/click happened this tick (advances messages).
    pub triggered: bool,
    /// Tile that was tapped this tick.
    pub tapped_tile: Option<(i32, i32)>,
    /// Tile under a held pointer.
    pub pressed_tile: Option<(i32, i32)>,
    /// Pointer position in screen pixels.
    pub pointer: Option<(i32, i32)>,
    pub pointer_pressed: bool,
    pub pointer_released: bool,
    /// Displayed choice index picked in an open choice window.
    pub choice: Option<usize>,
}

impl InputState {
    pub fn tap(x: i32, y: i32) -> Self {
        Self {
            triggered: true,
            tapped_tile: Some((x, y)),
            ..Self::default()
        }
    }

    pub fn advance() -> Self {
        Self {
            triggered: true,
            ..Self::default()
        }
    }

    pub fn choose(index: usize) -> Self {
        Self {
            choice: Some(index),
            ..Self::default()
        }
    }

    /// Drops tap-style input once a window has used it.
    pub(crate) fn consume(&mut self) {
        self.triggered = false;
        self.tapped_tile = None;
        self.choice = None;
    }
}
