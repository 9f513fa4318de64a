use serde::{Deserialize, Serialize};

use crate::input::InputState;

/// Frames a balloon spends opening or closing.
const BALLOON_ANIMATION_FRAMES: u32 = 4;
/// Frames the picked choice stays on screen before the windows close.
const CHOSEN_BALLOON_WAITING_FRAMES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalloonKind {
    /// Full-width message window.
    Message,
    /// Speech bubble anchored to a character.
    Balloon,
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalloonState {
    Opening,
    Opened,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balloon {
    kind: BalloonKind,
    content: String,
    event_id: i32,
    interpreter_id: u32,
    state: BalloonState,
    count: u32,
    #[serde(default)]
    checked: bool,
}

impl Balloon {
    fn new(kind: BalloonKind, content: String, event_id: i32, interpreter_id: u32) -> Self {
        Self {
            kind,
            content,
            event_id,
            interpreter_id,
            state: BalloonState::Closed,
            count: 0,
            checked: false,
        }
    }

    pub fn kind(&self) -> BalloonKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn event_id(&self) -> i32 {
        self.event_id
    }

    pub fn state(&self) -> BalloonState {
        self.state
    }

    /// Choice already picked on an earlier visit.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    fn open(&mut self) {
        self.state = BalloonState::Opening;
        self.count = BALLOON_ANIMATION_FRAMES;
    }

    fn close(&mut self) {
        if matches!(self.state, BalloonState::Closing | BalloonState::Closed) {
            return;
        }
        self.state = BalloonState::Closing;
        self.count = BALLOON_ANIMATION_FRAMES;
    }

    fn is_animating(&self) -> bool {
        matches!(self.state, BalloonState::Opening | BalloonState::Closing)
    }

    fn is_opened(&self) -> bool {
        self.state == BalloonState::Opened
    }

    fn belongs_to(&self, interpreter_id: Option<u32>) -> bool {
        interpreter_id.map_or(true, |id| id == self.interpreter_id)
    }

    fn update(&mut self) {
        if self.count == 0 {
            return;
        }
        self.count -= 1;
        if self.count > 0 {
            return;
        }
        self.state = match self.state {
            BalloonState::Opening => BalloonState::Opened,
            BalloonState::Closing => BalloonState::Closed,
            state => state,
        };
    }
}

/// Dialogue windows: at most one message or balloon on screen at a time,
/// plus an optional column of choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Windows {
    next_balloon: Option<Balloon>,
    balloons: Vec<Balloon>,
    choice_balloons: Vec<Balloon>,
    choosing: bool,
    choosing_interpreter_id: u32,
    chosen_index: usize,
    chosen_balloon_waiting_count: u32,
    /// Displayed index picked for an interpreter, waiting to be taken.
    chosen: Option<(u32, usize)>,
}

impl Windows {
    pub fn show_message(&mut self, content: String, event_id: i32, interpreter_id: u32) {
        self.queue(BalloonKind::Message, content, event_id, interpreter_id);
    }

    pub fn show_balloon(&mut self, content: String, event_id: i32, interpreter_id: u32) {
        self.queue(BalloonKind::Balloon, content, event_id, interpreter_id);
    }

    fn queue(&mut self, kind: BalloonKind, content: String, event_id: i32, interpreter_id: u32) {
        if let Some(previous) = &self.next_balloon {
            log::warn!(
                "interpreter #{} replaced a queued window of interpreter #{}",
                interpreter_id,
                previous.interpreter_id
            );
        }
        self.next_balloon = Some(Balloon::new(kind, content, event_id, interpreter_id));
    }

    /// Opens the displayed choices; each entry is (text, checked).
    pub fn show_choices(&mut self, choices: Vec<(String, bool)>, interpreter_id: u32) {
        self.choice_balloons = choices
            .into_iter()
            .map(|(content, checked)| {
                let mut balloon = Balloon::new(BalloonKind::Choice, content, 0, interpreter_id);
                balloon.checked = checked;
                balloon.open();
                balloon
            })
            .collect();
        self.chosen_index = 0;
        self.choosing = true;
        self.choosing_interpreter_id = interpreter_id;
        self.chosen = None;
    }

    pub fn close_all(&mut self) {
        self.next_balloon = None;
        for balloon in self.balloons.iter_mut().chain(self.choice_balloons.iter_mut()) {
            balloon.close();
        }
        self.choosing = false;
        self.choosing_interpreter_id = 0;
        self.chosen_balloon_waiting_count = 0;
    }

    pub fn balloons(&self) -> impl Iterator<Item = &Balloon> {
        self.balloons.iter().chain(self.choice_balloons.iter())
    }

    pub fn is_choosing(&self) -> bool {
        self.choosing
    }

    /// Whether windows owned by `interpreter_id` still need the player.
    pub fn is_busy(&self, interpreter_id: u32) -> bool {
        let id = Some(interpreter_id);
        if self.is_animating(id) || self.is_opened(id) {
            return true;
        }
        if self.choosing_interpreter_id == interpreter_id
            && (self.choosing || self.chosen_balloon_waiting_count > 0)
        {
            return true;
        }
        self.next_balloon
            .as_ref()
            .is_some_and(|balloon| balloon.belongs_to(id))
    }

    /// Whether anything is on screen or about to be.
    pub fn is_active(&self) -> bool {
        self.next_balloon.is_some()
            || self.choosing
            || !self.balloons.is_empty()
            || !self.choice_balloons.is_empty()
    }

    pub fn has_chosen_index(&self, interpreter_id: u32) -> bool {
        matches!(self.chosen, Some((id, _)) if id == interpreter_id)
    }

    /// Hands the picked displayed index to the interpreter that asked.
    pub fn take_chosen_index(&mut self, interpreter_id: u32) -> Option<usize> {
        match self.chosen {
            Some((id, index)) if id == interpreter_id => {
                self.chosen = None;
                Some(index)
            }
            _ => None,
        }
    }

    fn is_opened(&self, interpreter_id: Option<u32>) -> bool {
        self.balloons()
            .any(|balloon| balloon.belongs_to(interpreter_id) && balloon.is_opened())
    }

    fn is_animating(&self, interpreter_id: Option<u32>) -> bool {
        self.balloons()
            .any(|balloon| balloon.belongs_to(interpreter_id) && balloon.is_animating())
    }

    /// Advances one frame. Returns true when the input was used here and
    /// must not also reach the map.
    pub fn update(&mut self, input: &InputState) -> bool {
        let mut consumed = false;

        if !self.choosing && !self.is_animating(None) && !self.is_opened(None) {
            if let Some(mut balloon) = self.next_balloon.take() {
                balloon.open();
                self.balloons = vec![balloon];
            }
        }

        if self.chosen_balloon_waiting_count > 0 {
            self.chosen_balloon_waiting_count -= 1;
            if self.chosen_balloon_waiting_count == 0 {
                // Only the picked choice is still open at this point.
                for balloon in self.balloons.iter_mut().chain(self.choice_balloons.iter_mut()) {
                    balloon.close();
                }
                self.chosen = Some((self.choosing_interpreter_id, self.chosen_index));
                self.choosing_interpreter_id = 0;
            }
        } else if self.choosing && self.is_opened(None) {
            if let Some(index) = input.choice.filter(|i| *i < self.choice_balloons.len()) {
                self.chosen_index = index;
                for (i, balloon) in self.choice_balloons.iter_mut().enumerate() {
                    if i != index {
                        balloon.close();
                    }
                }
                self.chosen_balloon_waiting_count = CHOSEN_BALLOON_WAITING_FRAMES;
                self.choosing = false;
                consumed = true;
            }
        } else if !self.choosing && input.triggered {
            for balloon in &mut self.balloons {
                if balloon.is_opened() {
                    balloon.close();
                    consumed = true;
                }
            }
        }

        for balloon in self.balloons.iter_mut().chain(self.choice_balloons.iter_mut()) {
            balloon.update();
        }
        self.balloons
            .retain(|balloon| balloon.state != BalloonState::Closed);
        self.choice_balloons
            .retain(|balloon| balloon.state != BalloonState::Closed);
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(windows: &mut Windows, frames: usize) {
        for _ in 0..frames {
            windows.update(&InputState::default());
        }
    }

    #[test]
    fn message_stays_until_tapped() {
        let mut windows = Windows::default();
        windows.show_message("hello".to_string(), 3, 7);
        assert!(windows.is_busy(7));
        assert!(!windows.is_busy(8));
        run(&mut windows, 10);
        assert!(windows.is_busy(7));
        assert!(windows.update(&InputState::advance()));
        run(&mut windows, BALLOON_ANIMATION_FRAMES as usize);
        assert!(!windows.is_busy(7));
        assert!(!windows.is_active());
    }

    #[test]
    fn taps_while_opening_are_not_consumed() {
        let mut windows = Windows::default();
        windows.show_balloon("hi".to_string(), 1, 2);
        assert!(!windows.update(&InputState::advance()));
        assert!(windows.is_busy(2));
    }

    #[test]
    fn picking_a_choice_reports_the_displayed_index() {
        let mut windows = Windows::default();
        windows.show_choices(
            vec![("yes".to_string(), false), ("no".to_string(), true)],
            4,
        );
        // Picks are ignored until the column has opened.
        assert!(!windows.update(&InputState::choose(1)));
        run(&mut windows, BALLOON_ANIMATION_FRAMES as usize);
        assert!(windows.update(&InputState::choose(1)));
        assert!(!windows.has_chosen_index(4));
        run(&mut windows, CHOSEN_BALLOON_WAITING_FRAMES as usize);
        assert!(windows.has_chosen_index(4));
        assert_eq!(windows.take_chosen_index(5), None);
        assert_eq!(windows.take_chosen_index(4), Some(1));
        assert_eq!(windows.take_chosen_index(4), None);
        run(&mut windows, BALLOON_ANIMATION_FRAMES as usize);
        assert!(!windows.is_active());
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let mut windows = Windows::default();
        windows.show_choices(vec![("only".to_string(), false)], 1);
        run(&mut windows, BALLOON_ANIMATION_FRAMES as usize);
        assert!(!windows.update(&InputState::choose(3)));
        assert!(windows.is_choosing());
    }
}
