use serde::{Deserialize, Deserializer, Serialize};
use snack_data::{Dir, Page, Priority, Speed, PLAYER_EVENT_ID, TILE_SIZE};

use crate::interpolation::Interpolation;

const STEPPING_CYCLE: u32 = 60;
const WALKING_CYCLE: u32 = 16;

/// The player or one event standing on the tile grid.
///
/// `x`/`y` is the logical tile. While `move_count > 0` the character is
/// sliding toward the neighbouring tile in `move_dir`; the logical tile only
/// changes once that slide finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    event_id: i32,
    #[serde(deserialize_with = "speed_or_default", default)]
    speed: Speed,
    image_name: String,
    image_index: i32,
    dir: Dir,
    dir_fix: bool,
    stepping: bool,
    stepping_count: u32,
    walking: bool,
    walking_count: u32,
    frame: i32,
    prev_frame: i32,
    x: i32,
    y: i32,
    move_count: u32,
    move_dir: Dir,
    visible: bool,
    through: bool,
    erased: bool,
    #[serde(default)]
    priority: Priority,
    opacity: Interpolation,
}

fn speed_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Speed, D::Error> {
    let level = u8::deserialize(deserializer)?;
    Ok(Speed::from_level(level).unwrap_or_default())
}

impl Character {
    pub fn new(event_id: i32, x: i32, y: i32) -> Self {
        Self {
            event_id,
            speed: Speed::default(),
            image_name: String::new(),
            image_index: 0,
            dir: Dir::Down,
            dir_fix: false,
            stepping: false,
            stepping_count: 0,
            walking: true,
            walking_count: 0,
            frame: 1,
            prev_frame: 1,
            x,
            y,
            move_count: 0,
            move_dir: Dir::Down,
            visible: true,
            through: false,
            erased: false,
            priority: Priority::Same,
            opacity: Interpolation::new(255.0),
        }
    }

    pub fn new_player(x: i32, y: i32, image: &str, speed: Speed) -> Self {
        let mut player = Self::new(PLAYER_EVENT_ID, x, y);
        player.image_name = image.to_string();
        player.speed = speed;
        player
    }

    pub fn event_id(&self) -> i32 {
        self.event_id
    }

    pub fn is_player(&self) -> bool {
        self.event_id == PLAYER_EVENT_ID
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Tile the character occupies once any in-flight move completes.
    pub fn destination(&self) -> (i32, i32) {
        if !self.is_moving() {
            return self.position();
        }
        let (dx, dy) = self.move_dir.delta();
        (self.x + dx, self.y + dy)
    }

    pub fn dir(&self) -> Dir {
        self.dir
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn frame(&self) -> i32 {
        self.frame
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn image_index(&self) -> i32 {
        self.image_index
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_visible(&self) -> bool {
        self.visible && !self.erased
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn opacity(&self) -> &Interpolation {
        &self.opacity
    }

    pub fn is_moving(&self) -> bool {
        self.move_count > 0
    }

    /// Erased characters never block anything.
    pub fn through(&self) -> bool {
        self.through || self.erased
    }

    /// Whether this character keeps others off its tile.
    pub fn blocks(&self) -> bool {
        !self.through() && self.priority == Priority::Same
    }

    pub fn turn(&mut self, dir: Dir) {
        if self.dir_fix {
            return;
        }
        self.dir = dir;
    }

    /// Starts a one-tile move. Passability is the caller's concern.
    pub fn start_move(&mut self, dir: Dir) {
        self.turn(dir);
        self.move_dir = dir;
        self.move_count = self.speed.frames();
        if self.walking {
            self.frame = if self.prev_frame == 0 { 2 } else { 0 };
            self.prev_frame = self.frame;
            self.walking_count = 0;
        }
    }

    pub fn transfer_immediately(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
        self.move_count = 0;
    }

    pub fn erase(&mut self) {
        self.erased = true;
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_dir_fix(&mut self, dir_fix: bool) {
        self.dir_fix = dir_fix;
    }

    pub fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
        self.stepping_count = 0;
    }

    pub fn set_through(&mut self, through: bool) {
        self.through = through;
    }

    pub fn set_walking(&mut self, walking: bool) {
        self.walking = walking;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn set_image(&mut self, name: &str, index: i32, frame: i32, dir: Dir, use_frame_and_dir: bool) {
        self.image_name = name.to_string();
        self.image_index = index;
        if use_frame_and_dir {
            self.frame = frame;
            self.prev_frame = frame;
            self.dir = dir;
        }
    }

    pub fn set_opacity(&mut self, opacity: i32, frames: u32) {
        self.opacity.set_to(f64::from(opacity.clamp(0, 255)), frames);
    }

    /// Applies an event page's appearance. `None` means no page is active:
    /// the event becomes an invisible, non-blocking placeholder.
    pub fn update_with_page(&mut self, page: Option<&Page>) {
        match page {
            Some(page) => {
                self.image_name = page.image.clone();
                self.image_index = page.image_index;
                self.frame = page.frame;
                self.prev_frame = page.frame;
                self.dir = page.dir;
                self.dir_fix = page.dir_fix;
                self.stepping = page.stepping;
                self.walking = page.walking;
                self.through = page.through;
                self.speed = page.speed;
                self.priority = page.priority;
            }
            None => {
                self.image_name.clear();
                self.image_index = 0;
                self.dir_fix = false;
                self.stepping = false;
                self.walking = true;
                self.through = true;
                self.priority = Priority::Below;
            }
        }
        self.stepping_count = 0;
        self.walking_count = 0;
    }

    /// Advances animation and any in-flight move by one frame.
    pub fn update(&mut self) {
        self.opacity.update();

        if self.stepping {
            self.stepping_count = (self.stepping_count + 1) % STEPPING_CYCLE;
            self.frame = match self.stepping_count {
                0..=14 => 0,
                15..=29 => 1,
                30..=44 => 2,
                _ => 1,
            };
        }

        if !self.is_moving() {
            return;
        }

        if self.walking && !self.stepping {
            self.walking_count += 1;
            if self.walking_count == WALKING_CYCLE / 2 {
                self.frame = 1;
            } else if self.walking_count >= WALKING_CYCLE {
                self.frame = if self.prev_frame == 0 { 2 } else { 0 };
                self.prev_frame = self.frame;
                self.walking_count = 0;
            }
        }

        self.move_count -= 1;
        if self.move_count == 0 {
            let (dx, dy) = self.move_dir.delta();
            self.x += dx;
            self.y += dy;
            if self.walking && !self.stepping {
                self.frame = 1;
            }
        }
    }

    /// Pixel position of the tile's bottom-center, interpolated while moving.
    pub fn draw_position(&self) -> (i32, i32) {
        let mut px = self.x * TILE_SIZE + TILE_SIZE / 2;
        let mut py = (self.y + 1) * TILE_SIZE;
        if self.is_moving() {
            let frames = self.speed.frames() as i32;
            let elapsed = frames - self.move_count as i32;
            let d = elapsed * TILE_SIZE / frames;
            let (dx, dy) = self.move_dir.delta();
            px += dx * d;
            py += dy * d;
        }
        (px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_position_changes_only_when_move_completes() {
        let mut character = Character::new(1, 2, 2);
        character.set_speed(Speed::Speed6);
        character.start_move(Dir::Right);
        assert!(character.is_moving());
        assert_eq!(character.destination(), (3, 2));

        let frames = Speed::Speed6.frames();
        for _ in 0..frames - 1 {
            character.update();
            assert_eq!(character.position(), (2, 2));
        }
        character.update();
        assert!(!character.is_moving());
        assert_eq!(character.position(), (3, 2));
        assert_eq!(character.dir(), Dir::Right);
    }

    #[test]
    fn draw_position_interpolates_between_tiles() {
        let mut character = Character::new(1, 0, 0);
        character.set_speed(Speed::Speed6);
        let (start_x, start_y) = character.draw_position();
        character.start_move(Dir::Down);
        character.update();
        character.update();
        let (x, y) = character.draw_position();
        assert_eq!(x, start_x);
        assert_eq!(y, start_y + TILE_SIZE / 2);
    }

    #[test]
    fn dir_fix_and_erase_flags() {
        let mut character = Character::new(4, 0, 0);
        character.set_dir_fix(true);
        character.turn(Dir::Up);
        assert_eq!(character.dir(), Dir::Down);
        assert!(character.blocks());
        character.erase();
        assert!(character.through());
        assert!(!character.blocks());
        assert!(!character.is_visible());
    }

    #[test]
    fn missing_page_turns_event_into_placeholder() {
        let mut character = Character::new(4, 0, 0);
        let page = Page {
            image: "npc".to_string(),
            speed: Speed::Speed2,
            ..Page::default()
        };
        character.update_with_page(Some(&page));
        assert_eq!(character.image_name(), "npc");
        assert_eq!(character.speed(), Speed::Speed2);
        character.update_with_page(None);
        assert_eq!(character.image_name(), "");
        assert!(!character.blocks());
    }

    #[test]
    fn zero_speed_in_saved_data_falls_back() {
        let mut value = serde_json::to_value(Character::new(2, 1, 1)).expect("encode");
        value["speed"] = serde_json::Value::from(0);
        let character: Character = serde_json::from_value(value).expect("decode");
        assert_eq!(character.speed(), Speed::Speed3);
    }
}
