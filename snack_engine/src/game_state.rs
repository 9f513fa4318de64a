//! The mutable world and the per-tick driver around it.
//!
//! `GameState` owns everything a save file contains. A tick advances the
//! pieces in a fixed order (audio, requests, screen, windows, pictures, the
//! map and its interpreters, touch state) so a replay of the same inputs
//! reaches the same state.

mod values;

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Deserializer, Serialize};
use snack_data::{Dir, Game, Speed, Trigger, PLAYER_EVENT_ID, SELF_EVENT_ID};
use snack_save::{decode_expected, encode_payload, PayloadKind, SaveError};

use crate::audio_bridge::Bgm;
use crate::character::Character;
use crate::error::{EngineError, ScriptError};
use crate::hints::Hints;
use crate::input::InputState;
use crate::interpreter::{Interpreter, InterpreterKind};
use crate::items::Items;
use crate::map::GameMap;
use crate::movement::MoveCharacterState;
use crate::path::find_path;
use crate::pictures::Pictures;
use crate::requester::{RequestId, RequestKind};
use crate::rng::GameRng;
use crate::scene::SceneManager;
use crate::screen::Screen;
use crate::variables::Variables;
use crate::windows::Windows;

/// Entries kept in the event log before the oldest are dropped.
const EVENT_LOG_LIMIT: usize = 512;

/// Pictures under the pointer this tick, one slot per kind of touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PictureTouch {
    triggered: Option<usize>,
    pressed: Option<usize>,
    released: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    variables: Variables,
    #[serde(default)]
    items: Items,
    #[serde(default)]
    hints: Hints,
    #[serde(default)]
    screen: Screen,
    #[serde(default)]
    windows: Windows,
    #[serde(default)]
    pictures: Pictures,
    map: GameMap,
    #[serde(default)]
    last_interpreter_id: u32,
    #[serde(default = "enabled")]
    autosave_enabled: bool,
    #[serde(default = "enabled")]
    player_control_enabled: bool,
    #[serde(default = "player_default_speed", deserialize_with = "player_speed")]
    player_speed: Speed,
    #[serde(default)]
    inventory_visible: bool,
    #[serde(default)]
    cleared: bool,
    #[serde(default)]
    last_playing_bgm: Option<Bgm>,
    /// Image overrides per map, then per room.
    #[serde(default)]
    backgrounds: BTreeMap<i32, BTreeMap<i32, String>>,
    #[serde(default)]
    foregrounds: BTreeMap<i32, BTreeMap<i32, String>>,

    #[serde(skip)]
    pending_bgm: Option<Bgm>,
    #[serde(skip)]
    save_request_id: Option<RequestId>,
    /// Whether the save in flight belongs to a `save` command, whose
    /// interpreter collects the result itself.
    #[serde(skip)]
    save_by_script: bool,
    /// Request ids of `save` commands, sent in order once the tick's
    /// interpreters are back in the map and no other save is in flight.
    #[serde(skip)]
    scheduled_saves: VecDeque<RequestId>,
    #[serde(skip)]
    touch: PictureTouch,
    #[serde(skip)]
    pressed_tile: Option<(i32, i32)>,
    #[serde(skip)]
    image_sizes: BTreeMap<String, (u32, u32)>,
    #[serde(skip)]
    rng: GameRng,
    #[serde(skip)]
    event_log: VecDeque<String>,
    #[serde(skip)]
    script_errors: Vec<ScriptError>,
    #[serde(skip)]
    diagnostics: Vec<String>,
    #[serde(skip)]
    goto_title: bool,
    #[serde(skip)]
    item_preview: Option<i32>,
}

fn enabled() -> bool {
    true
}

fn player_default_speed() -> Speed {
    Speed::PLAYER_DEFAULT
}

/// Older saves may carry a speed of 0; those get the player default.
fn player_speed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Speed, D::Error> {
    let level = u8::deserialize(deserializer)?;
    Ok(Speed::from_level(level).unwrap_or(Speed::PLAYER_DEFAULT))
}

impl GameState {
    /// A fresh game at the project's initial position.
    pub fn new(game: &Game, seed: u64) -> Result<Self, EngineError> {
        let start = &game.system.initial_position;
        let player = Character::new_player(
            start.x,
            start.y,
            &game.system.initial_player_image,
            Speed::PLAYER_DEFAULT,
        );
        let map = GameMap::new(game, start.map_id, start.room_id, player)?;
        let mut state = Self {
            variables: Variables::default(),
            items: Items::default(),
            hints: Hints::default(),
            screen: Screen::default(),
            windows: Windows::default(),
            pictures: Pictures::default(),
            map,
            last_interpreter_id: 0,
            autosave_enabled: true,
            player_control_enabled: true,
            player_speed: Speed::PLAYER_DEFAULT,
            inventory_visible: false,
            cleared: false,
            last_playing_bgm: None,
            backgrounds: BTreeMap::new(),
            foregrounds: BTreeMap::new(),
            pending_bgm: None,
            save_request_id: None,
            save_by_script: false,
            scheduled_saves: VecDeque::new(),
            touch: PictureTouch::default(),
            pressed_tile: None,
            image_sizes: BTreeMap::new(),
            rng: GameRng::new(seed),
            event_log: VecDeque::new(),
            script_errors: Vec::new(),
            diagnostics: Vec::new(),
            goto_title: false,
            item_preview: None,
        };
        state.refresh_pages(game);
        log::info!(
            "new game at map{}/room{} ({}, {})",
            start.map_id,
            start.room_id,
            start.x,
            start.y
        );
        Ok(state)
    }

    pub fn encode(&self) -> Result<Vec<u8>, SaveError> {
        encode_payload(PayloadKind::Progress, self)
    }

    /// Restores a progress save. The RNG is not part of the save, so the
    /// caller picks the seed the resumed game continues with.
    pub fn decode(bytes: &[u8], seed: u64) -> Result<Self, SaveError> {
        let mut state: Self = decode_expected(PayloadKind::Progress, bytes)?;
        state.rng = GameRng::new(seed);
        state.pending_bgm = state.last_playing_bgm.clone();
        state.map.player_mut().set_speed(state.player_speed);
        state.map.forget_requests();
        log::info!(
            "loaded save at map{}/room{}",
            state.map.map_id(),
            state.map.room_id()
        );
        Ok(state)
    }

    /// Advances the world by one frame.
    pub fn update(&mut self, scene: &mut SceneManager, game: &Game, input: &InputState) {
        let mut input = *input;

        if let Some(bgm) = self.pending_bgm.take() {
            if let Some(audio) = scene.audio() {
                audio.play_bgm(&bgm.name, bgm.volume, 0);
            }
        }

        scene.update();
        self.collect_save_result(scene);

        self.screen.update();

        if self.windows.update(&input) {
            input.consume();
        }

        self.pictures.update();

        self.update_map(scene, game, &input);

        self.update_touch(&input);
    }

    fn collect_save_result(&mut self, scene: &mut SceneManager) {
        let Some(id) = self.save_request_id else {
            return;
        };
        if !scene.has_result(id) {
            return;
        }
        self.save_request_id = None;
        if self.save_by_script {
            return;
        }
        if let Some(result) = scene.take_result(id) {
            if !result.succeeded {
                log::warn!("save request #{id} failed");
            }
        }
    }

    fn update_map(&mut self, scene: &mut SceneManager, game: &Game, input: &InputState) {
        self.refresh_pages(game);
        self.start_automatic_events(game);
        self.handle_tap(game, input);
        self.update_player_move(game);

        let was_blocked = self.map.has_blocking_interpreter();

        let mut interpreters = self.map.take_interpreters();
        for interpreter in &mut interpreters {
            interpreter.update(self, scene, game);
        }
        self.map.merge_interpreters(interpreters);

        let mut routes = self.map.take_route_interpreters();
        for route in &mut routes {
            route.update(self, scene, game);
        }
        self.map.merge_route_interpreters(routes);

        // A transfer inside a script ran while the interpreters were taken
        // out of the map.
        self.map.drop_stale_interpreters();
        self.map.update_characters();

        // Script saves go first; an autosave in the same tick is then
        // refused since one save is already in flight.
        self.send_scheduled_save(scene);
        if was_blocked && !self.map.has_blocking_interpreter() && self.autosave_enabled {
            self.request_save(scene);
        }
    }

    fn send_scheduled_save(&mut self, scene: &mut SceneManager) {
        if self.save_request_id.is_some() || self.map.is_player_moving_by_user_input() {
            return;
        }
        let Some(id) = self.scheduled_saves.pop_front() else {
            return;
        };
        match self.encode() {
            Ok(bytes) => {
                scene.request_save_progress(id, &bytes);
                self.save_request_id = Some(id);
                self.save_by_script = true;
            }
            Err(err) => {
                log::error!("encoding save for request #{id}: {err}");
                scene.fail_request(id, RequestKind::SaveProgress);
            }
        }
    }

    /// Moves every event to the last page whose conditions hold.
    fn refresh_pages(&mut self, game: &Game) {
        let (map_id, room_id) = (self.map.map_id(), self.map.room_id());
        for event_id in self.map.event_ids() {
            let index = game.event(map_id, room_id, event_id).and_then(|event| {
                event
                    .pages
                    .iter()
                    .rposition(|page| self.meets_conditions(game, &page.conditions, event_id))
            });
            self.map.set_page_index(game, event_id, index);
        }
    }

    fn start_automatic_events(&mut self, game: &Game) {
        for event_id in self.map.event_ids() {
            let Some(page) = self.map.active_page(game, event_id) else {
                continue;
            };
            if page.commands.is_empty()
                || self.map.character(event_id).is_some_and(Character::is_erased)
                || self.map.is_event_running(event_id)
            {
                continue;
            }
            match page.trigger {
                Trigger::Auto if !self.map.has_blocking_interpreter() => {
                    self.start_event(game, event_id);
                }
                Trigger::Parallel => {
                    self.start_event(game, event_id);
                }
                _ => {}
            }
        }
    }

    fn accepts_input(&self) -> bool {
        self.player_control_enabled
            && !self.map.has_blocking_interpreter()
            && !self.windows.is_active()
    }

    /// A tap either runs a `direct` event on the tile or walks the player
    /// toward it.
    fn handle_tap(&mut self, game: &Game, input: &InputState) {
        let Some(target) = input.tapped_tile else {
            return;
        };
        if !self.accepts_input() {
            return;
        }
        if let Some(event_id) = self.map.event_at(game, target.0, target.1, Trigger::Direct) {
            self.start_event(game, event_id);
            return;
        }

        let start = self.map.player().destination();
        let map = &self.map;
        let path = find_path(start, target, |x, y| {
            map.passable_for(game, PLAYER_EVENT_ID, x, y, false)
        });
        if path.is_empty() {
            self.trigger_player_event(game, target);
            return;
        }
        log::debug!("player walks from {start:?} toward {target:?} in {} steps", path.len());
        let state = MoveCharacterState::along_path(&self.map, PLAYER_EVENT_ID, target, path);
        self.map.start_player_move(state);
    }

    fn update_player_move(&mut self, game: &Game) {
        let Some(mut state) = self.map.take_player_move() else {
            return;
        };
        state.update(&mut self.map, game, &mut self.rng);
        if !state.is_terminated(&self.map) {
            self.map.restore_player_move(state);
            return;
        }
        if self.map.is_player_moving_by_user_input() {
            self.map.finish_player_moving_by_user_input();
            self.trigger_player_event(game, state.target());
        }
    }

    /// Runs the `player` event on `target` if the player stands on it or
    /// right next to it.
    fn trigger_player_event(&mut self, game: &Game, target: (i32, i32)) {
        let Some(event_id) = self.map.executable_event_at(game, target.0, target.1) else {
            return;
        };
        let position = self.map.player().position();
        let distance = (position.0 - target.0).abs() + (position.1 - target.1).abs();
        if distance > 1 {
            return;
        }
        if let Some(dir) = Dir::toward(position, target) {
            self.map.player_mut().turn(dir);
        }
        self.start_event(game, event_id);
    }

    /// Starts the active page of an event in the current room. Returns false
    /// if it has no page or is already running.
    pub fn start_event(&mut self, game: &Game, event_id: i32) -> bool {
        let Some(page) = self.map.active_page(game, event_id) else {
            log::warn!(
                "event {event_id} has no active page in map{}/room{}",
                self.map.map_id(),
                self.map.room_id()
            );
            return false;
        };
        if self.map.is_event_running(event_id) {
            return false;
        }
        let kind = if page.trigger == Trigger::Parallel {
            InterpreterKind::Parallel
        } else {
            InterpreterKind::Event
        };
        self.start_interpreter(kind, event_id, &page.commands);
        self.log_event(format!("event.start {event_id}"));
        true
    }

    /// Runs an owned item's own commands with it set as the event item.
    pub fn start_item_commands(&mut self, game: &Game, item_id: i32) -> bool {
        if self.map.has_blocking_interpreter() {
            return false;
        }
        let Some(item) = game.item(item_id) else {
            log::warn!("item {item_id} not found");
            return false;
        };
        if !self.items.includes(item_id) {
            log::warn!("item {item_id} is not owned");
            return false;
        }
        self.items.set_event_item(item_id);
        self.start_interpreter(InterpreterKind::Item, SELF_EVENT_ID, &item.commands);
        self.log_event(format!("item.use {item_id}"));
        true
    }

    /// Runs the combine defined for the two items, if any.
    pub fn start_combine_commands(&mut self, game: &Game, item1: i32, item2: i32) -> bool {
        if self.map.has_blocking_interpreter() {
            return false;
        }
        let Some(combine) = game.find_combine(item1, item2) else {
            log::debug!("no combine for items {item1} and {item2}");
            return false;
        };
        self.items.set_combine_item(item2);
        self.start_interpreter(InterpreterKind::Combine, SELF_EVENT_ID, &combine.commands);
        self.log_event(format!("combine.start {}", combine.id));
        true
    }

    pub fn start_common_event(&mut self, game: &Game, id: i32) -> bool {
        let Some(common) = game.common_event(id) else {
            log::warn!("common event {id} not found");
            return false;
        };
        self.start_interpreter(InterpreterKind::Common, SELF_EVENT_ID, &common.commands);
        self.log_event(format!("common_event.start {id}"));
        true
    }

    /// Runs the first active hint's commands.
    pub fn start_hint_commands(&mut self, game: &Game) -> bool {
        let Some(hint) = self.hints.current().and_then(|id| game.hint(id)) else {
            return false;
        };
        self.start_interpreter(InterpreterKind::Hint, SELF_EVENT_ID, &hint.commands);
        self.log_event(format!("hint.show {}", hint.id));
        true
    }

    fn start_interpreter(&mut self, kind: InterpreterKind, event_id: i32, commands: &[snack_data::Command]) {
        let id = self.generate_interpreter_id();
        let interpreter = Interpreter::new(
            id,
            self.map.map_id(),
            self.map.room_id(),
            event_id,
            kind,
            commands,
        );
        log::debug!("interpreter #{id} ({kind:?}) started for event {event_id}");
        self.map.add_interpreter(interpreter);
    }

    /// Submits the whole state as a progress save. Refused while another
    /// save is in flight or queued, or while the player is walking to a
    /// tapped tile.
    pub fn request_save(&mut self, scene: &mut SceneManager) -> bool {
        if self.save_request_id.is_some()
            || !self.scheduled_saves.is_empty()
            || self.map.is_player_moving_by_user_input()
        {
            return false;
        }
        let bytes = match self.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("encoding save: {err}");
                return false;
            }
        };
        let id = scene.generate_request_id();
        scene.request_save_progress(id, &bytes);
        self.save_request_id = Some(id);
        self.save_by_script = false;
        true
    }

    pub fn is_saving(&self) -> bool {
        self.save_request_id.is_some() || !self.scheduled_saves.is_empty()
    }

    fn update_touch(&mut self, input: &InputState) {
        self.pressed_tile = input.pressed_tile;
        let sizes = &self.image_sizes;
        let hit = input.pointer.and_then(|(x, y)| {
            self.pictures
                .picture_at(x, y, |image| sizes.get(image).copied())
        });
        self.touch = PictureTouch {
            triggered: hit.filter(|_| input.triggered),
            pressed: hit.filter(|_| input.pointer_pressed),
            released: hit.filter(|_| input.pointer_released),
        };
    }

    /// Pixel size of an image, used to hit-test pictures.
    pub fn set_image_size(&mut self, image: &str, width: u32, height: u32) {
        self.image_sizes.insert(image.to_string(), (width, height));
    }

    pub fn transfer(
        &mut self,
        game: &Game,
        room_id: i32,
        x: i32,
        y: i32,
        dir: Option<Dir>,
    ) -> Result<(), EngineError> {
        self.map.transfer(game, room_id, x, y, dir)?;
        self.refresh_pages(game);
        self.log_event(format!("transfer {room_id} {x} {y}"));
        Ok(())
    }

    pub fn generate_interpreter_id(&mut self) -> u32 {
        self.last_interpreter_id += 1;
        self.last_interpreter_id
    }

    pub fn schedule_save(&mut self, id: RequestId) {
        self.scheduled_saves.push_back(id);
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut GameMap {
        &mut self.map
    }

    /// The map and the RNG together, for movement that rolls dice while
    /// moving characters.
    pub fn map_and_rng_mut(&mut self) -> (&mut GameMap, &mut GameRng) {
        (&mut self.map, &mut self.rng)
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn items(&self) -> &Items {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Items {
        &mut self.items
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn hints_mut(&mut self) -> &mut Hints {
        &mut self.hints
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn windows(&self) -> &Windows {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut Windows {
        &mut self.windows
    }

    pub fn pictures(&self) -> &Pictures {
        &self.pictures
    }

    pub fn pictures_mut(&mut self) -> &mut Pictures {
        &mut self.pictures
    }

    pub fn play_se(&mut self, scene: &SceneManager, name: &str, volume: i32) {
        if let Some(audio) = scene.audio() {
            audio.play_se(name, volume);
        }
    }

    pub fn play_bgm(&mut self, scene: &SceneManager, name: &str, volume: i32, fade_frames: u32) {
        if let Some(audio) = scene.audio() {
            audio.play_bgm(name, volume, fade_frames);
        }
        self.last_playing_bgm = Some(Bgm {
            name: name.to_string(),
            volume,
        });
    }

    pub fn stop_bgm(&mut self, scene: &SceneManager, fade_frames: u32) {
        if let Some(audio) = scene.audio() {
            audio.stop_bgm(fade_frames);
        }
        self.last_playing_bgm = None;
    }

    pub fn last_playing_bgm(&self) -> Option<&Bgm> {
        self.last_playing_bgm.as_ref()
    }

    pub fn set_background(&mut self, image: &str) {
        self.backgrounds
            .entry(self.map.map_id())
            .or_default()
            .insert(self.map.room_id(), image.to_string());
    }

    pub fn set_foreground(&mut self, image: &str) {
        self.foregrounds
            .entry(self.map.map_id())
            .or_default()
            .insert(self.map.room_id(), image.to_string());
    }

    /// Background of the current room, after `change_background`.
    pub fn background<'a>(&'a self, game: &'a Game) -> &'a str {
        self.room_image(&self.backgrounds)
            .or_else(|| self.map.room(game).map(|room| room.background.as_str()))
            .unwrap_or_default()
    }

    pub fn foreground<'a>(&'a self, game: &'a Game) -> &'a str {
        self.room_image(&self.foregrounds)
            .or_else(|| self.map.room(game).map(|room| room.foreground.as_str()))
            .unwrap_or_default()
    }

    fn room_image<'a>(&self, images: &'a BTreeMap<i32, BTreeMap<i32, String>>) -> Option<&'a str> {
        images
            .get(&self.map.map_id())?
            .get(&self.map.room_id())
            .map(String::as_str)
    }

    pub fn set_autosave(&mut self, enabled: bool) {
        self.autosave_enabled = enabled;
    }

    pub fn set_player_control(&mut self, enabled: bool) {
        self.player_control_enabled = enabled;
    }

    pub fn is_player_control_enabled(&self) -> bool {
        self.player_control_enabled
    }

    pub fn set_player_speed(&mut self, speed: Speed) {
        self.player_speed = speed;
    }

    pub fn player_speed(&self) -> Speed {
        self.player_speed
    }

    pub fn set_inventory_visible(&mut self, visible: bool) {
        self.inventory_visible = visible;
    }

    pub fn is_inventory_visible(&self) -> bool {
        self.inventory_visible
    }

    pub fn show_item_preview(&mut self, item_id: i32) {
        self.item_preview = Some(item_id);
    }

    pub fn hide_item_preview(&mut self) {
        self.item_preview = None;
    }

    pub fn item_preview(&self) -> Option<i32> {
        self.item_preview
    }

    pub fn mark_cleared(&mut self) {
        self.cleared = true;
        self.log_event("game.clear".to_string());
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn request_goto_title(&mut self) {
        self.goto_title = true;
    }

    /// Whether a script asked to return to the title since the last call.
    pub fn take_goto_title(&mut self) -> bool {
        std::mem::take(&mut self.goto_title)
    }

    pub fn log_event(&mut self, entry: String) {
        log::debug!("event log: {entry}");
        if self.event_log.len() == EVENT_LOG_LIMIT {
            self.event_log.pop_front();
        }
        self.event_log.push_back(entry);
    }

    pub fn event_log(&self) -> impl Iterator<Item = &str> {
        self.event_log.iter().map(String::as_str)
    }

    pub fn record_script_error(&mut self, error: ScriptError) {
        log::error!("{error}");
        self.script_errors.push(error);
    }

    pub fn script_errors(&self) -> &[ScriptError] {
        &self.script_errors
    }

    pub fn record_diagnostic(&mut self, message: String) {
        self.diagnostics.push(message);
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use snack_data::{Command, CommandArgs};

    use super::*;
    use crate::requester::{RecordedRequest, RecordingRequester};

    /// A 5x5 room. Event 1 sets switch 1 when the player acts on it and then
    /// flips to an inert page; event 2 counts variable 5 up to 2 on its own.
    fn game() -> Game {
        let json = r#"{
            "system": {"initialPosition": {"mapId": 1, "roomId": 1, "x": 0, "y": 0},
                       "initialPlayerImage": "hero"},
            "maps": [{"id": 1, "rooms": [
                {"id": 1, "width": 5, "height": 5, "events": [
                    {"id": 1, "x": 2, "y": 0, "pages": [
                        {"trigger": "player", "commands": [
                            {"name": "set_switch", "args": {"id": 1, "value": true}}
                        ]},
                        {"conditions": [{"type": "switch", "id": 1, "value": true}],
                         "trigger": "never"}
                    ]},
                    {"id": 2, "x": 4, "y": 4, "pages": [
                        {"conditions": [{"type": "variable", "id": 5, "comp": "<", "value": 2}],
                         "trigger": "auto", "commands": [
                            {"name": "set_variable", "args":
                                {"id": 5, "op": "+", "valueType": "constant", "value": 1}}
                        ]}
                    ]}
                ]}
            ]}]
        }"#;
        Game::from_json_slice(json.as_bytes()).expect("game")
    }

    fn scene(game: &Game) -> SceneManager {
        SceneManager::new(Rc::new(game.clone()), Box::new(RecordingRequester::new()))
    }

    fn run(state: &mut GameState, scene: &mut SceneManager, game: &Game, ticks: usize) {
        for _ in 0..ticks {
            state.update(scene, game, &InputState::default());
        }
    }

    #[test]
    fn script_save_and_autosave_in_one_tick_send_one_request() {
        // Event 1 saves in parallel once; the common event blocks for one tick
        // so its end would also trigger an autosave.
        let json = r#"{
            "system": {"initialPosition": {"mapId": 1, "roomId": 1, "x": 0, "y": 0}},
            "maps": [{"id": 1, "rooms": [{"id": 1, "width": 3, "height": 3, "events": [
                {"id": 1, "x": 2, "y": 2, "pages": [
                    {"conditions": [{"type": "switch", "id": 9, "value": false}],
                     "trigger": "parallel", "commands": [
                        {"name": "set_switch", "args": {"id": 9, "value": true}},
                        {"name": "save"},
                        {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 1}}
                    ]}
                ]}
            ]}]}],
            "commonEvents": [{"id": 1, "commands": [
                {"name": "set_variable", "args": {"id": 2, "op": "=", "valueType": "constant", "value": 1}}
            ]}]
        }"#;
        let game = Game::from_json_slice(json.as_bytes()).expect("game");
        let recorder = RecordingRequester::new();
        let mut scene = SceneManager::new(Rc::new(game.clone()), Box::new(recorder.clone()));
        let mut state = GameState::new(&game, 1).expect("state");
        assert!(state.start_common_event(&game, 1));

        run(&mut state, &mut scene, &game, 1);
        let saves: Vec<_> = recorder
            .requests()
            .into_iter()
            .filter(|request| matches!(request, RecordedRequest::SaveProgress { .. }))
            .collect();
        assert_eq!(saves.len(), 1);
        assert!(matches!(saves[0], RecordedRequest::SaveProgress { id: 1, .. }));
        assert!(state.is_saving());
        assert!(!state.request_save(&mut scene));

        // The script collects its own result and carries on.
        run(&mut state, &mut scene, &game, 1);
        assert!(!state.is_saving());
        assert_eq!(state.variables().variable_value(1), 1);
        assert_eq!(scene.pending_result_count(), 0);
    }

    #[test]
    fn script_saves_queue_behind_a_save_in_flight() {
        let game = game();
        let mut scene = scene(&game);
        let mut state = GameState::new(&game, 1).expect("state");
        run(&mut state, &mut scene, &game, 3);
        assert!(state.request_save(&mut scene));
        state.schedule_save(scene.generate_request_id());
        assert!(state.is_saving());
        // The queued save goes out once the first answer is collected.
        run(&mut state, &mut scene, &game, 1);
        assert!(state.is_saving());
        assert!(state.scheduled_saves.is_empty());
        assert!(!state.request_save(&mut scene));
    }

    #[test]
    fn auto_events_restart_until_their_page_turns_off() {
        let game = game();
        let mut scene = scene(&game);
        let mut state = GameState::new(&game, 1).expect("state");
        run(&mut state, &mut scene, &game, 1);
        assert_eq!(state.variables().variable_value(5), 1);
        run(&mut state, &mut scene, &game, 5);
        assert_eq!(state.variables().variable_value(5), 2);
        assert_eq!(state.map().page_index(2), None);
        assert!(!state.map().has_blocking_interpreter());
    }

    #[test]
    fn taps_are_ignored_while_an_auto_event_blocks() {
        let game = game();
        let mut scene = scene(&game);
        let mut state = GameState::new(&game, 1).expect("state");
        state.update(&mut scene, &game, &InputState::tap(0, 3));
        assert!(state.map().player_move().is_none());
    }

    #[test]
    fn tapping_an_event_walks_over_and_runs_it() {
        let game = game();
        let mut scene = scene(&game);
        let mut state = GameState::new(&game, 1).expect("state");
        run(&mut state, &mut scene, &game, 3);

        state.update(&mut scene, &game, &InputState::tap(2, 0));
        assert!(state.map().is_player_moving_by_user_input());
        run(&mut state, &mut scene, &game, 120);

        assert_eq!(state.map().player().position(), (1, 0));
        assert_eq!(state.map().player().dir(), Dir::Right);
        assert!(state.variables().switch_value(1));
        assert_eq!(state.map().page_index(1), Some(1));
        assert!(state.event_log().any(|entry| entry == "event.start 1"));
    }

    #[test]
    fn zero_player_speed_in_a_save_becomes_the_default() {
        let game = game();
        let mut state = GameState::new(&game, 1).expect("state");
        state.set_player_speed(Speed::Speed2);
        let bytes = state.encode().expect("encode");
        let restored = GameState::decode(&bytes, 1).expect("decode");
        assert_eq!(restored.player_speed(), Speed::Speed2);

        let speed = player_speed(serde_json::json!(0)).expect("speed");
        assert_eq!(speed, Speed::PLAYER_DEFAULT);
    }

    #[test]
    fn saves_are_refused_while_walking_to_a_tap() {
        let game = game();
        let mut scene = scene(&game);
        let mut state = GameState::new(&game, 1).expect("state");
        state.set_autosave(false);
        run(&mut state, &mut scene, &game, 3);

        state.update(&mut scene, &game, &InputState::tap(0, 3));
        assert!(!state.request_save(&mut scene));
        run(&mut state, &mut scene, &game, 120);
        assert_eq!(state.map().player().position(), (0, 3));

        assert!(state.request_save(&mut scene));
        assert!(!state.request_save(&mut scene), "one save at a time");
        run(&mut state, &mut scene, &game, 1);
        assert!(!state.is_saving());
    }

    #[test]
    fn started_interpreters_get_increasing_ids() {
        let game = game();
        let mut state = GameState::new(&game, 1).expect("state");
        let commands = vec![Command::new(CommandArgs::Nop)];
        state.start_interpreter(InterpreterKind::Common, SELF_EVENT_ID, &commands);
        state.start_interpreter(InterpreterKind::Common, SELF_EVENT_ID, &commands);
        let ids: Vec<u32> = state.map().interpreters().iter().map(Interpreter::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
