use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snack_data::{Dir, Game, Page, PassageType, Room, Trigger, PLAYER_EVENT_ID};

use crate::character::Character;
use crate::error::EngineError;
use crate::interpreter::Interpreter;
use crate::movement::MoveCharacterState;

/// The room the player is in: its characters, which page each event shows,
/// and every interpreter bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    map_id: i32,
    room_id: i32,
    player: Character,
    events: Vec<Character>,
    /// Active page per event id. Events without an entry show no page.
    #[serde(default)]
    page_indices: BTreeMap<i32, usize>,
    /// Event, item, combine and common-event interpreters in start order.
    #[serde(default)]
    interpreters: Vec<Interpreter>,
    /// One `set_route` body per character at most.
    #[serde(default)]
    route_interpreters: Vec<Interpreter>,
    #[serde(default)]
    player_move: Option<MoveCharacterState>,
    #[serde(default)]
    player_moving_by_user_input: bool,
}

impl GameMap {
    pub fn new(game: &Game, map_id: i32, room_id: i32, player: Character) -> Result<Self, EngineError> {
        let room = game
            .room(map_id, room_id)
            .ok_or(EngineError::MissingRoom { map_id, room_id })?;
        Ok(Self {
            map_id,
            room_id,
            player,
            events: event_characters(room),
            page_indices: BTreeMap::new(),
            interpreters: Vec::new(),
            route_interpreters: Vec::new(),
            player_move: None,
            player_moving_by_user_input: false,
        })
    }

    pub fn map_id(&self) -> i32 {
        self.map_id
    }

    pub fn room_id(&self) -> i32 {
        self.room_id
    }

    pub fn room<'g>(&self, game: &'g Game) -> Option<&'g Room> {
        game.room(self.map_id, self.room_id)
    }

    pub fn player(&self) -> &Character {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Character {
        &mut self.player
    }

    pub fn events(&self) -> &[Character] {
        &self.events
    }

    fn characters(&self) -> impl Iterator<Item = &Character> {
        std::iter::once(&self.player).chain(self.events.iter())
    }

    pub fn character(&self, event_id: i32) -> Option<&Character> {
        if event_id == PLAYER_EVENT_ID {
            return Some(&self.player);
        }
        self.events.iter().find(|event| event.event_id() == event_id)
    }

    pub fn character_mut(&mut self, event_id: i32) -> Option<&mut Character> {
        if event_id == PLAYER_EVENT_ID {
            return Some(&mut self.player);
        }
        self.events
            .iter_mut()
            .find(|event| event.event_id() == event_id)
    }

    /// Looks a character up only if it still lives in the given room. The
    /// player follows every transfer and always matches.
    pub fn character_in(&self, map_id: i32, room_id: i32, event_id: i32) -> Option<&Character> {
        if event_id != PLAYER_EVENT_ID && (map_id != self.map_id || room_id != self.room_id) {
            return None;
        }
        self.character(event_id)
    }

    pub fn passable_for(
        &self,
        game: &Game,
        mover_id: i32,
        x: i32,
        y: i32,
        ignore_characters: bool,
    ) -> bool {
        let Some(room) = self.room(game) else {
            return false;
        };
        if !room.contains(x, y) {
            return false;
        }
        if self.character(mover_id).is_some_and(Character::through) {
            return true;
        }
        let tile_set = game.tile_set(room.tile_set_id);
        let wall = room.tile_ids_at(x, y).any(|tile_id| {
            tile_set.is_some_and(|set| set.passage_type(tile_id) == PassageType::Wall)
        });
        if wall {
            return false;
        }
        if ignore_characters {
            return true;
        }
        !self.characters().any(|other| {
            other.event_id() != mover_id
                && other.blocks()
                && (other.position() == (x, y) || other.destination() == (x, y))
        })
    }

    pub fn page_index(&self, event_id: i32) -> Option<usize> {
        self.page_indices.get(&event_id).copied()
    }

    pub fn active_page<'g>(&self, game: &'g Game, event_id: i32) -> Option<&'g Page> {
        let index = self.page_index(event_id)?;
        game.event(self.map_id, self.room_id, event_id)?
            .pages
            .get(index)
    }

    /// Switches an event to another page and refreshes its appearance.
    /// Returns whether anything changed.
    pub fn set_page_index(&mut self, game: &Game, event_id: i32, index: Option<usize>) -> bool {
        if self.page_index(event_id) == index {
            return false;
        }
        match index {
            Some(index) => self.page_indices.insert(event_id, index),
            None => self.page_indices.remove(&event_id),
        };
        let page = self.active_page(game, event_id).cloned();
        if let Some(character) = self.character_mut(event_id) {
            character.update_with_page(page.as_ref());
        }
        log::debug!(
            "event {} in map{}/room{} now on page {:?}",
            event_id,
            self.map_id,
            self.room_id,
            index
        );
        true
    }

    pub fn event_ids(&self) -> Vec<i32> {
        self.events.iter().map(Character::event_id).collect()
    }

    /// First live event at a tile whose active page has `trigger` and
    /// something to run.
    pub fn event_at(&self, game: &Game, x: i32, y: i32, trigger: Trigger) -> Option<i32> {
        self.events
            .iter()
            .filter(|event| !event.is_erased() && event.position() == (x, y))
            .map(Character::event_id)
            .find(|event_id| {
                self.active_page(game, *event_id)
                    .is_some_and(|page| page.trigger == trigger && !page.commands.is_empty())
            })
    }

    pub fn executable_event_at(&self, game: &Game, x: i32, y: i32) -> Option<i32> {
        self.event_at(game, x, y, Trigger::Player)
    }

    /// Moves the player to another room of the same map. Interpreters that
    /// belonged to the old room stop unless they block the game.
    pub fn transfer(
        &mut self,
        game: &Game,
        room_id: i32,
        x: i32,
        y: i32,
        dir: Option<Dir>,
    ) -> Result<(), EngineError> {
        let room = game
            .room(self.map_id, room_id)
            .ok_or(EngineError::MissingRoom {
                map_id: self.map_id,
                room_id,
            })?;
        self.events = event_characters(room);
        self.room_id = room_id;
        self.page_indices.clear();
        self.player.transfer_immediately(x, y);
        if let Some(dir) = dir {
            self.player.turn(dir);
        }
        self.player_move = None;
        self.player_moving_by_user_input = false;
        self.drop_stale_interpreters();
        log::debug!("transferred to map{}/room{} at ({x}, {y})", self.map_id, room_id);
        Ok(())
    }

    pub fn drop_stale_interpreters(&mut self) {
        let (map_id, room_id) = (self.map_id, self.room_id);
        self.interpreters
            .retain(|interpreter| interpreter.is_blocking() || interpreter.is_in(map_id, room_id));
        self.route_interpreters.retain(|route| {
            route.route_character() == Some(PLAYER_EVENT_ID) || route.is_in(map_id, room_id)
        });
    }

    pub fn add_interpreter(&mut self, interpreter: Interpreter) {
        self.interpreters.push(interpreter);
    }

    pub fn take_interpreters(&mut self) -> Vec<Interpreter> {
        std::mem::take(&mut self.interpreters)
    }

    /// Puts run interpreters back ahead of any started while they were out.
    pub fn merge_interpreters(&mut self, mut survivors: Vec<Interpreter>) {
        survivors.retain(|interpreter| !interpreter.is_terminated());
        survivors.append(&mut self.interpreters);
        self.interpreters = survivors;
    }

    pub fn interpreters(&self) -> &[Interpreter] {
        &self.interpreters
    }

    pub fn has_blocking_interpreter(&self) -> bool {
        self.interpreters
            .iter()
            .any(|interpreter| interpreter.is_blocking() && !interpreter.is_terminated())
    }

    /// Whether an interpreter started by this event of the current room is
    /// still alive.
    pub fn is_event_running(&self, event_id: i32) -> bool {
        self.interpreters.iter().any(|interpreter| {
            interpreter.is_in(self.map_id, self.room_id)
                && interpreter.event_id() == event_id
                && !interpreter.is_terminated()
        })
    }

    /// Attaches a route, replacing whatever the character was following.
    pub fn set_route(&mut self, route: Interpreter) {
        let character_id = route.route_character();
        self.route_interpreters
            .retain(|existing| existing.route_character() != character_id);
        self.route_interpreters.push(route);
    }

    /// A finite route still running for the character. Repeating routes
    /// never finish, so they never count.
    pub fn has_route(&self, character_id: i32) -> bool {
        self.route_interpreters.iter().any(|route| {
            route.route_character() == Some(character_id)
                && !route.is_repeating()
                && !route.is_terminated()
        })
    }

    pub fn take_route_interpreters(&mut self) -> Vec<Interpreter> {
        std::mem::take(&mut self.route_interpreters)
    }

    pub fn merge_route_interpreters(&mut self, mut survivors: Vec<Interpreter>) {
        survivors.retain(|route| !route.is_terminated());
        // A route set while these ran wins over the old one.
        let replaced: Vec<Option<i32>> = self
            .route_interpreters
            .iter()
            .map(Interpreter::route_character)
            .collect();
        survivors.retain(|route| !replaced.contains(&route.route_character()));
        survivors.append(&mut self.route_interpreters);
        self.route_interpreters = survivors;
    }

    /// See [`Interpreter::forget_requests`].
    pub fn forget_requests(&mut self) {
        for interpreter in self
            .interpreters
            .iter_mut()
            .chain(self.route_interpreters.iter_mut())
        {
            interpreter.forget_requests();
        }
    }

    pub fn player_move(&self) -> Option<&MoveCharacterState> {
        self.player_move.as_ref()
    }

    pub fn start_player_move(&mut self, state: MoveCharacterState) {
        self.player_move = Some(state);
        self.player_moving_by_user_input = true;
    }

    pub fn take_player_move(&mut self) -> Option<MoveCharacterState> {
        self.player_move.take()
    }

    pub fn restore_player_move(&mut self, state: MoveCharacterState) {
        self.player_move = Some(state);
    }

    pub fn is_player_moving_by_user_input(&self) -> bool {
        self.player_moving_by_user_input
    }

    pub fn finish_player_moving_by_user_input(&mut self) {
        self.player_moving_by_user_input = false;
    }

    pub fn update_characters(&mut self) {
        self.player.update();
        for event in &mut self.events {
            event.update();
        }
    }
}

fn event_characters(room: &Room) -> Vec<Character> {
    room.events
        .iter()
        .map(|event| Character::new(event.id, event.x, event.y))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use snack_data::Speed;

    /// 5x4 room with a wall at (2, 1) and one event at (3, 2); a second
    /// room holds a single event.
    pub(crate) fn sample_game() -> Game {
        let json = r#"{
            "maps": [{"id": 1, "rooms": [
                {"id": 1, "width": 5, "height": 4, "tileSetId": 1,
                 "tiles": [[0,0,0,0,0, 0,0,1,0,0, 0,0,0,0,0, 0,0,0,0,0]],
                 "events": [{"id": 3, "x": 3, "y": 2, "pages": [
                     {"trigger": "player", "commands": [{"name": "nop"}]}
                 ]}]},
                {"id": 2, "width": 3, "height": 3,
                 "events": [{"id": 9, "x": 1, "y": 1}]}
            ]}],
            "tileSets": [{"id": 1, "passageTypes": ["passable", "wall"]}]
        }"#;
        Game::from_json_slice(json.as_bytes()).expect("sample game")
    }

    pub(crate) fn sample_map(game: &Game) -> GameMap {
        let player = Character::new_player(0, 0, "hero", Speed::Speed5);
        let mut map = GameMap::new(game, 1, 1, player).expect("map");
        map.set_page_index(game, 3, Some(0));
        map
    }

    #[test]
    fn walls_bounds_and_characters_block() {
        let game = sample_game();
        let map = sample_map(&game);
        assert!(map.passable_for(&game, PLAYER_EVENT_ID, 1, 1, false));
        assert!(!map.passable_for(&game, PLAYER_EVENT_ID, 2, 1, false));
        assert!(!map.passable_for(&game, PLAYER_EVENT_ID, 5, 0, false));
        assert!(!map.passable_for(&game, PLAYER_EVENT_ID, 3, 2, false));
        assert!(map.passable_for(&game, PLAYER_EVENT_ID, 3, 2, true));
        // The event does not block itself.
        assert!(map.passable_for(&game, 3, 3, 2, false));
    }

    #[test]
    fn through_characters_ignore_everything_but_bounds() {
        let game = sample_game();
        let mut map = sample_map(&game);
        map.player_mut().set_through(true);
        assert!(map.passable_for(&game, PLAYER_EVENT_ID, 2, 1, false));
        assert!(!map.passable_for(&game, PLAYER_EVENT_ID, -1, 0, false));
    }

    #[test]
    fn events_without_a_page_do_not_block() {
        let game = sample_game();
        let mut map = sample_map(&game);
        assert_eq!(map.executable_event_at(&game, 3, 2), Some(3));
        assert!(map.set_page_index(&game, 3, None));
        assert!(!map.set_page_index(&game, 3, None));
        assert!(map.passable_for(&game, PLAYER_EVENT_ID, 3, 2, false));
        assert_eq!(map.executable_event_at(&game, 3, 2), None);
    }

    #[test]
    fn transfer_swaps_room_events() {
        let game = sample_game();
        let mut map = sample_map(&game);
        map.transfer(&game, 2, 0, 2, Some(Dir::Up)).expect("transfer");
        assert_eq!(map.room_id(), 2);
        assert_eq!(map.event_ids(), vec![9]);
        assert_eq!(map.player().position(), (0, 2));
        assert_eq!(map.player().dir(), Dir::Up);
        assert!(map.character_in(1, 1, 3).is_none());
        assert!(map.character_in(1, 1, PLAYER_EVENT_ID).is_some());
        assert!(matches!(
            map.transfer(&game, 7, 0, 0, None),
            Err(EngineError::MissingRoom { room_id: 7, .. })
        ));
    }
}
