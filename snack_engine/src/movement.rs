use serde::{Deserialize, Serialize};
use snack_data::args::{MoveCharacterArgs, MoveCharacterType};
use snack_data::{Dir, Game, ValueType};

use crate::map::GameMap;
use crate::path::find_path;
use crate::rng::GameRng;

/// A multi-tile `move_character` in flight.
///
/// Each unit step waits for the character's tile transition to finish before
/// the next one starts. The whole struct is saved with its interpreter so a
/// restored game resumes mid-walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCharacterState {
    map_id: i32,
    room_id: i32,
    event_id: i32,
    args: MoveCharacterArgs,
    route_skip: bool,
    distance_count: u32,
    #[serde(default)]
    path: Vec<Dir>,
    waiting: bool,
    terminated: bool,
}

impl MoveCharacterState {
    /// Plans a move. `args` must already have its target resolved to
    /// constants. Returns `None` when a target is unreachable and
    /// `route_skip` is off; the caller retries on a later tick.
    pub fn new(
        map: &GameMap,
        game: &Game,
        event_id: i32,
        args: MoveCharacterArgs,
        route_skip: bool,
    ) -> Option<Self> {
        let mut state = Self {
            map_id: map.map_id(),
            room_id: map.room_id(),
            event_id,
            args,
            route_skip,
            distance_count: 0,
            path: Vec::new(),
            waiting: false,
            terminated: false,
        };
        match state.args.kind {
            MoveCharacterType::Direction
            | MoveCharacterType::Forward
            | MoveCharacterType::Backward => state.distance_count = state.args.distance,
            MoveCharacterType::Toward | MoveCharacterType::Against | MoveCharacterType::Random => {
                state.distance_count = 1;
            }
            MoveCharacterType::Target => {
                let start = map.character(event_id)?.position();
                let target = (state.args.x, state.args.y);
                let ignore_characters = state.args.ignore_characters;
                let path = find_path(start, target, |x, y| {
                    map.passable_for(game, event_id, x, y, ignore_characters)
                });
                let end = walk(start, &path);
                state.distance_count = path.len() as u32;
                state.path = path;
                if end != target {
                    if !state.route_skip {
                        return None;
                    }
                    state.terminated = true;
                }
            }
        }
        Some(state)
    }

    /// Walks the player along a precomputed path, stopping quietly if
    /// something steps into the way.
    pub fn along_path(map: &GameMap, event_id: i32, target: (i32, i32), path: Vec<Dir>) -> Self {
        Self {
            map_id: map.map_id(),
            room_id: map.room_id(),
            event_id,
            args: MoveCharacterArgs {
                kind: MoveCharacterType::Target,
                dir: Dir::Down,
                distance: path.len() as u32,
                x: target.0,
                y: target.1,
                value_type: ValueType::Constant,
                ignore_characters: false,
            },
            route_skip: true,
            distance_count: path.len() as u32,
            path,
            waiting: false,
            terminated: false,
        }
    }

    pub fn event_id(&self) -> i32 {
        self.event_id
    }

    pub fn target(&self) -> (i32, i32) {
        (self.args.x, self.args.y)
    }

    pub fn is_terminated(&self, map: &GameMap) -> bool {
        let Some(character) = map.character_in(self.map_id, self.room_id, self.event_id) else {
            return true;
        };
        if character.is_moving() {
            return false;
        }
        self.terminated
    }

    pub fn update(&mut self, map: &mut GameMap, game: &Game, rng: &mut GameRng) {
        let Some(character) = map.character_in(self.map_id, self.room_id, self.event_id) else {
            return;
        };
        // The character may still be sliding from the previous step.
        if character.is_moving() || self.terminated {
            return;
        }

        if self.waiting {
            self.distance_count = self.distance_count.saturating_sub(1);
            self.waiting = false;
            if self.distance_count == 0 {
                self.terminated = true;
                return;
            }
        }
        if self.distance_count == 0 {
            self.terminated = true;
            return;
        }

        let current_dir = character.dir();
        let position = character.position();
        let player = map.player().position();
        let dir = match self.args.kind {
            MoveCharacterType::Direction => self.args.dir,
            MoveCharacterType::Target => {
                let step = self.path.len() - self.distance_count as usize;
                match self.path.get(step) {
                    Some(dir) => *dir,
                    None => {
                        self.terminated = true;
                        return;
                    }
                }
            }
            MoveCharacterType::Forward => current_dir,
            MoveCharacterType::Backward => current_dir.opposite(),
            MoveCharacterType::Toward => Dir::toward(position, player).unwrap_or(current_dir),
            MoveCharacterType::Against => Dir::toward(player, position).unwrap_or(current_dir),
            MoveCharacterType::Random => Dir::ALL[rng.index(Dir::ALL.len())],
        };

        let (dx, dy) = dir.delta();
        let (nx, ny) = (position.0 + dx, position.1 + dy);
        let passable = map.passable_for(game, self.event_id, nx, ny, false);
        let Some(character) = map.character_mut(self.event_id) else {
            return;
        };
        if !passable {
            character.turn(dir);
            if self.route_skip {
                self.terminated = true;
                self.distance_count = 0;
            }
            return;
        }
        character.start_move(dir);
        self.waiting = true;
    }
}

fn walk(start: (i32, i32), path: &[Dir]) -> (i32, i32) {
    path.iter().fold(start, |(x, y), dir| {
        let (dx, dy) = dir.delta();
        (x + dx, y + dy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::map::tests::{sample_game, sample_map};
    use snack_data::{Speed, PLAYER_EVENT_ID};

    fn direction(dir: Dir, distance: u32) -> MoveCharacterArgs {
        MoveCharacterArgs {
            kind: MoveCharacterType::Direction,
            dir,
            distance,
            x: 0,
            y: 0,
            value_type: ValueType::Constant,
            ignore_characters: false,
        }
    }

    fn target(x: i32, y: i32) -> MoveCharacterArgs {
        MoveCharacterArgs {
            kind: MoveCharacterType::Target,
            x,
            y,
            ..direction(Dir::Down, 1)
        }
    }

    /// Runs movement and character animation together the way a tick does.
    fn drive(state: &mut MoveCharacterState, map: &mut GameMap, game: &Game, frames: usize) {
        let mut rng = GameRng::new(0);
        for _ in 0..frames {
            if state.is_terminated(map) {
                return;
            }
            state.update(map, game, &mut rng);
            map.update_characters();
        }
    }

    #[test]
    fn walks_the_requested_distance() {
        let game = sample_game();
        let mut map = sample_map(&game);
        let mut state =
            MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, direction(Dir::Right, 2), false)
                .expect("state");
        drive(&mut state, &mut map, &game, 100);
        assert!(state.is_terminated(&map));
        assert_eq!(map.player().position(), (2, 0));
        assert_eq!(map.player().dir(), Dir::Right);
    }

    #[test]
    fn blocked_move_turns_and_keeps_retrying() {
        let game = sample_game();
        let mut map = sample_map(&game);
        map.player_mut().transfer_immediately(2, 0);
        let mut state =
            MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, direction(Dir::Down, 1), false)
                .expect("state");
        drive(&mut state, &mut map, &game, 10);
        assert_eq!(map.player().dir(), Dir::Down);
        assert_eq!(map.player().position(), (2, 0));
        assert_eq!(map.player().move_count(), 0);
        assert!(!state.is_terminated(&map));
    }

    #[test]
    fn blocked_move_with_skip_gives_up() {
        let game = sample_game();
        let mut map = sample_map(&game);
        map.player_mut().transfer_immediately(2, 0);
        let mut state =
            MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, direction(Dir::Down, 3), true)
                .expect("state");
        drive(&mut state, &mut map, &game, 1);
        assert!(state.is_terminated(&map));
        assert_eq!(map.player().position(), (2, 0));
    }

    #[test]
    fn target_move_routes_around_the_wall() {
        let game = sample_game();
        let mut map = sample_map(&game);
        map.player_mut().transfer_immediately(2, 0);
        let mut state =
            MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, target(2, 2), false)
                .expect("state");
        drive(&mut state, &mut map, &game, 200);
        assert!(state.is_terminated(&map));
        assert_eq!(map.player().position(), (2, 2));
    }

    #[test]
    fn unreachable_target_depends_on_skip() {
        let json = r#"{"maps": [{"id": 1, "rooms": [{"id": 1, "width": 5, "height": 1,
            "tileSetId": 1, "tiles": [[0, 0, 1, 0, 0]]}]}],
            "tileSets": [{"id": 1, "passageTypes": ["passable", "wall"]}]}"#;
        let game = Game::from_json_slice(json.as_bytes()).expect("game");
        let player = Character::new_player(0, 0, "hero", Speed::Speed5);
        let map = GameMap::new(&game, 1, 1, player).expect("map");
        assert!(MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, target(4, 0), false).is_none());
        let state = MoveCharacterState::new(&map, &game, PLAYER_EVENT_ID, target(4, 0), true)
            .expect("state");
        assert!(state.is_terminated(&map));
    }
}
