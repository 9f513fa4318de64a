//! Command interpreter: walks one command tree with an explicit frame stack.
//!
//! Everything an interpreter needs to resume lives in plain fields (frames,
//! the reason it is waiting, a half-finished move) so a suspended script is
//! saved and restored like any other piece of state. Handlers for the
//! individual commands live in `commands`; route commands that act on a
//! character live in `characters`.

mod characters;
mod commands;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use snack_data::{Command, Game, SELF_EVENT_ID};

use crate::error::{ScriptError, ScriptErrorKind, ScriptLocation};
use crate::game_state::GameState;
use crate::movement::MoveCharacterState;
use crate::requester::RequestId;
use crate::scene::SceneManager;

/// Commands one interpreter may run in a single tick before it is forced to
/// yield. Guards against label loops that never wait.
const MAX_COMMANDS_PER_TICK: usize = 1000;

/// What started an interpreter. Everything except `Parallel` and `Route`
/// blocks player input while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterKind {
    Event,
    Parallel,
    Item,
    Combine,
    Common,
    Hint,
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FrameKind {
    Root,
    /// An `if` or `show_choices` branch; `return` passes through it.
    Branch,
    /// A called event or common event; `return` stops here.
    Call,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Frame {
    commands: Rc<[Command]>,
    index: usize,
    kind: FrameKind,
    /// Event that `event_id: 0` and self switches refer to in this frame.
    event_id: i32,
}

impl Frame {
    fn new(commands: &[Command], kind: FrameKind, event_id: i32) -> Self {
        Self {
            commands: Rc::from(commands),
            index: 0,
            kind,
            event_id,
        }
    }
}

/// Why an interpreter is not running its next command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Wait {
    #[default]
    None,
    Frames {
        count: u32,
    },
    /// A message or balloon owned by this interpreter is on screen.
    Window,
    Choices,
    Request {
        id: RequestId,
    },
    Route {
        character: i32,
    },
    Picture {
        id: usize,
    },
    Tint,
    Shake,
    Fade,
    CharacterOpacity {
        character: i32,
    },
}

/// Second half of a command that re-runs once its wait is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Pending {
    Choices,
    Request { id: RequestId },
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct RouteState {
    character: i32,
    repeat: bool,
    skip: bool,
}

/// What a handler asks the run loop to do next.
#[derive(Debug)]
enum Outcome {
    /// Advance to the next sibling and keep going.
    Next,
    /// Stay on this command and try it again next tick.
    Retry,
    /// Advance, then hold until the wait resolves.
    Wait(Wait),
    /// Hold on this command; it runs again once the wait resolves.
    WaitHere(Wait),
    /// Advance the current frame, then enter a new one.
    Push(Frame),
    /// Continue from another index of the current list on the next tick.
    Jump(usize),
    Return,
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpreter {
    id: u32,
    map_id: i32,
    room_id: i32,
    event_id: i32,
    kind: InterpreterKind,
    frames: Vec<Frame>,
    #[serde(default)]
    wait: Wait,
    #[serde(default)]
    pending: Option<Pending>,
    #[serde(default)]
    move_state: Option<MoveCharacterState>,
    #[serde(default)]
    route: Option<RouteState>,
    #[serde(default)]
    terminated: bool,
}

impl Interpreter {
    pub fn new(
        id: u32,
        map_id: i32,
        room_id: i32,
        event_id: i32,
        kind: InterpreterKind,
        commands: &[Command],
    ) -> Self {
        Self {
            id,
            map_id,
            room_id,
            event_id,
            kind,
            frames: vec![Frame::new(commands, FrameKind::Root, event_id)],
            wait: Wait::None,
            pending: None,
            move_state: None,
            route: None,
            terminated: false,
        }
    }

    /// A `set_route` body driving one character.
    pub fn route(
        id: u32,
        map_id: i32,
        room_id: i32,
        character: i32,
        commands: &[Command],
        repeat: bool,
        skip: bool,
    ) -> Self {
        let mut interpreter = Self::new(
            id,
            map_id,
            room_id,
            character,
            InterpreterKind::Route,
            commands,
        );
        interpreter.route = Some(RouteState {
            character,
            repeat,
            skip,
        });
        interpreter
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> InterpreterKind {
        self.kind
    }

    pub fn event_id(&self) -> i32 {
        self.event_id
    }

    pub fn is_in(&self, map_id: i32, room_id: i32) -> bool {
        self.map_id == map_id && self.room_id == room_id
    }

    pub fn is_blocking(&self) -> bool {
        !matches!(self.kind, InterpreterKind::Parallel | InterpreterKind::Route)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn route_character(&self) -> Option<i32> {
        self.route.map(|route| route.character)
    }

    pub fn is_repeating(&self) -> bool {
        self.route.is_some_and(|route| route.repeat)
    }

    pub fn wait(&self) -> &Wait {
        &self.wait
    }

    /// Depth of the frame stack; 1 while only the root list runs.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_moving_character(&self) -> bool {
        self.move_state.is_some()
    }

    /// Drops waits on requests issued by an earlier session. Their answers
    /// will never arrive, so the command counts as done.
    pub fn forget_requests(&mut self) {
        if matches!(self.pending, Some(Pending::Request { .. })) {
            self.pending = None;
            self.wait = Wait::None;
            self.advance();
        }
    }

    /// Runs commands until one waits, the list ends, or the tick budget is
    /// used up.
    pub fn update(&mut self, state: &mut GameState, scene: &mut SceneManager, game: &Game) {
        for _ in 0..MAX_COMMANDS_PER_TICK {
            if self.terminated || !self.resolve_wait(state, scene) || !self.update_move(state, game)
            {
                return;
            }
            let Some(frame) = self.frames.last() else {
                self.terminated = true;
                return;
            };
            if frame.index >= frame.commands.len() {
                if self.finish_frame() {
                    continue;
                }
                return;
            }
            let commands = Rc::clone(&frame.commands);
            let index = frame.index;

            let outcome = match self.execute(&commands[index], state, scene, game) {
                Ok(outcome) => outcome,
                Err(kind) => {
                    self.fail(state, kind);
                    return;
                }
            };
            match outcome {
                Outcome::Next => self.advance(),
                Outcome::Retry => return,
                Outcome::Wait(wait) => {
                    self.advance();
                    self.wait = wait;
                }
                Outcome::WaitHere(wait) => self.wait = wait,
                Outcome::Push(frame) => {
                    self.advance();
                    self.frames.push(frame);
                }
                Outcome::Jump(index) => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.index = index;
                    }
                    return;
                }
                Outcome::Return => self.return_from_call(),
                Outcome::Terminate => {
                    self.terminated = true;
                    return;
                }
            }
        }
        log::warn!(
            "interpreter #{} ran {} commands in one tick, yielding",
            self.id,
            MAX_COMMANDS_PER_TICK
        );
    }

    fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.index += 1;
        }
    }

    /// Pops a finished list. Returns false when the interpreter should stop
    /// for this tick.
    fn finish_frame(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            return true;
        }
        if self.is_repeating() {
            if let Some(root) = self.frames.first_mut() {
                root.index = 0;
            }
            return false;
        }
        self.frames.clear();
        self.terminated = true;
        log::debug!("interpreter #{} finished", self.id);
        false
    }

    fn return_from_call(&mut self) {
        while let Some(frame) = self.frames.pop() {
            if frame.kind == FrameKind::Call {
                return;
            }
        }
        self.terminated = true;
    }

    fn resolve_wait(&mut self, state: &GameState, scene: &SceneManager) -> bool {
        let done = match &mut self.wait {
            Wait::None => true,
            Wait::Frames { count } => {
                if *count > 0 {
                    *count -= 1;
                    false
                } else {
                    true
                }
            }
            Wait::Window => !state.windows().is_busy(self.id),
            Wait::Choices => state.windows().has_chosen_index(self.id),
            Wait::Request { id } => scene.has_result(*id),
            Wait::Route { character } => !state.map().has_route(*character),
            Wait::Picture { id } => !state.pictures().is_animating(*id),
            Wait::Tint => !state.screen().is_changing_tint(),
            Wait::Shake => !state.screen().is_shaking(),
            Wait::Fade => !state.screen().is_fading(),
            Wait::CharacterOpacity { character } => state
                .map()
                .character_in(self.map_id, self.room_id, *character)
                .map_or(true, |character| !character.opacity().is_animating()),
        };
        if done {
            self.wait = Wait::None;
        }
        done
    }

    /// Steps an inline `move_character`. Returns false while it is still
    /// walking.
    fn update_move(&mut self, state: &mut GameState, game: &Game) -> bool {
        let Some(mut move_state) = self.move_state.take() else {
            return true;
        };
        let (map, rng) = state.map_and_rng_mut();
        move_state.update(map, game, rng);
        if move_state.is_terminated(map) {
            return true;
        }
        self.move_state = Some(move_state);
        false
    }

    /// Event the current frame acts for.
    fn self_event_id(&self) -> i32 {
        self.frames
            .last()
            .map_or(self.event_id, |frame| frame.event_id)
    }

    /// `0` in an event id field means the event running the script.
    fn resolve_event_id(&self, event_id: i32) -> i32 {
        if event_id == SELF_EVENT_ID {
            self.self_event_id()
        } else {
            event_id
        }
    }

    fn location(&self) -> ScriptLocation {
        let (index, command) = self
            .frames
            .last()
            .map(|frame| {
                let name = frame
                    .commands
                    .get(frame.index)
                    .map_or("<end>", Command::name)
                    .to_string();
                (frame.index, name)
            })
            .unwrap_or((0, "<none>".to_string()));
        ScriptLocation {
            interpreter_id: self.id,
            map_id: self.map_id,
            room_id: self.room_id,
            event_id: self.self_event_id(),
            index,
            command,
        }
    }

    fn fail(&mut self, state: &mut GameState, kind: ScriptErrorKind) {
        let error = ScriptError {
            location: self.location(),
            kind,
        };
        self.terminated = true;
        state.record_script_error(error);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use snack_data::{commands_from_json, Dir};

    use super::*;
    use crate::input::InputState;
    use crate::requester::RecordingRequester;

    /// 5x5 room with a wall at (2, 1) and event 1 standing at (1, 1), plus
    /// an empty room 2.
    fn game() -> Game {
        let json = r#"{
            "system": {"initialPosition": {"mapId": 1, "roomId": 1, "x": 0, "y": 4}},
            "maps": [{"id": 1, "rooms": [
                {"id": 1, "width": 5, "height": 5, "tileSetId": 1,
                 "tiles": [[0,0,0,0,0, 0,0,1,0,0, 0,0,0,0,0, 0,0,0,0,0, 0,0,0,0,0]],
                 "events": [{"id": 1, "x": 1, "y": 1, "pages": [{}]}]},
                {"id": 2, "width": 3, "height": 3}
            ]}],
            "tileSets": [{"id": 1, "passageTypes": ["passable", "wall"]}],
            "commonEvents": [{"id": 1, "commands": [
                {"name": "set_variable", "args": {"id": 3, "op": "=", "valueType": "constant", "value": 5}},
                {"name": "return"},
                {"name": "set_variable", "args": {"id": 3, "op": "=", "valueType": "constant", "value": 9}}
            ]}]
        }"#;
        Game::from_json_slice(json.as_bytes()).expect("game")
    }

    struct Fixture {
        game: Game,
        scene: SceneManager,
        state: GameState,
    }

    impl Fixture {
        fn new() -> Self {
            let game = game();
            let scene =
                SceneManager::new(Rc::new(game.clone()), Box::new(RecordingRequester::new()));
            let state = GameState::new(&game, 5).expect("state");
            Self { game, scene, state }
        }

        fn interpreter(&self, json: &str) -> Interpreter {
            let commands = commands_from_json(json.as_bytes()).expect("commands");
            Interpreter::new(7, 1, 1, 1, InterpreterKind::Event, &commands)
        }

        fn tick(&mut self, interpreter: &mut Interpreter, input: InputState) {
            self.state.windows_mut().update(&input);
            interpreter.update(&mut self.state, &mut self.scene, &self.game);
        }

        fn variable(&self, id: i32) -> i64 {
            self.state.variables().variable_value(id)
        }
    }

    #[test]
    fn goto_loops_yield_once_per_tick() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "label", "args": {"name": "A"}},
                {"name": "set_variable", "args": {"id": 1, "op": "+", "valueType": "constant", "value": 1}},
                {"name": "goto", "args": {"name": "A"}}
            ]"#,
        );
        for _ in 0..3 {
            fx.tick(&mut interpreter, InputState::default());
        }
        assert_eq!(fx.variable(1), 3);
        assert!(!interpreter.is_terminated());
    }

    #[test]
    fn missing_label_stops_only_this_interpreter() {
        let mut fx = Fixture::new();
        let mut broken = fx.interpreter(r#"[{"name": "goto", "args": {"name": "nowhere"}}]"#);
        fx.tick(&mut broken, InputState::default());
        assert!(broken.is_terminated());
        let errors = fx.state.script_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ScriptErrorKind::LabelNotFound("nowhere".to_string())
        );
        assert_eq!(errors[0].location.command, "goto");

        let mut healthy = fx.interpreter(
            r#"[{"name": "set_switch", "args": {"id": 2, "value": true}}]"#,
        );
        fx.tick(&mut healthy, InputState::default());
        assert!(fx.state.variables().switch_value(2));
    }

    #[test]
    fn self_switches_written_after_a_transfer_read_back() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "transfer", "args": {"roomId": 2, "x": 0, "y": 0}},
                {"name": "set_self_switch", "args": {"id": 0, "value": true}},
                {"name": "if", "args": {"conditions": [{"type": "self_switch", "id": 0, "value": true}]},
                 "branches": [[
                    {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 1}}
                 ]]}
            ]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.state.map().room_id(), 2);
        assert_eq!(fx.variable(1), 1);
        assert!(fx.state.script_errors().is_empty());
        let key = fx.state.self_switch_key(1, 0);
        assert_eq!((key.map_id, key.room_id), (1, 2));
        assert!(fx.state.variables().self_switch_value(key));
    }

    #[test]
    fn out_of_range_permanent_slot_stops_only_this_script() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "save_permanent_variable", "args": {"permanentVariableId": 18446744073709551615, "variableId": 1}},
                {"name": "set_variable", "args": {"id": 2, "op": "=", "valueType": "constant", "value": 9}}
            ]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert!(interpreter.is_terminated());
        assert_eq!(fx.variable(2), 0);
        let errors = fx.state.script_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ScriptErrorKind::InvalidValue(_)));
        assert_eq!(errors[0].location.command, "save_permanent_variable");

        let mut healthy = fx.interpreter(
            r#"[{"name": "set_switch", "args": {"id": 4, "value": true}}]"#,
        );
        fx.tick(&mut healthy, InputState::default());
        assert!(fx.state.variables().switch_value(4));
    }

    #[test]
    fn unknown_commands_fail_when_reached() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 4}},
                {"name": "teleport", "args": {"to": 3}},
                {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 8}}
            ]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.variable(1), 4);
        assert!(interpreter.is_terminated());
        assert!(matches!(
            fx.state.script_errors()[0].kind,
            ScriptErrorKind::UnrecognizedCommand(_)
        ));
    }

    #[test]
    fn if_picks_the_first_true_branch_or_else() {
        let script = r#"[{"name": "if",
            "args": {"conditions": [{"type": "switch", "id": 1, "value": true}]},
            "branches": [
                [{"name": "set_variable", "args": {"id": 2, "op": "=", "valueType": "constant", "value": 1}}],
                [{"name": "set_variable", "args": {"id": 2, "op": "=", "valueType": "constant", "value": 2}}]
            ]}]"#;
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(script);
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.variable(2), 2);
        assert!(interpreter.is_terminated());

        fx.state.variables_mut().set_switch_value(1, true);
        let mut interpreter = fx.interpreter(script);
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.variable(2), 1);
    }

    #[test]
    fn return_leaves_the_called_common_event() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "call_common_event", "args": {"eventId": 1}},
                {"name": "set_variable", "args": {"id": 4, "op": "=", "valueType": "constant", "value": 1}}
            ]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.variable(3), 5);
        assert_eq!(fx.variable(4), 1);
        assert!(interpreter.is_terminated());
    }

    #[test]
    fn blocked_moves_turn_and_keep_trying() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[{"name": "move_character", "args": {"type": "direction", "dir": 1, "distance": 1}}]"#,
        );
        for _ in 0..5 {
            fx.tick(&mut interpreter, InputState::default());
            fx.state.map_mut().update_characters();
        }
        let event = fx.state.map().character(1).expect("event");
        assert_eq!(event.position(), (1, 1));
        assert_eq!(event.dir(), Dir::Right);
        assert_eq!(event.move_count(), 0);
        assert!(interpreter.is_moving_character());
        assert!(!interpreter.is_terminated());
    }

    #[test]
    fn hidden_choices_route_to_the_real_branch() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[{"name": "show_choices",
                "args": {"choices": ["a", "b", "c"],
                         "conditions": [{}, {"visible": {"type": "switch", "id": 4, "value": true}}, {}]},
                "branches": [
                    [{"name": "set_variable", "args": {"id": 5, "op": "=", "valueType": "constant", "value": 10}}],
                    [{"name": "set_variable", "args": {"id": 5, "op": "=", "valueType": "constant", "value": 11}}],
                    [{"name": "set_variable", "args": {"id": 5, "op": "=", "valueType": "constant", "value": 12}}]
                ]}]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(interpreter.wait(), &Wait::Choices);
        assert_eq!(fx.state.windows().balloons().count(), 2);

        for _ in 0..120 {
            if interpreter.is_terminated() {
                break;
            }
            fx.tick(&mut interpreter, InputState::choose(1));
        }
        assert!(interpreter.is_terminated());
        assert_eq!(fx.variable(5), 12);
    }

    #[test]
    fn messages_hold_the_script_until_dismissed() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[
                {"name": "show_message", "args": {"content": "Hello \\v[9]"}},
                {"name": "set_variable", "args": {"id": 6, "op": "=", "valueType": "constant", "value": 1}}
            ]"#,
        );
        fx.state.variables_mut().set_variable_value(9, 42);
        fx.tick(&mut interpreter, InputState::default());
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(fx.variable(6), 0);
        assert!(fx
            .state
            .windows()
            .balloons()
            .any(|balloon| balloon.content() == "Hello 42"));

        for _ in 0..120 {
            if interpreter.is_terminated() {
                break;
            }
            fx.tick(&mut interpreter, InputState::advance());
        }
        assert_eq!(fx.variable(6), 1);
    }

    #[test]
    fn routes_reject_non_route_commands() {
        let mut fx = Fixture::new();
        let commands = commands_from_json(
            br#"[{"name": "set_switch", "args": {"id": 1, "value": true}}]"#,
        )
        .expect("commands");
        let mut route = Interpreter::route(8, 1, 1, 1, &commands, false, false);
        route.update(&mut fx.state, &mut fx.scene, &fx.game);
        assert!(route.is_terminated());
        assert!(!fx.state.variables().switch_value(1));
        assert!(matches!(
            fx.state.script_errors()[0].kind,
            ScriptErrorKind::InvalidValue(_)
        ));
    }

    #[test]
    fn suspended_interpreters_survive_serialization() {
        let mut fx = Fixture::new();
        let mut interpreter = fx.interpreter(
            r#"[{"name": "if",
                "args": {"conditions": []},
                "branches": [[
                    {"name": "wait", "args": {"time": 30}},
                    {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 1}}
                ]]}]"#,
        );
        fx.tick(&mut interpreter, InputState::default());
        assert_eq!(interpreter.depth(), 2);

        let json = serde_json::to_string(&interpreter).expect("encode");
        let restored: Interpreter = serde_json::from_str(&json).expect("decode");
        assert_eq!(restored, interpreter);
    }
}
