use snack_data::args::{MoveCharacterArgs, SetCharacterPropertyArgs};
use snack_data::{CommandArgs, Game, ValueType, PLAYER_EVENT_ID};

use super::commands::{coordinate, CommandResult};
use super::{Interpreter, Outcome, Wait};
use crate::character::Character;
use crate::error::ScriptErrorKind;
use crate::game_state::GameState;
use crate::movement::MoveCharacterState;

impl Interpreter {
    /// Character a route command acts on: the route's owner, or the event
    /// running the script when the command appears inline.
    fn route_target(&self) -> i32 {
        self.route_character()
            .unwrap_or_else(|| self.self_event_id())
    }

    pub(super) fn execute_character_command(
        &mut self,
        args: &CommandArgs,
        state: &mut GameState,
        game: &Game,
    ) -> CommandResult {
        let target = self.route_target();
        if state
            .map()
            .character_in(self.map_id, self.room_id, target)
            .is_none()
        {
            log::warn!(
                "{}: character {target} is not in map{}/room{}",
                args.name(),
                self.map_id,
                self.room_id
            );
            return Ok(Outcome::Next);
        }

        match args {
            CommandArgs::MoveCharacter(args) => Ok(self.move_character(target, args, state, game)),
            CommandArgs::TurnCharacter(args) => {
                with_character(state, target, |character| character.turn(args.dir));
                Ok(Outcome::Next)
            }
            CommandArgs::RotateCharacter(args) => {
                with_character(state, target, |character| {
                    let dir = character.dir().rotate(args.angle / 90);
                    character.turn(dir);
                });
                Ok(Outcome::Next)
            }
            CommandArgs::SetCharacterProperty(property) => {
                if let (SetCharacterPropertyArgs::Speed(speed), PLAYER_EVENT_ID) = (property, target)
                {
                    state.set_player_speed(*speed);
                }
                with_character(state, target, |character| match *property {
                    SetCharacterPropertyArgs::Visibility(visible) => {
                        character.set_visibility(visible)
                    }
                    SetCharacterPropertyArgs::DirFix(dir_fix) => character.set_dir_fix(dir_fix),
                    SetCharacterPropertyArgs::Stepping(stepping) => {
                        character.set_stepping(stepping)
                    }
                    SetCharacterPropertyArgs::Through(through) => character.set_through(through),
                    SetCharacterPropertyArgs::Walking(walking) => character.set_walking(walking),
                    SetCharacterPropertyArgs::Speed(speed) => character.set_speed(speed),
                });
                Ok(Outcome::Next)
            }
            CommandArgs::SetCharacterImage(args) => {
                with_character(state, target, |character| {
                    character.set_image(
                        &args.image,
                        args.image_index,
                        args.frame,
                        args.dir,
                        args.use_frame_and_dir,
                    )
                });
                Ok(Outcome::Next)
            }
            CommandArgs::SetCharacterOpacity(args) => {
                with_character(state, target, |character| {
                    character.set_opacity(args.opacity, args.time)
                });
                if args.wait {
                    Ok(Outcome::Wait(Wait::CharacterOpacity { character: target }))
                } else {
                    Ok(Outcome::Next)
                }
            }
            other => Err(ScriptErrorKind::InvalidValue(format!(
                "{} is not a character command",
                other.name()
            ))),
        }
    }

    /// Starts a multi-tick move. An unreachable target without `skip`
    /// leaves the command in place to be planned again next tick.
    fn move_character(
        &mut self,
        target: i32,
        args: &MoveCharacterArgs,
        state: &mut GameState,
        game: &Game,
    ) -> Outcome {
        let mut args = args.clone();
        if args.value_type == ValueType::Variable {
            args.x = coordinate(state, ValueType::Variable, args.x);
            args.y = coordinate(state, ValueType::Variable, args.y);
            args.value_type = ValueType::Constant;
        }
        let skip = self.route.is_some_and(|route| route.skip);
        match MoveCharacterState::new(state.map(), game, target, args, skip) {
            Some(move_state) => {
                self.move_state = Some(move_state);
                Outcome::Next
            }
            None => Outcome::Retry,
        }
    }
}

fn with_character<F>(state: &mut GameState, event_id: i32, apply: F)
where
    F: FnOnce(&mut Character),
{
    if let Some(character) = state.map_mut().character_mut(event_id) {
        apply(character);
    }
}
