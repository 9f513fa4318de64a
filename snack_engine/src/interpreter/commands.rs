use snack_data::args::{
    AdsType, CallEventArgs, ControlHintType, IfArgs, SetRouteArgs, SetSwitchArgs,
    ShowBalloonArgs, ShowChoicesArgs, ShowPictureArgs, TransferArgs, TransferTransition,
};
use snack_data::{Command, CommandArgs, Game, ValueType};

use super::{Frame, FrameKind, Interpreter, InterpreterKind, Outcome, Pending, Wait};
use crate::error::ScriptErrorKind;
use crate::game_state::GameState;
use crate::pictures::PictureSpec;
use crate::requester::RequestId;
use crate::scene::SceneManager;
use crate::screen::{FadeColor, TRANSITION_FRAMES};
use crate::variables::ref_id;

pub(super) type CommandResult = Result<Outcome, ScriptErrorKind>;

fn wait_if(wait: bool, reason: Wait) -> Outcome {
    if wait {
        Outcome::Wait(reason)
    } else {
        Outcome::Next
    }
}

/// Reads a coordinate either literally or from the variable it names.
pub(super) fn coordinate(state: &GameState, value_type: ValueType, value: i32) -> i32 {
    match value_type {
        ValueType::Constant => value,
        ValueType::Variable => ref_id(state.variables().variable_value(value)),
    }
}

impl Interpreter {
    pub(super) fn execute(
        &mut self,
        command: &Command,
        state: &mut GameState,
        scene: &mut SceneManager,
        game: &Game,
    ) -> CommandResult {
        if self.kind == InterpreterKind::Route && !command.args.is_route_command() {
            return Err(ScriptErrorKind::InvalidValue(format!(
                "{} cannot run inside a route",
                command.name()
            )));
        }
        let event_id = self.self_event_id();

        match &command.args {
            CommandArgs::Nop | CommandArgs::Label(_) => Ok(Outcome::Next),
            CommandArgs::Return => Ok(Outcome::Return),
            CommandArgs::EraseEvent => {
                match state.map_mut().character_mut(event_id) {
                    Some(character) => character.erase(),
                    None => log::warn!("erase_event: event {event_id} is not in this room"),
                }
                Ok(Outcome::Next)
            }
            CommandArgs::ShowHint => Ok(self.show_hint(state, game)),
            CommandArgs::Save => {
                if let Some(outcome) = self.finish_request(scene) {
                    return Ok(outcome);
                }
                let id = scene.generate_request_id();
                // Encoded once this tick's interpreters are back in the map.
                state.schedule_save(id);
                Ok(self.wait_for_request(id))
            }
            CommandArgs::GotoTitle => {
                state.request_goto_title();
                Ok(Outcome::Next)
            }
            CommandArgs::GameClear => {
                state.mark_cleared();
                Ok(Outcome::Next)
            }
            CommandArgs::SyncIap => Ok(self.request(scene, SceneManager::request_restore_purchases)),
            CommandArgs::HideItem => {
                state.hide_item_preview();
                Ok(Outcome::Next)
            }
            CommandArgs::ShowInventory => {
                state.set_inventory_visible(true);
                Ok(Outcome::Next)
            }
            CommandArgs::HideInventory => {
                state.set_inventory_visible(false);
                Ok(Outcome::Next)
            }
            CommandArgs::FinishPlayerMovingByUserInput => {
                state.map_mut().finish_player_moving_by_user_input();
                Ok(Outcome::Next)
            }
            CommandArgs::ExecEventHere => Ok(self.exec_event_here(state, game)),

            CommandArgs::If(args) => self.branch_if(command, args, state, game),
            CommandArgs::Goto(args) => self.goto(&args.name),
            CommandArgs::CallEvent(args) => Ok(self.call_event(args, state, game)),
            CommandArgs::CallCommonEvent(args) => match game.common_event(args.event_id) {
                Some(common) => Ok(Outcome::Push(Frame::new(
                    &common.commands,
                    FrameKind::Call,
                    event_id,
                ))),
                None => {
                    log::warn!("call_common_event: common event {} not found", args.event_id);
                    Ok(Outcome::Next)
                }
            },
            CommandArgs::Wait(args) => Ok(Outcome::Wait(Wait::Frames { count: args.time })),

            CommandArgs::ShowBalloon(args) => Ok(self.show_balloon(args, state, scene, game)),
            CommandArgs::ShowMessage(args) => {
                let content = state.resolve_message(game, scene, &args.content);
                state.windows_mut().show_message(content, event_id, self.id);
                Ok(Outcome::Wait(Wait::Window))
            }
            CommandArgs::ShowChoices(args) => self.show_choices(command, args, state, scene, game),

            CommandArgs::SetSwitch(args) => {
                self.set_switch(args, state);
                Ok(Outcome::Next)
            }
            CommandArgs::SetSelfSwitch(args) => {
                let key = state.self_switch_key(event_id, args.id);
                state.variables_mut().set_self_switch_value(key, args.value);
                Ok(Outcome::Next)
            }
            CommandArgs::SetVariable(args) => {
                if let Err(fault) = state.set_variable(game, scene, args, event_id) {
                    // The variable was set to 0; the script carries on.
                    let message = format!("{}: {fault}", self.location());
                    log::warn!("{message}");
                    state.record_diagnostic(message);
                }
                Ok(Outcome::Next)
            }
            CommandArgs::Transfer(args) => self.transfer(args, state, game),
            CommandArgs::SetRoute(args) => Ok(self.set_route(args, state)),

            CommandArgs::TintScreen(args) => {
                state
                    .screen_mut()
                    .start_tint(args.red, args.green, args.blue, args.gray, args.time);
                Ok(wait_if(args.wait, Wait::Tint))
            }
            CommandArgs::ShakeScreen(args) => {
                state
                    .screen_mut()
                    .start_shaking(args.power, args.speed, args.time, args.direction);
                Ok(wait_if(args.wait, Wait::Shake))
            }
            CommandArgs::Weather(args) => {
                state.screen_mut().set_weather(args.kind);
                Ok(Outcome::Next)
            }
            CommandArgs::ChangeBackground(args) => {
                state.set_background(&args.image);
                Ok(Outcome::Next)
            }
            CommandArgs::ChangeForeground(args) => {
                state.set_foreground(&args.image);
                Ok(Outcome::Next)
            }
            CommandArgs::PlaySe(args) => {
                state.play_se(scene, &args.name, args.volume);
                Ok(Outcome::Next)
            }
            CommandArgs::PlayBgm(args) => {
                state.play_bgm(scene, &args.name, args.volume, args.fade_time);
                Ok(Outcome::Next)
            }
            CommandArgs::StopBgm(args) => {
                state.stop_bgm(scene, args.fade_time);
                Ok(Outcome::Next)
            }
            CommandArgs::Autosave(args) => {
                state.set_autosave(args.enabled);
                Ok(Outcome::Next)
            }
            CommandArgs::PlayerControl(args) => {
                state.set_player_control(args.enabled);
                Ok(Outcome::Next)
            }

            CommandArgs::UnlockAchievement(args) => {
                Ok(self.request(scene, |scene| scene.request_unlock_achievement(args.id)))
            }
            CommandArgs::ControlHint(args) => {
                let hints = state.hints_mut();
                match args.kind {
                    ControlHintType::Start => hints.start(args.id),
                    ControlHintType::Pause => hints.pause(args.id),
                    ControlHintType::Complete => hints.complete(args.id),
                }
                Ok(Outcome::Next)
            }
            CommandArgs::StartIap(args) => {
                if let Some(outcome) = self.finish_request(scene) {
                    return Ok(outcome);
                }
                let Some(product) = game.iap_product(args.id) else {
                    log::warn!("start_iap: product {} not found", args.id);
                    return Ok(Outcome::Next);
                };
                let id = scene.request_purchase(&product.key);
                Ok(self.wait_for_request(id))
            }
            CommandArgs::ShowAds(args) => Ok(self.request(scene, |scene| match args.kind {
                AdsType::Rewarded => scene.request_rewarded_ads(args.force),
                AdsType::Interstitial => scene.request_interstitial_ads(args.force),
            })),
            CommandArgs::OpenLink(args) => Ok(self.request(scene, |scene| {
                scene.request_open_link(&args.kind, &args.data)
            })),
            CommandArgs::SendAnalytics(args) => {
                scene.request_send_analytics(&args.event, &args.value);
                Ok(Outcome::Next)
            }
            CommandArgs::SavePermanentVariable(args) => {
                if let Some(outcome) = self.finish_request(scene) {
                    return Ok(outcome);
                }
                let value = state.variables().variable_value(args.variable_id);
                let id = scene
                    .request_save_permanent_variable(args.permanent_variable_id, value)
                    .map_err(|err| ScriptErrorKind::InvalidValue(err.to_string()))?;
                Ok(self.wait_for_request(id))
            }

            CommandArgs::AddItem(args) => {
                if game.item(args.id).is_none() {
                    log::warn!("add_item: item {} not found", args.id);
                } else if state.items_mut().add(args.id) {
                    state.log_event(format!("item.add {}", args.id));
                }
                Ok(Outcome::Next)
            }
            CommandArgs::RemoveItem(args) => {
                if state.items_mut().remove(args.id) {
                    state.log_event(format!("item.remove {}", args.id));
                }
                Ok(Outcome::Next)
            }
            CommandArgs::ReplaceItem(args) => {
                state.items_mut().replace(args.id, &args.replace_ids);
                Ok(Outcome::Next)
            }
            CommandArgs::ShowItem(args) => {
                state.show_item_preview(args.id);
                Ok(Outcome::Next)
            }

            CommandArgs::ShowPicture(args) => {
                self.show_picture(args, state);
                Ok(Outcome::Next)
            }
            CommandArgs::ErasePicture(args) => {
                state.pictures_mut().erase(args.id);
                Ok(Outcome::Next)
            }
            CommandArgs::MovePicture(args) => {
                let x = coordinate(state, args.pos_value_type, args.x);
                let y = coordinate(state, args.pos_value_type, args.y);
                state.pictures_mut().move_to(args.id, x, y, args.time);
                Ok(wait_if(args.wait, Wait::Picture { id: args.id }))
            }
            CommandArgs::ScalePicture(args) => {
                state
                    .pictures_mut()
                    .scale_to(args.id, args.scale_x, args.scale_y, args.time);
                Ok(wait_if(args.wait, Wait::Picture { id: args.id }))
            }
            CommandArgs::RotatePicture(args) => {
                state.pictures_mut().rotate_to(args.id, args.angle, args.time);
                Ok(wait_if(args.wait, Wait::Picture { id: args.id }))
            }
            CommandArgs::FadePicture(args) => {
                state.pictures_mut().fade_to(args.id, args.opacity, args.time);
                Ok(wait_if(args.wait, Wait::Picture { id: args.id }))
            }
            CommandArgs::TintPicture(args) => {
                state.pictures_mut().tint_to(
                    args.id, args.red, args.green, args.blue, args.gray, args.time,
                );
                Ok(wait_if(args.wait, Wait::Picture { id: args.id }))
            }
            CommandArgs::ChangePictureImage(args) => {
                state.pictures_mut().change_image(args.id, &args.image);
                Ok(Outcome::Next)
            }

            CommandArgs::MoveCharacter(_)
            | CommandArgs::TurnCharacter(_)
            | CommandArgs::RotateCharacter(_)
            | CommandArgs::SetCharacterProperty(_)
            | CommandArgs::SetCharacterImage(_)
            | CommandArgs::SetCharacterOpacity(_) => {
                self.execute_character_command(&command.args, state, game)
            }

            CommandArgs::Unrecognized(raw) => Err(ScriptErrorKind::UnrecognizedCommand(format!(
                "{} ({})",
                raw.name, raw.reason
            ))),
        }
    }

    /// Collects the answer to a request issued on an earlier visit.
    fn finish_request(&mut self, scene: &mut SceneManager) -> Option<Outcome> {
        let Some(Pending::Request { id }) = self.pending else {
            return None;
        };
        self.pending = None;
        match scene.take_result(id) {
            Some(result) if !result.succeeded => {
                log::info!("request #{id} ({:?}) did not succeed", result.kind);
            }
            Some(_) => {}
            None => log::warn!("result of request #{id} was already taken"),
        }
        Some(Outcome::Next)
    }

    fn wait_for_request(&mut self, id: RequestId) -> Outcome {
        self.pending = Some(Pending::Request { id });
        Outcome::WaitHere(Wait::Request { id })
    }

    fn request<F>(&mut self, scene: &mut SceneManager, issue: F) -> Outcome
    where
        F: FnOnce(&mut SceneManager) -> RequestId,
    {
        if let Some(outcome) = self.finish_request(scene) {
            return outcome;
        }
        let id = issue(scene);
        self.wait_for_request(id)
    }

    fn branch_if(
        &self,
        command: &Command,
        args: &IfArgs,
        state: &GameState,
        game: &Game,
    ) -> CommandResult {
        let event_id = self.self_event_id();
        let matched = args
            .conditions
            .iter()
            .position(|condition| state.meets_condition(game, condition, event_id));
        let index = match matched {
            Some(index) => index,
            // The branch after the last condition is the else branch.
            None if command.branches.len() > args.conditions.len() => args.conditions.len(),
            None => return Ok(Outcome::Next),
        };
        let branch = command
            .branches
            .get(index)
            .ok_or_else(|| ScriptErrorKind::MissingCommands(format!("branch {index} of if")))?;
        Ok(Outcome::Push(Frame::new(branch, FrameKind::Branch, event_id)))
    }

    /// Labels are only looked up in the list that is running.
    fn goto(&self, name: &str) -> CommandResult {
        self.frames
            .last()
            .and_then(|frame| {
                frame.commands.iter().position(|command| {
                    matches!(&command.args, CommandArgs::Label(label) if label.name == name)
                })
            })
            .map(Outcome::Jump)
            .ok_or_else(|| ScriptErrorKind::LabelNotFound(name.to_string()))
    }

    fn call_event(&self, args: &CallEventArgs, state: &GameState, game: &Game) -> Outcome {
        let target = self.resolve_event_id(args.event_id);
        let map = state.map();
        let page = game
            .event(map.map_id(), map.room_id(), target)
            .and_then(|event| event.pages.get(args.page_index));
        match page {
            Some(page) => Outcome::Push(Frame::new(&page.commands, FrameKind::Call, target)),
            None => {
                log::warn!(
                    "call_event: page {} of event {target} not found in map{}/room{}",
                    args.page_index,
                    map.map_id(),
                    map.room_id()
                );
                Outcome::Next
            }
        }
    }

    fn show_hint(&self, state: &GameState, game: &Game) -> Outcome {
        let Some(hint_id) = state.hints().current() else {
            log::debug!("show_hint: no active hint");
            return Outcome::Next;
        };
        match game.hint(hint_id) {
            Some(hint) => Outcome::Push(Frame::new(
                &hint.commands,
                FrameKind::Call,
                self.self_event_id(),
            )),
            None => {
                log::warn!("show_hint: hint {hint_id} not found");
                Outcome::Next
            }
        }
    }

    fn exec_event_here(&self, state: &GameState, game: &Game) -> Outcome {
        let map = state.map();
        let (x, y) = map.player().position();
        let page = map
            .executable_event_at(game, x, y)
            .and_then(|id| Some((id, map.active_page(game, id)?)));
        match page {
            Some((id, page)) => Outcome::Push(Frame::new(&page.commands, FrameKind::Call, id)),
            None => {
                log::warn!("exec_event_here: no event at ({x}, {y})");
                Outcome::Next
            }
        }
    }

    fn show_balloon(
        &self,
        args: &ShowBalloonArgs,
        state: &mut GameState,
        scene: &SceneManager,
        game: &Game,
    ) -> Outcome {
        let target = self.resolve_event_id(args.event_id);
        if state.map().character(target).is_none() {
            log::warn!("show_balloon: character {target} is not in this room");
            return Outcome::Next;
        }
        let content = state.resolve_message(game, scene, &args.content);
        state.windows_mut().show_balloon(content, target, self.id);
        Outcome::Wait(Wait::Window)
    }

    fn show_choices(
        &mut self,
        command: &Command,
        args: &ShowChoicesArgs,
        state: &mut GameState,
        scene: &SceneManager,
        game: &Game,
    ) -> CommandResult {
        let event_id = self.self_event_id();
        if self.pending == Some(Pending::Choices) {
            let Some(displayed) = state.windows_mut().take_chosen_index(self.id) else {
                return Ok(Outcome::WaitHere(Wait::Choices));
            };
            self.pending = None;
            let index = state.real_choice_index(game, args, displayed, event_id);
            let branch = command
                .branches
                .get(index)
                .ok_or_else(|| ScriptErrorKind::MissingCommands(format!("choice {index}")))?;
            return Ok(Outcome::Push(Frame::new(branch, FrameKind::Branch, event_id)));
        }

        let choices = state.visible_choices(game, scene, args, event_id);
        if choices.is_empty() {
            log::warn!("show_choices: every choice is hidden");
            return Ok(Outcome::Next);
        }
        state.windows_mut().show_choices(choices, self.id);
        self.pending = Some(Pending::Choices);
        Ok(Outcome::WaitHere(Wait::Choices))
    }

    fn set_switch(&self, args: &SetSwitchArgs, state: &mut GameState) {
        let id = match args.id_type {
            ValueType::Constant => args.id,
            ValueType::Variable => ref_id(state.variables().variable_value(args.id)),
        };
        let variables = state.variables_mut();
        if args.internal {
            variables.set_internal_switch_value(id, args.value);
        } else {
            variables.set_switch_value(id, args.value);
        }
    }

    fn transfer(
        &mut self,
        args: &TransferArgs,
        state: &mut GameState,
        game: &Game,
    ) -> CommandResult {
        let fade = match args.transition {
            TransferTransition::None => None,
            TransferTransition::Black => Some(FadeColor::Black),
            TransferTransition::White => Some(FadeColor::White),
        };
        let faded_out = self.pending == Some(Pending::Transfer);
        if let (Some(color), false) = (fade, faded_out) {
            let screen = state.screen_mut();
            screen.set_fade_color(color);
            screen.fade_out(TRANSITION_FRAMES);
            self.pending = Some(Pending::Transfer);
            return Ok(Outcome::WaitHere(Wait::Fade));
        }

        let room_id = coordinate(state, args.value_type, args.room_id);
        let x = coordinate(state, args.value_type, args.x);
        let y = coordinate(state, args.value_type, args.y);
        state
            .transfer(game, room_id, x, y, args.dir)
            .map_err(|err| ScriptErrorKind::InvalidValue(err.to_string()))?;

        if faded_out {
            self.pending = None;
            state.screen_mut().fade_in(TRANSITION_FRAMES);
            return Ok(Outcome::Wait(Wait::Fade));
        }
        Ok(Outcome::Next)
    }

    fn set_route(&self, args: &SetRouteArgs, state: &mut GameState) -> Outcome {
        let character = self.resolve_event_id(args.event_id);
        if state.map().character(character).is_none() {
            log::warn!("set_route: character {character} is not in this room");
            return Outcome::Next;
        }
        let id = state.generate_interpreter_id();
        let map = state.map_mut();
        let route = Interpreter::route(
            id,
            map.map_id(),
            map.room_id(),
            character,
            &args.commands,
            args.repeat,
            args.skip,
        );
        map.set_route(route);
        // A repeating route never finishes, so waiting on it would hang.
        wait_if(args.wait && !args.repeat, Wait::Route { character })
    }

    fn show_picture(&self, args: &ShowPictureArgs, state: &mut GameState) {
        let spec = PictureSpec {
            image: args.image.clone(),
            x: coordinate(state, args.pos_value_type, args.x),
            y: coordinate(state, args.pos_value_type, args.y),
            origin_x: args.origin_x,
            origin_y: args.origin_y,
            scale_x: args.scale_x,
            scale_y: args.scale_y,
            angle: args.angle,
            opacity: args.opacity,
            blend_type: args.blend_type,
        };
        state.pictures_mut().show(args.id, spec);
    }
}
