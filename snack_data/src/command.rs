//! Event command tree and its encodings.
//!
//! A command on the wire is `{name, args, branches}`. The shape of `args` is
//! picked by `name`, so decoding reads the name first and then decodes the
//! payload into the matching [`CommandArgs`] variant. Names or payloads this
//! build does not understand decode into [`CommandArgs::Unrecognized`]; the
//! interpreter reports them when it reaches them instead of refusing to load
//! the whole project.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::args::*;
use crate::error::DataError;

/// One node of a command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCommand", into = "RawCommand")]
pub struct Command {
    pub args: CommandArgs,
    /// Child lists for branching commands (`if`, `show_choices`).
    pub branches: Vec<Vec<Command>>,
}

impl Command {
    pub fn new(args: CommandArgs) -> Self {
        Self {
            args,
            branches: Vec::new(),
        }
    }

    pub fn with_branches(args: CommandArgs, branches: Vec<Vec<Command>>) -> Self {
        Self { args, branches }
    }

    pub fn name(&self) -> &str {
        self.args.name()
    }
}

/// A command whose name or payload could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedCommand {
    pub name: String,
    pub args: Value,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCommand {
    name: String,
    #[serde(default)]
    args: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    branches: Vec<Vec<Command>>,
}

impl From<RawCommand> for Command {
    fn from(raw: RawCommand) -> Self {
        Self {
            args: CommandArgs::decode(raw.name, raw.args),
            branches: raw.branches,
        }
    }
}

impl From<Command> for RawCommand {
    fn from(command: Command) -> Self {
        let (name, args) = command.args.encode();
        Self {
            name,
            args,
            branches: command.branches,
        }
    }
}

macro_rules! command_set {
    (
        plain { $($plain:ident => $plain_name:literal),* $(,)? }
        payload { $($variant:ident($args:ty) => $name:literal),* $(,)? }
    ) => {
        /// Typed payload of a command, one variant per command kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum CommandArgs {
            $($plain,)*
            $($variant($args),)*
            Unrecognized(UnrecognizedCommand),
        }

        impl CommandArgs {
            pub fn name(&self) -> &str {
                match self {
                    $(CommandArgs::$plain => $plain_name,)*
                    $(CommandArgs::$variant(_) => $name,)*
                    CommandArgs::Unrecognized(raw) => raw.name.as_str(),
                }
            }

            fn decode(name: String, args: Value) -> Self {
                match name.as_str() {
                    $($plain_name => CommandArgs::$plain,)*
                    $($name => match serde_json::from_value::<$args>(args.clone()) {
                        Ok(decoded) => CommandArgs::$variant(decoded),
                        Err(err) => CommandArgs::Unrecognized(UnrecognizedCommand {
                            name,
                            args,
                            reason: format!("malformed args: {err}"),
                        }),
                    },)*
                    _ => CommandArgs::Unrecognized(UnrecognizedCommand {
                        name,
                        args,
                        reason: "unknown command name".to_string(),
                    }),
                }
            }

            fn encode(self) -> (String, Value) {
                match self {
                    $(CommandArgs::$plain => ($plain_name.to_string(), Value::Null),)*
                    $(CommandArgs::$variant(args) => (
                        $name.to_string(),
                        // Payload structs only hold integers, floats, strings and
                        // string-keyed maps, which always convert.
                        serde_json::to_value(args).unwrap_or(Value::Null),
                    ),)*
                    CommandArgs::Unrecognized(raw) => (raw.name, raw.args),
                }
            }
        }
    };
}

command_set! {
    plain {
        Nop => "nop",
        Return => "return",
        EraseEvent => "erase_event",
        ShowHint => "show_hint",
        Save => "save",
        GotoTitle => "goto_title",
        GameClear => "game_clear",
        SyncIap => "sync_iap",
        HideItem => "hide_item",
        ShowInventory => "show_inventory",
        HideInventory => "hide_inventory",
        FinishPlayerMovingByUserInput => "finish_player_moving_by_user_input",
        ExecEventHere => "exec_event_here",
    }
    payload {
        If(IfArgs) => "if",
        Label(LabelArgs) => "label",
        Goto(LabelArgs) => "goto",
        CallEvent(CallEventArgs) => "call_event",
        CallCommonEvent(CallCommonEventArgs) => "call_common_event",
        Wait(WaitArgs) => "wait",
        ShowBalloon(ShowBalloonArgs) => "show_balloon",
        ShowMessage(ShowMessageArgs) => "show_message",
        ShowChoices(ShowChoicesArgs) => "show_choices",
        SetSwitch(SetSwitchArgs) => "set_switch",
        SetSelfSwitch(SetSelfSwitchArgs) => "set_self_switch",
        SetVariable(SetVariableArgs) => "set_variable",
        Transfer(TransferArgs) => "transfer",
        SetRoute(SetRouteArgs) => "set_route",
        TintScreen(TintScreenArgs) => "tint_screen",
        ShakeScreen(ShakeScreenArgs) => "shake_screen",
        Weather(WeatherArgs) => "weather",
        ChangeBackground(ChangeImageLayerArgs) => "change_background",
        ChangeForeground(ChangeImageLayerArgs) => "change_foreground",
        PlaySe(PlaySeArgs) => "play_se",
        PlayBgm(PlayBgmArgs) => "play_bgm",
        StopBgm(StopBgmArgs) => "stop_bgm",
        Autosave(EnabledArgs) => "autosave",
        PlayerControl(EnabledArgs) => "player_control",
        UnlockAchievement(AchievementArgs) => "unlock_achievement",
        ControlHint(ControlHintArgs) => "control_hint",
        StartIap(StartIapArgs) => "start_iap",
        ShowAds(ShowAdsArgs) => "show_ads",
        OpenLink(OpenLinkArgs) => "open_link",
        SendAnalytics(SendAnalyticsArgs) => "send_analytics",
        SavePermanentVariable(SavePermanentVariableArgs) => "save_permanent_variable",
        AddItem(ItemArgs) => "add_item",
        RemoveItem(ItemArgs) => "remove_item",
        ReplaceItem(ReplaceItemArgs) => "replace_item",
        ShowItem(ItemArgs) => "show_item",
        ShowPicture(ShowPictureArgs) => "show_picture",
        ErasePicture(ErasePictureArgs) => "erase_picture",
        MovePicture(MovePictureArgs) => "move_picture",
        ScalePicture(ScalePictureArgs) => "scale_picture",
        RotatePicture(RotatePictureArgs) => "rotate_picture",
        FadePicture(FadePictureArgs) => "fade_picture",
        TintPicture(TintPictureArgs) => "tint_picture",
        ChangePictureImage(ChangePictureImageArgs) => "change_picture_image",
        MoveCharacter(MoveCharacterArgs) => "move_character",
        TurnCharacter(TurnCharacterArgs) => "turn_character",
        RotateCharacter(RotateCharacterArgs) => "rotate_character",
        SetCharacterProperty(SetCharacterPropertyArgs) => "set_character_property",
        SetCharacterImage(SetCharacterImageArgs) => "set_character_image",
        SetCharacterOpacity(SetCharacterOpacityArgs) => "set_character_opacity",
    }
}

impl CommandArgs {
    /// Commands that only touch a character and may run inside `set_route`.
    pub fn is_route_command(&self) -> bool {
        matches!(
            self,
            CommandArgs::MoveCharacter(_)
                | CommandArgs::TurnCharacter(_)
                | CommandArgs::RotateCharacter(_)
                | CommandArgs::SetCharacterProperty(_)
                | CommandArgs::SetCharacterImage(_)
                | CommandArgs::SetCharacterOpacity(_)
                | CommandArgs::Wait(_)
                | CommandArgs::PlaySe(_)
        )
    }
}

/// Walks a command tree depth-first, including branch lists and route
/// bodies, yielding each command with its path of indices.
///
/// Nested paths alternate command index and list index: `[1, 1, 0]` is the
/// first command of the second branch of command 1. A route body counts as
/// list 0 of its `set_route`.
pub fn visit_commands<'a, F>(commands: &'a [Command], visit: &mut F)
where
    F: FnMut(&[usize], &'a Command),
{
    let mut path = Vec::new();
    visit_inner(commands, &mut path, visit);
}

fn visit_inner<'a, F>(commands: &'a [Command], path: &mut Vec<usize>, visit: &mut F)
where
    F: FnMut(&[usize], &'a Command),
{
    for (index, command) in commands.iter().enumerate() {
        path.push(index);
        visit(path.as_slice(), command);
        for (list, branch) in command.branches.iter().enumerate() {
            path.push(list);
            visit_inner(branch, path, visit);
            path.pop();
        }
        if let CommandArgs::SetRoute(route) = &command.args {
            path.push(0);
            visit_inner(&route.commands, path, visit);
            path.pop();
        }
        path.pop();
    }
}

/// Decode a command list from the authoring tool's JSON.
pub fn commands_from_json(bytes: &[u8]) -> Result<Vec<Command>, DataError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn commands_to_json(commands: &[Command]) -> Result<Vec<u8>, DataError> {
    Ok(serde_json::to_vec(commands)?)
}

/// Decode a command list from the compact MessagePack encoding.
pub fn commands_from_msgpack(bytes: &[u8]) -> Result<Vec<Command>, DataError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub fn commands_to_msgpack(commands: &[Command]) -> Result<Vec<u8>, DataError> {
    Ok(rmp_serde::to_vec_named(commands)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::types::Dir;

    const SCRIPT: &str = r#"[
        {"name": "label", "args": {"name": "top"}},
        {"name": "if", "args": {"conditions": [{"type": "switch", "id": 1, "value": true}]},
         "branches": [
            [{"name": "show_message", "args": {"content": "msg-1", "positionType": "top"}}],
            [{"name": "wait", "args": {"time": 10}}]
         ]},
        {"name": "set_route", "args": {"eventId": 2, "wait": true, "commands": [
            {"name": "move_character", "args": {"type": "direction", "dir": 1, "distance": 2}}
        ]}},
        {"name": "return"}
    ]"#;

    #[test]
    fn decodes_args_by_name() {
        let commands = commands_from_json(SCRIPT.as_bytes()).expect("decode");
        assert_eq!(commands.len(), 4);
        assert_eq!(
            commands[0].args,
            CommandArgs::Label(LabelArgs {
                name: "top".to_string()
            })
        );
        match &commands[1].args {
            CommandArgs::If(args) => assert_eq!(
                args.conditions,
                vec![Condition::Switch { id: 1, value: true }]
            ),
            other => panic!("unexpected args {other:?}"),
        }
        assert_eq!(commands[1].branches.len(), 2);
        match &commands[2].args {
            CommandArgs::SetRoute(route) => {
                assert!(route.wait);
                match &route.commands[0].args {
                    CommandArgs::MoveCharacter(args) => {
                        assert_eq!(args.dir, Dir::Right);
                        assert_eq!(args.distance, 2);
                    }
                    other => panic!("unexpected route command {other:?}"),
                }
            }
            other => panic!("unexpected args {other:?}"),
        }
        assert_eq!(commands[3].args, CommandArgs::Return);
    }

    #[test]
    fn json_and_msgpack_encodings_agree() {
        let commands = commands_from_json(SCRIPT.as_bytes()).expect("decode");
        let packed = commands_to_msgpack(&commands).expect("msgpack");
        let unpacked = commands_from_msgpack(&packed).expect("unpack");
        assert_eq!(unpacked, commands);
        let json = commands_to_json(&unpacked).expect("json");
        assert_eq!(commands_from_json(&json).expect("reparse"), commands);
    }

    #[test]
    fn unknown_and_malformed_commands_are_preserved() {
        let json = r#"[
            {"name": "teleport_everyone", "args": {"where": 3}},
            {"name": "wait", "args": {"time": "soon"}}
        ]"#;
        let commands = commands_from_json(json.as_bytes()).expect("decode");
        match &commands[0].args {
            CommandArgs::Unrecognized(raw) => {
                assert_eq!(raw.name, "teleport_everyone");
                assert_eq!(raw.reason, "unknown command name");
            }
            other => panic!("unexpected args {other:?}"),
        }
        match &commands[1].args {
            CommandArgs::Unrecognized(raw) => assert!(raw.reason.starts_with("malformed args")),
            other => panic!("unexpected args {other:?}"),
        }
        let reencoded = commands_to_json(&commands).expect("encode");
        let value: Value = serde_json::from_slice(&reencoded).expect("value");
        assert_eq!(value[0]["args"]["where"], Value::from(3));
        assert_eq!(value[1]["name"], Value::from("wait"));
    }

    #[test]
    fn visits_nested_lists() {
        let commands = commands_from_json(SCRIPT.as_bytes()).expect("decode");
        let mut names = Vec::new();
        visit_commands(&commands, &mut |path, command| {
            names.push(format!("{:?}:{}", path, command.name()));
        });
        assert_eq!(
            names,
            vec![
                "[0]:label",
                "[1]:if",
                "[1, 0, 0]:show_message",
                "[1, 1, 0]:wait",
                "[2]:set_route",
                "[2, 0, 0]:move_character",
                "[3]:return",
            ]
        );
    }
}
