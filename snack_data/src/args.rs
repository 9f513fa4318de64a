//! Payload shapes for each command kind.
//!
//! Field names follow the authoring tool's camelCase JSON. A payload is never
//! self-describing; the owning command's name picks the struct.

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;
use crate::condition::{ChoiceCondition, Condition};
use crate::types::{Dir, Speed, ValueType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfArgs {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelArgs {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEventArgs {
    pub event_id: i32,
    #[serde(default)]
    pub page_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCommonEventArgs {
    pub event_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitArgs {
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalloonType {
    #[default]
    Normal,
    Think,
    Shout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowBalloonArgs {
    #[serde(default)]
    pub event_id: i32,
    pub content: String,
    #[serde(default)]
    pub balloon_type: BalloonType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBackground {
    #[default]
    Dim,
    Transparent,
    Banner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePosition {
    #[default]
    Bottom,
    Middle,
    Top,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowMessageArgs {
    pub content: String,
    #[serde(default)]
    pub background: MessageBackground,
    #[serde(default)]
    pub position_type: MessagePosition,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub message_style_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowChoicesArgs {
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ChoiceCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSwitchArgs {
    pub id: i32,
    #[serde(default)]
    pub id_type: ValueType,
    pub value: bool,
    #[serde(default)]
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSelfSwitchArgs {
    pub id: i32,
    pub value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetVariableOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetVariableValueType {
    Constant,
    Variable,
    VariableRef,
    Switch,
    SwitchRef,
    Random,
    Character,
    ItemGroup,
    IapProduct,
    System,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterValueType {
    Direction,
    RoomX,
    RoomY,
    ScreenX,
    ScreenY,
    IsPressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemGroupValueType {
    Owned,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemVariable {
    InterstitialAdsLoaded,
    RewardedAdsLoaded,
    ActiveHintCount,
    RoomId,
    CurrentTime,
    ActiveItemId,
    EventItemId,
    TriggeredPictureId,
    PressedPictureId,
    ReleasedPictureId,
    SponsorTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
    pub begin: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterValue {
    #[serde(rename = "type")]
    pub kind: CharacterValueType,
    #[serde(default)]
    pub event_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroupValue {
    #[serde(rename = "type")]
    pub kind: ItemGroupValueType,
    #[serde(default)]
    pub group: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableValue {
    pub name: String,
    pub id: i64,
    #[serde(default)]
    pub id_type: ValueType,
    pub attr: String,
}

/// Right-hand side of `set_variable`.
#[derive(Debug, Clone, PartialEq)]
pub enum SetVariableValue {
    Constant(i64),
    Variable(i32),
    VariableRef(i32),
    Switch(i32),
    SwitchRef(i32),
    Random(RandomRange),
    Character(CharacterValue),
    ItemGroup(ItemGroupValue),
    IapProduct(i32),
    System(SystemVariable),
    Table(TableValue),
}

impl SetVariableValue {
    pub fn value_type(&self) -> SetVariableValueType {
        match self {
            SetVariableValue::Constant(_) => SetVariableValueType::Constant,
            SetVariableValue::Variable(_) => SetVariableValueType::Variable,
            SetVariableValue::VariableRef(_) => SetVariableValueType::VariableRef,
            SetVariableValue::Switch(_) => SetVariableValueType::Switch,
            SetVariableValue::SwitchRef(_) => SetVariableValueType::SwitchRef,
            SetVariableValue::Random(_) => SetVariableValueType::Random,
            SetVariableValue::Character(_) => SetVariableValueType::Character,
            SetVariableValue::ItemGroup(_) => SetVariableValueType::ItemGroup,
            SetVariableValue::IapProduct(_) => SetVariableValueType::IapProduct,
            SetVariableValue::System(_) => SetVariableValueType::System,
            SetVariableValue::Table(_) => SetVariableValueType::Table,
        }
    }

    fn decode(value_type: SetVariableValueType, value: Value) -> Result<Self, serde_json::Error> {
        use serde_json::from_value;
        Ok(match value_type {
            SetVariableValueType::Constant => SetVariableValue::Constant(from_value(value)?),
            SetVariableValueType::Variable => SetVariableValue::Variable(from_value(value)?),
            SetVariableValueType::VariableRef => SetVariableValue::VariableRef(from_value(value)?),
            SetVariableValueType::Switch => SetVariableValue::Switch(from_value(value)?),
            SetVariableValueType::SwitchRef => SetVariableValue::SwitchRef(from_value(value)?),
            SetVariableValueType::Random => SetVariableValue::Random(from_value(value)?),
            SetVariableValueType::Character => SetVariableValue::Character(from_value(value)?),
            SetVariableValueType::ItemGroup => SetVariableValue::ItemGroup(from_value(value)?),
            SetVariableValueType::IapProduct => SetVariableValue::IapProduct(from_value(value)?),
            SetVariableValueType::System => SetVariableValue::System(from_value(value)?),
            SetVariableValueType::Table => SetVariableValue::Table(from_value(value)?),
        })
    }

    fn encode(&self) -> Value {
        let encoded = match self {
            SetVariableValue::Constant(value) => serde_json::to_value(value),
            SetVariableValue::Variable(id)
            | SetVariableValue::VariableRef(id)
            | SetVariableValue::Switch(id)
            | SetVariableValue::SwitchRef(id)
            | SetVariableValue::IapProduct(id) => serde_json::to_value(id),
            SetVariableValue::Random(range) => serde_json::to_value(range),
            SetVariableValue::Character(character) => serde_json::to_value(character),
            SetVariableValue::ItemGroup(group) => serde_json::to_value(group),
            SetVariableValue::System(system) => serde_json::to_value(system),
            SetVariableValue::Table(table) => serde_json::to_value(table),
        };
        // These shapes only contain integers, strings and string-keyed maps.
        encoded.unwrap_or(Value::Null)
    }
}

/// `set_variable` payload. The shape of `value` depends on `valueType`, so
/// the wire form is decoded in two steps through [`RawSetVariableArgs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSetVariableArgs", into = "RawSetVariableArgs")]
pub struct SetVariableArgs {
    pub id: i32,
    pub id_type: ValueType,
    pub op: SetVariableOp,
    pub value: SetVariableValue,
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSetVariableArgs {
    id: i32,
    #[serde(default)]
    id_type: ValueType,
    op: SetVariableOp,
    value_type: SetVariableValueType,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    internal: bool,
}

impl TryFrom<RawSetVariableArgs> for SetVariableArgs {
    type Error = serde_json::Error;

    fn try_from(raw: RawSetVariableArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            id_type: raw.id_type,
            op: raw.op,
            value: SetVariableValue::decode(raw.value_type, raw.value)?,
            internal: raw.internal,
        })
    }
}

impl From<SetVariableArgs> for RawSetVariableArgs {
    fn from(args: SetVariableArgs) -> Self {
        Self {
            id: args.id,
            id_type: args.id_type,
            op: args.op,
            value_type: args.value.value_type(),
            value: args.value.encode(),
            internal: args.internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferTransition {
    #[default]
    None,
    Black,
    White,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferArgs {
    #[serde(default)]
    pub value_type: ValueType,
    pub room_id: i32,
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<Dir>,
    #[serde(default)]
    pub transition: TransferTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRouteArgs {
    #[serde(default)]
    pub event_id: i32,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub wait: bool,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TintScreenArgs {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub gray: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShakeDirection {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShakeScreenArgs {
    pub power: i32,
    pub speed: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub direction: ShakeDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    #[default]
    None,
    Snow,
    Rain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherArgs {
    #[serde(rename = "type")]
    pub kind: WeatherType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeImageLayerArgs {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySeArgs {
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayBgmArgs {
    pub name: String,
    #[serde(default = "default_volume")]
    pub volume: i32,
    #[serde(default)]
    pub fade_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopBgmArgs {
    #[serde(default)]
    pub fade_time: u32,
}

fn default_volume() -> i32 {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledArgs {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementArgs {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlHintType {
    Pause,
    Start,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlHintArgs {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: ControlHintType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartIapArgs {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdsType {
    Rewarded,
    Interstitial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowAdsArgs {
    #[serde(rename = "type")]
    pub kind: AdsType,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLinkArgs {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendAnalyticsArgs {
    pub event: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemArgs {
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceItemArgs {
    pub id: i32,
    pub replace_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePermanentVariableArgs {
    pub permanent_variable_id: usize,
    pub variable_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendType {
    #[default]
    Normal,
    Add,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPictureArgs {
    pub id: usize,
    pub image: String,
    #[serde(default = "default_origin")]
    pub origin_x: f64,
    #[serde(default = "default_origin")]
    pub origin_y: f64,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub pos_value_type: ValueType,
    #[serde(default = "default_percent")]
    pub scale_x: i32,
    #[serde(default = "default_percent")]
    pub scale_y: i32,
    #[serde(default)]
    pub angle: i32,
    #[serde(default = "default_opacity")]
    pub opacity: i32,
    #[serde(default)]
    pub blend_type: BlendType,
}

fn default_origin() -> f64 {
    0.5
}

fn default_percent() -> i32 {
    100
}

fn default_opacity() -> i32 {
    255
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErasePictureArgs {
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePictureArgs {
    pub id: usize,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub pos_value_type: ValueType,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalePictureArgs {
    pub id: usize,
    pub scale_x: i32,
    pub scale_y: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatePictureArgs {
    pub id: usize,
    pub angle: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadePictureArgs {
    pub id: usize,
    pub opacity: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TintPictureArgs {
    pub id: usize,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub gray: i32,
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePictureImageArgs {
    pub id: usize,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCharacterType {
    Direction,
    Target,
    Forward,
    Backward,
    Toward,
    Against,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCharacterArgs {
    #[serde(rename = "type")]
    pub kind: MoveCharacterType,
    #[serde(default)]
    pub dir: Dir,
    #[serde(default = "default_distance")]
    pub distance: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub ignore_characters: bool,
}

fn default_distance() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnCharacterArgs {
    pub dir: Dir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateCharacterArgs {
    pub angle: i32,
}

/// A character flag change. The value's type depends on the property, so
/// this goes through [`RawCharacterProperty`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCharacterProperty", into = "RawCharacterProperty")]
pub enum SetCharacterPropertyArgs {
    Visibility(bool),
    DirFix(bool),
    Stepping(bool),
    Through(bool),
    Walking(bool),
    Speed(Speed),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CharacterPropertyType {
    Visibility,
    DirFix,
    Stepping,
    Through,
    Walking,
    Speed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCharacterProperty {
    #[serde(rename = "type")]
    kind: CharacterPropertyType,
    value: Value,
}

impl TryFrom<RawCharacterProperty> for SetCharacterPropertyArgs {
    type Error = serde_json::Error;

    fn try_from(raw: RawCharacterProperty) -> Result<Self, Self::Error> {
        use serde_json::from_value;
        Ok(match raw.kind {
            CharacterPropertyType::Visibility => Self::Visibility(from_value(raw.value)?),
            CharacterPropertyType::DirFix => Self::DirFix(from_value(raw.value)?),
            CharacterPropertyType::Stepping => Self::Stepping(from_value(raw.value)?),
            CharacterPropertyType::Through => Self::Through(from_value(raw.value)?),
            CharacterPropertyType::Walking => Self::Walking(from_value(raw.value)?),
            CharacterPropertyType::Speed => Self::Speed(from_value(raw.value)?),
        })
    }
}

impl From<SetCharacterPropertyArgs> for RawCharacterProperty {
    fn from(args: SetCharacterPropertyArgs) -> Self {
        let (kind, value) = match args {
            SetCharacterPropertyArgs::Visibility(v) => (CharacterPropertyType::Visibility, v.into()),
            SetCharacterPropertyArgs::DirFix(v) => (CharacterPropertyType::DirFix, v.into()),
            SetCharacterPropertyArgs::Stepping(v) => (CharacterPropertyType::Stepping, v.into()),
            SetCharacterPropertyArgs::Through(v) => (CharacterPropertyType::Through, v.into()),
            SetCharacterPropertyArgs::Walking(v) => (CharacterPropertyType::Walking, v.into()),
            SetCharacterPropertyArgs::Speed(speed) => {
                (CharacterPropertyType::Speed, Value::from(speed as u8))
            }
        };
        Self { kind, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCharacterImageArgs {
    pub image: String,
    #[serde(default)]
    pub image_index: i32,
    #[serde(default)]
    pub frame: i32,
    #[serde(default)]
    pub dir: Dir,
    #[serde(default)]
    pub use_frame_and_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCharacterOpacityArgs {
    pub opacity: i32,
    #[serde(default)]
    pub time: u32,
    #[serde(default)]
    pub wait: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_variable_value_shape_follows_value_type() {
        let json = r#"{"id": 4, "op": "+", "valueType": "random",
                       "value": {"begin": 1, "end": 6}}"#;
        let args: SetVariableArgs = serde_json::from_str(json).expect("args");
        assert_eq!(args.op, SetVariableOp::Add);
        assert_eq!(
            args.value,
            SetVariableValue::Random(RandomRange { begin: 1, end: 6 })
        );

        // valueType may arrive after value.
        let json = r#"{"value": "room_id", "valueType": "system", "id": 1, "op": "="}"#;
        let args: SetVariableArgs = serde_json::from_str(json).expect("args");
        assert_eq!(args.value, SetVariableValue::System(SystemVariable::RoomId));
    }

    #[test]
    fn set_variable_rejects_mismatched_value() {
        let json = r#"{"id": 4, "op": "=", "valueType": "constant", "value": "oops"}"#;
        assert!(serde_json::from_str::<SetVariableArgs>(json).is_err());
    }

    #[test]
    fn character_property_value_depends_on_type() {
        let speed: SetCharacterPropertyArgs =
            serde_json::from_str(r#"{"type": "speed", "value": 4}"#).expect("speed");
        assert_eq!(speed, SetCharacterPropertyArgs::Speed(Speed::Speed4));
        let through: SetCharacterPropertyArgs =
            serde_json::from_str(r#"{"type": "through", "value": true}"#).expect("through");
        assert_eq!(through, SetCharacterPropertyArgs::Through(true));
        let encoded = serde_json::to_value(speed).expect("encode");
        assert_eq!(encoded["value"], Value::from(4));
    }
}
