//! Reading the world: conditions, `set_variable` operands, message
//! directives and choice visibility.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use snack_data::args::{
    CharacterValue, CharacterValueType, ItemGroupValueType, SetVariableArgs, SetVariableValue,
    ShowChoicesArgs, SystemVariable, TableValue,
};
use snack_data::{Condition, ConditionValueType, Game, ItemCondition, ValueType, SELF_EVENT_ID};

use super::GameState;
use crate::message_syntax::{parse_message_syntax, MessageContext};
use crate::scene::SceneManager;
use crate::variables::{apply_op, ref_id, ArithmeticFault, SelfSwitchKey};

impl GameState {
    /// Self-switches are keyed by the room the player is in, for writes and
    /// reads alike.
    pub fn self_switch_key(&self, event_id: i32, id: i32) -> SelfSwitchKey {
        SelfSwitchKey {
            map_id: self.map.map_id(),
            room_id: self.map.room_id(),
            event_id,
            id,
        }
    }

    pub fn meets_condition(&self, game: &Game, condition: &Condition, event_id: i32) -> bool {
        match condition {
            Condition::Switch { id, value } => self.variables.switch_value(*id) == *value,
            Condition::SelfSwitch { id, value } => {
                self.variables.self_switch_value(self.self_switch_key(event_id, *id)) == *value
            }
            Condition::Variable {
                id,
                comp,
                value,
                value_type,
            } => {
                let rhs = match value_type {
                    ConditionValueType::Constant => *value,
                    ConditionValueType::Variable => self.variables.variable_value(ref_id(*value)),
                    ConditionValueType::VariableRef => {
                        self.variables.variable_ref_value(ref_id(*value))
                    }
                };
                comp.compare(self.variables.variable_value(*id), rhs)
            }
            // Item id 0 stands for "any item".
            Condition::Item { id, value } => match (value, *id) {
                (ItemCondition::Own, 0) => !self.items.is_empty(),
                (ItemCondition::Own, id) => self.items.includes(id),
                (ItemCondition::NotOwn, 0) => self.items.is_empty(),
                (ItemCondition::NotOwn, id) => !self.items.includes(id),
                (ItemCondition::Active, 0) => self.items.active_item() != 0,
                (ItemCondition::Active, id) => self.items.active_item() == id,
            },
            Condition::Special { .. } => {
                let (x, y) = self.map.player().position();
                self.map.executable_event_at(game, x, y).is_some()
            }
        }
    }

    /// All conditions hold. An empty list always holds.
    pub fn meets_conditions(&self, game: &Game, conditions: &[Condition], event_id: i32) -> bool {
        conditions
            .iter()
            .all(|condition| self.meets_condition(game, condition, event_id))
    }

    /// Applies one `set_variable`. On division or modulo by zero the target
    /// is set to 0 and the fault is returned for the caller to report.
    pub fn set_variable(
        &mut self,
        game: &Game,
        scene: &SceneManager,
        args: &SetVariableArgs,
        event_id: i32,
    ) -> Result<(), ArithmeticFault> {
        let id = match args.id_type {
            ValueType::Constant => args.id,
            ValueType::Variable => ref_id(self.variables.variable_value(args.id)),
        };
        let lhs = if args.internal {
            self.variables.internal_variable_value(id)
        } else {
            self.variables.variable_value(id)
        };
        let rhs = self.operand(game, scene, &args.value, event_id);
        let (value, fault) = match apply_op(args.op, lhs, rhs) {
            Ok(value) => (value, None),
            Err(fault) => (0, Some(fault)),
        };
        if args.internal {
            self.variables.set_internal_variable_value(id, value);
        } else {
            self.variables.set_variable_value(id, value);
        }
        fault.map_or(Ok(()), Err)
    }

    fn operand(
        &mut self,
        game: &Game,
        scene: &SceneManager,
        value: &SetVariableValue,
        event_id: i32,
    ) -> i64 {
        match value {
            SetVariableValue::Constant(value) => *value,
            SetVariableValue::Variable(id) => self.variables.variable_value(*id),
            SetVariableValue::VariableRef(id) => self.variables.variable_ref_value(*id),
            SetVariableValue::Switch(id) => i64::from(self.variables.switch_value(*id)),
            SetVariableValue::SwitchRef(id) => i64::from(self.variables.switch_ref_value(*id)),
            SetVariableValue::Random(range) => self.rng.range_inclusive(range.begin, range.end),
            SetVariableValue::Character(character) => self.character_value(character, event_id),
            SetVariableValue::ItemGroup(group) => {
                let count = match group.kind {
                    ItemGroupValueType::Owned => self.items.owned_in_group(game, group.group),
                    ItemGroupValueType::Total => game.item_count_in_group(group.group),
                };
                i64::try_from(count).unwrap_or(i64::MAX)
            }
            SetVariableValue::IapProduct(id) => match game.iap_product(*id) {
                Some(product) => i64::from(scene.is_purchased(&product.key)),
                None => {
                    log::warn!("set_variable: iap product {id} not found");
                    0
                }
            },
            SetVariableValue::System(variable) => self.system_value(scene, *variable),
            SetVariableValue::Table(table) => self.table_operand(game, table),
        }
    }

    fn character_value(&self, value: &CharacterValue, event_id: i32) -> i64 {
        let id = if value.event_id == SELF_EVENT_ID {
            event_id
        } else {
            value.event_id
        };
        let Some(character) = self.map.character(id) else {
            log::warn!("set_variable: character {id} not found");
            return 0;
        };
        match value.kind {
            CharacterValueType::Direction => character.dir().index(),
            CharacterValueType::RoomX => i64::from(character.position().0),
            CharacterValueType::RoomY => i64::from(character.position().1),
            CharacterValueType::ScreenX => i64::from(character.draw_position().0),
            CharacterValueType::ScreenY => i64::from(character.draw_position().1),
            CharacterValueType::IsPressed => {
                i64::from(self.pressed_tile == Some(character.position()))
            }
        }
    }

    fn system_value(&self, scene: &SceneManager, variable: SystemVariable) -> i64 {
        let picture = |id: Option<usize>| id.map_or(0, |id| i64::try_from(id).unwrap_or(0));
        match variable {
            SystemVariable::InterstitialAdsLoaded => i64::from(scene.interstitial_ads_loaded()),
            SystemVariable::RewardedAdsLoaded => i64::from(scene.rewarded_ads_loaded()),
            SystemVariable::ActiveHintCount => {
                i64::try_from(self.hints.active_hint_count()).unwrap_or(i64::MAX)
            }
            SystemVariable::RoomId => i64::from(self.map.room_id()),
            SystemVariable::CurrentTime => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| {
                    i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
                }),
            SystemVariable::ActiveItemId => i64::from(self.items.active_item()),
            SystemVariable::EventItemId => i64::from(self.items.event_item()),
            SystemVariable::TriggeredPictureId => picture(self.touch.triggered),
            SystemVariable::PressedPictureId => picture(self.touch.pressed),
            SystemVariable::ReleasedPictureId => picture(self.touch.released),
            SystemVariable::SponsorTier => scene.sponsor_tier(),
        }
    }

    fn table_operand(&self, game: &Game, table: &TableValue) -> i64 {
        let record = match table.id_type {
            ValueType::Constant => table.id,
            ValueType::Variable => self.variables.variable_value(ref_id(table.id)),
        };
        let cell = game
            .table(&table.name)
            .and_then(|found| found.cell(record, &table.attr));
        match cell {
            Some(Value::Number(number)) => number.as_i64().unwrap_or_else(|| {
                log::warn!(
                    "set_variable: {}[{record}].{} is not an integer",
                    table.name,
                    table.attr
                );
                0
            }),
            Some(other) => {
                log::warn!(
                    "set_variable: {}[{record}].{} is {other}, not a number",
                    table.name,
                    table.attr
                );
                0
            }
            None => {
                log::warn!(
                    "set_variable: {}[{record}].{} not found",
                    table.name,
                    table.attr
                );
                0
            }
        }
    }

    /// Localizes a text id (falling back to the literal) and expands its
    /// directives.
    pub fn resolve_message(&self, game: &Game, scene: &SceneManager, content: &str) -> String {
        let lookup = MessageLookup {
            state: self,
            game,
            scene,
        };
        parse_message_syntax(&lookup.text(content), &lookup)
    }

    /// Text and checked mark of every visible choice, in display order.
    pub fn visible_choices(
        &self,
        game: &Game,
        scene: &SceneManager,
        args: &ShowChoicesArgs,
        event_id: i32,
    ) -> Vec<(String, bool)> {
        args.choices
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_choice_visible(game, args, *index, event_id))
            .map(|(index, choice)| {
                let checked = args
                    .conditions
                    .get(index)
                    .and_then(|condition| condition.checked.as_ref())
                    .is_some_and(|condition| self.meets_condition(game, condition, event_id));
                (self.resolve_message(game, scene, choice), checked)
            })
            .collect()
    }

    /// Maps a displayed choice index back to its index in `args.choices`,
    /// skipping hidden choices.
    pub fn real_choice_index(
        &self,
        game: &Game,
        args: &ShowChoicesArgs,
        displayed: usize,
        event_id: i32,
    ) -> usize {
        if args.conditions.is_empty() {
            return displayed;
        }
        (0..args.choices.len())
            .filter(|index| self.is_choice_visible(game, args, *index, event_id))
            .nth(displayed)
            .unwrap_or(displayed)
    }

    fn is_choice_visible(
        &self,
        game: &Game,
        args: &ShowChoicesArgs,
        index: usize,
        event_id: i32,
    ) -> bool {
        args.conditions
            .get(index)
            .and_then(|condition| condition.visible.as_ref())
            .map_or(true, |condition| self.meets_condition(game, condition, event_id))
    }
}

struct MessageLookup<'a> {
    state: &'a GameState,
    game: &'a Game,
    scene: &'a SceneManager,
}

impl MessageLookup<'_> {
    fn text(&self, id: &str) -> String {
        self.game
            .texts
            .get(self.scene.language(), id)
            .unwrap_or(id)
            .to_string()
    }
}

impl MessageContext for MessageLookup<'_> {
    fn price(&self, product_key: &str) -> String {
        self.scene.price(product_key)
    }

    fn variable(&self, id: i32) -> i64 {
        self.state.variables.variable_value(id)
    }

    fn item_name(&self, item_id: i32) -> Option<String> {
        let item = self.game.item(item_id)?;
        Some(self.text(&item.name))
    }

    fn table_value(&self, table: &str, record_id: i64, attr: &str) -> Option<String> {
        let value = self.game.table(table)?.cell(record_id, attr)?;
        Some(match value {
            Value::String(text) => self.text(text),
            other => other.to_string(),
        })
    }
}
