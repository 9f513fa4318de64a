use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{visit_commands, Command, CommandArgs};
use crate::condition::Condition;
use crate::error::DataError;
use crate::types::{Dir, Speed, DEFAULT_ROOM_HEIGHT, DEFAULT_ROOM_WIDTH};

/// A whole authored project as exported by the authoring tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Game {
    pub maps: Vec<Map>,
    pub tile_sets: Vec<TileSet>,
    pub texts: Texts,
    pub items: Vec<Item>,
    pub combines: Vec<Combine>,
    pub common_events: Vec<CommonEvent>,
    pub hints: Vec<Hint>,
    pub iap_products: Vec<IapProduct>,
    pub tables: Vec<Table>,
    pub system: System,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct System {
    pub game_name: String,
    pub default_language: String,
    pub initial_position: InitialPosition,
    pub initial_player_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialPosition {
    pub map_id: i32,
    pub room_id: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i32,
    #[serde(default = "default_room_width")]
    pub width: i32,
    #[serde(default = "default_room_height")]
    pub height: i32,
    #[serde(default)]
    pub tile_set_id: i32,
    /// Tile layers, each `width * height` tile ids in row-major order.
    #[serde(default)]
    pub tiles: Vec<Vec<i32>>,
    #[serde(default)]
    pub events: Vec<EventData>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub foreground: String,
}

fn default_room_width() -> i32 {
    DEFAULT_ROOM_WIDTH
}

fn default_room_height() -> i32 {
    DEFAULT_ROOM_HEIGHT
}

impl Room {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn tile_ids_at(&self, x: i32, y: i32) -> impl Iterator<Item = i32> + '_ {
        let index = if self.contains(x, y) {
            Some((y * self.width + x) as usize)
        } else {
            None
        };
        self.tiles
            .iter()
            .filter_map(move |layer| index.and_then(|i| layer.get(i).copied()))
    }

    pub fn event(&self, id: i32) -> Option<&EventData> {
        self.events.iter().find(|event| event.id == id)
    }
}

/// Passability table for one tile set. Tile id 0 is always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSet {
    pub id: i32,
    #[serde(default)]
    pub passage_types: Vec<PassageType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageType {
    #[default]
    Passable,
    Wall,
}

impl TileSet {
    pub fn passage_type(&self, tile_id: i32) -> PassageType {
        if tile_id <= 0 {
            return PassageType::Passable;
        }
        self.passage_types
            .get(tile_id as usize)
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub id: i32,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Runs when the player walks up to the event and acts on it.
    Player,
    /// Runs when the event's tile is tapped directly.
    Direct,
    /// Runs as soon as the page becomes active and blocks player input.
    Auto,
    /// Runs alongside everything else without blocking.
    Parallel,
    #[default]
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Below,
    #[default]
    Same,
    Above,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub conditions: Vec<Condition>,
    pub image: String,
    pub image_index: i32,
    pub frame: i32,
    pub dir: Dir,
    pub dir_fix: bool,
    pub stepping: bool,
    pub walking: bool,
    pub through: bool,
    pub speed: Speed,
    pub trigger: Trigger,
    pub priority: Priority,
    pub commands: Vec<Command>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            image: String::new(),
            image_index: 0,
            frame: 1,
            dir: Dir::Down,
            dir_fix: false,
            stepping: false,
            walking: true,
            through: false,
            speed: Speed::default(),
            trigger: Trigger::default(),
            priority: Priority::default(),
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i32,
    /// Text id of the display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub group: i32,
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineType {
    /// Symmetric: either item may be the one picked first.
    #[default]
    Combine,
    /// Directed: item1 is used on item2.
    Use,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combine {
    pub id: i32,
    pub item1: i32,
    pub item2: i32,
    #[serde(rename = "type", default)]
    pub kind: CombineType,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Combine {
    pub fn matches(&self, item1: i32, item2: i32) -> bool {
        (self.item1 == item1 && self.item2 == item2)
            || (self.kind == CombineType::Combine && self.item1 == item2 && self.item2 == item1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonEvent {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub id: i32,
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IapProductType {
    #[default]
    Unlock,
    Consumable,
    Tier1Donation,
    Tier2Donation,
    Tier3Donation,
}

impl IapProductType {
    /// Sponsor tier granted by owning a product of this type.
    pub fn sponsor_tier(self) -> i64 {
        match self {
            IapProductType::Tier1Donation => 1,
            IapProductType::Tier2Donation => 2,
            IapProductType::Tier3Donation => 3,
            IapProductType::Unlock | IapProductType::Consumable => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IapProduct {
    pub id: i32,
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: IapProductType,
}

/// A lookup table. Records are keyed by the stringified record id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub records: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Table {
    pub fn cell(&self, id: i64, attr: &str) -> Option<&Value> {
        self.records.get(&id.to_string())?.get(attr)
    }
}

/// Localized strings keyed by text id, then language code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Texts {
    pub languages: Vec<String>,
    pub data: BTreeMap<String, BTreeMap<String, String>>,
}

impl Texts {
    /// Resolves a text id, falling back to the first listed language.
    pub fn get(&self, lang: &str, id: &str) -> Option<&str> {
        let entry = self.data.get(id)?;
        entry
            .get(lang)
            .or_else(|| {
                self.languages
                    .first()
                    .and_then(|fallback| entry.get(fallback))
            })
            .map(String::as_str)
    }
}

/// Where a command list lives inside the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOwner {
    Page {
        map_id: i32,
        room_id: i32,
        event_id: i32,
        page: usize,
    },
    Item(i32),
    Combine(i32),
    CommonEvent(i32),
    Hint(i32),
}

/// A command that failed to decode, with its position in the project.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDiagnostic {
    pub owner: ScriptOwner,
    /// Same shape as the paths yielded by `visit_commands`.
    pub path: Vec<usize>,
    pub name: String,
    pub reason: String,
}

impl Game {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, DataError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DataError> {
        let bytes = fs::read(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    pub fn map(&self, map_id: i32) -> Option<&Map> {
        self.maps.iter().find(|map| map.id == map_id)
    }

    pub fn room(&self, map_id: i32, room_id: i32) -> Option<&Room> {
        self.map(map_id)?
            .rooms
            .iter()
            .find(|room| room.id == room_id)
    }

    pub fn event(&self, map_id: i32, room_id: i32, event_id: i32) -> Option<&EventData> {
        self.room(map_id, room_id)?.event(event_id)
    }

    pub fn tile_set(&self, id: i32) -> Option<&TileSet> {
        self.tile_sets.iter().find(|set| set.id == id)
    }

    pub fn item(&self, id: i32) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn find_combine(&self, item1: i32, item2: i32) -> Option<&Combine> {
        self.combines
            .iter()
            .find(|combine| combine.matches(item1, item2))
    }

    pub fn common_event(&self, id: i32) -> Option<&CommonEvent> {
        self.common_events.iter().find(|event| event.id == id)
    }

    pub fn hint(&self, id: i32) -> Option<&Hint> {
        self.hints.iter().find(|hint| hint.id == id)
    }

    pub fn iap_product(&self, id: i32) -> Option<&IapProduct> {
        self.iap_products.iter().find(|product| product.id == id)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Number of defined items in a group; group 0 counts every item.
    pub fn item_count_in_group(&self, group: i32) -> usize {
        self.items
            .iter()
            .filter(|item| group == 0 || item.group == group)
            .count()
    }

    /// Lists every command in the project that did not decode cleanly.
    pub fn diagnostics(&self) -> Vec<ScriptDiagnostic> {
        let mut out = Vec::new();
        for map in &self.maps {
            for room in &map.rooms {
                for event in &room.events {
                    for (page, data) in event.pages.iter().enumerate() {
                        let owner = ScriptOwner::Page {
                            map_id: map.id,
                            room_id: room.id,
                            event_id: event.id,
                            page,
                        };
                        collect_diagnostics(owner, &data.commands, &mut out);
                    }
                }
            }
        }
        for item in &self.items {
            collect_diagnostics(ScriptOwner::Item(item.id), &item.commands, &mut out);
        }
        for combine in &self.combines {
            collect_diagnostics(ScriptOwner::Combine(combine.id), &combine.commands, &mut out);
        }
        for event in &self.common_events {
            collect_diagnostics(ScriptOwner::CommonEvent(event.id), &event.commands, &mut out);
        }
        for hint in &self.hints {
            collect_diagnostics(ScriptOwner::Hint(hint.id), &hint.commands, &mut out);
        }
        out
    }
}

fn collect_diagnostics(owner: ScriptOwner, commands: &[Command], out: &mut Vec<ScriptDiagnostic>) {
    visit_commands(commands, &mut |path, command| {
        if let CommandArgs::Unrecognized(raw) = &command.args {
            out.push(ScriptDiagnostic {
                owner: owner.clone(),
                path: path.to_vec(),
                name: raw.name.clone(),
                reason: raw.reason.clone(),
            });
        }
    });
}
