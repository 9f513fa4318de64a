use serde::{Deserialize, Serialize};
use snack_data::Game;

/// Owned items in player-visible order plus the current selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Items {
    items: Vec<i32>,
    active_item: i32,
    event_item: i32,
    combine_item: i32,
}

impl Items {
    pub fn item_ids(&self) -> &[i32] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn includes(&self, id: i32) -> bool {
        self.items.contains(&id)
    }

    pub fn active_item(&self) -> i32 {
        self.active_item
    }

    pub fn event_item(&self) -> i32 {
        self.event_item
    }

    pub fn combine_item(&self) -> i32 {
        self.combine_item
    }

    /// Appends an item. Returns false if it was already owned.
    pub fn add(&mut self, id: i32) -> bool {
        if id == 0 || self.includes(id) {
            return false;
        }
        self.items.push(id);
        true
    }

    /// Drops an item and any selection pointing at it.
    pub fn remove(&mut self, id: i32) -> bool {
        let Some(index) = self.items.iter().position(|item| *item == id) else {
            return false;
        };
        self.items.remove(index);
        self.clear_selection_of(id);
        true
    }

    /// Swaps every owned id in `replace_ids` for `id`, keeping the slot of
    /// the first one found. Adds `id` at the end when none is owned.
    pub fn replace(&mut self, id: i32, replace_ids: &[i32]) {
        let slot = self
            .items
            .iter()
            .position(|item| replace_ids.contains(item));
        for old in replace_ids {
            if *old != id && self.includes(*old) {
                self.items.retain(|item| item != old);
                self.clear_selection_of(*old);
            }
        }
        if self.includes(id) {
            return;
        }
        match slot {
            Some(index) => self.items.insert(index.min(self.items.len()), id),
            None => self.items.push(id),
        }
    }

    pub fn activate(&mut self, id: i32) -> bool {
        if !self.includes(id) {
            return false;
        }
        self.active_item = id;
        true
    }

    pub fn deactivate(&mut self) {
        self.active_item = 0;
    }

    /// Marks the item being used or previewed; 0 clears it.
    pub fn set_event_item(&mut self, id: i32) {
        self.event_item = id;
    }

    /// Second item of a pending combine; allowed to be unowned while picking.
    pub fn set_combine_item(&mut self, id: i32) {
        self.combine_item = id;
    }

    /// Owned items belonging to `group` (0 counts everything).
    pub fn owned_in_group(&self, game: &Game, group: i32) -> usize {
        self.items
            .iter()
            .filter(|id| {
                group == 0
                    || game
                        .item(**id)
                        .map(|item| item.group == group)
                        .unwrap_or(false)
            })
            .count()
    }

    fn clear_selection_of(&mut self, id: i32) {
        if self.active_item == id {
            self.active_item = 0;
        }
        if self.event_item == id {
            self.event_item = 0;
        }
        if self.combine_item == id {
            self.combine_item = 0;
        }
    }
}
