use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Hint progress. Active hints keep the order they were started in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hints {
    active: Vec<i32>,
    paused: BTreeSet<i32>,
    completed: BTreeSet<i32>,
}

impl Hints {
    pub fn start(&mut self, id: i32) {
        self.paused.remove(&id);
        if self.completed.contains(&id) || self.active.contains(&id) {
            return;
        }
        self.active.push(id);
    }

    pub fn pause(&mut self, id: i32) {
        if self.active.contains(&id) {
            self.paused.insert(id);
        }
    }

    pub fn complete(&mut self, id: i32) {
        self.active.retain(|hint| *hint != id);
        self.paused.remove(&id);
        self.completed.insert(id);
    }

    pub fn active_hint_count(&self) -> usize {
        self.active
            .iter()
            .filter(|id| !self.paused.contains(id))
            .count()
    }

    /// The hint `show_hint` should present.
    pub fn current(&self) -> Option<i32> {
        self.active
            .iter()
            .copied()
            .find(|id| !self.paused.contains(id))
    }

    pub fn is_completed(&self, id: i32) -> bool {
        self.completed.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pausing_and_completing_adjust_counts() {
        let mut hints = Hints::default();
        hints.start(2);
        hints.start(5);
        assert_eq!(hints.active_hint_count(), 2);
        hints.pause(2);
        assert_eq!(hints.current(), Some(5));
        hints.complete(5);
        assert_eq!(hints.active_hint_count(), 0);
        hints.start(5);
        assert!(hints.is_completed(5));
        assert_eq!(hints.current(), None);
        hints.start(2);
        assert_eq!(hints.current(), Some(2));
    }
}
