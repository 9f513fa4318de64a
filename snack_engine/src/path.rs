use std::collections::{BTreeMap, VecDeque};

use snack_data::Dir;

/// Breadth-first search over the room grid.
///
/// Returns the unit steps from `start` toward `goal`. The goal tile itself
/// does not need to be passable (the player walks up to an event standing
/// there). When the goal cannot be reached the path leads to the reachable
/// tile closest to it by Manhattan distance, so an empty path means the
/// mover is already as close as it can get.
pub fn find_path<F>(start: (i32, i32), goal: (i32, i32), passable: F) -> Vec<Dir>
where
    F: Fn(i32, i32) -> bool,
{
    if start == goal {
        return Vec::new();
    }

    let mut came_from: BTreeMap<(i32, i32), ((i32, i32), Dir)> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    let mut best = start;
    let mut best_distance = manhattan(start, goal);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            best = goal;
            break;
        }
        for dir in Dir::ALL {
            let (dx, dy) = dir.delta();
            let next = (current.0 + dx, current.1 + dy);
            if next == start || came_from.contains_key(&next) {
                continue;
            }
            if next != goal && !passable(next.0, next.1) {
                continue;
            }
            came_from.insert(next, (current, dir));
            queue.push_back(next);

            let distance = manhattan(next, goal);
            if distance < best_distance {
                best = next;
                best_distance = distance;
            }
        }
    }

    let mut steps = Vec::new();
    let mut cursor = best;
    while let Some(&(previous, dir)) = came_from.get(&cursor) {
        steps.push(dir);
        cursor = previous;
    }
    steps.reverse();
    steps
}

fn manhattan(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}
