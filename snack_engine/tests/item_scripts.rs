use std::rc::Rc;

use anyhow::{Context, Result};
use snack_data::Game;
use snack_engine::requester::RecordingRequester;
use snack_engine::{GameState, InputState, SceneManager};

const PROJECT: &str = r#"{
    "system": {"initialPosition": {"mapId": 1, "roomId": 1, "x": 1, "y": 1}},
    "maps": [{"id": 1, "rooms": [{"id": 1, "width": 3, "height": 3}]}],
    "items": [
        {"id": 1, "name": "key"},
        {"id": 2, "name": "lock"},
        {"id": 3, "name": "open_lock"},
        {"id": 4, "name": "note", "commands": [
            {"name": "set_switch", "args": {"id": 5, "value": true}}
        ]}
    ],
    "combines": [
        {"id": 1, "item1": 1, "item2": 2, "type": "combine", "commands": [
            {"name": "replace_item", "args": {"id": 3, "replaceIds": [1, 2]}}
        ]},
        {"id": 2, "item1": 4, "item2": 3, "type": "use", "commands": [
            {"name": "set_variable", "args": {"id": 2, "op": "=", "valueType": "constant", "value": 1}}
        ]}
    ],
    "commonEvents": [{"id": 1, "commands": [{"name": "wait", "args": {"time": 10}}]}]
}"#;

struct Fixture {
    game: Game,
    scene: SceneManager,
    state: GameState,
}

impl Fixture {
    fn new() -> Result<Self> {
        let game = Game::from_json_slice(PROJECT.as_bytes()).context("parsing project")?;
        let scene = SceneManager::new(Rc::new(game.clone()), Box::new(RecordingRequester::new()));
        let mut state = GameState::new(&game, 3)?;
        for id in [1, 2, 4] {
            state.items_mut().add(id);
        }
        Ok(Self { game, scene, state })
    }

    fn tick(&mut self) {
        self.state
            .update(&mut self.scene, &self.game, &InputState::default());
    }
}

#[test]
fn symmetric_combines_work_in_either_order() -> Result<()> {
    let mut fixture = Fixture::new()?;
    assert!(fixture.state.start_combine_commands(&fixture.game, 2, 1));
    fixture.tick();
    // The result takes the slot of the first consumed item.
    assert_eq!(fixture.state.items().item_ids(), &[3, 4]);
    assert!(fixture.state.event_log().any(|entry| entry == "combine.start 1"));
    Ok(())
}

#[test]
fn directed_uses_only_match_in_their_own_order() -> Result<()> {
    let mut fixture = Fixture::new()?;
    fixture.state.items_mut().replace(3, &[1, 2]);

    assert!(!fixture.state.start_combine_commands(&fixture.game, 3, 4));
    fixture.tick();
    assert_eq!(fixture.state.variables().variable_value(2), 0);

    assert!(fixture.state.start_combine_commands(&fixture.game, 4, 3));
    assert_eq!(fixture.state.items().combine_item(), 3);
    fixture.tick();
    assert_eq!(fixture.state.variables().variable_value(2), 1);
    Ok(())
}

#[test]
fn item_scripts_run_with_the_item_selected() -> Result<()> {
    let mut fixture = Fixture::new()?;
    assert!(fixture.state.start_item_commands(&fixture.game, 4));
    assert_eq!(fixture.state.items().event_item(), 4);
    fixture.tick();
    assert!(fixture.state.variables().switch_value(5));
    assert!(fixture.state.map().interpreters().is_empty());
    Ok(())
}

#[test]
fn unowned_items_cannot_run_their_scripts() -> Result<()> {
    let mut fixture = Fixture::new()?;
    assert!(fixture.state.items_mut().remove(4));
    assert!(!fixture.state.start_item_commands(&fixture.game, 4));
    assert_eq!(fixture.state.items().event_item(), 0);
    fixture.tick();
    assert!(!fixture.state.variables().switch_value(5));
    assert!(fixture.state.map().interpreters().is_empty());
    Ok(())
}

#[test]
fn nothing_starts_while_a_script_blocks() -> Result<()> {
    let mut fixture = Fixture::new()?;
    assert!(fixture.state.start_common_event(&fixture.game, 1));
    assert!(!fixture.state.start_combine_commands(&fixture.game, 1, 2));
    assert!(!fixture.state.start_item_commands(&fixture.game, 4));

    for _ in 0..12 {
        fixture.tick();
    }
    assert!(!fixture.state.map().has_blocking_interpreter());
    assert!(fixture.state.start_combine_commands(&fixture.game, 1, 2));
    Ok(())
}

#[test]
fn unknown_items_and_combines_are_refused() -> Result<()> {
    let mut fixture = Fixture::new()?;
    assert!(!fixture.state.start_item_commands(&fixture.game, 99));
    assert!(!fixture.state.start_combine_commands(&fixture.game, 1, 4));
    assert!(fixture.state.map().interpreters().is_empty());
    Ok(())
}
