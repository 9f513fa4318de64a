use std::rc::Rc;

use anyhow::{Context, Result};
use snack_data::{Condition, Game};
use snack_engine::requester::RecordingRequester;
use snack_engine::{GameState, InputState, SceneManager};

const PROJECT: &str = r#"{
    "system": {"initialPosition": {"mapId": 1, "roomId": 1, "x": 0, "y": 4},
               "initialPlayerImage": "hero"},
    "maps": [{"id": 1, "rooms": [
        {"id": 1, "width": 5, "height": 5, "events": [
            {"id": 2, "x": 2, "y": 0, "pages": [{}]},
            {"id": 3, "x": 4, "y": 0, "pages": [
                {},
                {"conditions": [{"type": "switch", "id": 3, "value": true}], "image": "open"}
            ]}
        ]}
    ]}],
    "commonEvents": [{"id": 1, "commands": [
        {"name": "play_bgm", "args": {"name": "theme", "volume": 80}},
        {"name": "show_picture", "args": {"id": 1, "image": "sun", "x": 0, "y": 0}},
        {"name": "move_picture", "args": {"id": 1, "x": 100, "y": 50, "time": 60}},
        {"name": "set_route", "args": {"eventId": 2, "commands": [
            {"name": "move_character", "args": {"type": "direction", "dir": 2, "distance": 3}}
        ]}},
        {"name": "if", "args": {"conditions": [{"type": "switch", "id": 1, "value": false}]},
         "branches": [[
            {"name": "wait", "args": {"time": 30}},
            {"name": "set_variable", "args": {"id": 1, "op": "=", "valueType": "constant", "value": 7}}
         ]]}
    ]}]
}"#;

fn setup() -> Result<(Game, SceneManager)> {
    let game = Game::from_json_slice(PROJECT.as_bytes()).context("parsing project")?;
    let scene = SceneManager::new(Rc::new(game.clone()), Box::new(RecordingRequester::new()));
    Ok((game, scene))
}

fn run(state: &mut GameState, scene: &mut SceneManager, game: &Game, ticks: usize) {
    for _ in 0..ticks {
        state.update(scene, game, &InputState::default());
    }
}

#[test]
fn mid_flight_state_reencodes_byte_for_byte() -> Result<()> {
    let (game, mut scene) = setup()?;
    let mut state = GameState::new(&game, 11)?;
    state.start_common_event(&game, 1);
    run(&mut state, &mut scene, &game, 2);

    // Interpreter inside the `if` branch, event 2 sliding, picture moving.
    let interpreter = &state.map().interpreters()[0];
    assert_eq!(interpreter.depth(), 2);
    assert!(state.map().character(2).expect("event 2").is_moving());
    assert!(state.pictures().is_animating(1));

    let first = state.encode()?;
    let restored = GameState::decode(&first, 11)?;
    let second = restored.encode()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn restored_state_keeps_running_like_the_original() -> Result<()> {
    let (game, mut scene) = setup()?;
    let mut state = GameState::new(&game, 11)?;
    state.start_common_event(&game, 1);
    run(&mut state, &mut scene, &game, 2);

    let (_, mut other_scene) = setup()?;
    let mut restored = GameState::decode(&state.encode()?, 11)?;
    assert_eq!(restored.last_playing_bgm().map(|bgm| bgm.name.as_str()), Some("theme"));

    run(&mut state, &mut scene, &game, 90);
    run(&mut restored, &mut other_scene, &game, 90);
    assert_eq!(state.variables().variable_value(1), 7);
    assert_eq!(restored.variables().variable_value(1), 7);
    assert_eq!(restored.map().character(2).expect("event 2").position(), (2, 3));
    assert_eq!(state.encode()?, restored.encode()?);
    Ok(())
}

#[test]
fn switch_conditions_agree_across_a_save() -> Result<()> {
    let (game, mut scene) = setup()?;
    let mut state = GameState::new(&game, 1)?;
    state.variables_mut().set_switch_value(3, true);
    state.variables_mut().set_switch_value(8, true);
    run(&mut state, &mut scene, &game, 1);
    assert_eq!(state.map().page_index(3), Some(1));

    let restored = GameState::decode(&state.encode()?, 1)?;
    for id in 1..=10 {
        for value in [false, true] {
            let condition = Condition::Switch { id, value };
            let expected = state.variables().switch_value(id) == value;
            assert_eq!(state.meets_condition(&game, &condition, 0), expected);
            assert_eq!(restored.meets_condition(&game, &condition, 0), expected);
        }
    }
    assert_eq!(restored.map().page_index(3), Some(1));
    Ok(())
}

#[test]
fn garbage_and_wrong_kinds_fail_to_load() -> Result<()> {
    let (game, _) = setup()?;
    let state = GameState::new(&game, 1)?;
    let mut bytes = state.encode()?;
    assert!(GameState::decode(&bytes[..3], 1).is_err());
    bytes[0] = b'X';
    assert!(GameState::decode(&bytes, 1).is_err());

    let permanent = snack_save::encode_payload(
        snack_save::PayloadKind::Permanent,
        &snack_engine::scene::Permanent::default(),
    )?;
    assert!(GameState::decode(&permanent, 1).is_err());
    Ok(())
}
