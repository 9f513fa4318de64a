use std::{fs, path::Path, rc::Rc};

use anyhow::{Context, Result};
use serde::Serialize;
use snack_data::Game;
use snack_engine::audio_bridge::{AudioSink, RecordingAudioSink};
use snack_engine::requester_file::FileRequester;
use snack_engine::{GameState, InputState, SceneManager};

use crate::cli::RunArgs;

#[derive(Serialize)]
struct EventLog<'a> {
    ticks: u32,
    events: Vec<&'a str>,
    script_errors: Vec<String>,
    diagnostics: &'a [String],
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        project_json,
        save_path,
        purchases_path,
        language_path,
        prices_path,
        ticks,
        seed,
        inputs,
        save_on_exit,
        state_json,
        event_log_json,
        audio_log_json,
    } = args;

    let game = Game::from_json_file(&project_json)
        .with_context(|| format!("loading project {}", project_json.display()))?;
    for diagnostic in game.diagnostics() {
        log::warn!(
            "{:?} at {:?}: unrecognized command {} ({})",
            diagnostic.owner,
            diagnostic.path,
            diagnostic.name,
            diagnostic.reason
        );
    }
    let game = Rc::new(game);

    let requester =
        FileRequester::new(save_path, purchases_path, language_path).with_prices(prices_path);
    let purchases = requester
        .load_purchases()
        .context("loading purchases")?;
    let language = requester.load_language().context("loading language")?;
    let permanent = requester
        .load_permanent()
        .context("loading permanent data")?;
    let progress = requester.load_progress().context("loading progress save")?;

    let audio = Rc::new(RecordingAudioSink::new());
    let mut scene = SceneManager::new(Rc::clone(&game), Box::new(requester.clone()))
        .with_purchases(purchases)
        .with_audio(Rc::clone(&audio) as Rc<dyn AudioSink>);
    if let Some(bytes) = permanent.as_deref() {
        scene = scene.with_permanent(bytes).with_context(|| {
            format!("decoding {}", requester.permanent_path().display())
        })?;
    }
    if let Some(language) = language.as_deref() {
        scene.set_language(language);
    }
    let prices_request = scene.request_iap_prices();
    scene.update();
    match scene.take_result(prices_request) {
        Some(result) if result.succeeded => {}
        _ => log::warn!("product prices unavailable; price directives render empty"),
    }

    let seed = seed.unwrap_or_else(rand::random);
    log::info!("rng seed {seed}");
    let mut state = match progress {
        Some(bytes) => {
            let state = GameState::decode(&bytes, seed).with_context(|| {
                format!("decoding save {}", requester.save_path().display())
            })?;
            println!("Resumed save from {}", requester.save_path().display());
            scene.set_progress(bytes);
            state
        }
        None => GameState::new(&game, seed).context("starting a new game")?,
    };

    let mut ran = 0;
    for tick in 0..ticks {
        let input = inputs.get(&tick).copied().unwrap_or_default();
        state.update(&mut scene, &game, &input);
        ran += 1;
        if state.take_goto_title() {
            println!("Script returned to the title on frame {tick}");
            break;
        }
    }

    if save_on_exit {
        if state.request_save(&mut scene) {
            // The file requester answers right away; one more tick collects it.
            state.update(&mut scene, &game, &InputState::default());
            println!("Saved progress to {}", requester.save_path().display());
        } else {
            log::warn!("save refused: another save is in flight or the player is walking");
        }
    }

    let map = state.map();
    println!(
        "Ran {ran} frames; player in map{}/room{} at {:?}",
        map.map_id(),
        map.room_id(),
        map.player().position()
    );
    if !state.script_errors().is_empty() {
        println!("{} script error(s):", state.script_errors().len());
        for error in state.script_errors() {
            println!("  - {error}");
        }
    }

    if let Some(path) = state_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&state).context("serializing game state to JSON")?;
        write_json(path, &json, "game state")?;
    }
    if let Some(path) = event_log_json.as_ref() {
        let log = EventLog {
            ticks: ran,
            events: state.event_log().collect(),
            script_errors: state.script_errors().iter().map(ToString::to_string).collect(),
            diagnostics: state.diagnostics(),
        };
        let json = serde_json::to_string_pretty(&log).context("serializing event log to JSON")?;
        write_json(path, &json, "event log")?;
    }
    if let Some(path) = audio_log_json.as_ref() {
        let json = serde_json::to_string_pretty(&audio.events())
            .context("serializing audio log to JSON")?;
        write_json(path, &json, "audio log")?;
    }

    Ok(())
}

fn write_json(path: &Path, json: &str, what: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}
