use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use snack_engine::InputState;

#[derive(Parser, Debug)]
#[command(about = "Runs a snack project headlessly with scripted input", version)]
pub struct Args {
    /// Project JSON exported by the editor
    pub project_json: PathBuf,

    /// Progress save; resumed when it exists
    #[arg(long, default_value = "save.msgpack")]
    pub save_msgpack_path: PathBuf,

    /// JSON list of purchased product keys
    #[arg(long, default_value = "purchases.json")]
    pub purchases_json_path: PathBuf,

    /// JSON file holding the selected language
    #[arg(long, default_value = "language.json")]
    pub language_json_path: PathBuf,

    /// JSON object of product key to display price
    #[arg(long, default_value = "prices.json")]
    pub prices_json_path: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Seed for script randomness (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tap a tile on a given frame, e.g. `3,4@10` (repeatable)
    #[arg(long = "tap", value_name = "X,Y@TICK")]
    pub taps: Vec<String>,

    /// Pick a displayed choice on a given frame, e.g. `1@40` (repeatable)
    #[arg(long = "choose", value_name = "INDEX@TICK")]
    pub choices: Vec<String>,

    /// Write a progress save after the last frame
    #[arg(long)]
    pub save_on_exit: bool,

    /// Path to write the final game state as JSON
    #[arg(long)]
    pub state_json: Option<PathBuf>,

    /// Path to write the event log and script errors as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the audio events scripts emitted as JSON
    #[arg(long)]
    pub audio_log_json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunArgs {
    pub project_json: PathBuf,
    pub save_path: PathBuf,
    pub purchases_path: PathBuf,
    pub language_path: PathBuf,
    pub prices_path: PathBuf,
    pub ticks: u32,
    pub seed: Option<u64>,
    /// Input per frame; frames without an entry get no input.
    pub inputs: BTreeMap<u32, InputState>,
    pub save_on_exit: bool,
    pub state_json: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub audio_log_json: Option<PathBuf>,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        if self.ticks == 0 {
            bail!("--ticks must be at least 1");
        }

        let mut inputs: BTreeMap<u32, InputState> = BTreeMap::new();
        for raw in &self.taps {
            let (tile, tick) = split_tick(raw, "--tap")?;
            let (x, y) = tile
                .split_once(',')
                .with_context(|| format!("--tap {raw:?}: expected X,Y@TICK"))?;
            let x: i32 = x
                .trim()
                .parse()
                .with_context(|| format!("--tap {raw:?}: bad x"))?;
            let y: i32 = y
                .trim()
                .parse()
                .with_context(|| format!("--tap {raw:?}: bad y"))?;
            let input = inputs.entry(check_tick(tick, self.ticks, raw)?).or_default();
            input.triggered = true;
            input.tapped_tile = Some((x, y));
        }
        for raw in &self.choices {
            let (index, tick) = split_tick(raw, "--choose")?;
            let index: usize = index
                .trim()
                .parse()
                .with_context(|| format!("--choose {raw:?}: bad index"))?;
            let input = inputs.entry(check_tick(tick, self.ticks, raw)?).or_default();
            input.choice = Some(index);
        }

        Ok(RunArgs {
            project_json: self.project_json,
            save_path: self.save_msgpack_path,
            purchases_path: self.purchases_json_path,
            language_path: self.language_json_path,
            prices_path: self.prices_json_path,
            ticks: self.ticks,
            seed: self.seed,
            inputs,
            save_on_exit: self.save_on_exit,
            state_json: self.state_json,
            event_log_json: self.event_log_json,
            audio_log_json: self.audio_log_json,
        })
    }
}

fn split_tick<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, u32)> {
    let Some((value, tick)) = raw.rsplit_once('@') else {
        bail!("{flag} {raw:?}: missing @TICK");
    };
    let tick = tick
        .trim()
        .parse()
        .with_context(|| format!("{flag} {raw:?}: bad tick"))?;
    Ok((value, tick))
}

fn check_tick(tick: u32, ticks: u32, raw: &str) -> Result<u32> {
    if tick >= ticks {
        bail!("{raw:?}: tick {tick} is past the last frame ({})", ticks - 1);
    }
    Ok(tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Result<RunArgs> {
        let mut argv = vec!["snack", "project.json"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)?.into_run_args()
    }

    #[test]
    fn taps_and_choices_on_one_frame_merge() {
        let run = args(&["--ticks", "20", "--tap", "3,4@5", "--choose", "1@5"]).expect("args");
        let input = run.inputs[&5];
        assert_eq!(input.tapped_tile, Some((3, 4)));
        assert!(input.triggered);
        assert_eq!(input.choice, Some(1));
        assert_eq!(run.inputs.len(), 1);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(args(&["--tap", "3@5"]).is_err());
        assert!(args(&["--tap", "3,4"]).is_err());
        assert!(args(&["--ticks", "10", "--choose", "0@10"]).is_err());
        assert!(args(&["--ticks", "0"]).is_err());
    }
}
