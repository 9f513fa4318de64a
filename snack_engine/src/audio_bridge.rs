use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

/// Receives audio side effects from scripts. Playback itself is up to the host.
pub trait AudioSink {
    fn play_bgm(&self, name: &str, volume: i32, fade_frames: u32);
    fn stop_bgm(&self, fade_frames: u32);
    fn play_se(&self, name: &str, volume: i32);
}

/// Background music remembered across save/load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bgm {
    pub name: String,
    pub volume: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioEvent {
    BgmPlay {
        name: String,
        volume: i32,
        fade_frames: u32,
    },
    BgmStop {
        fade_frames: u32,
    },
    SePlay {
        name: String,
        volume: i32,
    },
}

#[derive(Clone, Default)]
pub struct RecordingAudioSink {
    events: Rc<RefCell<Vec<AudioEvent>>>,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.borrow().clone()
    }
}

impl AudioSink for RecordingAudioSink {
    fn play_bgm(&self, name: &str, volume: i32, fade_frames: u32) {
        self.events.borrow_mut().push(AudioEvent::BgmPlay {
            name: name.to_string(),
            volume,
            fade_frames,
        });
    }

    fn stop_bgm(&self, fade_frames: u32) {
        self.events
            .borrow_mut()
            .push(AudioEvent::BgmStop { fade_frames });
    }

    fn play_se(&self, name: &str, volume: i32) {
        self.events.borrow_mut().push(AudioEvent::SePlay {
            name: name.to_string(),
            volume,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_tracks_audio_events() {
        let sink = RecordingAudioSink::new();
        sink.play_bgm("theme", 80, 30);
        sink.play_se("door", 100);
        sink.stop_bgm(0);

        assert_eq!(
            sink.events(),
            vec![
                AudioEvent::BgmPlay {
                    name: "theme".to_string(),
                    volume: 80,
                    fade_frames: 30,
                },
                AudioEvent::SePlay {
                    name: "door".to_string(),
                    volume: 100,
                },
                AudioEvent::BgmStop { fade_frames: 0 },
            ]
        );
    }
}
