//! Background tracks with cross-fades, plus one-shot sounds.

use std::collections::HashMap;

use crate::config::MusicConfig;

/// Where the mixer's decisions end up. The controller only tracks volumes;
/// decoding and output belong to the backend.
pub trait AudioBackend {
    /// Starts `track` looping at `volume`.
    fn play_track(&mut self, track: &str, volume: f32);
    fn set_volume(&mut self, track: &str, volume: f32);
    fn stop_track(&mut self, track: &str);
    fn play_sound(&mut self, sound: &str, volume: f32);
}

/// Backend that only logs, used when no output device is wired up.
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioBackend for LogAudio {
    fn play_track(&mut self, track: &str, volume: f32) {
        log::debug!("audio: play '{track}' at {volume:.2}");
    }

    fn set_volume(&mut self, _track: &str, _volume: f32) {}

    fn stop_track(&mut self, track: &str) {
        log::debug!("audio: stop '{track}'");
    }

    fn play_sound(&mut self, sound: &str, volume: f32) {
        log::debug!("audio: sound '{sound}' at {volume:.2}");
    }
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    volume: f32,
    target: f32,
}

pub struct Music {
    config: MusicConfig,
    backend: Box<dyn AudioBackend>,
    tracks: HashMap<String, Fade>,
    current: Option<String>,
}

impl Music {
    pub fn new(config: MusicConfig, backend: Box<dyn AudioBackend>) -> Self {
        Self {
            config,
            backend,
            tracks: HashMap::new(),
            current: None,
        }
    }

    pub fn play_ambient(&mut self) {
        let track = self.config.ambient_track.clone();
        self.crossfade_to(&track);
    }

    pub fn play_cut_scene(&mut self) {
        let track = self.config.cut_scene_track.clone();
        self.crossfade_to(&track);
    }

    /// One-shot impact, louder the faster the box was moving.
    pub fn play_impact(&mut self, velocity: f32) {
        let full = self.config.impact_full_volume_speed.max(f32::EPSILON);
        let volume = (velocity / full).clamp(0.0, 1.0) * self.config.volume;
        self.backend.play_sound(&self.config.impact_sound, volume);
    }

    fn crossfade_to(&mut self, track: &str) {
        if self.current.as_deref() == Some(track) {
            return;
        }
        if let Some(previous) = self.current.take() {
            if let Some(fade) = self.tracks.get_mut(&previous) {
                fade.target = 0.0;
            }
        }

        let target = self.config.volume;
        match self.tracks.get_mut(track) {
            // Still fading out from an earlier swap; turn it back around.
            Some(fade) => fade.target = target,
            None => {
                self.backend.play_track(track, 0.0);
                self.tracks.insert(
                    track.to_string(),
                    Fade {
                        volume: 0.0,
                        target,
                    },
                );
            }
        }
        self.current = Some(track.to_string());
    }

    /// Moves every track toward its target volume. Tracks that reach silence
    /// are stopped.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let step = if self.config.fade_seconds > 0.0 {
            self.config.volume.max(f32::EPSILON) * dt / self.config.fade_seconds
        } else {
            f32::INFINITY
        };

        let mut silent = Vec::new();
        for (track, fade) in &mut self.tracks {
            if fade.volume == fade.target {
                continue;
            }
            fade.volume = if fade.volume < fade.target {
                (fade.volume + step).min(fade.target)
            } else {
                (fade.volume - step).max(fade.target)
            };
            self.backend.set_volume(track, fade.volume);
            if fade.volume <= 0.0 && fade.target <= 0.0 {
                silent.push(track.clone());
            }
        }
        for track in silent {
            self.tracks.remove(&track);
            self.backend.stop_track(&track);
        }
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn track_volume(&self, track: &str) -> Option<f32> {
        self.tracks.get(track).map(|f| f.volume)
    }

    pub fn stop_all(&mut self) {
        for (track, _) in self.tracks.drain() {
            self.backend.stop_track(&track);
        }
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(String),
        Stop(String),
        Sound(String, f32),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AudioBackend for Recorder {
        fn play_track(&mut self, track: &str, _volume: f32) {
            self.0.lock().unwrap().push(Call::Play(track.to_string()));
        }
        fn set_volume(&mut self, _track: &str, _volume: f32) {}
        fn stop_track(&mut self, track: &str) {
            self.0.lock().unwrap().push(Call::Stop(track.to_string()));
        }
        fn play_sound(&mut self, sound: &str, volume: f32) {
            self.0
                .lock()
                .unwrap()
                .push(Call::Sound(sound.to_string(), volume));
        }
    }

    fn music() -> (Music, Recorder) {
        let recorder = Recorder::default();
        let music = Music::new(MusicConfig::default(), Box::new(recorder.clone()));
        (music, recorder)
    }

    #[test]
    fn ambient_fades_in_to_configured_volume() {
        let (mut music, recorder) = music();
        music.play_ambient();
        assert_eq!(music.track_volume("ambient"), Some(0.0));

        music.update(0.5);
        assert!((music.track_volume("ambient").unwrap() - 0.25).abs() < 1e-5);
        music.update(1.0);
        assert_eq!(music.track_volume("ambient"), Some(0.5));
        assert_eq!(recorder.calls(), vec![Call::Play("ambient".into())]);
    }

    #[test]
    fn swapping_tracks_fades_the_old_one_out_and_stops_it() {
        let (mut music, recorder) = music();
        music.play_ambient();
        music.update(2.0);

        music.play_cut_scene();
        assert_eq!(music.current_track(), Some("cutScene"));
        music.update(2.0);

        assert_eq!(music.track_volume("ambient"), None);
        assert_eq!(music.track_volume("cutScene"), Some(0.5));
        assert!(recorder.calls().contains(&Call::Stop("ambient".into())));
    }

    #[test]
    fn replaying_the_current_track_is_a_no_op() {
        let (mut music, recorder) = music();
        music.play_ambient();
        music.play_ambient();
        assert_eq!(recorder.calls().len(), 1);
    }

    #[test]
    fn impact_volume_scales_with_speed() {
        let (mut music, recorder) = music();
        music.play_impact(4.0);
        music.play_impact(100.0);
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Sound("impact".into(), 0.25),
                Call::Sound("impact".into(), 0.5)
            ]
        );
    }
}
