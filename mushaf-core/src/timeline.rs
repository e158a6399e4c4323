//! Playback clock and word highlighting.
//!
//! [`AudioTimeline`] is a pure state machine. The host media element reports
//! clock events (`on_tick`, `on_duration_known`, `on_ended`); user commands
//! (`play`, `pause`, `seek`, `play_word`) return a [`Transition`] listing the
//! [`MediaCommand`]s the host must apply and, for one-shot word playback, the
//! [`AutoStop`] it must schedule.
//!
//! Every playback command bumps a generation counter. Auto-stops and pending
//! word-audio fetches carry the generation they were issued under and are
//! ignored once it has moved on, so a superseded stop can never halt newer
//! playback.

use crate::error::CoreError;
use crate::model::{AudioTiming, AyahAudio, AyahNumber, RecitationId, SurahNumber, WordAudio, WordId};
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "mushaf::timeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Instruction for the host's media element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
    Load { url: String },
    Seek(Duration),
    Play,
    Pause,
}

/// A stop the host must fire after `after` has elapsed, unless cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoStop {
    pub generation: u64,
    pub after: Duration,
}

/// Side effects produced by a timeline transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub commands: Vec<MediaCommand>,
    pub auto_stop: Option<AutoStop>,
}

impl Transition {
    fn with_commands(commands: Vec<MediaCommand>) -> Self {
        Self {
            commands,
            auto_stop: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.auto_stop.is_none()
    }
}

/// Identifies one ayah's audio in one recitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AyahKey {
    pub surah: SurahNumber,
    pub ayah: AyahNumber,
    pub recitation_id: RecitationId,
}

impl std::fmt::Display for AyahKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} (recitation {})", self.surah, self.ayah, self.recitation_id)
    }
}

/// Sorted, non-overlapping word windows for one ayah.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AyahTimings {
    key: AyahKey,
    audio_url: String,
    windows: Vec<AudioTiming>,
}

impl AyahTimings {
    /// Normalise raw timings: sort by start, clip overlaps so the earlier
    /// window ends where the later begins, and drop empty windows.
    #[must_use]
    pub fn new(audio: AyahAudio) -> Self {
        let key = AyahKey {
            surah: audio.surah,
            ayah: audio.ayah,
            recitation_id: audio.recitation_id,
        };
        let mut windows = audio.word_timings;
        windows.sort_by_key(|w| w.start_time);

        let mut clipped = 0usize;
        for i in 1..windows.len() {
            let next_start = windows[i].start_time;
            let prev = &mut windows[i - 1];
            if prev.end_time > next_start {
                prev.end_time = next_start;
                clipped += 1;
            }
        }
        let before = windows.len();
        windows.retain(|w| w.end_time > w.start_time);

        if clipped > 0 || windows.len() != before {
            warn!(
                target: LOG_TARGET,
                "Normalised timings for {}: {} overlaps clipped, {} empty windows dropped",
                key,
                clipped,
                before - windows.len()
            );
        }

        Self {
            key,
            audio_url: audio.audio_url,
            windows,
        }
    }

    #[must_use]
    pub const fn key(&self) -> AyahKey {
        self.key
    }

    #[must_use]
    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }

    #[must_use]
    pub fn windows(&self) -> &[AudioTiming] {
        &self.windows
    }

    /// The window containing `position`, found by binary search.
    #[must_use]
    pub fn active_window(&self, position: Duration) -> Option<&AudioTiming> {
        active_window(&self.windows, position)
    }

    #[must_use]
    pub fn active_word(&self, position: Duration) -> Option<WordId> {
        self.active_window(position).map(|w| w.word_id)
    }
}

/// Last window starting at or before `position`, if it has not yet ended.
fn active_window(windows: &[AudioTiming], position: Duration) -> Option<&AudioTiming> {
    let idx = windows.partition_point(|w| w.start_time <= position);
    idx.checked_sub(1)
        .map(|i| &windows[i])
        .filter(|w| position < w.end_time)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum TimingSource {
    #[default]
    None,
    Loading { key: AyahKey, generation: u64 },
    Loaded(AyahTimings),
    Unavailable { key: AyahKey },
}

/// Ticket for an in-flight timing fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingLoad {
    pub key: AyahKey,
    pub load_generation: u64,
    /// Playback generation at issue time; autoplay only if still current.
    pub playback_generation: u64,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Transition),
    /// No timings for this ayah; highlighting stays off until another ayah loads.
    Unavailable(CoreError),
    Stale,
}

#[derive(Debug, Default)]
pub struct AudioTimeline {
    status: PlaybackStatus,
    position: Duration,
    duration: Option<Duration>,
    timings: TimingSource,
    clip: Option<AudioTiming>,
    /// A tick inside the clip window has been seen since it started
    clip_reached: bool,
    loaded_url: Option<String>,
    highlighted: Option<WordId>,
    generation: u64,
    load_generation: u64,
}

impl AudioTimeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn status(&self) -> PlaybackStatus {
        self.status
    }

    #[must_use]
    pub const fn position(&self) -> Duration {
        self.position
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    #[must_use]
    pub const fn highlighted_word_id(&self) -> Option<WordId> {
        self.highlighted
    }

    /// Current playback generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn timings(&self) -> Option<&AyahTimings> {
        match &self.timings {
            TimingSource::Loaded(timings) => Some(timings),
            _ => None,
        }
    }

    /// The ayah whose timings are loaded, loading, or known to be missing.
    #[must_use]
    pub fn current_key(&self) -> Option<AyahKey> {
        match &self.timings {
            TimingSource::None => None,
            TimingSource::Loading { key, .. } | TimingSource::Unavailable { key } => Some(*key),
            TimingSource::Loaded(timings) => Some(timings.key()),
        }
    }

    /// Whether the current ayah is known to have no timing data.
    #[must_use]
    pub fn timings_unavailable(&self) -> bool {
        matches!(self.timings, TimingSource::Unavailable { .. })
    }

    /// The word clip currently playing, if any.
    #[must_use]
    pub const fn word_clip(&self) -> Option<&AudioTiming> {
        self.clip.as_ref()
    }

    /// Invalidate pending auto-stops and word fetches.
    fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn derive_highlight(&self) -> Option<WordId> {
        if self.status == PlaybackStatus::Stopped {
            return None;
        }
        if let Some(clip) = &self.clip {
            return clip.contains(self.position).then_some(clip.word_id);
        }
        // Ayah windows only describe the recording they were loaded with
        self.timings()
            .filter(|timings| self.loaded_url.as_deref() == Some(timings.audio_url()))
            .and_then(|timings| timings.active_word(self.position))
    }

    fn refresh_highlight(&mut self) {
        self.highlighted = self.derive_highlight();
    }

    fn stop(&mut self) -> Transition {
        let was_running = self.status != PlaybackStatus::Stopped;
        self.status = PlaybackStatus::Stopped;
        self.clip = None;
        self.highlighted = None;
        if was_running {
            Transition::with_commands(vec![MediaCommand::Pause])
        } else {
            Transition::default()
        }
    }

    /// Drop the current highlight until the next clock event re-derives it.
    pub fn clear_highlight(&mut self) {
        self.highlighted = None;
    }

    // Clock events

    /// Periodic clock update from the media element.
    ///
    /// While a word clip has not yet been reached, ticks outside its window
    /// were taken before the seek to its start and are ignored.
    pub fn on_tick(&mut self, position: Duration) -> Transition {
        if let Some(clip) = self.clip.filter(|_| !self.clip_reached) {
            if !clip.contains(position) {
                debug!(
                    target: LOG_TARGET,
                    "Ignoring tick at {:?} outside word clip {:?}..{:?}",
                    position,
                    clip.start_time,
                    clip.end_time
                );
                return Transition::default();
            }
            self.clip_reached = true;
        }
        self.position = position;
        if self
            .clip
            .is_some_and(|clip| self.status == PlaybackStatus::Playing && position >= clip.end_time)
        {
            debug!(target: LOG_TARGET, "Word clip reached its end at {:?}", position);
            self.bump_generation();
            return self.stop();
        }
        self.refresh_highlight();
        Transition::default()
    }

    pub fn on_duration_known(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    /// The media element reached the end of its source.
    pub fn on_ended(&mut self) {
        if let Some(duration) = self.duration {
            self.position = duration;
        }
        if self.status == PlaybackStatus::Playing {
            self.bump_generation();
            self.status = PlaybackStatus::Stopped;
            self.clip = None;
        }
        self.highlighted = None;
    }

    // Timing loads

    /// Discard the current ayah's timings and start loading `key`.
    pub fn begin_load(&mut self, key: AyahKey) -> (TimingLoad, Transition) {
        let transition = self.stop();
        self.bump_generation();
        self.load_generation += 1;
        self.position = Duration::ZERO;
        self.duration = None;
        self.timings = TimingSource::Loading {
            key,
            generation: self.load_generation,
        };
        debug!(target: LOG_TARGET, "Loading timings for {}", key);
        (
            TimingLoad {
                key,
                load_generation: self.load_generation,
                playback_generation: self.generation,
            },
            transition,
        )
    }

    /// Apply the answer to [`begin_load`](Self::begin_load).
    pub fn finish_load(&mut self, load: TimingLoad, result: Result<AyahAudio, CoreError>) -> LoadOutcome {
        let current = matches!(
            &self.timings,
            TimingSource::Loading { generation, .. } if *generation == load.load_generation
        );
        if !current {
            debug!(target: LOG_TARGET, "Ignoring stale timings for {}", load.key);
            return LoadOutcome::Stale;
        }

        match result {
            Ok(audio) => {
                let timings = AyahTimings::new(audio);
                info!(
                    target: LOG_TARGET,
                    "Loaded {} word timings for {}",
                    timings.windows().len(),
                    load.key
                );
                let url = timings.audio_url().to_string();
                self.timings = TimingSource::Loaded(timings);
                self.loaded_url = Some(url.clone());
                LoadOutcome::Loaded(Transition::with_commands(vec![MediaCommand::Load { url }]))
            }
            Err(error) => {
                warn!(target: LOG_TARGET, "Timings for {} unavailable: {}", load.key, error);
                self.timings = TimingSource::Unavailable { key: load.key };
                self.loaded_url = None;
                self.highlighted = None;
                LoadOutcome::Unavailable(error)
            }
        }
    }

    // Playback commands

    /// Start or resume playback from the current position.
    pub fn play(&mut self) -> Transition {
        if self.loaded_url.is_none() {
            debug!(target: LOG_TARGET, "Nothing loaded to play");
            return Transition::default();
        }
        if self.status == PlaybackStatus::Playing {
            return Transition::default();
        }
        let generation = self.bump_generation();
        let mut commands = Vec::with_capacity(2);
        if self.status == PlaybackStatus::Stopped
            && self.duration.is_some_and(|duration| self.position >= duration)
        {
            debug!(target: LOG_TARGET, "Rewinding finished source");
            self.position = Duration::ZERO;
            commands.push(MediaCommand::Seek(Duration::ZERO));
        }
        commands.push(MediaCommand::Play);
        self.status = PlaybackStatus::Playing;
        self.refresh_highlight();

        // Resuming a paused word clip re-arms its stop for the remaining time
        let auto_stop = self.clip.map(|clip| AutoStop {
            generation,
            after: clip.end_time.saturating_sub(self.position),
        });
        Transition {
            commands,
            auto_stop,
        }
    }

    pub fn pause(&mut self) -> Transition {
        if self.status != PlaybackStatus::Playing {
            return Transition::default();
        }
        self.bump_generation();
        self.status = PlaybackStatus::Paused;
        Transition::with_commands(vec![MediaCommand::Pause])
    }

    /// `Playing -> Paused`, otherwise start playing.
    pub fn toggle_play_pause(&mut self) -> Transition {
        match self.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused | PlaybackStatus::Stopped => self.play(),
        }
    }

    /// Move the clock. Abandons any one-shot word clip.
    pub fn seek(&mut self, position: Duration) -> Transition {
        self.bump_generation();
        self.clip = None;
        self.position = self.duration.map_or(position, |d| position.min(d));
        self.refresh_highlight();
        Transition::with_commands(vec![MediaCommand::Seek(self.position)])
    }

    /// Reserve a generation for a word-audio fetch, cancelling earlier playback commands.
    pub fn begin_word(&mut self) -> u64 {
        self.bump_generation()
    }

    /// Start one-shot playback of a word fetched under `generation`.
    ///
    /// Returns `None` if another command superseded the fetch.
    pub fn play_word(&mut self, generation: u64, audio: &WordAudio) -> Option<Transition> {
        if generation != self.generation {
            debug!(target: LOG_TARGET, "Ignoring superseded word audio for {}", audio.word_id);
            return None;
        }
        let timing = audio.timing();
        if timing.duration().is_zero() {
            warn!(target: LOG_TARGET, "Word {} has an empty audio window", audio.word_id);
            return Some(Transition::default());
        }

        let generation = self.bump_generation();
        let mut commands = Vec::with_capacity(3);
        if self.loaded_url.as_deref() != Some(audio.audio_url.as_str()) {
            commands.push(MediaCommand::Load {
                url: audio.audio_url.clone(),
            });
            self.loaded_url = Some(audio.audio_url.clone());
            self.duration = None;
        }
        commands.push(MediaCommand::Seek(timing.start_time));
        commands.push(MediaCommand::Play);

        self.clip = Some(timing);
        self.clip_reached = false;
        self.position = timing.start_time;
        self.status = PlaybackStatus::Playing;
        self.refresh_highlight();

        Some(Transition {
            commands,
            auto_stop: Some(AutoStop {
                generation,
                after: timing.duration(),
            }),
        })
    }

    /// A scheduled auto-stop fired. Only the current generation may stop playback.
    pub fn auto_stop(&mut self, generation: u64) -> Transition {
        if generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Ignoring cancelled auto-stop (generation {}, current {})", generation, self.generation
            );
            return Transition::default();
        }
        self.bump_generation();
        self.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AyahKey {
        AyahKey {
            surah: 1,
            ayah: 1,
            recitation_id: 7,
        }
    }

    fn timing(word_id: WordId, start: u64, end: u64) -> AudioTiming {
        AudioTiming {
            word_id,
            start_time: Duration::from_millis(start),
            end_time: Duration::from_millis(end),
        }
    }

    fn ayah_audio(word_timings: Vec<AudioTiming>) -> AyahAudio {
        AyahAudio {
            surah: 1,
            ayah: 1,
            recitation_id: 7,
            audio_url: "https://audio.example/001001.mp3".into(),
            word_timings,
        }
    }

    fn word_audio(word_id: WordId, start: u64, end: u64) -> WordAudio {
        WordAudio {
            word_id,
            audio_url: "https://audio.example/001001.mp3".into(),
            start_time: Duration::from_millis(start),
            end_time: Duration::from_millis(end),
        }
    }

    fn loaded_timeline(word_timings: Vec<AudioTiming>) -> AudioTimeline {
        let mut timeline = AudioTimeline::new();
        let (load, _) = timeline.begin_load(key());
        let outcome = timeline.finish_load(load, Ok(ayah_audio(word_timings)));
        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
        timeline
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_normalise_sorts_clips_and_drops_empty() {
        let timings = AyahTimings::new(ayah_audio(vec![
            timing(3, 600, 900),
            timing(1, 0, 350),
            timing(2, 300, 600),
            timing(4, 900, 900),
        ]));
        assert_eq!(
            timings.windows(),
            &[timing(1, 0, 300), timing(2, 300, 600), timing(3, 600, 900)]
        );
    }

    #[test]
    fn test_active_word_binary_search() {
        let windows: Vec<_> = (0..500u32)
            .map(|i| timing(1000 + i, u64::from(i) * 100, u64::from(i) * 100 + 80))
            .collect();
        let timings = AyahTimings::new(ayah_audio(windows));

        assert_eq!(timings.active_word(ms(0)), Some(1000));
        assert_eq!(timings.active_word(ms(79)), Some(1000));
        assert_eq!(timings.active_word(ms(80)), None);
        assert_eq!(timings.active_word(ms(100)), Some(1001));
        assert_eq!(timings.active_word(ms(49_950)), Some(1499));
        assert_eq!(timings.active_word(ms(60_000)), None);
    }

    #[test]
    fn test_at_most_one_window_highlighted() {
        let windows = vec![
            timing(10, 0, 250),
            timing(11, 250, 500),
            timing(12, 620, 900),
            timing(13, 900, 1200),
        ];
        let mut timeline = loaded_timeline(windows.clone());
        timeline.play();

        for t in 0..1300 {
            timeline.on_tick(ms(t));
            let containing: Vec<_> = windows.iter().filter(|w| w.contains(ms(t))).collect();
            assert!(containing.len() <= 1);
            match timeline.highlighted_word_id() {
                Some(id) => assert_eq!(containing[0].word_id, id, "t={t}"),
                None => assert!(containing.is_empty(), "t={t}"),
            }
        }
    }

    #[test]
    fn test_highlight_requires_playback() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500)]);
        timeline.on_tick(ms(100));
        assert_eq!(timeline.highlighted_word_id(), None);

        assert_eq!(timeline.play().commands, vec![MediaCommand::Play]);
        timeline.on_tick(ms(150));
        assert_eq!(timeline.highlighted_word_id(), Some(10));

        // Paused keeps the word that was being read
        assert_eq!(timeline.pause().commands, vec![MediaCommand::Pause]);
        assert_eq!(timeline.status(), PlaybackStatus::Paused);
        assert_eq!(timeline.highlighted_word_id(), Some(10));
    }

    #[test]
    fn test_toggle_play_pause() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500)]);
        timeline.toggle_play_pause();
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
        timeline.toggle_play_pause();
        assert_eq!(timeline.status(), PlaybackStatus::Paused);
        timeline.toggle_play_pause();
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_play_without_source_is_noop() {
        let mut timeline = AudioTimeline::new();
        assert!(timeline.play().is_empty());
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_ended_stops_and_clears_highlight() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500), timing(11, 500, 1000)]);
        timeline.on_duration_known(ms(1000));
        timeline.play();
        timeline.on_tick(ms(600));
        assert_eq!(timeline.highlighted_word_id(), Some(11));

        timeline.on_ended();
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
        assert_eq!(timeline.highlighted_word_id(), None);
        assert_eq!(timeline.position(), ms(1000));
    }

    #[test]
    fn test_unavailable_timings_never_highlight() {
        let mut timeline = AudioTimeline::new();
        let (load, _) = timeline.begin_load(key());
        let outcome = timeline.finish_load(
            load,
            Err(CoreError::TimingUnavailable {
                surah: 1,
                ayah: 1,
                recitation_id: 7,
            }),
        );
        assert!(matches!(outcome, LoadOutcome::Unavailable(_)));
        assert!(timeline.timings_unavailable());

        timeline.play();
        for t in (0..2000).step_by(50) {
            timeline.on_tick(ms(t));
            assert_eq!(timeline.highlighted_word_id(), None);
        }
    }

    #[test]
    fn test_stale_timing_load_ignored() {
        let mut timeline = AudioTimeline::new();
        let (first, _) = timeline.begin_load(key());
        let second_key = AyahKey { ayah: 2, ..key() };
        let (second, _) = timeline.begin_load(second_key);

        assert!(matches!(
            timeline.finish_load(first, Ok(ayah_audio(vec![timing(1, 0, 100)]))),
            LoadOutcome::Stale
        ));
        assert!(timeline.timings().is_none());

        let mut audio = ayah_audio(vec![timing(8, 0, 100)]);
        audio.ayah = 2;
        assert!(matches!(timeline.finish_load(second, Ok(audio)), LoadOutcome::Loaded(_)));
        assert_eq!(timeline.timings().unwrap().key(), second_key);
    }

    #[test]
    fn test_new_load_discards_previous_timings() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500)]);
        timeline.play();
        timeline.on_tick(ms(100));
        assert_eq!(timeline.highlighted_word_id(), Some(10));

        let (_, transition) = timeline.begin_load(AyahKey { ayah: 2, ..key() });
        assert_eq!(transition.commands, vec![MediaCommand::Pause]);
        assert!(timeline.timings().is_none());
        assert_eq!(timeline.highlighted_word_id(), None);
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_play_word_schedules_auto_stop() {
        let mut timeline = AudioTimeline::new();
        let generation = timeline.begin_word();
        let transition = timeline
            .play_word(generation, &word_audio(42, 1200, 1650))
            .unwrap();

        assert_eq!(
            transition.commands,
            vec![
                MediaCommand::Load {
                    url: "https://audio.example/001001.mp3".into()
                },
                MediaCommand::Seek(ms(1200)),
                MediaCommand::Play,
            ]
        );
        let auto_stop = transition.auto_stop.unwrap();
        assert_eq!(auto_stop.after, ms(450));
        assert_eq!(timeline.highlighted_word_id(), Some(42));

        let stop = timeline.auto_stop(auto_stop.generation);
        assert_eq!(stop.commands, vec![MediaCommand::Pause]);
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
        assert_eq!(timeline.highlighted_word_id(), None);
    }

    #[test]
    fn test_play_word_cancelled_by_newer_word() {
        let mut timeline = AudioTimeline::new();
        let first_gen = timeline.begin_word();
        let first = timeline
            .play_word(first_gen, &word_audio(42, 1200, 1650))
            .unwrap()
            .auto_stop
            .unwrap();

        let second_gen = timeline.begin_word();
        let second = timeline
            .play_word(second_gen, &word_audio(43, 1650, 2400))
            .unwrap()
            .auto_stop
            .unwrap();

        // The first word's stop fires against the second word's playback
        assert!(timeline.auto_stop(first.generation).is_empty());
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
        assert_eq!(timeline.highlighted_word_id(), Some(43));

        assert!(!timeline.auto_stop(second.generation).is_empty());
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_superseded_word_fetch_is_dropped() {
        let mut timeline = AudioTimeline::new();
        let stale = timeline.begin_word();
        let fresh = timeline.begin_word();
        assert!(timeline.play_word(stale, &word_audio(1, 0, 100)).is_none());
        assert!(timeline.play_word(fresh, &word_audio(2, 0, 100)).is_some());
    }

    #[test]
    fn test_tick_past_clip_end_stops() {
        let mut timeline = AudioTimeline::new();
        let generation = timeline.begin_word();
        let auto_stop = timeline
            .play_word(generation, &word_audio(42, 1000, 1300))
            .unwrap()
            .auto_stop
            .unwrap();

        assert!(timeline.on_tick(ms(1299)).is_empty());
        assert_eq!(timeline.highlighted_word_id(), Some(42));

        let transition = timeline.on_tick(ms(1300));
        assert_eq!(transition.commands, vec![MediaCommand::Pause]);
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
        // The timer firing afterwards is a no-op
        assert!(timeline.auto_stop(auto_stop.generation).is_empty());
    }

    #[test]
    fn test_pause_and_resume_word_rearms_remaining_stop() {
        let mut timeline = AudioTimeline::new();
        let generation = timeline.begin_word();
        let original = timeline
            .play_word(generation, &word_audio(42, 1000, 1500))
            .unwrap()
            .auto_stop
            .unwrap();

        timeline.on_tick(ms(1200));
        timeline.pause();
        assert!(timeline.auto_stop(original.generation).is_empty());
        assert_eq!(timeline.status(), PlaybackStatus::Paused);

        let resumed = timeline.play().auto_stop.unwrap();
        assert_eq!(resumed.after, ms(300));
    }

    #[test]
    fn test_seek_rederives_highlight_and_drops_clip() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500), timing(11, 500, 1000)]);
        timeline.on_duration_known(ms(1000));
        timeline.play();

        let transition = timeline.seek(ms(700));
        assert_eq!(transition.commands, vec![MediaCommand::Seek(ms(700))]);
        assert_eq!(timeline.highlighted_word_id(), Some(11));

        // Seeks clamp to the known duration
        timeline.seek(ms(5000));
        assert_eq!(timeline.position(), ms(1000));
        assert_eq!(timeline.highlighted_word_id(), None);
    }

    #[test]
    fn test_play_word_reuses_loaded_source() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500)]);
        let generation = timeline.begin_word();
        let transition = timeline
            .play_word(generation, &word_audio(10, 0, 500))
            .unwrap();
        assert_eq!(
            transition.commands,
            vec![MediaCommand::Seek(Duration::ZERO), MediaCommand::Play]
        );
    }

    #[test]
    fn test_tick_taken_before_word_seek_is_ignored() {
        let mut timeline = AudioTimeline::new();
        let generation = timeline.begin_word();
        timeline.play_word(generation, &word_audio(10, 1000, 1400));
        timeline.on_tick(ms(1300));
        assert_eq!(timeline.highlighted_word_id(), Some(10));

        let generation = timeline.begin_word();
        timeline.play_word(generation, &word_audio(3, 300, 700));

        // Queued by the media element before it applied the seek to 300
        assert!(timeline.on_tick(ms(1350)).is_empty());
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
        assert_eq!(timeline.position(), ms(300));
        assert_eq!(timeline.highlighted_word_id(), Some(3));

        assert!(timeline.on_tick(ms(400)).is_empty());
        assert_eq!(timeline.highlighted_word_id(), Some(3));

        // Once the clip is reached its end stops playback as usual
        let transition = timeline.on_tick(ms(700));
        assert_eq!(transition.commands, vec![MediaCommand::Pause]);
        assert_eq!(timeline.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_ayah_windows_ignored_while_other_recording_loaded() {
        let mut timeline = loaded_timeline(vec![timing(2, 0, 500), timing(3, 500, 1000)]);
        timeline.on_duration_known(ms(1000));
        timeline.play();
        timeline.pause();

        let generation = timeline.begin_word();
        let clip = WordAudio {
            audio_url: "https://audio.example/words.mp3".into(),
            ..word_audio(2, 200, 600)
        };
        let transition = timeline.play_word(generation, &clip).unwrap();
        assert_eq!(
            transition.commands[0],
            MediaCommand::Load {
                url: "https://audio.example/words.mp3".into()
            }
        );
        assert_eq!(timeline.duration(), None);
        timeline.auto_stop(transition.auto_stop.unwrap().generation);

        // Resuming plays words.mp3, which the ayah windows do not describe
        assert_eq!(timeline.toggle_play_pause().commands, vec![MediaCommand::Play]);
        timeline.on_tick(ms(600));
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
        assert_eq!(timeline.highlighted_word_id(), None);
    }

    #[test]
    fn test_play_after_end_rewinds() {
        let mut timeline = loaded_timeline(vec![timing(10, 0, 500)]);
        timeline.on_duration_known(ms(1000));
        timeline.play();
        timeline.on_tick(ms(900));
        timeline.on_ended();
        assert_eq!(timeline.position(), ms(1000));

        let transition = timeline.play();
        assert_eq!(
            transition.commands,
            vec![MediaCommand::Seek(Duration::ZERO), MediaCommand::Play]
        );
        assert_eq!(timeline.position(), Duration::ZERO);
        assert_eq!(timeline.status(), PlaybackStatus::Playing);
        assert_eq!(timeline.highlighted_word_id(), Some(10));

        // Resuming mid-source does not rewind
        timeline.on_tick(ms(300));
        timeline.pause();
        assert_eq!(timeline.play().commands, vec![MediaCommand::Play]);
    }
}
