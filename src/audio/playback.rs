use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::synth::{AudioSignal, Synthesizer};
use crate::error::PlaybackError;
use crate::render::frame::ProcessedFrame;

/// Source of "current time" in seconds.
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Real-time output that loops a buffer from a start offset.
pub trait AudioSink {
    fn start(&mut self, signal: Arc<AudioSignal>, offset: f64) -> Result<(), PlaybackError>;
    fn stop(&mut self);
}

/// Wall clock measured from construction.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl AudioClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn set(&self, t: f64) {
        if let Ok(mut time) = self.time.lock() {
            *time = t;
        }
    }

    pub fn advance(&self, dt: f64) {
        if let Ok(mut time) = self.time.lock() {
            *time += dt;
        }
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.time.lock().map(|t| *t).unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Start {
        offset: f64,
        sample_count: usize,
        sample_rate: u32,
    },
    Stop,
}

/// Sink that plays nothing and records what it was asked to do.
///
/// Used headless (no device) and by tests. Clones share the event log.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    current: Arc<Mutex<Option<Arc<AudioSignal>>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last_start(&self) -> Option<(f64, usize)> {
        self.events().iter().rev().find_map(|e| match e {
            SinkEvent::Start {
                offset,
                sample_count,
                ..
            } => Some((*offset, *sample_count)),
            SinkEvent::Stop => None,
        })
    }

    /// Signal currently "playing", if any.
    pub fn current(&self) -> Option<Arc<AudioSignal>> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

impl AudioSink for RecordingSink {
    fn start(&mut self, signal: Arc<AudioSignal>, offset: f64) -> Result<(), PlaybackError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(SinkEvent::Start {
                offset,
                sample_count: signal.samples.len(),
                sample_rate: signal.sample_rate,
            });
        }
        if let Ok(mut current) = self.current.lock() {
            *current = Some(signal);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut events) = self.events.lock() {
            events.push(SinkEvent::Stop);
        }
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Wrap `offset` into `[0, duration)`. Zero-length signals always start at 0.
pub fn wrap_offset(offset: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || !offset.is_finite() {
        return 0.0;
    }
    let wrapped = offset.rem_euclid(duration);
    if wrapped >= duration {
        0.0
    } else {
        wrapped
    }
}

/// The single playback session. Clock and sink are injected, so the same state
/// machine drives a device or a manual test clock.
pub struct PlaybackController<C: AudioClock, S: AudioSink> {
    clock: C,
    sink: S,
    synth: Synthesizer,
    state: PlaybackState,
    signal: Option<Arc<AudioSignal>>,
    start_clock_time: f64,
    paused_offset: f64,
}

impl<C: AudioClock, S: AudioSink> PlaybackController<C, S> {
    pub fn new(clock: C, sink: S, synth: Synthesizer) -> Self {
        Self {
            clock,
            sink,
            synth,
            state: PlaybackState::Stopped,
            signal: None,
            start_clock_time: 0.0,
            paused_offset: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn synth(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Signal handed to the sink most recently.
    pub fn signal(&self) -> Option<&Arc<AudioSignal>> {
        self.signal.as_ref()
    }

    pub fn duration(&self) -> f64 {
        self.signal.as_ref().map_or(0.0, |s| s.duration())
    }

    pub fn paused_offset(&self) -> f64 {
        self.paused_offset
    }

    /// Current position inside the looped buffer.
    pub fn position(&self) -> f64 {
        let raw = match self.state {
            PlaybackState::Playing => self.clock.now() - self.start_clock_time,
            PlaybackState::Stopped => self.paused_offset,
        };
        wrap_offset(raw, self.duration())
    }

    /// Stop any current output and start `frame`'s signal at `offset`.
    ///
    /// On sink failure the session ends up stopped with its stored offset intact.
    fn start_from(&mut self, offset: f64, frame: &ProcessedFrame) -> Result<(), PlaybackError> {
        if self.is_playing() {
            self.sink.stop();
            self.state = PlaybackState::Stopped;
        }

        let signal = self.synth.synthesize_shared(frame);
        let safe_offset = wrap_offset(offset, signal.duration());
        self.signal = Some(Arc::clone(&signal));
        self.paused_offset = safe_offset;

        if let Err(err) = self.sink.start(signal, safe_offset) {
            log::warn!("{}", err);
            return Err(err);
        }

        self.start_clock_time = self.clock.now() - safe_offset;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Stopped -> Playing, resuming from the stored offset.
    pub fn play(&mut self, frame: &ProcessedFrame) -> Result<(), PlaybackError> {
        if self.is_playing() {
            return Ok(());
        }
        self.start_from(self.paused_offset, frame)?;
        log::info!("Playing from {:.3}s of {:.3}s", self.position(), self.duration());
        Ok(())
    }

    /// Playing -> Stopped, remembering the elapsed position.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.sink.stop();
        self.paused_offset = self.clock.now() - self.start_clock_time;
        self.state = PlaybackState::Stopped;
        log::info!("Paused at {:.3}s", self.paused_offset);
    }

    pub fn toggle(&mut self, frame: &ProcessedFrame) -> Result<PlaybackState, PlaybackError> {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(frame)?;
        }
        Ok(self.state)
    }

    /// Replace the playing buffer with `frame`'s signal at the elapsed position.
    ///
    /// Returns `false` without touching the sink when nothing is playing.
    pub fn hot_swap(&mut self, frame: &ProcessedFrame) -> Result<bool, PlaybackError> {
        if !self.is_playing() {
            return Ok(false);
        }
        let elapsed = self.clock.now() - self.start_clock_time;
        self.start_from(elapsed, frame)?;
        log::info!("Hot-swapped signal at {:.3}s", self.position());
        Ok(true)
    }

    /// Jump to `t` (taken modulo the signal duration).
    pub fn seek(&mut self, t: f64, frame: &ProcessedFrame) -> Result<(), PlaybackError> {
        let duration = self.synth.duration_for(frame);
        let target = wrap_offset(t, duration);
        self.paused_offset = target;
        if self.is_playing() {
            self.start_from(target, frame)?;
        }
        log::info!("Seek to {:.3}s", target);
        Ok(())
    }

    /// Stop output and rewind; used when the source image is replaced.
    pub fn reset(&mut self) {
        if self.is_playing() {
            self.sink.stop();
        }
        self.state = PlaybackState::Stopped;
        self.signal = None;
        self.paused_offset = 0.0;
        self.start_clock_time = 0.0;
    }
}
