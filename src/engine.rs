use std::sync::Arc;

use crate::audio::playback::{AudioClock, AudioSink, PlaybackController, PlaybackState};
use crate::audio::synth::{duration_of, AudioSignal, Synthesizer};
use crate::encode::wav::encode_wav;
use crate::error::EngineError;
use crate::params::GlitchParams;
use crate::render::frame::{ProcessedFrame, SourceFrame, SPECTROGRAM_SIZE};
use crate::render::pipeline;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Ready,
}

pub struct GlitchEngine<C: AudioClock, S: AudioSink> {
    source: Option<Arc<SourceFrame>>,
    processed: Option<ProcessedFrame>,
    spectrogram: [u8; SPECTROGRAM_SIZE],
    params: GlitchParams,
    playback: PlaybackController<C, S>,
}

impl<C: AudioClock, S: AudioSink> GlitchEngine<C, S> {
    pub fn new(clock: C, sink: S, synth: Synthesizer) -> Self {
        Self {
            source: None,
            processed: None,
            spectrogram: [0; SPECTROGRAM_SIZE],
            params: GlitchParams::neutral(),
            playback: PlaybackController::new(clock, sink, synth),
        }
    }

    pub fn status(&self) -> EngineStatus {
        if self.processed.is_some() {
            EngineStatus::Ready
        } else {
            EngineStatus::Idle
        }
    }

    /// Replace the source. Stops playback, rewinds, and renders it unmodified.
    pub fn load_source(&mut self, source: SourceFrame) {
        self.playback.reset();
        let duration = duration_of(source.pixel_count() * 3, self.playback.synth().sample_rate());
        log::info!(
            "Loaded {}x{} source, duration {:.2}s",
            source.width(),
            source.height(),
            duration
        );
        let source = Arc::new(source);
        self.params = GlitchParams::neutral();
        let frame = pipeline::run(&source, &self.params);
        self.install(frame);
        self.source = Some(source);
    }

    fn install(&mut self, frame: ProcessedFrame) {
        self.spectrogram = frame.spectrogram();
        self.processed = Some(frame);
    }

    /// Re-run the full pipeline and hot-swap audio if it is playing.
    ///
    /// The new frame is kept even when the hot-swap fails; the playback error is
    /// returned for the caller to surface.
    pub fn reprocess(&mut self, params: &GlitchParams) -> Result<&ProcessedFrame, EngineError> {
        let source = self.source.clone().ok_or(EngineError::NotReady)?;
        let params = params.sanitized();
        let frame = pipeline::run(&source, &params);
        self.apply(params, frame)
    }

    /// Install a frame computed elsewhere (e.g. on the scheduler thread).
    pub fn apply(
        &mut self,
        params: GlitchParams,
        frame: ProcessedFrame,
    ) -> Result<&ProcessedFrame, EngineError> {
        let source = self.source.as_ref().ok_or(EngineError::NotReady)?;
        if (frame.width, frame.height) != (source.width(), source.height()) {
            return Err(EngineError::InvalidFrame {
                width: source.width(),
                height: source.height(),
                expected: source.pixel_count() * 4,
                actual: frame.pixels.len(),
            });
        }
        self.params = params;
        self.install(frame);
        let frame = self.processed.as_ref().ok_or(EngineError::NotReady)?;
        self.playback.hot_swap(frame)?;
        Ok(frame)
    }

    pub fn toggle_playback(&mut self) -> Result<PlaybackState, EngineError> {
        let frame = self.processed.as_ref().ok_or(EngineError::NotReady)?;
        Ok(self.playback.toggle(frame)?)
    }

    pub fn seek(&mut self, t: f64) -> Result<(), EngineError> {
        let frame = self.processed.as_ref().ok_or(EngineError::NotReady)?;
        Ok(self.playback.seek(t, frame)?)
    }

    /// Playback position in seconds, looping.
    pub fn current_time(&self) -> f64 {
        self.playback.position()
    }

    /// Duration of the current frame's signal.
    pub fn duration(&self) -> f64 {
        self.processed
            .as_ref()
            .map_or(0.0, |f| self.playback.synth().duration_for(f))
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn source(&self) -> Option<&Arc<SourceFrame>> {
        self.source.as_ref()
    }

    pub fn processed(&self) -> Option<&ProcessedFrame> {
        self.processed.as_ref()
    }

    pub fn params(&self) -> &GlitchParams {
        &self.params
    }

    pub fn spectrogram(&self) -> &[u8; SPECTROGRAM_SIZE] {
        &self.spectrogram
    }

    pub fn signal(&self) -> Result<AudioSignal, EngineError> {
        let frame = self.processed.as_ref().ok_or(EngineError::NotReady)?;
        Ok(self.playback.synth().synthesize(frame))
    }

    pub fn export_wav(&self) -> Result<Vec<u8>, EngineError> {
        let signal = self.signal()?;
        Ok(encode_wav(&signal.samples, signal.sample_rate)?)
    }

    pub fn playback(&self) -> &PlaybackController<C, S> {
        &self.playback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::{ManualClock, RecordingSink, SinkEvent};
    use crate::error::PlaybackError;

    fn source(width: u32, height: u32) -> SourceFrame {
        let pixels = (0..width * height * 4).map(|i| (i * 31 % 256) as u8).collect();
        SourceFrame::new(width, height, pixels).unwrap()
    }

    fn engine() -> (GlitchEngine<ManualClock, RecordingSink>, ManualClock, RecordingSink) {
        let clock = ManualClock::default();
        let sink = RecordingSink::default();
        let engine = GlitchEngine::new(clock.clone(), sink.clone(), Synthesizer::new(44_100, 0.5));
        (engine, clock, sink)
    }

    fn glitch(seed: &str) -> GlitchParams {
        GlitchParams {
            displacement: 0.9,
            noise: 0.4,
            seed: seed.into(),
            bloom_intensity: 0.8,
            ..Default::default()
        }
    }

    #[test]
    fn refuses_to_run_without_source() {
        let (mut engine, _, _) = engine();
        assert_eq!(engine.status(), EngineStatus::Idle);
        assert!(matches!(engine.reprocess(&glitch("a")), Err(EngineError::NotReady)));
        assert!(matches!(engine.toggle_playback(), Err(EngineError::NotReady)));
        assert!(matches!(engine.export_wav(), Err(EngineError::NotReady)));
    }

    #[test]
    fn load_renders_identity() {
        let (mut engine, _, _) = engine();
        let src = source(6, 4);
        engine.load_source(src.clone());
        assert_eq!(engine.status(), EngineStatus::Ready);
        let out = engine.processed().unwrap();
        for (s, o) in src.pixels().chunks(4).zip(out.pixels.chunks(4)) {
            assert_eq!(&s[..3], &o[..3]);
            assert_eq!(o[3], 255);
        }
        assert_eq!(engine.spectrogram()[0], src.pixels()[0]);
        assert_eq!(engine.duration(), 72.0 / 44_100.0);
    }

    #[test]
    fn reprocess_is_deterministic_for_a_seed() {
        let (mut engine, _, _) = engine();
        engine.load_source(source(20, 12));
        let a = engine.reprocess(&glitch("s")).unwrap().clone();
        let wav_a = engine.export_wav().unwrap();
        let b = engine.reprocess(&glitch("s")).unwrap().clone();
        let wav_b = engine.export_wav().unwrap();
        assert_eq!(a, b);
        assert_eq!(wav_a, wav_b);
        assert_eq!(engine.signal().unwrap().samples.len(), 3 * 20 * 12);
    }

    #[test]
    fn parameter_change_hot_swaps_at_elapsed_offset() {
        let (mut engine, clock, sink) = engine();
        engine.load_source(source(100, 100));
        engine.toggle_playback().unwrap();
        assert!(engine.is_playing());

        clock.advance(0.125);
        engine.reprocess(&glitch("swap")).unwrap();

        let (offset, _) = sink.last_start().unwrap();
        assert!((offset - 0.125).abs() < 1e-9);
        assert!(engine.is_playing());
        let playing = sink.current().unwrap();
        assert_eq!(*playing, engine.signal().unwrap());
    }

    #[test]
    fn new_source_stops_playback() {
        let (mut engine, clock, sink) = engine();
        engine.load_source(source(10, 10));
        engine.toggle_playback().unwrap();
        clock.advance(0.001);
        engine.load_source(source(4, 4));
        assert!(!engine.is_playing());
        assert_eq!(sink.events().last(), Some(&SinkEvent::Stop));
        assert_eq!(engine.current_time(), 0.0);
    }

    #[test]
    fn rejects_frame_of_wrong_size() {
        let (mut engine, _, _) = engine();
        engine.load_source(source(4, 4));
        let err = engine
            .apply(GlitchParams::neutral(), ProcessedFrame::blank(2, 2))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidFrame { .. }));
        assert_eq!(engine.processed().unwrap().width, 4);
    }

    struct DeadSink;

    impl AudioSink for DeadSink {
        fn start(&mut self, _: Arc<AudioSignal>, _: f64) -> Result<(), PlaybackError> {
            Err(PlaybackError::Unavailable("context suspended".into()))
        }
        fn stop(&mut self) {}
    }

    #[test]
    fn playback_failure_keeps_pipeline_usable() {
        let mut engine =
            GlitchEngine::new(ManualClock::default(), DeadSink, Synthesizer::default());
        engine.load_source(source(8, 8));
        assert!(matches!(engine.toggle_playback(), Err(EngineError::Playback(_))));
        assert!(engine.reprocess(&glitch("still works")).is_ok());
        assert_eq!(engine.export_wav().unwrap().len(), 44 + 3 * 64 * 2);
    }
}
