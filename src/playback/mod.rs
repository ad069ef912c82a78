//! Playback Scheduler
//!
//! Replays a discovery result frame by frame. `Playback::tick` is the state
//! machine (`Idle -> Playing -> Finished`); `Playback::run` drives it on a
//! [`FrameClock`], pausing the configured delay between frames.

pub mod sink;

pub use sink::{clear_display, RenderSink, TerminalSink};

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::discovery::{DiscoveryResult, RevisionRun};
use crate::timestamp;

/// Suspension point between frames
#[async_trait]
pub trait FrameClock: Send {
    async fn wait(&mut self, delay: Duration);
}

/// Clock backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl FrameClock for TokioClock {
    async fn wait(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub run_index: usize,
    pub within_run_offset: usize,
    pub frames_emitted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was written; `frame` is 1-based
    Frame { frame: usize },
    /// No run left to show; the tick will be retried after the same delay
    Stalled,
    /// Every frame has been shown
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames: usize,
    pub runs: usize,
    pub stalls: usize,
}

/// One playback over an ordered sequence of runs
#[derive(Debug, Clone)]
pub struct Playback<'a> {
    runs: &'a [RevisionRun],
    total: usize,
    frame_delay: Duration,
    state: PlaybackState,
}

impl<'a> Playback<'a> {
    pub fn new(result: &'a DiscoveryResult, frame_delay: Duration) -> Self {
        Self::from_runs(result.runs(), result.rev_total(), frame_delay)
    }

    /// Play `runs` as `total` frames
    pub fn from_runs(runs: &'a [RevisionRun], total: usize, frame_delay: Duration) -> Self {
        Self {
            runs,
            total,
            frame_delay,
            state: PlaybackState::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }

    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Advance one frame.
    ///
    /// A run's content is written on the first frame that shows it, so
    /// swapping to the next run happens in the same tick as its first frame.
    pub fn tick(&mut self, sink: &mut dyn RenderSink) -> TickOutcome {
        match self.state.phase {
            PlaybackPhase::Finished => return TickOutcome::Finished,
            PlaybackPhase::Idle => self.state.phase = PlaybackPhase::Playing,
            PlaybackPhase::Playing => {}
        }

        if self.state.frames_emitted >= self.total {
            self.state.phase = PlaybackPhase::Finished;
            return TickOutcome::Finished;
        }

        let Some(run) = self.runs.get(self.state.run_index) else {
            return TickOutcome::Stalled;
        };

        let offset = self.state.within_run_offset;
        if offset == 0 {
            sink.show_content(run.content());
        }
        if let Some(at) = run.occurrences().get(offset) {
            sink.show_date(&timestamp::date_label(*at));
        }

        self.state.frames_emitted += 1;
        let frame = self.state.frames_emitted;
        sink.show_frame(&format!("{} / {}", frame, self.total));

        self.state.within_run_offset += 1;
        if self.state.within_run_offset >= run.span() {
            self.state.run_index += 1;
            self.state.within_run_offset = 0;
        }

        if frame >= self.total {
            self.state.phase = PlaybackPhase::Finished;
            return TickOutcome::Finished;
        }
        TickOutcome::Frame { frame }
    }

    /// Play to the end. The returned future resolving is the completion
    /// signal; it resolves exactly once.
    pub async fn run(mut self, sink: &mut dyn RenderSink, clock: &mut dyn FrameClock) -> PlaybackReport {
        debug!(
            "Playing {} frames over {} runs at {:?} per frame",
            self.total,
            self.runs.len(),
            self.frame_delay
        );

        let mut stalls = 0usize;
        loop {
            match self.tick(sink) {
                TickOutcome::Finished => break,
                TickOutcome::Frame { .. } => {}
                TickOutcome::Stalled => {
                    stalls += 1;
                    warn!(
                        "Playback stalled at frame {} of {}: no run left to show",
                        self.state.frames_emitted, self.total
                    );
                }
            }
            clock.wait(self.frame_delay).await;
        }

        PlaybackReport {
            frames: self.state.frames_emitted,
            runs: self.state.run_index,
            stalls,
        }
    }
}
