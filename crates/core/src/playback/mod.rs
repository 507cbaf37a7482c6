//! Timer-paced replay of a normalized show.
//!
//! Playback moves through
//! `Idle -> Armed -> (EmitFrame <-> WaitTick)* -> Finalizing -> Done`.
//! A shutdown request is only acted on between frames, so a frame that has
//! started is always drawn in full.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};

use crate::{
    config::PlayerConfig,
    show::{Coordinate, Frame, Show},
    sink::{Beam, PlottingSink},
    Result,
};

/// Beam state for each coordinate of a frame, in order.
///
/// The first point is always a dark positioning move. Every later point is
/// drawn when the point before it carries color index 0, and travels dark
/// otherwise.
pub fn beam_states(coordinates: &[Coordinate]) -> impl Iterator<Item = Beam> + '_ {
    let first = coordinates.first().map(|_| Beam::Off);
    first.into_iter().chain(coordinates.windows(2).map(|pair| {
        if pair[0].color == 0 {
            Beam::On
        } else {
            Beam::Off
        }
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Armed,
    EmitFrame,
    WaitTick,
    Cancelled,
    Finalizing,
    Done,
}

/// Outcome of a call to [`PlaybackScheduler::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    pub frames_played: usize,
    pub points_plotted: usize,
    /// Playback stopped on a shutdown request with frames still left to play.
    pub cancelled: bool,
}

/// Cloneable pending-shutdown flag.
///
/// Requesting shutdown never interrupts a frame; the scheduler checks the flag
/// at frame boundaries and is woken early from its tick wait.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // notify_one stores a permit when nobody is waiting yet, so a request
        // landing between the flag check and the wait still wakes it.
        self.notify.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn requested(&self) {
        self.notify.notified().await;
    }

    /// Turns SIGINT, SIGTERM and SIGHUP into a shutdown request. Must be
    /// called from within a tokio runtime.
    ///
    /// The flag is set inside the signal handler itself, so a signal that
    /// lands mid-frame is seen at the next frame boundary even if the runtime
    /// never yields. The spawned task only wakes the tick wait.
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> Result<SignalGuard> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use tokio::signal::unix::{signal, SignalKind};

        let mut ids = Vec::with_capacity(3);
        for number in [SIGINT, SIGTERM, SIGHUP] {
            match signal_hook::flag::register(number, Arc::clone(&self.requested)) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    for id in ids {
                        signal_hook::low_level::unregister(id);
                    }
                    return Err(err.into());
                }
            }
        }

        let mut guard = SignalGuard { ids, task: None };
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;
        let handle = self.clone();

        guard.task = Some(tokio::spawn(async move {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = hangup.recv() => "SIGHUP",
            };
            tracing::info!(signal = name, "shutdown requested");
            handle.request();
        }));
        Ok(guard)
    }

    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> Result<SignalGuard> {
        let handle = self.clone();
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                handle.request();
            }
        });
        Ok(SignalGuard { task: Some(task) })
    }
}

/// Signal registrations made by [`ShutdownHandle::listen_for_signals`].
/// Dropping it unregisters them.
pub struct SignalGuard {
    #[cfg(unix)]
    ids: Vec<signal_hook::SigId>,
    task: Option<JoinHandle<()>>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            for id in self.ids.drain(..) {
                signal_hook::low_level::unregister(id);
            }
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Replays frames at a fixed interval.
#[derive(Debug)]
pub struct PlaybackScheduler {
    config: PlayerConfig,
    shutdown: ShutdownHandle,
    state: PlaybackState,
}

impl PlaybackScheduler {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownHandle::new(),
            state: PlaybackState::Idle,
        }
    }

    /// Handle that stops playback at the next frame boundary.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Plays every frame of `show` in order, then finalizes the sink. The
    /// show is dropped when playback ends.
    ///
    /// Once `initialize` has succeeded the sink is always finalized, even
    /// when playback fails; the playback error wins over a finalize error.
    pub async fn play<S: PlottingSink>(&mut self, show: Show, mut sink: S) -> Result<PlaybackReport> {
        sink.initialize()?;

        let outcome = self.arm_and_run(&show.frames, &mut sink).await;

        self.transition(PlaybackState::Finalizing);
        let finalized = sink.finalize();
        drop(show);
        self.transition(PlaybackState::Done);

        let report = outcome?;
        finalized?;

        tracing::info!(
            frames = report.frames_played,
            points = report.points_plotted,
            cancelled = report.cancelled,
            "playback finished"
        );
        Ok(report)
    }

    async fn arm_and_run<S: PlottingSink>(
        &mut self,
        frames: &[Frame],
        sink: &mut S,
    ) -> Result<PlaybackReport> {
        let period = self.config.frame_interval();
        // first tick one period out: frame zero is drawn right away
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let _signals = if self.config.handle_signals {
            Some(self.shutdown.listen_for_signals()?)
        } else {
            None
        };
        self.transition(PlaybackState::Armed);

        self.run(frames, sink, &mut ticker).await
    }

    async fn run<S: PlottingSink>(
        &mut self,
        frames: &[Frame],
        sink: &mut S,
        ticker: &mut Interval,
    ) -> Result<PlaybackReport> {
        let shutdown = self.shutdown.clone();
        let mut report = PlaybackReport::default();

        for frame in frames {
            if shutdown.is_requested() {
                self.transition(PlaybackState::Cancelled);
                report.cancelled = true;
                break;
            }

            self.transition(PlaybackState::EmitFrame);
            report.points_plotted += emit_frame(sink, frame)?;
            report.frames_played += 1;

            self.transition(PlaybackState::WaitTick);
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.requested() => {}
            }
        }

        Ok(report)
    }

    fn transition(&mut self, next: PlaybackState) {
        tracing::debug!(from = ?self.state, to = ?next, "playback state");
        self.state = next;
    }
}

fn emit_frame<S: PlottingSink>(sink: &mut S, frame: &Frame) -> Result<usize> {
    sink.begin_frame()?;
    for (coordinate, beam) in frame.coordinates.iter().zip(beam_states(&frame.coordinates)) {
        sink.plot(beam, coordinate.x, coordinate.y)?;
    }
    sink.flush()?;
    Ok(frame.coordinates.len())
}
