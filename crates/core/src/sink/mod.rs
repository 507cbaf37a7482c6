//! Destinations for plot commands.
//!
//! The scheduler only ever talks to a [`PlottingSink`]. Calls are synchronous
//! and in order; a sink is free to buffer until [`PlottingSink::flush`].

mod tek;

pub use tek::TekSink;

use crate::Result;

/// Whether a move draws a visible segment or travels dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beam {
    Off,
    On,
}

impl Beam {
    pub fn is_on(self) -> bool {
        self == Beam::On
    }
}

pub trait PlottingSink {
    fn initialize(&mut self) -> Result<()>;

    /// Starts a new page; called once per frame before its first point.
    fn begin_frame(&mut self) -> Result<()>;

    fn plot(&mut self, beam: Beam, x: u16, y: u16) -> Result<()>;

    /// Pushes out anything buffered for the current frame.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<()>;
}

impl<S: PlottingSink + ?Sized> PlottingSink for &mut S {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn begin_frame(&mut self) -> Result<()> {
        (**self).begin_frame()
    }

    fn plot(&mut self, beam: Beam, x: u16, y: u16) -> Result<()> {
        (**self).plot(beam, x, y)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

/// One call made on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Initialize,
    BeginFrame,
    Plot { beam: Beam, x: u16, y: u16 },
    Flush,
    Finalize,
}

/// Sink that remembers every call, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plot commands grouped by the frame they were emitted in.
    pub fn frames(&self) -> Vec<Vec<(Beam, u16, u16)>> {
        let mut frames = Vec::new();
        for event in &self.events {
            match *event {
                SinkEvent::BeginFrame => frames.push(Vec::new()),
                SinkEvent::Plot { beam, x, y } => {
                    if let Some(current) = frames.last_mut() {
                        current.push((beam, x, y));
                    }
                }
                _ => {}
            }
        }
        frames
    }
}

impl PlottingSink for RecordingSink {
    fn initialize(&mut self) -> Result<()> {
        self.events.push(SinkEvent::Initialize);
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.events.push(SinkEvent::BeginFrame);
        Ok(())
    }

    fn plot(&mut self, beam: Beam, x: u16, y: u16) -> Result<()> {
        self.events.push(SinkEvent::Plot { beam, x, y });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.events.push(SinkEvent::Flush);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.events.push(SinkEvent::Finalize);
        Ok(())
    }
}

/// Headless sink that reports each command through `tracing` instead of
/// drawing it.
#[derive(Debug, Default)]
pub struct TraceSink {
    frame: usize,
}

impl TraceSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlottingSink for TraceSink {
    fn initialize(&mut self) -> Result<()> {
        tracing::debug!("trace sink ready");
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.frame += 1;
        tracing::debug!(frame = self.frame, "page");
        Ok(())
    }

    fn plot(&mut self, beam: Beam, x: u16, y: u16) -> Result<()> {
        tracing::trace!(frame = self.frame, on = beam.is_on(), x, y, "plot");
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        tracing::debug!(frames = self.frame, "trace sink done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_groups_plots_by_frame() {
        let mut sink = RecordingSink::new();
        sink.initialize().unwrap();
        sink.begin_frame().unwrap();
        sink.plot(Beam::Off, 1, 2).unwrap();
        sink.plot(Beam::On, 3, 4).unwrap();
        sink.flush().unwrap();
        sink.begin_frame().unwrap();
        sink.flush().unwrap();
        sink.finalize().unwrap();

        assert_eq!(
            sink.frames(),
            vec![vec![(Beam::Off, 1, 2), (Beam::On, 3, 4)], vec![]]
        );
        assert_eq!(sink.events.first(), Some(&SinkEvent::Initialize));
        assert_eq!(sink.events.last(), Some(&SinkEvent::Finalize));
    }

    #[test]
    fn forwards_through_mutable_reference() {
        fn drive<S: PlottingSink>(mut sink: S) {
            sink.begin_frame().unwrap();
            sink.plot(Beam::On, 5, 6).unwrap();
        }

        let mut inner = RecordingSink::new();
        drive(&mut inner);
        assert_eq!(inner.frames(), vec![vec![(Beam::On, 5, 6)]]);
    }
}
