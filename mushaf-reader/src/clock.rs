//! Simulated media element.
//!
//! The navigator issues [`MediaCommand`]s through [`ClockMedia`]; the
//! [`MediaClock`] task turns them into the clock events a real audio element
//! would report: a duration once a source loads, a position update every tick
//! while playing, and an end-of-source notification.

use mushaf_core::{MediaCommand, MediaOutput, NavigatorHandle, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "mushaf::clock";

/// Receiver of the clock's events.
pub trait ClockListener {
    /// # Errors
    ///
    /// Returns an error once the receiver has gone away.
    fn tick(&self, position: Duration) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error once the receiver has gone away.
    fn duration_known(&self, duration: Duration) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error once the receiver has gone away.
    fn ended(&self) -> Result<()>;
}

impl ClockListener for NavigatorHandle {
    fn tick(&self, position: Duration) -> Result<()> {
        Self::tick(self, position)
    }

    fn duration_known(&self, duration: Duration) -> Result<()> {
        Self::duration_known(self, duration)
    }

    fn ended(&self) -> Result<()> {
        Self::ended(self)
    }
}

/// [`MediaOutput`] half: forwards commands to the clock task without blocking.
pub struct ClockMedia {
    tx: mpsc::UnboundedSender<MediaCommand>,
}

impl ClockMedia {
    fn send(&self, command: MediaCommand) {
        if self.tx.send(command).is_err() {
            debug!(target: LOG_TARGET, "Media clock has stopped, command dropped");
        }
    }
}

impl MediaOutput for ClockMedia {
    fn load(&mut self, url: &str) {
        self.send(MediaCommand::Load { url: url.to_string() });
    }

    fn seek(&mut self, position: Duration) {
        self.send(MediaCommand::Seek(position));
    }

    fn play(&mut self) {
        self.send(MediaCommand::Play);
    }

    fn pause(&mut self) {
        self.send(MediaCommand::Pause);
    }
}

/// Clock task half.
pub struct MediaClock {
    rx: mpsc::UnboundedReceiver<MediaCommand>,
    ticker: Interval,
    tick_interval: Duration,
    source_length: Duration,
    cancel_token: CancellationToken,
    source: Option<String>,
    position: Duration,
    playing: bool,
}

/// Create a connected media output and clock.
///
/// Every loaded source is treated as `source_length` long.
#[must_use]
pub fn media_clock(
    tick_interval: Duration,
    source_length: Duration,
    cancel_token: CancellationToken,
) -> (ClockMedia, MediaClock) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let clock = MediaClock {
        rx,
        ticker,
        tick_interval,
        source_length,
        cancel_token,
        source: None,
        position: Duration::ZERO,
        playing: false,
    };
    (ClockMedia { tx }, clock)
}

impl MediaClock {
    /// Run until cancelled, the media output is dropped, or the listener
    /// goes away.
    pub async fn run<L: ClockListener>(mut self, listener: L) {
        info!(
            target: LOG_TARGET,
            "Media clock running (tick {:?}, source length {:?})",
            self.tick_interval,
            self.source_length
        );

        loop {
            let result = tokio::select! {
                () = self.cancel_token.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => self.apply(command, &listener),
                    None => break,
                },
                _ = self.ticker.tick(), if self.playing => self.advance(&listener),
            };

            if let Err(e) = result {
                debug!(target: LOG_TARGET, "Clock listener gone: {}", e);
                break;
            }
        }

        info!(target: LOG_TARGET, "Media clock stopped");
    }

    fn apply<L: ClockListener>(&mut self, command: MediaCommand, listener: &L) -> Result<()> {
        match command {
            MediaCommand::Load { url } => {
                debug!(target: LOG_TARGET, "Loading {}", url);
                self.source = Some(url);
                self.position = Duration::ZERO;
                self.playing = false;
                listener.duration_known(self.source_length)
            }
            MediaCommand::Seek(position) => {
                self.position = position.min(self.source_length);
                listener.tick(self.position)
            }
            MediaCommand::Play => {
                if self.source.is_some() && self.position < self.source_length {
                    self.playing = true;
                    self.ticker.reset();
                }
                Ok(())
            }
            MediaCommand::Pause => {
                self.playing = false;
                Ok(())
            }
        }
    }

    fn advance<L: ClockListener>(&mut self, listener: &L) -> Result<()> {
        self.position = (self.position + self.tick_interval).min(self.source_length);
        listener.tick(self.position)?;
        if self.position >= self.source_length {
            self.playing = false;
            listener.ended()?;
        }
        Ok(())
    }
}
