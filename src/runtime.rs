use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::submit::SubmitOutcome;

/// One tick per second drives elapsed-time accounting.
pub const TICK_RATE_MS: u64 = 1000;

/// Unified event type consumed by the app loop. Submission outcomes arrive
/// here too, so all session mutation stays on one thread.
#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize,
    Tick,
    Submitted(SubmitOutcome),
}

/// Source of app events (keyboard, resize, ticks, worker results).
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError>;
}

/// Production event source: a crossterm input thread plus a fixed-rate tick
/// thread, both feeding one channel.
pub struct CrosstermEventSource {
    rx: Receiver<Event>,
    tx: Sender<Event>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let tick_tx = tx.clone();
        thread::spawn(move || loop {
            if tick_tx.send(Event::Tick).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(TICK_RATE_MS));
        });

        let input_tx = tx.clone();
        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if input_tx.send(Event::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if input_tx.send(Event::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx, tx }
    }

    /// Handle for worker threads (result submission) to push events back
    /// into the loop.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    /// Block until the next event. The tick thread guarantees the loop
    /// wakes at least once a second.
    pub fn recv(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<Event>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<Event>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on
    /// timeout so headless drivers get ticks without a tick thread.
    pub fn step(&self) -> Event {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Event::Tick,
        }
    }
}
