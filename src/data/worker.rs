use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use super::loader::load_file;
use super::model::PointRow;
use crate::state::{DataLoadError, LoadRequest, ViewEvent};

/// Result of one background load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub category: String,
    pub result: Result<Vec<PointRow>, DataLoadError>,
}

impl From<LoadOutcome> for ViewEvent {
    fn from(outcome: LoadOutcome) -> Self {
        ViewEvent::DataLoaded {
            category: outcome.category,
            result: outcome.result,
        }
    }
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// Runs [`load_file`] off the UI thread, one thread per request, and hands
/// the outcomes back through a channel polled by the UI loop.
pub struct BackgroundLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    notify: Option<Notifier>,
    in_flight: usize,
}

impl Default for BackgroundLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        BackgroundLoader {
            tx,
            rx,
            notify: None,
            in_flight: 0,
        }
    }

    /// Call `notify` after each outcome is sent (e.g. to request a repaint).
    pub fn with_notifier(notify: impl Fn() + Send + Sync + 'static) -> Self {
        BackgroundLoader {
            notify: Some(Arc::new(notify)),
            ..Self::new()
        }
    }

    pub fn request(&mut self, request: LoadRequest) {
        let tx = self.tx.clone();
        let notify = self.notify.clone();
        self.in_flight += 1;
        std::thread::spawn(move || {
            let result = load_file(&request.locator).map_err(|e| DataLoadError {
                category: request.category.clone(),
                message: format!("{e:#}"),
            });
            // The receiver is gone when the UI replaced this loader.
            let _ = tx.send(LoadOutcome {
                category: request.category,
                result,
            });
            if let Some(notify) = notify {
                notify();
            }
        });
    }

    /// Outcomes that have arrived so far, without blocking.
    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let outcomes: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    /// Block up to `timeout` for the next outcome.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let outcome = self.rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
