//! Shared application state for the monitor server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use paycheck::io::init::PaycheckPaths;
use paycheck::simulator::{PipelineEvent, Simulation};
use tokio::sync::broadcast;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Root directory of the project (contains .paycheck/).
    pub project_dir: PathBuf,
    /// Broadcast sender for pipeline events; shared by every simulation.
    pub event_tx: Arc<broadcast::Sender<PipelineEvent>>,
    /// The current simulation. Replacing or clearing it cancels the old one.
    current: Arc<Mutex<Option<Simulation>>>,
}

impl AppState {
    pub fn new(project_dir: PathBuf) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            project_dir,
            event_tx: Arc::new(event_tx),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn paths(&self) -> PaycheckPaths {
        PaycheckPaths::new(&self.project_dir)
    }

    pub fn current(&self) -> MutexGuard<'_, Option<Simulation>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
