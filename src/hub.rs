//! Viewer registry + broadcast loop.
//!
//! The registry lives inside the hub task only. Viewer sessions join and
//! leave through [`HubCommand`]s, and scraped envelopes arrive on a bounded
//! channel from the bundler readers, so no state is shared behind a lock.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::types::{Envelope, ViewerId};

pub const GREETING: &str = "Connected! Waiting for app logs...";

/// Outbound queue of one viewer (serialized JSON frames).
pub type ViewerTx = mpsc::UnboundedSender<String>;

#[derive(Debug)]
pub enum HubCommand {
    Join { id: ViewerId, tx: ViewerTx },
    Leave(ViewerId),
}

#[derive(Debug, Default)]
pub struct ViewerRegistry {
    viewers: HashMap<ViewerId, ViewerTx>,
}

impl ViewerRegistry {
    pub fn add(&mut self, id: ViewerId, tx: ViewerTx) {
        self.viewers.insert(id, tx);
    }

    pub fn remove(&mut self, id: ViewerId) -> bool {
        self.viewers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// Queue `frame` for every viewer. A closed queue is skipped; its
    /// session sends `Leave` on its own. Returns how many queues accepted it.
    pub fn broadcast(&self, frame: &str) -> usize {
        let mut delivered = 0;
        for (id, tx) in &self.viewers {
            match tx.send(frame.to_owned()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(viewer = id, "viewer queue closed, skipping"),
            }
        }
        delivered
    }
}

pub struct Hub {
    registry: ViewerRegistry,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    logs: mpsc::Receiver<Envelope>,
}

impl Hub {
    pub fn new(commands: mpsc::UnboundedReceiver<HubCommand>, logs: mpsc::Receiver<Envelope>) -> Self {
        Self {
            registry: ViewerRegistry::default(),
            commands,
            logs,
        }
    }

    /// Run until every command sender (the viewer server) is gone.
    pub async fn run(mut self) {
        let mut logs_open = true;
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },

                env = self.logs.recv(), if logs_open => match env {
                    Some(env) => self.publish(&env),
                    None => {
                        info!("Bundler output ended; viewers stay connected");
                        logs_open = false;
                    }
                },
            }
        }
    }

    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Join { id, tx } => {
                // Greeting goes out before the viewer can see any broadcast.
                match Envelope::status(GREETING).to_json() {
                    Ok(frame) => {
                        if tx.send(frame).is_err() {
                            debug!(viewer = id, "viewer queue closed before greeting");
                        }
                    }
                    Err(e) => error!("status encode failed: {}", e),
                }
                self.registry.add(id, tx);
                info!("Debug viewer connected ({} online)", self.registry.len());
            }
            HubCommand::Leave(id) => {
                if self.registry.remove(id) {
                    info!("Debug viewer disconnected ({} online)", self.registry.len());
                }
            }
        }
    }

    fn publish(&self, env: &Envelope) {
        if self.registry.is_empty() {
            return;
        }
        match env.to_json() {
            Ok(frame) => {
                self.registry.broadcast(&frame);
            }
            Err(e) => error!("envelope encode failed: {}", e),
        }
    }
}
