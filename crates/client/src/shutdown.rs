use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;

#[derive(Debug)]
pub struct ShutdownController {
    forced: AtomicU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    Graceful,
    Immediate,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            forced: AtomicU8::new(0),
        }
    }

    pub fn bump_forced(&self) -> u8 {
        self.forced.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// First request is graceful, any further one is immediate.
    pub fn next_event(&self) -> ShutdownEvent {
        if self.bump_forced() == 1 {
            ShutdownEvent::Graceful
        } else {
            ShutdownEvent::Immediate
        }
    }
}

pub fn spawn_ctrl_c_handler(
    shutdown: Arc<ShutdownController>,
    shutdown_tx: mpsc::UnboundedSender<ShutdownEvent>,
) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            let ev = shutdown.next_event();
            let _ = shutdown_tx.send(ev);
            if ev == ShutdownEvent::Immediate {
                return;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_is_immediate() {
        let shutdown = ShutdownController::new();
        assert_eq!(shutdown.next_event(), ShutdownEvent::Graceful);
        assert_eq!(shutdown.next_event(), ShutdownEvent::Immediate);
        assert_eq!(shutdown.next_event(), ShutdownEvent::Immediate);
    }
}
