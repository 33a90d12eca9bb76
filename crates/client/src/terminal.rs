use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::constants::{KEY_POLL_INTERVAL_MS, MAX_SELECT_KEYS};
use crate::shutdown::{ShutdownController, ShutdownEvent};

/// Key bindings of the live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Select the job at this 0-based row.
    Select(usize),
    ClearSelection,
    Refresh,
    GenerateSelected,
    Quit,
}

pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Char('0') => Some(KeyAction::ClearSelection),
        KeyCode::Char(c @ '1'..='9') => {
            let row = (c as usize) - ('1' as usize);
            (row < MAX_SELECT_KEYS).then_some(KeyAction::Select(row))
        }
        KeyCode::Char('r') => Some(KeyAction::Refresh),
        KeyCode::Char('g') => Some(KeyAction::GenerateSelected),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

#[cfg(unix)]
fn enable_onlcr() -> anyhow::Result<()> {
    use std::os::fd::AsRawFd as _;

    let fd = std::io::stdout().as_raw_fd();
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        termios.c_oflag |= (libc::OPOST | libc::ONLCR) as libc::tcflag_t;
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}

/// Raw-mode terminal with a key reader thread; restores the terminal on drop.
pub struct TuiTerminal {
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl TuiTerminal {
    pub fn enter(
        shutdown: Arc<ShutdownController>,
        shutdown_tx: mpsc::UnboundedSender<ShutdownEvent>,
        key_tx: mpsc::UnboundedSender<KeyAction>,
    ) -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        #[cfg(unix)]
        if let Err(err) = enable_onlcr() {
            let _ = crossterm::terminal::disable_raw_mode();
            return Err(err);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();
        let thread = std::thread::spawn(move || {
            use crossterm::event::Event;

            while !stop_thread.load(Ordering::Relaxed) {
                let ready = crossterm::event::poll(Duration::from_millis(KEY_POLL_INTERVAL_MS))
                    .unwrap_or(false);
                if !ready {
                    continue;
                }
                let Ok(Event::Key(key)) = crossterm::event::read() else {
                    continue;
                };
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    let _ = shutdown_tx.send(shutdown.next_event());
                    continue;
                }
                if let Some(action) = key_action(&key) {
                    let _ = key_tx.send(action);
                }
            }
        });

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for TuiTerminal {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = crossterm::terminal::disable_raw_mode();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Option<KeyAction> {
        key_action(&KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn maps_selection_keys() {
        assert_eq!(press(KeyCode::Char('1')), Some(KeyAction::Select(0)));
        assert_eq!(press(KeyCode::Char('9')), Some(KeyAction::Select(8)));
        assert_eq!(press(KeyCode::Char('0')), Some(KeyAction::ClearSelection));
    }

    #[test]
    fn maps_commands() {
        assert_eq!(press(KeyCode::Char('r')), Some(KeyAction::Refresh));
        assert_eq!(press(KeyCode::Char('g')), Some(KeyAction::GenerateSelected));
        assert_eq!(press(KeyCode::Char('q')), Some(KeyAction::Quit));
        assert_eq!(press(KeyCode::Char('x')), None);
        assert_eq!(
            key_action(&KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            None
        );
    }
}
