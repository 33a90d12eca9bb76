use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// Coarse progress derived from a job's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 0..=100.
    pub percent: u8,
    /// No further status changes are expected.
    pub terminal: bool,
    pub failed: bool,
}

impl Progress {
    const fn running(percent: u8) -> Self {
        Self {
            percent,
            terminal: false,
            failed: false,
        }
    }

    const fn done() -> Self {
        Self {
            percent: 100,
            terminal: true,
            failed: false,
        }
    }
}

/// Map a status to its progress. Unknown statuses report 0% and never fail.
pub fn progress_of(status: &JobStatus) -> Progress {
    match status {
        JobStatus::Queued => Progress::running(5),
        JobStatus::Processing => Progress::running(15),
        JobStatus::AudioExtracted => Progress::running(35),
        JobStatus::Transcribing => Progress::running(65),
        JobStatus::Transcribed | JobStatus::Ready => Progress::done(),
        JobStatus::Failed => Progress {
            percent: 100,
            terminal: true,
            failed: true,
        },
        JobStatus::Other(_) => Progress::running(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of(raw: &str) -> Progress {
        progress_of(&JobStatus::from(raw))
    }

    #[test]
    fn fixed_table() {
        let table = [
            ("queued", 5, false),
            ("processing", 15, false),
            ("audio_extracted", 35, false),
            ("transcribing", 65, false),
            ("transcribed", 100, true),
            ("ready", 100, true),
            ("failed", 100, true),
        ];
        for (raw, percent, terminal) in table {
            let p = of(raw);
            assert_eq!(p.percent, percent, "{raw}");
            assert_eq!(p.terminal, terminal, "{raw}");
            assert_eq!(p.failed, raw == "failed", "{raw}");
        }
    }

    #[test]
    fn unknown_statuses_are_zero_and_running() {
        for raw in ["bogus", "summarizing", "done", "uploaded", ""] {
            assert_eq!(of(raw), Progress::running(0), "{raw}");
        }
    }
}
