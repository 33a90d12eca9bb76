use std::io::Write;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use vidnotes_client_core::progress_of;
use vidnotes_client_engine::StatusSnapshot;

use crate::constants::PROGRESS_BAR_LEN;
use crate::format::{format_stable_url, header_status, job_title, row_prefix};

const HELP_LINE: &str = "keys: 1-9 select  0 clear  r refresh  g generate summary  q quit";

pub(crate) struct Ui {
    mp: MultiProgress,
    header_pb: ProgressBar,
    player_pb: ProgressBar,
    rows: Vec<ProgressBar>,
    running_style: ProgressStyle,
    failed_style: ProgressStyle,
    notice: Option<String>,
    last: StatusSnapshot,
}

fn text_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}\u{1b}[0K").unwrap()
}

impl Ui {
    pub(crate) fn new() -> Self {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stdout());
        mp.set_move_cursor(true);

        let header_pb = mp.add(ProgressBar::new(0));
        header_pb.set_style(text_style());
        header_pb.set_message(HELP_LINE);

        let player_pb = mp.add(ProgressBar::new(0));
        player_pb.set_style(text_style());
        player_pb.set_message(format_stable_url(None));

        let running_style =
            ProgressStyle::with_template("{prefix} {bar:20.cyan/blue} {pos:>3}% {msg}\u{1b}[0K")
                .unwrap()
                .progress_chars("#--");
        let failed_style =
            ProgressStyle::with_template("{prefix} {bar:20.red/red} {pos:>3}% {msg}\u{1b}[0K")
                .unwrap()
                .progress_chars("#--");

        Self {
            mp,
            header_pb,
            player_pb,
            rows: Vec::new(),
            running_style,
            failed_style,
            notice: None,
            last: StatusSnapshot::default(),
        }
    }

    pub(crate) fn println(&self, msg: &str) {
        let _ = self.mp.println(msg);
    }

    /// Show a notice in the header until the next one replaces it.
    pub(crate) fn set_notice(&mut self, msg: impl Into<String>) {
        self.notice = Some(msg.into());
        self.draw_header();
    }

    fn draw_header(&self) {
        match header_status(&self.last, self.notice.as_deref()) {
            Some(msg) => self.header_pb.set_message(format!("{msg}  ({HELP_LINE})")),
            None => self.header_pb.set_message(HELP_LINE),
        }
    }

    fn resize_rows(&mut self, count: usize) {
        while self.rows.len() > count {
            if let Some(pb) = self.rows.pop() {
                pb.finish_and_clear();
                self.mp.remove(&pb);
            }
        }
        while self.rows.len() < count {
            let pb = self
                .mp
                .insert_before(&self.player_pb, ProgressBar::new(PROGRESS_BAR_LEN));
            pb.set_style(self.running_style.clone());
            self.rows.push(pb);
        }
    }

    pub(crate) fn render(&mut self, snap: &StatusSnapshot) {
        self.resize_rows(snap.jobs.len());
        for (idx, (job, pb)) in snap.jobs.iter().zip(&self.rows).enumerate() {
            let progress = progress_of(&job.status);
            let selected = snap.selected.as_ref() == Some(&job.id);
            pb.set_style(if progress.failed {
                self.failed_style.clone()
            } else {
                self.running_style.clone()
            });
            pb.set_prefix(row_prefix(idx, selected));
            pb.set_position(u64::from(progress.percent).min(PROGRESS_BAR_LEN));
            pb.set_message(format!("{} ({})", job_title(job), job.status));
        }
        self.player_pb
            .set_message(format_stable_url(snap.stable_url.as_deref()));
        self.last = snap.clone();
        self.draw_header();
    }

    pub(crate) fn freeze(&self) {
        self.mp.set_move_cursor(false);
        for row in &self.rows {
            row.abandon();
        }
        self.header_pb.abandon();
        self.player_pb.abandon();
        let _ = std::io::stdout().write_all(b"\n");
    }
}
