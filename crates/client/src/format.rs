use vidnotes_client_core::{JobRecord, progress_of};
use vidnotes_client_engine::StatusSnapshot;

pub fn job_title(job: &JobRecord) -> &str {
    if job.filename.trim().is_empty() {
        job.id.as_str()
    } else {
        job.filename.as_str()
    }
}

/// Row prefix: `*` marks the selected job, the number is its selection key.
pub fn row_prefix(index: usize, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    format!("{marker}[{}]", index + 1)
}

pub fn format_job_line(index: usize, job: &JobRecord, selected: bool) -> String {
    let progress = progress_of(&job.status);
    let mut line = format!(
        "{} {:>3}% {} ({})",
        row_prefix(index, selected),
        progress.percent,
        job_title(job),
        job.status
    );
    if progress.failed {
        if let Some(err) = job.error.as_deref().filter(|e| !e.is_empty()) {
            line.push_str(&format!(": {err}"));
        }
    }
    if job.summary.is_some() {
        line.push_str(" [summary]");
    }
    line
}

pub fn format_stable_url(url: Option<&str>) -> String {
    match url {
        Some(url) => format!("Now playing: {url}"),
        None => "Player idle".to_string(),
    }
}

/// Status shown in the header. A foreground load outranks its last error,
/// which outranks the latest user notice.
pub fn header_status<'a>(snap: &'a StatusSnapshot, notice: Option<&'a str>) -> Option<&'a str> {
    if snap.foreground_pending {
        Some("Loading video jobs...")
    } else {
        snap.last_error.as_deref().or(notice)
    }
}
