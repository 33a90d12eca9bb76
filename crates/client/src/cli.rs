use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Url;

use vidnotes_client_core::settings::ClientSettings;
use vidnotes_client_engine::EngineConfig;

#[cfg(feature = "prod-backend")]
const DEFAULT_BACKEND_URL: &str = "https://api.vidnotes.app/";

#[cfg(not(feature = "prod-backend"))]
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(600);

fn default_backend_url() -> Url {
    Url::parse(DEFAULT_BACKEND_URL).expect("DEFAULT_BACKEND_URL must be a valid URL")
}

/// Parse a polling interval such as `5s`, `750ms`, `2m` or a bare millisecond count.
pub fn parse_interval(input: &str) -> Result<Duration, String> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err("interval must not be empty".to_string());
    }

    let (num, scale_ms) = if let Some(raw) = s.strip_suffix("ms") {
        (raw, 1u64)
    } else if let Some(raw) = s.strip_suffix('s') {
        (raw, 1_000u64)
    } else if let Some(raw) = s.strip_suffix('m') {
        (raw, 60_000u64)
    } else {
        (s.as_str(), 1u64)
    };

    let value: u64 = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid interval: {input:?}"))?;
    let ms = value
        .checked_mul(scale_ms)
        .ok_or_else(|| format!("interval too large: {input:?}"))?;

    let interval = Duration::from_millis(ms);
    if interval < EngineConfig::MIN_POLL_INTERVAL || interval > MAX_POLL_INTERVAL {
        return Err(format!(
            "interval must be between {}ms and {}s",
            EngineConfig::MIN_POLL_INTERVAL.as_millis(),
            MAX_POLL_INTERVAL.as_secs()
        ));
    }
    Ok(interval)
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Poll the backend and show live job progress (default).
    Watch,
    /// Queue (re)generation of a job's summary.
    Generate { id: String },
    /// Upload a manual transcript for a job from a text file.
    Transcript { id: String, file: PathBuf },
    /// Delete a job and its stored video.
    Delete { id: String },
    /// Save a job's summary as a new note.
    SaveNote { id: String },
}

#[derive(Debug, Clone, Parser)]
#[command(name = "vidnotes", version, about = "Video notes job monitor")]
pub struct Cli {
    /// Backend base URL (overrides the config file).
    #[arg(long, env = "VIDNOTES_BACKEND_URL")]
    pub backend_url: Option<Url>,

    /// Bearer token attached to backend requests.
    #[arg(long, env = "VIDNOTES_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Background polling interval (e.g. `5s`, `750ms`).
    #[arg(long, env = "VIDNOTES_POLL_INTERVAL", value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Job id to select on startup.
    #[arg(long)]
    pub select: Option<String>,

    /// Keep the player URL even when the selected job's video is replaced.
    #[arg(long, env = "VIDNOTES_HOLD_URL", default_value_t = false)]
    pub hold_url: bool,

    #[arg(long, env = "VIDNOTES_NO_TUI", default_value_t = false)]
    pub no_tui: bool,

    /// Debug logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Write the effective backend URL, token and interval to the config file.
    #[arg(long, default_value_t = false)]
    pub save_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Connection settings after layering CLI/env over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub backend_url: Url,
    pub token: Option<String>,
    pub interval: Duration,
}

impl Resolved {
    pub fn to_settings(&self) -> ClientSettings {
        ClientSettings {
            backend_url: Some(self.backend_url.to_string()),
            token: self.token.clone(),
            poll_interval_ms: Some(self.interval.as_millis() as u64),
        }
    }
}

pub fn resolve(cli: &Cli, file: &ClientSettings) -> anyhow::Result<Resolved> {
    let backend_url = match (&cli.backend_url, file.backend_url.as_deref()) {
        (Some(url), _) => url.clone(),
        (None, Some(raw)) => Url::parse(raw)
            .map_err(|err| anyhow::anyhow!("invalid backend_url in config file {raw:?}: {err}"))?,
        (None, None) => default_backend_url(),
    };

    let interval = match (cli.interval, file.poll_interval_ms) {
        (Some(interval), _) => interval,
        (None, Some(ms)) => parse_interval(&ms.to_string())
            .map_err(|err| anyhow::anyhow!("invalid poll_interval_ms in config file: {err}"))?,
        (None, None) => EngineConfig::DEFAULT_POLL_INTERVAL,
    };

    Ok(Resolved {
        backend_url,
        token: cli.token.clone().or_else(|| file.token.clone()),
        interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_units() {
        assert_eq!(parse_interval("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_interval("750ms"), Ok(Duration::from_millis(750)));
        assert_eq!(parse_interval(" 2M "), Ok(Duration::from_secs(120)));
        assert_eq!(parse_interval("5000"), Ok(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_bad_intervals() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("fast").is_err());
        assert!(parse_interval("10ms").is_err());
        assert!(parse_interval("11m").is_err());
        assert!(parse_interval("99999999999999999999m").is_err());
    }

    #[test]
    fn cli_overrides_config_file() {
        let cli = Cli::parse_from([
            "vidnotes",
            "--backend-url",
            "http://cli.example:9000",
            "--interval",
            "2s",
        ]);
        let file = ClientSettings {
            backend_url: Some("http://file.example".to_string()),
            token: Some("from-file".to_string()),
            poll_interval_ms: Some(10_000),
        };
        let resolved = resolve(&cli, &file).unwrap();
        assert_eq!(resolved.backend_url.as_str(), "http://cli.example:9000/");
        assert_eq!(resolved.token.as_deref(), Some("from-file"));
        assert_eq!(resolved.interval, Duration::from_secs(2));
    }

    #[test]
    fn falls_back_to_defaults() {
        let cli = Cli::parse_from(["vidnotes", "watch"]);
        let resolved = resolve(&cli, &ClientSettings::default()).unwrap();
        assert_eq!(resolved.backend_url, default_backend_url());
        assert_eq!(resolved.interval, EngineConfig::DEFAULT_POLL_INTERVAL);
        assert_eq!(cli.command, Some(Command::Watch));
    }

    #[test]
    fn parses_job_action_subcommands() {
        let cli = Cli::parse_from(["vidnotes", "save-note", "abc"]);
        assert_eq!(
            cli.command,
            Some(Command::SaveNote {
                id: "abc".to_string()
            })
        );
        let cli = Cli::parse_from(["vidnotes", "delete", "abc"]);
        assert_eq!(
            cli.command,
            Some(Command::Delete {
                id: "abc".to_string()
            })
        );
    }

    #[test]
    fn bad_config_url_is_reported() {
        let cli = Cli::parse_from(["vidnotes"]);
        let file = ClientSettings {
            backend_url: Some("not a url".to_string()),
            ..ClientSettings::default()
        };
        assert!(resolve(&cli, &file).is_err());
    }
}
