// src/config.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf};

/// Run configuration. Every option can also come from the environment (or a
/// `.env` file loaded at startup); it is built once and read-only afterwards.
#[derive(Parser, Debug, Clone)]
#[command(name = "radar", about = "Consolidate report export emails into the monthly spreadsheet")]
pub struct Config {
    /// IMAP server host
    #[arg(long, env = "IMAP_SERVER")]
    pub imap_server: String,

    /// IMAP-over-TLS port
    #[arg(long, env = "IMAP_PORT", default_value_t = 993)]
    pub imap_port: u16,

    #[arg(long, env = "EMAIL_ACCOUNT")]
    pub email_account: String,

    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: String,

    /// Mailbox folder holding the report emails
    #[arg(long, env = "MAILBOX", default_value = "RADAR")]
    pub mailbox: String,

    /// Only messages from this sender are processed
    #[arg(long, env = "FROM_SENDER")]
    pub from_sender: String,

    /// Log file name, created inside the work directory
    #[arg(long, env = "LOG_FILE", default_value = "radar.log")]
    pub log_file: String,

    /// Local directory for the log and the downloaded/written spreadsheet
    #[arg(long, env = "WORK_DIR", default_value = "Arquivos")]
    pub work_dir: PathBuf,

    /// Folder (object prefix) the spreadsheet is stored under
    #[arg(long, env = "DRIVE_FOLDER_ID")]
    pub drive_folder_id: Option<String>,

    /// Cloud Storage bucket; required unless --store-dir is given
    #[arg(long, env = "GCS_BUCKET", required_unless_present = "store_dir")]
    pub bucket: Option<String>,

    /// Keep the consolidated spreadsheet in this local directory instead of
    /// Cloud Storage
    #[arg(long, env = "STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Timeout for each export download
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Process the day this many days before today
    #[arg(long, env = "DAYS_BACK", default_value_t = 0)]
    pub days_back: u32,
}

impl Config {
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(&self.log_file)
    }

    /// Create the work directory if it does not exist yet.
    pub fn prepare_work_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("creating work directory {}", self.work_dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "radar",
        "--imap-server",
        "imap.example.com",
        "--email-account",
        "robo@example.com",
        "--email-password",
        "secret",
        "--from-sender",
        "relatorios@example.com",
    ];

    #[test]
    fn test_defaults_with_local_store() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--store-dir", "/tmp/radar-store"]);
        let config = Config::try_parse_from(args).unwrap();

        assert_eq!(config.imap_port, 993);
        assert_eq!(config.mailbox, "RADAR");
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.days_back, 0);
        assert_eq!(config.log_path(), PathBuf::from("Arquivos/radar.log"));
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/radar-store")));
    }

    #[test]
    fn test_bucket_or_store_dir_required() {
        if std::env::var_os("GCS_BUCKET").is_some() || std::env::var_os("STORE_DIR").is_some() {
            return;
        }
        assert!(Config::try_parse_from(REQUIRED).is_err());

        let mut args = REQUIRED.to_vec();
        args.extend(["--bucket", "radar-bucket", "--drive-folder-id", "vendas"]);
        let config = Config::try_parse_from(args).unwrap();
        assert_eq!(config.bucket.as_deref(), Some("radar-bucket"));
        assert_eq!(config.drive_folder_id.as_deref(), Some("vendas"));
    }
}
