// src/workflow.rs
use chrono::{Datelike, Days, Local, NaiveDate};
use mailparse::MailParseError;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::fetch::{extract_export_link, ExportFetcher};
use crate::mail::{Message, MessageSource};
use crate::store::RemoteStore;
use crate::table::{delimited, fresh_base, merge, xlsx, Table, TableError};

/// Why a single message contributed nothing to the run.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("message could not be parsed: {0}")]
    Malformed(#[from] MailParseError),
    #[error("message has no html part")]
    NoHtml,
    #[error("no export link in message")]
    NoLink,
    #[error("download of {url} failed: {reason:#}")]
    Download { url: String, reason: anyhow::Error },
    #[error("export could not be parsed: {0}")]
    Parse(#[from] TableError),
}

/// Calendar month a run consolidates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `YYYY_MM`
    pub fn key(&self) -> String {
        format!("{:04}_{:02}", self.year, self.month)
    }

    pub fn file_name(&self) -> String {
        format!("RADAR_{}.xlsx", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Merge,
    Persist,
    Upload,
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Done,
    NoMessages,
    NoData,
    Failed(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub state: RunState,
    pub file_name: String,
    pub messages: usize,
    pub exports: usize,
    pub rows_written: usize,
}

impl RunOutcome {
    fn new(file_name: String) -> Self {
        Self {
            state: RunState::Done,
            file_name,
            messages: 0,
            exports: 0,
            rows_written: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.state, RunState::Failed(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} ({} messages, {} exports, {} rows)",
            self.state, self.file_name, self.messages, self.exports, self.rows_written
        )
    }
}

/// The part of the configuration the workflow itself reads.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub sender: String,
    pub work_dir: PathBuf,
    pub days_back: u32,
}

impl WorkflowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sender: config.from_sender.clone(),
            work_dir: config.work_dir.clone(),
            days_back: config.days_back,
        }
    }
}

/// Turn one report email into the table behind its export link.
pub async fn process_message<F>(fetcher: &F, message: &Message) -> Result<Table, MessageError>
where
    F: ExportFetcher + ?Sized,
{
    let html = message.html_body()?.ok_or(MessageError::NoHtml)?;
    let url = extract_export_link(&html).ok_or(MessageError::NoLink)?;
    let data = fetcher
        .fetch(&url)
        .await
        .map_err(|reason| MessageError::Download {
            url: url.clone(),
            reason,
        })?;
    Ok(delimited::parse_csv(&data)?)
}

/// Batch driver: load the month's spreadsheet, pull today's report emails,
/// merge their exports and push the spreadsheet back.
pub struct Workflow<M, S, F> {
    settings: WorkflowSettings,
    source: M,
    store: S,
    fetcher: F,
}

impl<M, S, F> Workflow<M, S, F>
where
    M: MessageSource,
    S: RemoteStore,
    F: ExportFetcher,
{
    pub fn new(settings: WorkflowSettings, source: M, store: S, fetcher: F) -> Self {
        Self {
            settings,
            source,
            store,
            fetcher,
        }
    }

    /// Run for today (local time), shifted back by the configured days.
    pub async fn run(&self) -> RunOutcome {
        let today = Local::now().date_naive();
        let day = today
            .checked_sub_days(Days::new(u64::from(self.settings.days_back)))
            .unwrap_or(today);
        self.run_for(day).await
    }

    pub async fn run_for(&self, day: NaiveDate) -> RunOutcome {
        let period = Period::of(day);
        let file_name = period.file_name();
        let mut outcome = RunOutcome::new(file_name.clone());
        info!(%day, file = %file_name, "run started");

        let existing = self.load_existing(&file_name).await;

        let messages = self.fetch_messages(day).await;
        outcome.messages = messages.len();
        if messages.is_empty() {
            warn!("no messages today; stopping");
            outcome.state = RunState::NoMessages;
            return outcome;
        }

        let total = messages.len();
        let mut results = Vec::with_capacity(total);
        for (i, message) in messages.iter().enumerate() {
            let subject = message.subject().unwrap_or_default();
            let date = message.date().unwrap_or_default();
            info!(message = i + 1, total, %subject, %date, "processing message");
            results.push(process_message(&self.fetcher, message).await);
        }

        let exports: Vec<Table> = results
            .into_iter()
            .enumerate()
            .filter_map(|(i, result)| match result {
                Ok(table) => {
                    info!(message = i + 1, rows = table.len(), "export parsed");
                    Some(table)
                }
                Err(e) => {
                    warn!(message = i + 1, error = %e, "skipping message");
                    None
                }
            })
            .collect();
        outcome.exports = exports.len();

        if exports.is_empty() {
            warn!("no export could be combined today");
            outcome.state = RunState::NoData;
            return outcome;
        }

        let merged = match merge(existing, exports) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "merging exports failed");
                outcome.state = RunState::Failed(Stage::Merge);
                return outcome;
            }
        };

        let local_path = self.settings.work_dir.join(&file_name);
        if let Err(e) = xlsx::write_table(&merged, &local_path) {
            error!(path = %local_path.display(), error = %e, "writing spreadsheet failed");
            outcome.state = RunState::Failed(Stage::Persist);
            return outcome;
        }
        info!(path = %local_path.display(), rows = merged.len(), "spreadsheet written");
        outcome.rows_written = merged.len();

        if let Err(e) = self.store.upload(&local_path, &file_name).await {
            error!(file = %file_name, error = %format!("{:#}", e), "upload failed");
            outcome.state = RunState::Failed(Stage::Upload);
            return outcome;
        }

        info!(%outcome, "run finished");
        outcome
    }

    /// The month's consolidated table, or a fresh `TAG`-only base when it is
    /// missing or unusable. Never fails.
    #[instrument(level = "info", skip(self))]
    async fn load_existing(&self, file_name: &str) -> Table {
        let file = match self.store.find(file_name).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                info!("no consolidated file in store; starting fresh");
                return fresh_base();
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "store lookup failed; starting fresh");
                return fresh_base();
            }
        };

        let path = match self.store.download(&file, &self.settings.work_dir).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "download failed; starting fresh");
                return fresh_base();
            }
        };

        match xlsx::read_table(&path) {
            Ok(table) => {
                info!(rows = table.len(), path = %path.display(), "loaded consolidated file");
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable consolidated file; starting fresh");
                fresh_base()
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_messages(&self, since: NaiveDate) -> Vec<Message> {
        match self.source.fetch(&self.settings.sender, since).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %format!("{:#}", e), "fetching messages failed");
                Vec::new()
            }
        }
    }
}
