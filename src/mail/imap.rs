// src/mail/imap.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;
use tracing::{debug, error, info, warn};

use super::{Message, MessageSource};
use crate::config::Config;

type TlsSession = ::imap::Session<TlsStream<TcpStream>>;

/// IMAP-over-TLS mailbox. A fresh session is opened for every `fetch` and
/// logged out when the fetch returns, on success or error.
#[derive(Debug, Clone)]
pub struct ImapSource {
    server: String,
    port: u16,
    account: String,
    password: String,
    mailbox: String,
}

impl ImapSource {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        account: impl Into<String>,
        password: impl Into<String>,
        mailbox: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            account: account.into(),
            password: password.into(),
            mailbox: mailbox.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.imap_server,
            config.imap_port,
            &config.email_account,
            &config.email_password,
            &config.mailbox,
        )
    }

    fn open(&self) -> Result<MailboxSession> {
        info!(server = %self.server, port = self.port, "connecting to IMAP server");
        let tls = TlsConnector::builder().build().context("building TLS connector")?;
        let client = ::imap::connect((self.server.as_str(), self.port), &self.server, &tls)
            .with_context(|| format!("connecting to {}:{}", self.server, self.port))?;
        let session = client
            .login(&self.account, &self.password)
            .map_err(|(e, _)| anyhow!("IMAP login as {} failed: {}", self.account, e))?;
        Ok(MailboxSession {
            inner: session,
            selected: false,
        })
    }

    fn fetch_blocking(&self, sender: &str, since: NaiveDate) -> Result<Vec<Message>> {
        let mut session = self.open()?;

        info!(mailbox = %self.mailbox, "selecting mailbox");
        session
            .inner
            .select(&self.mailbox)
            .with_context(|| format!("selecting mailbox {}", self.mailbox))?;
        session.selected = true;

        let query = search_query(sender, since);
        info!(%query, "searching messages");
        let mut ids: Vec<u32> = session
            .inner
            .search(&query)
            .context("IMAP search failed")?
            .into_iter()
            .collect();
        ids.sort_unstable();

        if ids.is_empty() {
            warn!(mailbox = %self.mailbox, "no messages matched");
            return Ok(Vec::new());
        }

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            match session.inner.fetch(id.to_string(), "RFC822") {
                Ok(fetches) => match fetches.iter().find_map(|f| f.body()) {
                    Some(body) => messages.push(Message::from_bytes(body)),
                    None => warn!(id, "fetch returned no body"),
                },
                Err(e) => error!(id, error = %e, "failed to fetch message"),
            }
        }

        info!(count = messages.len(), "fetched messages");
        Ok(messages)
    }
}

#[async_trait]
impl MessageSource for ImapSource {
    async fn fetch(&self, sender: &str, since: NaiveDate) -> Result<Vec<Message>> {
        let source = self.clone();
        let sender = sender.to_string();
        tokio::task::spawn_blocking(move || source.fetch_blocking(&sender, since))
            .await
            .context("IMAP task panicked")?
    }
}

/// `FROM "<sender>" SINCE "<dd-Mon-YYYY>"`. Quotes are stripped from the
/// sender so it cannot break out of the search string.
fn search_query(sender: &str, since: NaiveDate) -> String {
    format!(
        "(FROM \"{}\" SINCE \"{}\")",
        sender.replace('"', ""),
        since.format("%d-%b-%Y")
    )
}

/// Logged-in session that closes the selected mailbox and logs out on drop.
struct MailboxSession {
    inner: TlsSession,
    selected: bool,
}

impl Drop for MailboxSession {
    fn drop(&mut self) {
        if self.selected {
            if let Err(e) = self.inner.close() {
                debug!(error = %e, "IMAP close failed");
            }
        }
        match self.inner.logout() {
            Ok(()) => debug!("IMAP session logged out"),
            Err(e) => warn!(error = %e, "IMAP logout failed"),
        }
    }
}
