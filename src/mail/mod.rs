// src/mail/mod.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use mailparse::{MailHeaderMap, MailParseError, ParsedMail};
use tracing::warn;

pub mod imap;

pub use self::imap::ImapSource;

/// Anything that can hand over the raw report emails for a sender.
#[async_trait]
pub trait MessageSource {
    /// All messages from `sender` received on or after `since`, oldest first.
    async fn fetch(&self, sender: &str, since: NaiveDate) -> Result<Vec<Message>>;
}

/// One raw RFC 822 email.
#[derive(Debug, Clone)]
pub struct Message {
    raw: Vec<u8>,
}

impl Message {
    pub fn from_bytes(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn subject(&self) -> Option<String> {
        self.header("Subject")
    }

    pub fn date(&self) -> Option<String> {
        self.header("Date")
    }

    fn header(&self, name: &str) -> Option<String> {
        let (headers, _) = mailparse::parse_headers(&self.raw).ok()?;
        headers.get_first_value(name)
    }

    /// The first `text/html` part, decoded with its declared charset.
    /// `Ok(None)` means the message parsed but has no usable HTML part.
    pub fn html_body(&self) -> Result<Option<String>, MailParseError> {
        let parsed = mailparse::parse_mail(&self.raw)?;
        Ok(find_html(&parsed))
    }
}

fn find_html(part: &ParsedMail<'_>) -> Option<String> {
    if part.ctype.mimetype.eq_ignore_ascii_case("text/html") {
        match part.get_body() {
            Ok(body) => return Some(body),
            Err(e) => warn!(error = %e, "failed to decode html part"),
        }
    }
    part.subparts.iter().find_map(find_html)
}
