//! Inbound delivery
//!
//! Turns a raw inbound message into a stored [`Message`] in the recipient's
//! mailbox, tagged All and Inbox.

use anyhow::{Context, Result as AnyResult};
use chrono::{DateTime, Utc};
use log::info;
use mail_parser::{HeaderValue, MessageParser, MimeHeaders, PartType};

use crate::error::Result;
use crate::models::{Disposition, EmailAddress, Mailbox, Message, MessageId, MimePart, ReservedLabel};
use crate::storage::MailStorage;

/// An attachment extracted from an inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttachment {
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub content_id: Option<String>,
    pub disposition: Option<Disposition>,
    pub content: Vec<u8>,
}

/// The parts of an inbound message the store keeps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEmail {
    pub from: Option<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub subject: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub in_reply_to: Option<String>,
    pub attachments: Vec<ParsedAttachment>,
}

impl ParsedEmail {
    /// Parse a raw RFC 5322 message
    pub fn parse(raw: &[u8]) -> AnyResult<Self> {
        let message = MessageParser::default()
            .parse(raw)
            .context("Failed to parse inbound message")?;

        let from = message.from().and_then(|from| from.first()).map(to_address);
        let to = message
            .to()
            .map(|to| to.iter().map(to_address).collect())
            .unwrap_or_default();

        let date = message
            .date()
            .and_then(|date| DateTime::from_timestamp(date.to_timestamp(), 0));

        let in_reply_to = match message.in_reply_to() {
            HeaderValue::Text(id) => Some(id.to_string()),
            HeaderValue::TextList(ids) => ids.first().map(|id| id.to_string()),
            _ => None,
        };

        // Only real bodies; mail-parser would otherwise convert one into the other
        let text = message.text_part(0).and_then(|part| match &part.body {
            PartType::Text(text) => Some(text.to_string()),
            _ => None,
        });
        let html = message.html_part(0).and_then(|part| match &part.body {
            PartType::Html(html) => Some(html.to_string()),
            _ => None,
        });

        let attachments = message
            .attachments()
            .map(|part| {
                let mime_type = MimeHeaders::content_type(part).map(|ct| match ct.subtype() {
                    Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                    None => ct.ctype().to_string(),
                });
                let disposition = part.content_disposition().and_then(|cd| {
                    if cd.ctype().eq_ignore_ascii_case("attachment") {
                        Some(Disposition::Attachment)
                    } else if cd.ctype().eq_ignore_ascii_case("inline") {
                        Some(Disposition::Inline)
                    } else {
                        None
                    }
                });
                ParsedAttachment {
                    filename: part.attachment_name().map(str::to_string),
                    mime_type,
                    content_id: part.content_id().map(str::to_string),
                    disposition,
                    content: part.contents().to_vec(),
                }
            })
            .collect();

        Ok(Self {
            from,
            to,
            subject: message.subject().map(str::to_string),
            date,
            text,
            html,
            in_reply_to,
            attachments,
        })
    }
}

fn to_address(addr: &mail_parser::Addr<'_>) -> EmailAddress {
    EmailAddress {
        address: addr.address().unwrap_or_default().to_string(),
        name: addr.name().map(str::to_string),
    }
}

/// Store an inbound message for `recipient`.
///
/// `recipient` may carry a display name (`Alice <alice@example.com>`).
/// Attachments are numbered "1", "2", ... in the order they occur.
pub fn deliver(
    storage: &dyn MailStorage,
    recipient: &str,
    parsed: ParsedEmail,
    raw_size: u64,
) -> Result<MessageId> {
    let mailbox = Mailbox::from_email(&EmailAddress::parse(recipient).address)?;
    let id = storage.generate_id();

    let mut builder = Message::builder(id.clone())
        .label(ReservedLabel::Inbox)
        .from(parsed.from.unwrap_or_default())
        .to(parsed.to)
        .date(parsed.date.unwrap_or_else(Utc::now))
        .size(raw_size);
    if let Some(subject) = parsed.subject {
        builder = builder.subject(subject);
    }
    if let Some(text) = parsed.text {
        builder = builder.text(text);
    }
    if let Some(html) = parsed.html {
        builder = builder.html(html);
    }
    if let Some(in_reply_to) = parsed.in_reply_to {
        builder = builder.in_reply_to(in_reply_to);
    }

    for (i, attachment) in parsed.attachments.into_iter().enumerate() {
        let mut part = MimePart::new((i + 1).to_string(), attachment.content);
        part.filename = attachment.filename;
        part.mime_type = attachment.mime_type;
        part.content_id = attachment.content_id;
        part.disposition = attachment.disposition;
        builder = builder.part(part);
    }

    let mut message = builder.build();
    storage.put_message(&mailbox, &id, &mut message)?;

    info!(
        "[MDA] Stored message {} for {} ({} bytes, {} attachments)",
        id,
        mailbox,
        raw_size,
        message.parts.len()
    );
    Ok(id)
}
