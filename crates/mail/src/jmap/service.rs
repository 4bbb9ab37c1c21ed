//! JMAP method implementations over the storage contract

use chrono::Utc;
use log::{debug, info};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::types::*;
use crate::error::{MailError, Result};
use crate::models::{EmailAddress, Mailbox, Marker, Message, MessageId, ReservedLabel};
use crate::sending::SendingService;
use crate::storage::MailStorage;

/// Synthetic part ids for the bodies returned by `Email/get`
const HTML_PART_ID: &str = "1a";
const TEXT_PART_ID: &str = "2a";

/// Translates JMAP method calls into storage operations.
///
/// Holds no state between calls.
pub struct MailboxService {
    storage: Arc<dyn MailStorage>,
    sending: Arc<dyn SendingService>,
}

impl MailboxService {
    pub fn new(storage: Arc<dyn MailStorage>, sending: Arc<dyn SendingService>) -> Self {
        Self { storage, sending }
    }

    /// `Mailbox/get`: one synthetic inbox covering every message
    pub fn get_mailbox(&self, args: MailboxGetArgs) -> Result<MailboxGetResponse> {
        let mailbox = args.account_id.mailbox()?;
        let ids = self.storage.get_all_message_ids(Some(&mailbox), None)?;

        let inbox = JmapMailbox {
            id: "inbox".to_string(),
            name: "Inbox".to_string(),
            parent_id: None,
            role: Some("inbox".to_string()),
            sort_order: 0,
            total_emails: ids.len(),
            unread_emails: 0,
            total_threads: 0,
            unread_threads: 0,
            is_subscribed: false,
            my_rights: MailboxRights {
                may_read_items: true,
                may_set_seen: true,
                ..MailboxRights::default()
            },
        };

        Ok(MailboxGetResponse {
            account_id: args.account_id,
            state: String::new(),
            list: vec![inbox],
            not_found: Vec::new(),
        })
    }

    /// `Email/get`: requested ids, or every message in the mailbox
    pub fn get_email(&self, args: EmailGetArgs) -> Result<EmailGetResponse> {
        let mailbox = args.account_id.mailbox()?;

        let ids: Vec<MessageId> = match &args.ids {
            Some(ids) => ids.iter().map(|id| MessageId::new(id.as_str())).collect(),
            None => self.storage.get_all_message_ids(Some(&mailbox), None)?,
        };
        let messages = self.storage.get_messages(&mailbox, &ids)?;

        let found: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        let not_found = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .map(|id| id.to_string())
            .collect();

        let list = messages
            .iter()
            .map(|m| to_email(m, args.fetch_html_body_values, args.fetch_text_body_values))
            .collect();

        Ok(EmailGetResponse {
            account_id: args.account_id,
            state: String::new(),
            list,
            not_found,
        })
    }

    /// `Email/query`: ids in one folder, in storage order
    pub fn query_email(&self, args: EmailQueryArgs) -> Result<EmailQueryResponse> {
        let mailbox = args.account_id.mailbox()?;

        let folder = match args.filter.and_then(|f| f.in_mailbox) {
            Some(id) => id.parse::<ReservedLabel>().map_err(|_| {
                MailError::InvalidArguments(format!("Unknown mailbox id {:?}", id))
            })?,
            None => ReservedLabel::All,
        };

        let ids = self.storage.get_all_message_ids(Some(&mailbox), Some(folder))?;
        debug!("[JMAP] Query {} folder {} -> {} ids", mailbox, folder.name(), ids.len());

        Ok(EmailQueryResponse {
            account_id: args.account_id,
            query_state: String::new(),
            can_calculate_changes: false,
            position: 0,
            ids: ids.into_iter().map(|id| id.0).collect(),
        })
    }

    /// `Email/set`: create drafts and destroy messages.
    ///
    /// Every requested destroy is reported destroyed; delete is idempotent.
    pub fn set_email(&self, args: EmailSetArgs) -> Result<EmailSetResponse> {
        let mailbox = args.account_id.mailbox()?;

        let creates: Vec<(String, EmailCreate)> = args.create.unwrap_or_default().into_iter().collect();
        let outcomes = creates
            .into_par_iter()
            .map(|(key, create)| {
                let outcome = match self.create_draft(&mailbox, create) {
                    Ok(id) => Ok(id),
                    Err(e) if e.is_client_error() => Err(SetError::new("invalidArguments", e.to_string())),
                    Err(e) => return Err(e),
                };
                Ok((key, outcome))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut created = BTreeMap::new();
        let mut not_created = BTreeMap::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(id) => {
                    created.insert(key, Created { id: id.0 });
                }
                Err(error) => {
                    not_created.insert(key, error);
                }
            }
        }

        let destroyed = args.destroy.unwrap_or_default();
        destroyed
            .par_iter()
            .try_for_each(|id| self.storage.delete(&mailbox, &MessageId::new(id.as_str())))?;

        Ok(EmailSetResponse {
            account_id: args.account_id,
            new_state: String::new(),
            created,
            not_created,
            destroyed,
        })
    }

    /// Build and store a draft: labeled Drafts, marked Seen, sent from the
    /// mailbox's own address
    fn create_draft(&self, mailbox: &Mailbox, create: EmailCreate) -> Result<MessageId> {
        let text = join_body_values(&create.text_body, &create.body_values)?;
        let html = join_body_values(&create.html_body, &create.body_values)?;

        let id = self.storage.generate_id();
        let mut builder = Message::builder(id.clone())
            .label(ReservedLabel::Drafts)
            .marker(Marker::Seen)
            .from(EmailAddress::new(mailbox.id()))
            .to(create.to.unwrap_or_default().into_iter().map(Into::into).collect())
            .date(Utc::now());
        if let Some(subject) = create.subject {
            builder = builder.subject(subject);
        }
        if let Some(text) = text {
            builder = builder.text(text);
        }
        if let Some(html) = html {
            builder = builder.html(html);
        }

        let mut message = builder.build();
        self.storage.put_message(mailbox, &id, &mut message)?;
        debug!("[JMAP] Created draft {} in {}", id, mailbox);
        Ok(id)
    }

    /// `EmailSubmission/set`: send stored messages, reporting each outcome
    pub fn set_email_submission(
        &self,
        args: EmailSubmissionSetArgs,
    ) -> Result<EmailSubmissionSetResponse> {
        let mailbox = args.account_id.mailbox()?;

        let submissions: Vec<(String, EmailSubmissionCreate)> =
            args.create.unwrap_or_default().into_iter().collect();
        let outcomes = submissions
            .into_par_iter()
            .map(|(key, submission)| {
                let id = MessageId::new(submission.email_id);
                let outcome = match self.storage.get_message(&mailbox, &id) {
                    Ok(message) if self.sending.send(&message) => Ok(()),
                    Ok(_) => Err(SetError::default()),
                    Err(e @ MailError::MessageNotFound { .. }) => {
                        Err(SetError::new("notFound", e.to_string()))
                    }
                    Err(e) => return Err(e),
                };
                Ok((key, outcome))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut created = BTreeMap::new();
        let mut not_created = BTreeMap::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    created.insert(key.clone(), Created { id: key });
                }
                Err(error) => {
                    not_created.insert(key, error);
                }
            }
        }

        info!(
            "[JMAP] Submission for {}: {} sent, {} failed",
            mailbox,
            created.len(),
            not_created.len()
        );

        Ok(EmailSubmissionSetResponse {
            account_id: args.account_id,
            created,
            not_created,
        })
    }
}

/// Concatenate the body values a body part list points at.
/// `None` when the list is empty.
fn join_body_values(
    parts: &[BodyPart],
    values: &BTreeMap<String, BodyValue>,
) -> Result<Option<String>> {
    if parts.is_empty() {
        return Ok(None);
    }
    let mut joined = String::new();
    for part in parts {
        let value = values.get(&part.part_id).ok_or_else(|| {
            MailError::InvalidArguments(format!("No body value for part {:?}", part.part_id))
        })?;
        joined.push_str(&value.value);
    }
    Ok(Some(joined))
}

/// Map a stored message to its JMAP form
fn to_email(message: &Message, fetch_html: bool, fetch_text: bool) -> Email {
    let mut body_values = BTreeMap::new();
    let mut html_body = Vec::new();
    let mut text_body = Vec::new();

    if fetch_html {
        let html = message.html.clone().unwrap_or_default();
        html_body.push(BodyPart {
            part_id: HTML_PART_ID.to_string(),
            size: Some(html.len() as u64),
            mime_type: Some("text/html".to_string()),
        });
        body_values.insert(
            HTML_PART_ID.to_string(),
            BodyValue {
                value: html,
                is_truncated: false,
            },
        );
    }
    if fetch_text {
        let text = message.text.clone().unwrap_or_default();
        text_body.push(BodyPart {
            part_id: TEXT_PART_ID.to_string(),
            size: Some(text.len() as u64),
            mime_type: Some("text/plain".to_string()),
        });
        body_values.insert(
            TEXT_PART_ID.to_string(),
            BodyValue {
                value: text,
                is_truncated: false,
            },
        );
    }

    Email {
        id: message.id.to_string(),
        mailbox_ids: message
            .labels
            .iter()
            .map(|label| (label.to_string(), true))
            .collect(),
        keywords: message
            .markers
            .iter()
            .map(|marker| (marker.keyword().to_string(), true))
            .collect(),
        received_at: message.date,
        sent_at: message.date,
        size: message.size,
        message_id: Vec::new(),
        in_reply_to: message.in_reply_to.iter().cloned().collect(),
        sender: Vec::new(),
        from: vec![JmapAddress::from(&message.from)],
        to: message.to.iter().map(JmapAddress::from).collect(),
        cc: Vec::new(),
        bcc: Vec::new(),
        reply_to: Vec::new(),
        subject: message.subject.clone(),
        body_values,
        html_body,
        text_body,
    }
}
