//! JMAP request, response, and object shapes
//!
//! Only the fields this server reads or writes are modeled. Unknown request
//! fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::AccountId;
use crate::models::EmailAddress;

/// A method call or response: `[name, arguments, call id]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation(pub String, pub Value, pub String);

impl Invocation {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn arguments(&self) -> &Value {
        &self.1
    }

    pub fn call_id(&self) -> &str {
        &self.2
    }
}

/// A JMAP API request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub using: Vec<String>,
    pub method_calls: Vec<Invocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_ids: Option<BTreeMap<String, String>>,
}

/// A JMAP API response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub method_responses: Vec<Invocation>,
    pub created_ids: BTreeMap<String, String>,
    pub session_state: String,
}

/// The methods this server implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    MailboxGet,
    EmailGet,
    EmailQuery,
    EmailSet,
    EmailSubmissionSet,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::MailboxGet,
        Method::EmailGet,
        Method::EmailQuery,
        Method::EmailSet,
        Method::EmailSubmissionSet,
    ];

    /// Wire name of the method
    pub fn name(self) -> &'static str {
        match self {
            Method::MailboxGet => "Mailbox/get",
            Method::EmailGet => "Email/get",
            Method::EmailQuery => "Email/query",
            Method::EmailSet => "Email/set",
            Method::EmailSubmissionSet => "EmailSubmission/set",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error object of an `error` method response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-item failure in a `/set` response. An empty object when no detail
/// is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetError {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SetError {
    pub fn new(error_type: &str, description: impl Into<String>) -> Self {
        Self {
            error_type: Some(error_type.to_string()),
            description: Some(description.into()),
        }
    }
}

/// An address in JMAP form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JmapAddress {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

impl From<&EmailAddress> for JmapAddress {
    fn from(address: &EmailAddress) -> Self {
        Self {
            name: address.name.clone(),
            email: address.address.clone(),
        }
    }
}

impl From<JmapAddress> for EmailAddress {
    fn from(address: JmapAddress) -> Self {
        Self {
            address: address.email,
            name: address.name,
        }
    }
}

/// Rights the caller has on a mailbox
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxRights {
    pub may_read_items: bool,
    pub may_add_items: bool,
    pub may_remove_items: bool,
    pub may_set_seen: bool,
    pub may_set_keywords: bool,
    pub may_create_child: bool,
    pub may_rename: bool,
    pub may_delete: bool,
    pub may_submit: bool,
}

/// A JMAP Mailbox object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JmapMailbox {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub role: Option<String>,
    pub sort_order: u32,
    pub total_emails: usize,
    pub unread_emails: usize,
    pub total_threads: usize,
    pub unread_threads: usize,
    pub is_subscribed: bool,
    pub my_rights: MailboxRights,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxGetArgs {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxGetResponse {
    pub account_id: AccountId,
    pub state: String,
    pub list: Vec<JmapMailbox>,
    pub not_found: Vec<String>,
}

/// A body part reference: into `bodyValues` on create, describing a
/// synthesized body on get
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPart {
    pub part_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyValue {
    pub value: String,
    #[serde(default)]
    pub is_truncated: bool,
}

/// A JMAP Email object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub mailbox_ids: BTreeMap<String, bool>,
    pub keywords: BTreeMap<String, bool>,
    pub received_at: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
    pub size: u64,
    pub message_id: Vec<String>,
    pub in_reply_to: Vec<String>,
    pub sender: Vec<JmapAddress>,
    pub from: Vec<JmapAddress>,
    pub to: Vec<JmapAddress>,
    pub cc: Vec<JmapAddress>,
    pub bcc: Vec<JmapAddress>,
    pub reply_to: Vec<JmapAddress>,
    pub subject: Option<String>,
    pub body_values: BTreeMap<String, BodyValue>,
    pub html_body: Vec<BodyPart>,
    pub text_body: Vec<BodyPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailGetArgs {
    pub account_id: AccountId,
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default, rename = "fetchHTMLBodyValues")]
    pub fetch_html_body_values: bool,
    #[serde(default)]
    pub fetch_text_body_values: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailGetResponse {
    pub account_id: AccountId,
    pub state: String,
    pub list: Vec<Email>,
    pub not_found: Vec<String>,
}

/// The one supported filter shape
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFilter {
    #[serde(default)]
    pub in_mailbox: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailQueryArgs {
    pub account_id: AccountId,
    #[serde(default)]
    pub filter: Option<EmailFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailQueryResponse {
    pub account_id: AccountId,
    pub query_state: String,
    pub can_calculate_changes: bool,
    pub position: usize,
    pub ids: Vec<String>,
}

/// A draft to create through `Email/set`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCreate {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub to: Option<Vec<JmapAddress>>,
    #[serde(default)]
    pub text_body: Vec<BodyPart>,
    #[serde(default)]
    pub html_body: Vec<BodyPart>,
    #[serde(default)]
    pub body_values: BTreeMap<String, BodyValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSetArgs {
    pub account_id: AccountId,
    #[serde(default)]
    pub create: Option<BTreeMap<String, EmailCreate>>,
    #[serde(default)]
    pub destroy: Option<Vec<String>>,
}

/// Server-assigned id of a created object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSetResponse {
    pub account_id: AccountId,
    pub new_state: String,
    pub created: BTreeMap<String, Created>,
    pub not_created: BTreeMap<String, SetError>,
    pub destroyed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSubmissionCreate {
    pub email_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSubmissionSetArgs {
    pub account_id: AccountId,
    #[serde(default)]
    pub create: Option<BTreeMap<String, EmailSubmissionCreate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSubmissionSetResponse {
    pub account_id: AccountId,
    pub created: BTreeMap<String, Created>,
    pub not_created: BTreeMap<String, SetError>,
}
