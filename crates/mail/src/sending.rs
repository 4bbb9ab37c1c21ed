//! Outbound sending service
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::config::SendingCredentials;
use crate::models::Message;

/// Hands a stored message to an outbound transport.
///
/// Only success or failure is reported; the caller records failures per
/// submission.
pub trait SendingService: Send + Sync {
    fn send(&self, message: &Message) -> bool;
}

/// Body of a Resend `POST /emails` call
#[derive(Debug, Serialize, PartialEq)]
struct SendRequest<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

impl<'a> SendRequest<'a> {
    /// Build the request body, `None` when the message has no recipient
    fn from_message(message: &'a Message) -> Option<Self> {
        if message.to.is_empty() {
            return None;
        }
        Some(Self {
            from: message.from.display(),
            to: message.to.iter().map(|a| a.address.as_str()).collect(),
            subject: message.subject.as_deref().unwrap_or_default(),
            text: message.text.as_deref().unwrap_or_default(),
            html: message.html.as_deref().unwrap_or_default(),
        })
    }
}

/// Sending service backed by the Resend HTTP API
pub struct ResendClient {
    api_key: String,
    endpoint: String,
}

impl ResendClient {
    /// Resend API endpoint for sending one email
    const DEFAULT_ENDPOINT: &'static str = "https://api.resend.com/emails";

    pub fn new(credentials: SendingCredentials) -> Self {
        Self {
            api_key: credentials.api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Send to a different endpoint (a local relay or a test server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn post(&self, request: &SendRequest<'_>) -> Result<()> {
        ureq::post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(request)
            .context("Failed to send email request")?;
        Ok(())
    }
}

impl SendingService for ResendClient {
    fn send(&self, message: &Message) -> bool {
        let Some(request) = SendRequest::from_message(message) else {
            warn!("[SEND] Message {} has no recipients", message.id);
            return false;
        };

        match self.post(&request) {
            Ok(()) => {
                info!("[SEND] Sent message {} to {} recipients", message.id, request.to.len());
                true
            }
            Err(e) => {
                warn!("[SEND] Failed to send message {}: {:#}", message.id, e);
                false
            }
        }
    }
}
