//! JMAP protocol adapter
//!
//! Implements `Mailbox/get`, `Email/get`, `Email/query`, `Email/set`, and
//! `EmailSubmission/set` against [`MailStorage`](crate::storage::MailStorage).
//! Route registration and bearer-token validation belong to the HTTP layer
//! in front of [`handle_request`].

mod account;
mod dispatch;
mod service;
mod session;
pub mod types;

pub use account::AccountId;
pub use dispatch::{handle_request, method_error};
pub use service::MailboxService;
pub use session::{CORE_CAPABILITY, MAIL_CAPABILITY, Session};
pub use types::{Invocation, Method, Request, Response};
