//! JMAP request processing

use anyhow::Context;
use log::warn;
use rayon::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use super::service::MailboxService;
use super::types::{Invocation, Method, MethodError, Request, Response};
use crate::error::{MailError, Result};

/// Run every method call of a request and collect the responses in call
/// order.
///
/// Calls run concurrently and independently: a failing call produces an
/// `error` invocation and does not affect the others.
pub fn handle_request(service: &MailboxService, request: Request) -> Response {
    let method_responses = request
        .method_calls
        .par_iter()
        .map(|call| process_call(service, call))
        .collect();

    Response {
        method_responses,
        created_ids: BTreeMap::new(),
        session_state: String::new(),
    }
}

fn process_call(service: &MailboxService, call: &Invocation) -> Invocation {
    let Ok(method) = call.name().parse::<Method>() else {
        warn!("[JMAP] Unknown method {:?}", call.name());
        return error_invocation(
            call.call_id(),
            MethodError {
                error_type: "unknownMethod".to_string(),
                description: Some(format!("Unsupported method {}", call.name())),
            },
        );
    };

    match invoke(service, method, call.arguments()) {
        Ok(response) => Invocation(method.name().to_string(), response, call.call_id().to_string()),
        Err(e) => {
            warn!("[JMAP] {} failed: {:#}", method, e);
            error_invocation(call.call_id(), method_error(&e))
        }
    }
}

fn invoke(service: &MailboxService, method: Method, arguments: &Value) -> Result<Value> {
    match method {
        Method::MailboxGet => call(arguments, |args| service.get_mailbox(args)),
        Method::EmailGet => call(arguments, |args| service.get_email(args)),
        Method::EmailQuery => call(arguments, |args| service.query_email(args)),
        Method::EmailSet => call(arguments, |args| service.set_email(args)),
        Method::EmailSubmissionSet => call(arguments, |args| service.set_email_submission(args)),
    }
}

/// Decode arguments, run the handler, and encode its response
fn call<A, R>(arguments: &Value, handler: impl FnOnce(A) -> Result<R>) -> Result<Value>
where
    A: DeserializeOwned,
    R: Serialize,
{
    let args = A::deserialize(arguments).map_err(|e| MailError::InvalidArguments(e.to_string()))?;
    let response = handler(args)?;
    Ok(serde_json::to_value(response).context("Failed to encode method response")?)
}

/// JMAP error type for a failed call
pub fn method_error(error: &MailError) -> MethodError {
    let error_type = if error.is_client_error() {
        "invalidArguments"
    } else {
        "serverFail"
    };
    MethodError {
        error_type: error_type.to_string(),
        description: Some(error.to_string()),
    }
}

fn error_invocation(call_id: &str, error: MethodError) -> Invocation {
    // MethodError always serializes to an object
    let arguments = serde_json::to_value(error).unwrap_or(Value::Null);
    Invocation("error".to_string(), arguments, call_id.to_string())
}
