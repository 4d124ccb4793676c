//! Request/response correlation.
//!
//! Calls are strictly sequential on a connection, so at most one call is
//! pending at a time. Ids are UUID v4 and never reissued by the same
//! correlator.

use std::collections::HashSet;

use super::message::{Params, Request, Response};
use crate::error::{MoltbotError, Result};

/// The call currently awaiting its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// Call id
    pub id: String,
    /// Method name
    pub method: String,
}

/// A response matched to its pending call.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The call that was answered
    pub call: PendingCall,
    /// The matching response
    pub response: Response,
}

/// Assigns call ids and matches responses to the pending call.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Option<PendingCall>,
    issued: HashSet<String>,
}

impl Correlator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently pending call, if any.
    pub fn pending(&self) -> Option<&PendingCall> {
        self.pending.as_ref()
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Create a request with a fresh id and mark it pending.
    pub fn issue(&mut self, method: &str, params: Params) -> Result<Request> {
        if let Some(pending) = &self.pending {
            return Err(MoltbotError::Protocol(format!(
                "cannot send {method} while {} is pending",
                pending.method
            )));
        }

        let id = loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.issued.insert(id.clone()) {
                break id;
            }
        };

        self.pending = Some(PendingCall {
            id: id.clone(),
            method: method.to_string(),
        });

        Ok(Request::new(id, method, params))
    }

    /// Match a response against the pending call.
    ///
    /// Returns `None` (and keeps the call pending) when the id does not match.
    pub fn resolve(&mut self, response: Response) -> Option<Resolved> {
        match &self.pending {
            Some(pending) if pending.id == response.id => {
                let call = self.pending.take()?;
                Some(Resolved { call, response })
            },
            _ => None,
        }
    }
}
