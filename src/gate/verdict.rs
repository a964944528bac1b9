//! Admission verdicts and their wire mapping.

use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};

use crate::error::Error;

/// Reason returned verbatim to the API caller when a live instance already exists
pub const THERE_CAN_BE_ONLY_ONE: &str =
    "there can be only one instance of this object per namespace";

/// Outcome of a single gate evaluation
#[derive(Debug)]
pub enum Verdict {
    /// Admit the request
    Allow,
    /// Policy violation, carrying the human-readable reason
    Deny(String),
    /// The gate could not decide, e.g. the list call failed
    Error(Error),
}

impl Verdict {
    /// The singleton policy denial
    pub fn only_one() -> Self {
        Verdict::Deny(THERE_CAN_BE_ONLY_ONE.to_string())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allow => "allowed",
            Verdict::Deny(_) => "denied",
            Verdict::Error(_) => "errored",
        }
    }

    /// Build the admission response for `request`.
    ///
    /// - `Allow` is an allowed response with no message
    /// - `Deny` is a denied response with code 403 and the reason as message
    /// - `Error` is a denied response with the error's status code and cause
    pub fn into_response(self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let response = AdmissionResponse::from(request);
        match self {
            Verdict::Allow => response,
            Verdict::Deny(reason) => {
                let mut response = response.deny(reason);
                response.result.code = 403;
                response.result.reason = "Forbidden".to_string();
                response
            }
            Verdict::Error(err) => {
                let mut response = response.deny(err.to_string());
                response.result.code = err.status_code();
                response.result.reason = if err.status_code() >= 500 {
                    "InternalError".to_string()
                } else {
                    "BadRequest".to_string()
                };
                response
            }
        }
    }
}

impl From<Error> for Verdict {
    fn from(err: Error) -> Self {
        Verdict::Error(err)
    }
}
