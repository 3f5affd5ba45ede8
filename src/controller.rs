use serde::Serialize;

use crate::service::SendFailure;

pub mod airports;
pub mod deals;
pub mod digest;
pub mod ingest;
pub mod notifications;
pub mod subscriptions;

/// JSON summary returned by the operator-triggered runs
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<SendFailure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_send_to: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
}

impl RunSummary {
    /// Nothing was sent, with the reason
    pub fn skipped(note: Option<&'static str>) -> Self {
        Self {
            ok: true,
            sent: Some(0),
            note,
            ..Default::default()
        }
    }

    pub fn delivered(sent: usize, failures: Vec<SendFailure>) -> Self {
        Self {
            ok: true,
            sent: Some(sent),
            failures: Some(failures),
            ..Default::default()
        }
    }
}
