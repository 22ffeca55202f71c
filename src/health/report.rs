//! Run results and their wire representation.
//!
//! # Wire Format
//! ```text
//! {
//!  "status": "ok" | "warn" | "crit",
//!  "summary": "<fixed text for the status tier>",
//!  "details": [
//!   { "description": .., "test_status": .., "result": .., "runtime": <ms> }
//!  ]
//! }
//! ```
//!
//! # Design Decisions
//! - Pretty-printed with a single-space indent for compatibility with
//!   existing consumers
//! - Serialization never fails outward; a fixed diagnostic body is used instead

use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Payload recorded for a probe that did not finish before the deadline.
pub const TIMEOUT_MESSAGE: &str = "The test didn't complete before the alotted time frame.";

/// Payload recorded for a probe whose task panicked.
pub const PANIC_MESSAGE: &str = "The test panicked before completing.";

/// Payload recorded when a run was torn down before finishing.
pub const INTERRUPTED_MESSAGE: &str = "The health run was interrupted before completing.";

/// Body used when a run result could not be serialized.
pub const SERIALIZE_FAILURE_MESSAGE: &str =
    "Could not create JSON response. Test results contained a circular reference.";

/// Severity of a single probe outcome or of a whole run.
///
/// Ordering follows severity: `Ok < Warn < Crit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warn,
    Crit,
}

impl Status {
    /// Fixed summary text for this tier.
    pub fn summary(self) -> &'static str {
        match self {
            Status::Ok => "No issues to report. All tests passed without error",
            Status::Warn => {
                "Some non-critical tests encountered issues. See the \"details\" object for specifics."
            }
            Status::Crit => {
                "A critical test item encountered an error. Please investigate this. See the \"details\" object for specifics."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Warn => "warn",
            Status::Crit => "crit",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe within one run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub description: String,
    #[serde(rename = "test_status")]
    pub status: Status,
    /// Success payload, or the error value when the probe failed.
    pub result: Value,
    #[serde(serialize_with = "serialize_millis")]
    pub runtime: Duration,
}

fn serialize_millis<S: Serializer>(runtime: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(runtime.as_millis().min(u64::MAX as u128) as u64)
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    status: Status,
    summary: &'static str,
    details: Vec<ProbeOutcome>,
}

impl RunReport {
    /// An empty, healthy report.
    pub fn new() -> Self {
        Self {
            status: Status::Ok,
            summary: Status::Ok.summary(),
            details: Vec::new(),
        }
    }

    /// Append an outcome and raise the aggregate status if needed.
    ///
    /// The aggregate only ever moves up in severity, so a `crit` run stays
    /// `crit` whatever is folded in afterwards.
    pub fn record(&mut self, outcome: ProbeOutcome) {
        if outcome.status > self.status {
            self.status = outcome.status;
            self.summary = outcome.status.summary();
        }
        self.details.push(outcome);
    }

    /// Report for a run that was torn down before producing a result.
    pub fn interrupted() -> Self {
        let mut report = Self::new();
        report.record(ProbeOutcome {
            description: "health run".to_string(),
            status: Status::Crit,
            result: Value::from(INTERRUPTED_MESSAGE),
            runtime: Duration::ZERO,
        });
        report
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn summary(&self) -> &'static str {
        self.summary
    }

    pub fn details(&self) -> &[ProbeOutcome] {
        &self.details
    }

    /// Serialize to the wire body.
    pub fn to_wire(&self) -> String {
        render_pretty(self)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// The finalized answer delivered to every caller of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReply {
    pub status: Status,
    pub body: String,
}

impl HealthReply {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            status: report.status(),
            body: report.to_wire(),
        }
    }
}

/// Pretty-print with a one-space indent, falling back to a fixed message.
pub(crate) fn render_pretty<T: Serialize + ?Sized>(value: &T) -> String {
    let mut buf = Vec::with_capacity(256);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);

    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| SERIALIZE_FAILURE_MESSAGE.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize health report");
            SERIALIZE_FAILURE_MESSAGE.to_string()
        }
    }
}
