// Execution Domain Model

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Execution ID (opaque, assigned by the platform)
pub type ExecutionId = String;

/// Remote execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Created,
    Queued,
    Dequeued,
    Running,
    Finished,
    Killed,
    Rejected,
    Error,
}

impl ExecutionStatus {
    /// No further transition happens once this returns true
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Finished
                | ExecutionStatus::Killed
                | ExecutionStatus::Rejected
                | ExecutionStatus::Error
        )
    }

    /// Failed terminal states: ERROR, KILLED and REJECTED
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Error | ExecutionStatus::Killed | ExecutionStatus::Rejected
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Created => write!(f, "CREATED"),
            ExecutionStatus::Queued => write!(f, "QUEUED"),
            ExecutionStatus::Dequeued => write!(f, "DEQUEUED"),
            ExecutionStatus::Running => write!(f, "RUNNING"),
            ExecutionStatus::Finished => write!(f, "FINISHED"),
            ExecutionStatus::Killed => write!(f, "KILLED"),
            ExecutionStatus::Rejected => write!(f, "REJECTED"),
            ExecutionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One log line emitted by a remote execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(
        timestamp: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: level.into(),
            message: message.into(),
        }
    }

    /// Parsed timestamp, None when the platform sent something that is not RFC 3339
    pub fn instant(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }

    pub fn is_error(&self) -> bool {
        self.level.eq_ignore_ascii_case("ERROR")
    }

    /// Chronological ordering. RFC 3339 timestamps come first, by instant and then
    /// by raw text; anything unparseable goes last in string order.
    pub fn cmp_timestamp(&self, other: &LogEntry) -> Ordering {
        let (a, b) = (self.instant(), other.instant());
        a.is_none()
            .cmp(&b.is_none())
            .then_with(|| a.cmp(&b))
            .then_with(|| self.timestamp.cmp(&other.timestamp))
    }
}

/// Status-change event reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub status: ExecutionStatus,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Timeline wrapper as returned by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTimeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

/// Remote execution record (what `GET /executions/{id}` returns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: ExecutionId,
    pub process_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<ExecutionTimeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Transport string; usually JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,
}

/// Response of an execution trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRef {
    pub execution_id: ExecutionId,
}

/// Error surfaced to observers when an execution ends in a failed state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub message: Option<String>,
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message),
            None => write!(f, "unknown error"),
        }
    }
}

/// Per-execution settings forwarded to the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_pool_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Remote-side timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ExecutionSettings {
    pub fn is_empty(&self) -> bool {
        self.agent_pool_slug.is_none() && self.callback_url.is_none() && self.timeout.is_none()
    }
}

/// Pass-through options of an asynchronous execution trigger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteOptions {
    pub initiated_by: Option<String>,
    pub tag: Option<String>,
    pub comment: Option<String>,
    pub settings: Option<ExecutionSettings>,
}

/// Everything the tracker knows about an execution at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    pub execution_id: ExecutionId,
    pub process_id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub logs: Vec<LogEntry>,
    pub timeline: Vec<TimelineEvent>,
    pub parameters: Option<serde_json::Value>,
    pub comment: Option<String>,
    pub return_value: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ExecutionSnapshot {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            process_id: None,
            status: None,
            logs: Vec::new(),
            timeline: Vec::new(),
            parameters: None,
            comment: None,
            return_value: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(ExecutionStatus::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ExecutionStatus; 8] = [
        ExecutionStatus::Created,
        ExecutionStatus::Queued,
        ExecutionStatus::Dequeued,
        ExecutionStatus::Running,
        ExecutionStatus::Finished,
        ExecutionStatus::Killed,
        ExecutionStatus::Rejected,
        ExecutionStatus::Error,
    ];

    #[test]
    fn test_terminal_and_failure_sets() {
        let terminal: Vec<_> = ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![
                &ExecutionStatus::Finished,
                &ExecutionStatus::Killed,
                &ExecutionStatus::Rejected,
                &ExecutionStatus::Error
            ]
        );

        for status in ALL {
            if status.is_failure() {
                assert!(status.is_terminal(), "{} failed but not terminal", status);
            }
        }
        assert!(!ExecutionStatus::Finished.is_failure());
    }

    #[test]
    fn test_status_wire_format() {
        let status: ExecutionStatus = serde_json::from_str("\"DEQUEUED\"").unwrap();
        assert_eq!(status, ExecutionStatus::Dequeued);
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Finished).unwrap(),
            "\"FINISHED\""
        );
        assert_eq!(ExecutionStatus::Rejected.to_string(), "REJECTED");
    }

    #[test]
    fn test_execution_deserializes_platform_payload() {
        let execution: Execution = serde_json::from_value(serde_json::json!({
            "id": "exec-1",
            "processId": "proc-1",
            "status": "ERROR",
            "timeline": {
                "events": [
                    {"status": "CREATED", "timestamp": "2025-01-01T00:00:00Z"},
                    {"status": "ERROR", "timestamp": "2025-01-01T00:00:01Z", "explanation": "boom"}
                ]
            },
            "returnValue": "{\"ok\":false}",
            "createdBy": "someone"
        }))
        .unwrap();

        assert_eq!(execution.process_id, "proc-1");
        assert_eq!(execution.timeline.unwrap().events.len(), 2);
        assert_eq!(execution.return_value.as_deref(), Some("{\"ok\":false}"));
    }

    #[test]
    fn test_log_ordering_uses_parsed_time() {
        // Same instant in different offsets must not compare by string
        let utc = LogEntry::new("2025-01-01T10:00:02Z", "INFO", "a");
        let offset = LogEntry::new("2025-01-01T11:00:01+01:00", "INFO", "b");
        assert_eq!(utc.cmp_timestamp(&offset), Ordering::Greater);
    }

    #[test]
    fn test_log_ordering_is_total_across_formats() {
        let stamps = [
            "2025-01-01T10:00:00Z",
            "2025-01-01T15:00:00+05:00",
            "2025-01-01T10:00:01Z",
            "2025-01-01T09:30:00+05:00",
            "2025-01-01 10:00:00",
            "yesterday",
            "1735725600",
            "2025-01-01T10:00:00.500Z",
        ];
        let entries: Vec<LogEntry> = stamps
            .iter()
            .map(|t| LogEntry::new(*t, "INFO", "m"))
            .collect();

        for a in &entries {
            assert_eq!(a.cmp_timestamp(a), Ordering::Equal);
            for b in &entries {
                assert_eq!(a.cmp_timestamp(b), b.cmp_timestamp(a).reverse());
                for c in &entries {
                    if a.cmp_timestamp(b).is_le() && b.cmp_timestamp(c).is_le() {
                        assert!(
                            a.cmp_timestamp(c).is_le(),
                            "{} {} {}",
                            a.timestamp,
                            b.timestamp,
                            c.timestamp
                        );
                    }
                }
            }
        }

        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| a.cmp_timestamp(b));
        let order: Vec<_> = sorted.iter().map(|l| l.timestamp.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "2025-01-01T09:30:00+05:00",
                "2025-01-01T10:00:00Z",
                "2025-01-01T15:00:00+05:00",
                "2025-01-01T10:00:00.500Z",
                "2025-01-01T10:00:01Z",
                "1735725600",
                "2025-01-01 10:00:00",
                "yesterday",
            ]
        );
    }
}
