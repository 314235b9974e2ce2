//! Lifecycle tracking for tool calls surfaced by the stream.
//!
//! The marker protocol carries no call ids: a result or error line belongs
//! to the most recently started call that is still executing, matching the
//! backend's guarantee that it resolves one tool call before starting the
//! next within a single stream. Ids are generated locally so the UI can
//! upsert call snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle state of one tool call.
///
/// `Pending` exists for UI anticipation but is never produced by the stream:
/// the backend only reports calls once they begin executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

/// Snapshot of a single tool invocation, kept for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub status: ToolStatus,
    /// Flat parameter list, in the order the marker carried it.
    pub params: Vec<(String, String)>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ToolCall {
    /// Wall-clock duration, if the call has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        self.ended_at.map(|end| end - self.started_at)
    }
}

/// Result text stamped onto calls the stream left open at session end; the
/// UI contract forbids a call that stays visually in progress forever.
pub const SYNTHETIC_COMPLETION_RESULT: &str = "Execution completed";

/// Ordered history of tool calls for one session. Calls are never removed;
/// terminal calls are never mutated again.
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    calls: Vec<ToolCall>,
}

impl ToolCallTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new call in `Executing` state and return its snapshot.
    pub fn start(&mut self, name: String, params: Vec<(String, String)>) -> ToolCall {
        let call = ToolCall {
            id: Uuid::new_v4().to_string(),
            name,
            status: ToolStatus::Executing,
            params,
            result: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        };
        self.calls.push(call.clone());
        call
    }

    /// Complete the most recent executing call. `None` means the marker was
    /// an orphan (no call open) and must be discarded by the caller.
    pub fn resolve_success(&mut self, result: String) -> Option<ToolCall> {
        let call = self.last_executing_mut()?;
        call.status = ToolStatus::Completed;
        call.result = Some(result);
        call.ended_at = Some(Utc::now());
        Some(call.clone())
    }

    /// Fail the most recent executing call. `None` means orphan.
    pub fn resolve_error(&mut self, error: String) -> Option<ToolCall> {
        let call = self.last_executing_mut()?;
        call.status = ToolStatus::Failed;
        call.error = Some(error);
        call.ended_at = Some(Utc::now());
        Some(call.clone())
    }

    /// True while at least one call is executing.
    #[must_use]
    pub fn any_executing(&self) -> bool {
        self.calls
            .iter()
            .any(|c| c.status == ToolStatus::Executing)
    }

    /// Force-complete every call the stream left open, returning the
    /// snapshots that changed.
    pub fn finalize_open(&mut self) -> Vec<ToolCall> {
        let now = Utc::now();
        let mut changed = Vec::new();
        for call in &mut self.calls {
            if call.status == ToolStatus::Executing {
                call.status = ToolStatus::Completed;
                call.result = Some(SYNTHETIC_COMPLETION_RESULT.to_string());
                call.ended_at = Some(now);
                changed.push(call.clone());
            }
        }
        changed
    }

    /// All calls observed so far, in start order.
    #[must_use]
    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }

    fn last_executing_mut(&mut self) -> Option<&mut ToolCall> {
        self.calls
            .iter_mut()
            .rev()
            .find(|c| c.status == ToolStatus::Executing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_opens_executing_call_with_fresh_id() {
        let mut tracker = ToolCallTracker::new();
        let a = tracker.start("web_search".to_string(), vec![]);
        let b = tracker.start("weather".to_string(), vec![]);
        assert_eq!(a.status, ToolStatus::Executing);
        assert_ne!(a.id, b.id);
        assert!(tracker.any_executing());
    }

    #[test]
    fn result_resolves_most_recent_open_call() {
        let mut tracker = ToolCallTracker::new();
        tracker.start("web_search".to_string(), vec![]);
        let second = tracker.start("weather".to_string(), vec![]);

        let resolved = tracker
            .resolve_success("sunny".to_string())
            .expect("open call");
        assert_eq!(resolved.id, second.id);
        assert_eq!(resolved.status, ToolStatus::Completed);
        assert_eq!(resolved.result.as_deref(), Some("sunny"));
        assert!(resolved.ended_at.is_some());

        // The first call is still open.
        assert!(tracker.any_executing());
    }

    #[test]
    fn error_marks_call_failed() {
        let mut tracker = ToolCallTracker::new();
        tracker.start("file_write".to_string(), vec![]);
        let failed = tracker
            .resolve_error("permission denied".to_string())
            .expect("open call");
        assert_eq!(failed.status, ToolStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("permission denied"));
        assert!(!tracker.any_executing());
    }

    #[test]
    fn orphan_result_is_rejected() {
        let mut tracker = ToolCallTracker::new();
        assert!(tracker.resolve_success("stray".to_string()).is_none());

        tracker.start("weather".to_string(), vec![]);
        tracker.resolve_success("ok".to_string());
        assert!(tracker.resolve_success("stray".to_string()).is_none());
    }

    #[test]
    fn terminal_calls_are_never_mutated_again() {
        let mut tracker = ToolCallTracker::new();
        tracker.start("weather".to_string(), vec![]);
        let first = tracker.resolve_success("18°C".to_string()).expect("open");

        tracker.start("weather".to_string(), vec![]);
        tracker.resolve_error("boom".to_string());

        let calls = tracker.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], first);
    }

    #[test]
    fn finalize_completes_open_calls_synthetically() {
        let mut tracker = ToolCallTracker::new();
        tracker.start("web_search".to_string(), vec![]);
        tracker.resolve_success("done".to_string());
        tracker.start("weather".to_string(), vec![]);

        let changed = tracker.finalize_open();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "weather");
        assert_eq!(changed[0].status, ToolStatus::Completed);
        assert_eq!(
            changed[0].result.as_deref(),
            Some(SYNTHETIC_COMPLETION_RESULT)
        );
        assert!(!tracker.any_executing());
        assert!(tracker.finalize_open().is_empty());
    }
}
