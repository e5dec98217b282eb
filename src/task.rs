// Copyright (C) 2026 vipr contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::cmp::min;
use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer, Serializer};
use tracing::{debug, warn};

use super::data::ResourceRef;
use super::error::*;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Backend-reported state of a task. Only `Ready` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Error,
    /// Any other transient state the controller might report.
    Other(String),
}

impl TaskState {
    /// Parse the `state` string of a task reply.
    pub fn parse(s: &str) -> TaskState {
        match s.to_lowercase().as_str() {
            "pending" => TaskState::Pending,
            "ready" => TaskState::Ready,
            "error" => TaskState::Error,
            _ => TaskState::Other(s.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match *self {
            TaskState::Ready | TaskState::Error => true,
            _ => false,
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Ready => write!(f, "ready"),
            TaskState::Error => write!(f, "error"),
            TaskState::Other(ref s) => write!(f, "{}", s),
        }
    }
}

fn str_to_task_state<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<TaskState, D::Error> {
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(match s {
        Some(s) => TaskState::parse(&s),
        None => TaskState::Pending,
    })
}

fn task_state_to_str<S: Serializer>(
    state: &TaskState,
    serializer: S,
) -> ::std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&state.to_string())
}

/// Error details attached to a failed task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskServiceError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub details: Option<String>,
}

/// An asynchronous operation tracked by the controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub op_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// The resource the task acts upon.
    #[serde(default)]
    pub resource: Option<ResourceRef>,
    #[serde(default)]
    #[serde(deserialize_with = "str_to_task_state")]
    #[serde(serialize_with = "task_state_to_str")]
    pub state: TaskState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub service_error: Option<TaskServiceError>,
}

impl Task {
    /// URI of the resource the task acts upon.
    pub fn resource_uri(&self) -> Result<&str> {
        match self.resource {
            Some(ref r) if !r.id.is_empty() => Ok(&r.id),
            _ => Err(ViprError::BackendBug(format!(
                "Task {} carries no resource reference",
                self.op_id
            ))),
        }
    }

    /// What the controller said went wrong, verbatim.
    pub fn error_detail(&self) -> String {
        if let Some(ref se) = self.service_error {
            if let Some(ref d) = se.details {
                return d.to_string();
            }
        }
        self.message
            .as_ref()
            .or_else(|| self.description.as_ref())
            .cloned()
            .unwrap_or_else(|| "no error detail reported".to_string())
    }
}

/// How waiting for a task ended.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    /// The task reached `ready`.
    Completed(Task),
    /// The task reached `error`.
    Failed { op_id: String, detail: String },
    /// No terminal state was observed before the deadline. The task may
    /// still complete on the controller.
    TimedOut,
}

impl TaskResult {
    pub fn is_completed(&self) -> bool {
        match *self {
            TaskResult::Completed(_) => true,
            _ => false,
        }
    }

    /// Turn a non-completed outcome into an error, for callers that cannot
    /// go on without the task having finished. `op_id` names the task in
    /// the time out message.
    pub fn into_result(self, op_id: &str) -> Result<Task> {
        match self {
            TaskResult::Completed(t) => Ok(t),
            TaskResult::Failed { op_id, detail } => {
                Err(ViprError::TaskFailed { op_id, detail })
            }
            TaskResult::TimedOut => Err(ViprError::TimeOut(format!(
                "Operation timed out waiting for task {}",
                op_id
            ))),
        }
    }
}

/// Anything that can report the current state of a task.
pub trait TaskSource {
    /// `Ok(None)` when the controller returned no data.
    fn fetch_task(
        &mut self,
        resource_uri: &str,
        op_id: &str,
    ) -> Result<Option<Task>>;
}

/// Blocks until a task completes, fails or the timeout elapses.
///
/// The task is fetched once, then once per `interval` until a terminal
/// state shows up. The deadline is checked after each fetch, so an in-flight
/// request is never interrupted and the number of fetches stays within
/// `timeout / interval + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskPoller {
    timeout: Duration,
    interval: Duration,
}

impl Default for TaskPoller {
    fn default() -> Self {
        TaskPoller {
            timeout: DEFAULT_TASK_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TaskPoller {
    pub fn new(timeout: Duration, interval: Duration) -> TaskPoller {
        TaskPoller { timeout, interval }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn with_timeout(self, timeout: Duration) -> TaskPoller {
        TaskPoller { timeout, ..self }
    }

    pub fn wait<S: TaskSource + ?Sized>(
        &self,
        source: &mut S,
        resource_uri: &str,
        op_id: &str,
    ) -> Result<TaskResult> {
        if resource_uri.is_empty() || op_id.is_empty() {
            return Err(ViprError::InvalidArgument(format!(
                "Both resource URI and operation id are required, got \
                 '{}' and '{}'",
                resource_uri, op_id
            )));
        }
        if self.timeout == Duration::from_secs(0) {
            return Err(ViprError::InvalidArgument(
                "Task timeout should be positive".to_string(),
            ));
        }

        // A timeout too large to represent as an instant never expires.
        let deadline = Instant::now().checked_add(self.timeout);
        let mut fetches: u32 = 0;
        loop {
            fetches += 1;
            match source.fetch_task(resource_uri, op_id)? {
                Some(task) => match task.state {
                    TaskState::Ready => {
                        debug!("Task {} is ready after {} polls", op_id, fetches);
                        return Ok(TaskResult::Completed(task));
                    }
                    TaskState::Error => {
                        let detail = task.error_detail();
                        warn!("Task {} is in ERROR state: {}", op_id, detail);
                        return Ok(TaskResult::Failed {
                            op_id: op_id.to_string(),
                            detail,
                        });
                    }
                    ref s => debug!("Task {} is {}", op_id, s),
                },
                None => debug!("Got no data for task {}", op_id),
            }

            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(
                            "Operation timed out: task {} of {} not finished \
                             after {:?}, {} polls",
                            op_id, resource_uri, self.timeout, fetches
                        );
                        return Ok(TaskResult::TimedOut);
                    }
                    sleep(min(self.interval, deadline - now));
                }
                None => sleep(self.interval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of replies, repeating the last one.
    struct ScriptedBackend {
        replies: VecDeque<Option<&'static str>>,
        last: Option<&'static str>,
        fetches: usize,
    }

    impl ScriptedBackend {
        fn new(replies: &[Option<&'static str>]) -> ScriptedBackend {
            ScriptedBackend {
                replies: replies.iter().cloned().collect(),
                last: None,
                fetches: 0,
            }
        }
    }

    impl TaskSource for ScriptedBackend {
        fn fetch_task(
            &mut self,
            resource_uri: &str,
            op_id: &str,
        ) -> Result<Option<Task>> {
            self.fetches += 1;
            if let Some(r) = self.replies.pop_front() {
                self.last = r;
            }
            Ok(self.last.map(|state| Task {
                op_id: op_id.to_string(),
                name: None,
                resource: Some(ResourceRef {
                    id: resource_uri.to_string(),
                    ..Default::default()
                }),
                state: TaskState::parse(state),
                message: Some(format!("task is {}", state)),
                description: None,
                service_error: None,
            }))
        }
    }

    fn fast_poller(timeout_ms: u64) -> TaskPoller {
        TaskPoller::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn ready_on_first_poll() {
        let mut b = ScriptedBackend::new(&[Some("ready")]);
        let r = fast_poller(1000).wait(&mut b, "fs-123", "op-456").unwrap();
        assert!(r.is_completed());
        assert_eq!(b.fetches, 1);
    }

    #[test]
    fn pending_twice_then_ready() {
        let mut b = ScriptedBackend::new(&[
            Some("pending"),
            Some("pending"),
            Some("ready"),
        ]);
        let r = fast_poller(10_000).wait(&mut b, "fs-123", "op-456").unwrap();
        match r {
            TaskResult::Completed(t) => {
                assert_eq!(t.op_id, "op-456");
                assert_eq!(t.resource_uri().unwrap(), "fs-123");
            }
            _ => panic!("expected Completed, got {:?}", r),
        }
        assert_eq!(b.fetches, 3);
    }

    #[test]
    fn error_stops_polling() {
        let mut b = ScriptedBackend::new(&[Some("pending"), Some("error")]);
        let r = fast_poller(1000).wait(&mut b, "fs-123", "op-456").unwrap();
        assert_eq!(
            r,
            TaskResult::Failed {
                op_id: "op-456".to_string(),
                detail: "task is error".to_string(),
            }
        );
        assert_eq!(b.fetches, 2);
    }

    #[test]
    fn missing_data_and_unknown_states_are_not_terminal() {
        let mut b = ScriptedBackend::new(&[
            None,
            Some("queued"),
            Some("PENDING"),
            Some("ready"),
        ]);
        let r = fast_poller(10_000).wait(&mut b, "fs-123", "op-456").unwrap();
        assert!(r.is_completed());
        assert_eq!(b.fetches, 4);
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let mut b = ScriptedBackend::new(&[Some("pending"), Some("ready")]);
        let poller = TaskPoller::new(
            Duration::from_secs(u64::MAX),
            Duration::from_millis(10),
        );
        let r = poller.wait(&mut b, "fs-123", "op-456").unwrap();
        assert!(r.is_completed());
        assert_eq!(b.fetches, 2);
    }

    #[test]
    fn gives_up_at_deadline() {
        let mut b = ScriptedBackend::new(&[Some("pending")]);
        let started = Instant::now();
        let r = fast_poller(100).wait(&mut b, "fs-123", "op-456").unwrap();
        assert_eq!(r, TaskResult::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(100));
        // 100ms / 10ms + 1
        assert!(b.fetches <= 11, "fetched {} times", b.fetches);
        assert!(b.fetches >= 2);
    }

    #[test]
    fn rejects_empty_ids() {
        let mut b = ScriptedBackend::new(&[Some("ready")]);
        assert!(fast_poller(100).wait(&mut b, "", "op-1").is_err());
        assert!(fast_poller(100).wait(&mut b, "fs-1", "").is_err());
        assert!(fast_poller(0).wait(&mut b, "fs-1", "op-1").is_err());
        assert_eq!(b.fetches, 0);
    }

    #[test]
    fn into_result_maps_outcomes() {
        let failed = TaskResult::Failed {
            op_id: "op-1".to_string(),
            detail: "pool full".to_string(),
        };
        match failed.into_result("op-1") {
            Err(ViprError::TaskFailed { op_id, detail }) => {
                assert_eq!(op_id, "op-1");
                assert_eq!(detail, "pool full");
            }
            r => panic!("unexpected {:?}", r),
        }
        match TaskResult::TimedOut.into_result("op-2") {
            Err(ViprError::TimeOut(m)) => assert!(m.contains("op-2")),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn error_detail_prefers_service_error() {
        let t: Task = serde_json::from_value(json!({
            "op_id": "op-1",
            "state": "error",
            "message": "Operation failed",
            "service_error": {"code": 12000, "details": "Pool is full"}
        }))
        .unwrap();
        assert_eq!(t.state, TaskState::Error);
        assert_eq!(t.error_detail(), "Pool is full");
    }
}
