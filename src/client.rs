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

use std::time::Duration;

use serde_json::{self, Value};
use tracing::{debug, info, warn};

use super::config::ViprConfig;
use super::data::{list_field, ResourceKind, SearchHit};
use super::error::*;
use super::retry::{self, Reauthenticate};
use super::session::{Credentials, Session};
use super::task::{Task, TaskPoller, TaskResult, TaskSource};
use super::transport::{HttpTransport, Method, RestTransport};

/// Represent the connection to a controller.
///
/// The client owns its [`Session`][1]: it logs in on first use, drops the
/// session whenever the controller rejects it and logs in again on demand.
/// Methods take `&mut self`, so one client is never used by two callers at
/// once; run one client per thread when concurrency is needed.
///
/// [1]: struct.Session.html
pub struct Client<T: RestTransport = HttpTransport> {
    tp: T,
    credentials: Credentials,
    session: Option<Session>,
    poller: TaskPoller,
}

impl Client<HttpTransport> {
    /// Create a client for the controller described by `cfg`.
    ///
    /// No request is sent until the first call.
    pub fn new(cfg: &ViprConfig) -> Result<Client> {
        let tp = HttpTransport::new(
            &cfg.hostname,
            cfg.port,
            cfg.verify_tls,
            Some(cfg.request_timeout),
        )?;
        Ok(Client::with_transport(
            tp,
            Credentials::new(&cfg.username, &cfg.password),
            TaskPoller::new(cfg.task_timeout, cfg.poll_interval),
        ))
    }
}

impl<T: RestTransport> Client<T> {
    pub fn with_transport(
        tp: T,
        credentials: Credentials,
        poller: TaskPoller,
    ) -> Client<T> {
        Client {
            tp,
            credentials,
            session: None,
            poller,
        }
    }

    pub fn transport(&self) -> &T {
        &self.tp
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.tp
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn poller(&self) -> TaskPoller {
        self.poller
    }

    pub fn set_poller(&mut self, poller: TaskPoller) {
        self.poller = poller;
    }

    /// Log in, replacing the current session if any.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::Unauthorized`][1] credentials rejected.
    ///
    /// [1]: enum.ViprError.html#variant.Unauthorized
    pub fn authenticate(&mut self) -> Result<&Session> {
        self.session = None;
        let session = self.tp.authenticate(&self.credentials)?;
        info!("Logged in to controller as {}", session.user());
        Ok(self.session.get_or_insert(session))
    }

    /// Log in only when there is no session yet.
    pub fn ensure_authenticated(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.authenticate()?;
        }
        Ok(())
    }

    /// Forget the session; the next call logs in again.
    pub fn invalidate_session(&mut self) {
        if self.session.take().is_some() {
            debug!("Session invalidated");
        }
    }

    /// End the session on the controller. A failed logout is logged and
    /// the session is dropped anyway.
    pub fn logout(&mut self) {
        if let Some(s) = self.session.take() {
            if let Err(e) = self.tp.logout(&s) {
                warn!("Failed to log out {}: {}", s.user(), e);
            }
        }
    }

    /// Send one authenticated request and decode the JSON reply.
    ///
    /// An empty reply body is returned as `Value::Null`. When the controller
    /// rejects the session it is dropped before the error is returned.
    pub fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.ensure_authenticated()?;
        let body = match body {
            Some(b) => Some(serde_json::to_string(b)?),
            None => None,
        };
        let reply = self.tp.request(
            method,
            path,
            body.as_ref().map(|s| s.as_str()),
            self.session.as_ref(),
        );
        let (text, _) = match reply {
            Ok(r) => r,
            Err(e) => {
                if e.is_auth_failure() {
                    self.invalidate_session();
                }
                return Err(e);
            }
        };
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) fn get(&mut self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None)
    }

    pub(crate) fn post(&mut self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body))
    }

    pub(crate) fn put(&mut self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body))
    }

    pub(crate) fn delete(&mut self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None)
    }

    /// URIs returned by a `search` endpoint.
    pub(crate) fn search(&mut self, path: &str) -> Result<Vec<String>> {
        let val = self.get(path)?;
        let hits: Vec<SearchHit> = list_field(&val, "resource")?;
        Ok(hits.into_iter().map(|h| h.id).collect())
    }

    /// Current state of one task, `None` when the controller sent nothing.
    pub fn show_task(
        &mut self,
        resource_uri: &str,
        op_id: &str,
    ) -> Result<Option<Task>> {
        let kind = ResourceKind::from_uri(resource_uri)?;
        let val = self.get(&kind.task_path(resource_uri, op_id))?;
        if val.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(val)?))
    }

    /// All tasks recorded for a resource.
    pub fn list_tasks(&mut self, resource_uri: &str) -> Result<Vec<Task>> {
        let kind = ResourceKind::from_uri(resource_uri)?;
        let val = self.get(&kind.tasks_path(resource_uri))?;
        list_field(&val, "task")
    }

    /// Poll a task until it completes, fails or `timeout` (default: the
    /// client poller's) elapses.
    pub fn wait_for_task(
        &mut self,
        resource_uri: &str,
        op_id: &str,
        timeout: Option<Duration>,
    ) -> Result<TaskResult> {
        let poller = match timeout {
            Some(t) => self.poller.with_timeout(t),
            None => self.poller,
        };
        poller.wait(self, resource_uri, op_id)
    }

    /// Wait for `task` and require it to complete.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::TaskFailed`][1] the task reached `error`.
    ///  * [`ViprError::TimeOut`][2] the task did not finish in time.
    ///
    /// [1]: enum.ViprError.html#variant.TaskFailed
    /// [2]: enum.ViprError.html#variant.TimeOut
    pub fn complete(&mut self, task: &Task) -> Result<Task> {
        let uri = task.resource_uri()?.to_string();
        self.wait_for_task(&uri, &task.op_id, None)?
            .into_result(&task.op_id)
    }

    /// [`complete()`][1] every task in turn, stopping at the first failure.
    ///
    /// [1]: #method.complete
    pub fn wait_for_tasks(&mut self, tasks: &[Task]) -> Result<Vec<Task>> {
        tasks.iter().map(|t| self.complete(t)).collect()
    }

    /// Return `task` as is, or once it completed when `sync` is set.
    pub(crate) fn finish(&mut self, task: Task, sync: bool) -> Result<Task> {
        if sync {
            self.complete(&task)
        } else {
            Ok(task)
        }
    }

    /// Decode a single task reply and [`finish()`][1] it.
    ///
    /// [1]: #method.finish
    pub(crate) fn finish_reply(&mut self, val: Value, sync: bool) -> Result<Task> {
        let task: Task = serde_json::from_value(val)?;
        self.finish(task, sync)
    }

    /// Decode a task list reply (`{"task": [...]}`) and wait for each task
    /// when `sync` is set.
    pub(crate) fn finish_list(
        &mut self,
        val: Value,
        sync: bool,
    ) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = list_field(&val, "task")?;
        if tasks.is_empty() {
            return Err(ViprError::BackendBug(format!(
                "Expecting a task list, got {}",
                val
            )));
        }
        if sync {
            self.wait_for_tasks(&tasks)
        } else {
            Ok(tasks)
        }
    }

    /// Run `op`, logging in again and retrying once when the session was
    /// rejected.
    pub fn with_auth_retry<R, F>(&mut self, op: F) -> Result<R>
    where
        F: FnMut(&mut Self) -> Result<R>,
    {
        retry::with_auth_retry(self, op)
    }
}

impl<T: RestTransport> TaskSource for Client<T> {
    fn fetch_task(
        &mut self,
        resource_uri: &str,
        op_id: &str,
    ) -> Result<Option<Task>> {
        self.show_task(resource_uri, op_id)
    }
}

impl<T: RestTransport> Reauthenticate for Client<T> {
    fn reauthenticate(&mut self) -> Result<()> {
        self.invalidate_session();
        self.authenticate()?;
        Ok(())
    }
}
