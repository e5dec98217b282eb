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

//! In-memory controller used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;

use super::client::Client;
use super::error::*;
use super::session::{Credentials, Session};
use super::task::TaskPoller;
use super::transport::{Method, RestTransport};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Status(u16),
    Empty,
}

/// Replays canned replies per `(method, path)`. Replies queued for the same
/// route are served in order, the last one repeating forever.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    pub(crate) calls: Vec<(Method, String, Option<Value>)>,
    pub(crate) tokens: Vec<Option<String>>,
    pub(crate) logins: usize,
    pub(crate) reject_login: bool,
}

impl FakeTransport {
    pub(crate) fn on(
        &mut self,
        method: Method,
        path: &str,
        reply: Reply,
    ) -> &mut FakeTransport {
        self.routes
            .entry((method, path.to_string()))
            .or_insert_with(VecDeque::new)
            .push_back(reply);
        self
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .count()
    }

    /// Bodies sent to `(method, path)`, oldest first.
    pub(crate) fn bodies(&self, method: Method, path: &str) -> Vec<Value> {
        self.calls
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .filter_map(|(_, _, b)| b.clone())
            .collect()
    }
}

impl RestTransport for FakeTransport {
    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
        session: Option<&Session>,
    ) -> Result<(String, HeaderMap)> {
        let body = match body {
            Some(b) => Some(serde_json::from_str(b)?),
            None => None,
        };
        self.calls.push((method.clone(), path.to_string(), body));
        self.tokens.push(session.map(|s| s.token().to_string()));
        let key = (method.clone(), path.to_string());
        let reply = match self.routes.get_mut(&key) {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Json(v)) => Ok((v.to_string(), HeaderMap::new())),
            Some(Reply::Empty) => Ok((String::new(), HeaderMap::new())),
            Some(Reply::Status(s)) => Err(ViprError::from_status(s, "")),
            None => Err(ViprError::NotFound(format!(
                "No fake route for {} {}",
                method, path
            ))),
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> Result<Session> {
        self.logins += 1;
        if self.reject_login {
            return Err(ViprError::from_status(401, ""));
        }
        Ok(Session::new(
            &credentials.username,
            &format!("token-{}", self.logins),
        ))
    }
}

pub(crate) fn fake_client() -> Client<FakeTransport> {
    Client::with_transport(
        FakeTransport::default(),
        Credentials::new("root", "ChangeMe"),
        TaskPoller::new(Duration::from_secs(5), Duration::from_millis(5)),
    )
}
