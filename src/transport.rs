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

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
pub use reqwest::Method;
use tracing::debug;
use url::Url;

use super::error::*;
use super::session::{Credentials, Session};

/// Header carrying the session token, both in the login reply and in every
/// authenticated request.
pub const AUTH_TOKEN_HEADER: &str = "X-SDS-AUTH-TOKEN";
pub const DEFAULT_PORT: u16 = 4443;

const LOGIN_PATH: &str = "/login";
const LOGOUT_PATH: &str = "/logout";
const JSON_MIME: &str = "application/json";

/// Uniform request interface to the controller.
///
/// [`HttpTransport`][1] is the real implementation; tests substitute
/// in-memory fakes.
///
/// [1]: struct.HttpTransport.html
pub trait RestTransport {
    /// Issue one request. `path` is relative to the controller root and may
    /// carry a query string. Non-2xx replies fail with the error built by
    /// [`ViprError::from_status`][1].
    ///
    /// [1]: enum.ViprError.html#method.from_status
    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
        session: Option<&Session>,
    ) -> Result<(String, HeaderMap)>;

    /// Log in and return the new session.
    fn authenticate(&mut self, credentials: &Credentials) -> Result<Session>;

    fn logout(&mut self, session: &Session) -> Result<()> {
        self.request(Method::GET, LOGOUT_PATH, None, Some(session))?;
        Ok(())
    }
}

/// Blocking HTTPS transport to a controller.
pub struct HttpTransport {
    http: HttpClient,
    base: Url,
}

impl HttpTransport {
    /// Connect to `https://<hostname>:<port>`.
    ///
    /// Controllers usually run with a self-signed certificate, hence
    /// `verify_tls` is normally false.
    pub fn new(
        hostname: &str,
        port: u16,
        verify_tls: bool,
        timeout: Option<Duration>,
    ) -> Result<HttpTransport> {
        HttpTransport::with_base_url(
            &format!("https://{}:{}", hostname, port),
            verify_tls,
            timeout,
        )
    }

    /// Connect to an arbitrary base URL, scheme included.
    pub fn with_base_url(
        base_url: &str,
        verify_tls: bool,
        timeout: Option<Duration>,
    ) -> Result<HttpTransport> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ViprError::InvalidArgument(format!(
                "Invalid controller URL: '{}'",
                base_url
            )));
        }
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));
        let mut builder = HttpClient::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_tls);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(HttpTransport {
            http: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

impl RestTransport for HttpTransport {
    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
        session: Option<&Session>,
    ) -> Result<(String, HeaderMap)> {
        let url = self.url(path)?;
        debug!("{} {}", method, url);
        let mut req = self.http.request(method, url);
        if let Some(s) = session {
            req = req.header(AUTH_TOKEN_HEADER, s.token());
        }
        if let Some(b) = body {
            debug!("request body: {}", b);
            req = req.header(CONTENT_TYPE, JSON_MIME).body(b.to_string());
        }
        let resp = req.send()?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let text = resp.text()?;
        if !status.is_success() {
            debug!("HTTP {} reply: {}", status.as_u16(), text);
            return Err(ViprError::from_status(status.as_u16(), &text));
        }
        Ok((text, headers))
    }

    fn authenticate(&mut self, credentials: &Credentials) -> Result<Session> {
        let url = self.url(LOGIN_PATH)?;
        debug!("Logging in to {} as {}", url, credentials.username);
        let resp = self
            .http
            .get(url)
            .basic_auth(&credentials.username, Some(credentials.password()))
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ViprError::from_status(status.as_u16(), &text));
        }
        match resp.headers().get(AUTH_TOKEN_HEADER) {
            Some(token) => {
                Ok(Session::new(&credentials.username, token.to_str()?))
            }
            None => Err(ViprError::Unauthorized(format!(
                "Login as '{}' succeeded but the controller sent no {} \
                 header",
                credentials.username, AUTH_TOKEN_HEADER
            ))),
        }
    }
}
