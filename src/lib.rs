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

//! # `vipr`
//!
//! Client library for the REST API of the ViPR storage controller:
//!
//!  * Log in and keep an authenticated session, logging in again once
//!    when the controller rejects it.
//!
//!  * Resolve tenants, projects, virtual arrays and virtual pools by name.
//!
//!  * Create, clone, tag, export and delete block volumes and snapshots.
//!
//!  * Create, expand, export and delete file systems.
//!
//!  * Wait for the asynchronous tasks the controller runs for every change,
//!    with an explicit completed, failed or timed out outcome.
//!
//!  * Drive all of the above as a block storage [`VolumeDriver`][1].
//!
//! # Example
//!
//! ```rust,no_run
//! extern crate vipr;
//! use vipr::{Client, TaskResult, ViprConfig, ViprError};
//!
//! fn main() -> Result<(), ViprError> {
//!     let cfg = ViprConfig::from_env()?;
//!     let mut c = Client::new(&cfg)?;
//!     let tasks = c.volume_create(
//!         "acme/openstack", "vol1", 1 << 30, "varray1", "gold", 1, false,
//!     )?;
//!     for t in tasks {
//!         let uri = t.resource_uri()?.to_string();
//!         match c.wait_for_task(&uri, &t.op_id, None)? {
//!             TaskResult::Completed(_) => println!("{} created", uri),
//!             TaskResult::Failed { detail, .. } => println!("{}", detail),
//!             TaskResult::TimedOut => println!("still running"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [1]: trait.VolumeDriver.html

extern crate rand;
extern crate regex;
extern crate reqwest;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate thiserror;
extern crate tracing;
extern crate url;

pub use self::client::Client;
pub use self::config::ViprConfig;
pub use self::data::*;
pub use self::driver::{
    Connector, DeviceInfo, SnapshotSpec, ViprDriver, VolumeDriver,
    VolumeSpec, VolumeStats,
};
pub use self::error::{Result, ViprError};
pub use self::exportgroup::ExportGroupType;
pub use self::fileshare::NfsExportSpec;
pub use self::misc::{
    is_uri, parent_child_from_path, size_bytes_2_size_human, to_bytes,
    unique_suffix, verify_initiator_port,
};
pub use self::retry::{with_auth_retry, Reauthenticate};
pub use self::session::{Credentials, Session};
pub use self::task::{
    Task, TaskPoller, TaskResult, TaskServiceError, TaskSource, TaskState,
};
pub use self::transport::{
    HttpTransport, Method, RestTransport, AUTH_TOKEN_HEADER, DEFAULT_PORT,
};

mod client;
mod config;
mod data;
pub mod driver;
mod error;
mod exportgroup;
mod fileshare;
mod host;
mod misc;
mod retry;
mod session;
mod snapshot;
mod task;
mod tenant;
mod transport;
mod volume;

#[cfg(test)]
mod fake;
