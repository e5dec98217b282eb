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

use std::fmt;

use serde_json::{Map, Value};

use super::client::Client;
use super::data::*;
use super::error::*;
use super::misc::{is_uri, parent_child_from_path};
use super::task::Task;
use super::transport::RestTransport;

const URI_EXPORT_GROUPS: &str = "/block/exports";

/// What an export group exports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportGroupType {
    Host,
    Cluster,
    Initiator,
}

impl fmt::Display for ExportGroupType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ExportGroupType::Host => write!(f, "Host"),
            ExportGroupType::Cluster => write!(f, "Cluster"),
            ExportGroupType::Initiator => write!(f, "Initiator"),
        }
    }
}

impl<T: RestTransport> Client<T> {
    /// URIs of the export groups of project `tenant/project`.
    pub fn exportgroup_list(&mut self, project_path: &str) -> Result<Vec<String>> {
        let project_uri = self.project_query(project_path)?;
        self.search(&format!(
            "{}/search?project={}",
            URI_EXPORT_GROUPS, project_uri
        ))
    }

    pub fn exportgroup_show(&mut self, uri: &str) -> Result<ExportGroup> {
        Ok(serde_json::from_value(
            self.get(&ResourceKind::ExportGroup.resource_path(uri))?,
        )?)
    }

    /// URI of the active export group `name` of project `tenant/project`.
    /// A URI is returned unchanged.
    pub fn exportgroup_query(
        &mut self,
        name: &str,
        project_path: &str,
    ) -> Result<String> {
        if is_uri(name) {
            return Ok(name.to_string());
        }
        for uri in self.exportgroup_list(project_path)? {
            let eg = self.exportgroup_show(&uri)?;
            if eg.name == name && !eg.inactive {
                return Ok(eg.id);
            }
        }
        Err(ViprError::NotFound(format!("Export group {}: not found", name)))
    }

    /// Create an export group in `varray`. For [`ExportGroupType::Host`][1]
    /// groups `host` names (or is the URI of) the host to export to.
    ///
    /// [1]: enum.ExportGroupType.html#variant.Host
    pub fn exportgroup_create(
        &mut self,
        name: &str,
        project_path: &str,
        varray: &str,
        group_type: ExportGroupType,
        host: Option<&str>,
        sync: bool,
    ) -> Result<Task> {
        let project_uri = self.project_query(project_path)?;
        let varray_uri = self.varray_query(varray)?;
        let mut args = Map::new();
        args.insert("name".to_string(), Value::from(name));
        args.insert("project".to_string(), Value::from(project_uri));
        args.insert("varray".to_string(), Value::from(varray_uri));
        args.insert("type".to_string(), Value::from(group_type.to_string()));
        if let Some(h) = host {
            let (tenant, _) = parent_child_from_path(project_path);
            let host_uri = self.host_query(h, tenant)?;
            args.insert("hosts".to_string(), json!([host_uri]));
        }
        let ret = self.post(URI_EXPORT_GROUPS, &Value::Object(args))?;
        self.finish_reply(ret, sync)
    }

    /// Export a volume through an export group, at host LUN `hlu` when
    /// given, otherwise at whatever LUN the controller picks.
    pub fn exportgroup_add_volumes(
        &mut self,
        name: &str,
        project_path: &str,
        volume_path: &str,
        hlu: Option<u32>,
        sync: bool,
    ) -> Result<Task> {
        let eg_uri = self.exportgroup_query(name, project_path)?;
        let vol_uri = self.volume_query(volume_path)?;
        let mut vol = Map::new();
        vol.insert("id".to_string(), Value::from(vol_uri));
        if let Some(lun) = hlu {
            vol.insert("lun".to_string(), Value::from(lun));
        }
        let body = json!({"volume_changes": {"add": [Value::Object(vol)]}});
        let ret =
            self.put(&ResourceKind::ExportGroup.resource_path(&eg_uri), &body)?;
        self.finish_reply(ret, sync)
    }

    pub fn exportgroup_remove_volumes(
        &mut self,
        name: &str,
        project_path: &str,
        volume_path: &str,
        sync: bool,
    ) -> Result<Task> {
        let eg_uri = self.exportgroup_query(name, project_path)?;
        let vol_uri = self.volume_query(volume_path)?;
        let body = json!({"volume_changes": {"remove": [vol_uri]}});
        let ret =
            self.put(&ResourceKind::ExportGroup.resource_path(&eg_uri), &body)?;
        self.finish_reply(ret, sync)
    }
}
