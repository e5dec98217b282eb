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

use serde_json::{Map, Value};
use url::form_urlencoded;

use super::client::Client;
use super::data::*;
use super::error::*;
use super::misc::{is_uri, parent_child_from_path};
use super::task::Task;
use super::transport::RestTransport;

const URI_FILESHARES: &str = "/file/filesystems";

/// Who may mount an NFS export, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct NfsExportSpec {
    /// Security flavor: `sys`, `krb5`, `krb5i` or `krb5p`.
    pub security_type: String,
    /// `ro`, `rw` or `root`.
    pub permissions: String,
    pub root_user: String,
    /// Host names, IP addresses or netgroups.
    pub endpoints: Vec<String>,
    /// `NFS` or `NFSv4`.
    pub protocol: String,
    pub sub_directory: Option<String>,
}

impl Default for NfsExportSpec {
    fn default() -> Self {
        NfsExportSpec {
            security_type: "sys".to_string(),
            permissions: "rw".to_string(),
            root_user: "nobody".to_string(),
            endpoints: Vec::new(),
            protocol: "NFS".to_string(),
            sub_directory: None,
        }
    }
}

fn fileshare_path(uri: &str) -> String {
    ResourceKind::FileShare.resource_path(uri)
}

impl<T: RestTransport> Client<T> {
    fn fileshare_search(&mut self, project_uri: &str) -> Result<Vec<String>> {
        self.search(&format!(
            "{}/search?project={}",
            URI_FILESHARES, project_uri
        ))
    }

    fn fileshare_show_by_uri(&mut self, uri: &str) -> Result<Option<FileSystem>> {
        let val = self.get(&fileshare_path(uri))?;
        if val.is_null() {
            return Ok(None);
        }
        let fs: FileSystem = serde_json::from_value(val)?;
        Ok(if fs.inactive { None } else { Some(fs) })
    }

    /// Active file systems of project `tenant/project`.
    pub fn fileshare_list(&mut self, project_path: &str) -> Result<Vec<FileSystem>> {
        let project_uri = self.project_query(project_path)?;
        let mut ret = Vec::new();
        for uri in self.fileshare_search(&project_uri)? {
            if let Some(fs) = self.fileshare_show_by_uri(&uri)? {
                ret.push(fs);
            }
        }
        Ok(ret)
    }

    /// File system at `tenant/project/name`, or by URI.
    pub fn fileshare_show(&mut self, path: &str) -> Result<FileSystem> {
        let uri = self.fileshare_query(path)?;
        self.fileshare_show_by_uri(&uri)?.ok_or_else(|| {
            ViprError::NotFound(format!("Filesystem {}: not found", path))
        })
    }

    pub fn fileshare_query(&mut self, path: &str) -> Result<String> {
        if is_uri(path) {
            return Ok(path.to_string());
        }
        let (project_path, name) = parent_child_from_path(path);
        if project_path.is_empty() {
            return Err(ViprError::InvalidArgument(format!(
                "Project not specified in filesystem path '{}'",
                path
            )));
        }
        let project_uri = self.project_query(project_path)?;
        for uri in self.fileshare_search(&project_uri)? {
            if let Some(fs) = self.fileshare_show_by_uri(&uri)? {
                if fs.name == name {
                    return Ok(fs.id);
                }
            }
        }
        Err(ViprError::NotFound(format!("Filesystem {}: not found", name)))
    }

    /// Create a file system. `protocols` restricts how it can be exported
    /// (`NFS`, `NFSv4`, `CIFS`); empty leaves the choice to the vpool.
    pub fn fileshare_create(
        &mut self,
        project_path: &str,
        name: &str,
        size_bytes: u64,
        varray: &str,
        vpool: &str,
        protocols: &[String],
        sync: bool,
    ) -> Result<Task> {
        let vpool_uri = self.vpool_query(vpool, VpoolType::File)?;
        let varray_uri = self.varray_query(varray)?;
        let project_uri = self.project_query(project_path)?;

        let mut args = Map::new();
        args.insert("name".to_string(), Value::from(name));
        args.insert("size".to_string(), Value::from(size_bytes.to_string()));
        args.insert("varray".to_string(), Value::from(varray_uri));
        args.insert("vpool".to_string(), Value::from(vpool_uri));
        if !protocols.is_empty() {
            args.insert("protocols".to_string(), Value::from(protocols.to_vec()));
        }
        let ret = self
            .post(
                &format!("{}?project={}", URI_FILESHARES, project_uri),
                &Value::Object(args),
            )
            .map_err(|e| e.context(&format!("Filesystem {}: create failed", name)))?;
        self.finish_reply(ret, sync)
    }

    /// Delete a file system; `force` deletes it even while exported.
    pub fn fileshare_delete(
        &mut self,
        path: &str,
        force: bool,
        sync: bool,
    ) -> Result<Task> {
        let uri = self.fileshare_query(path)?;
        let ret = self.post(
            &format!("{}/deactivate", fileshare_path(&uri)),
            &json!({ "forceDelete": force }),
        )?;
        self.finish_reply(ret, sync)
    }

    /// Rename a file system and move it to virtual pool `vpool`.
    pub fn fileshare_update(
        &mut self,
        path: &str,
        new_name: &str,
        vpool: &str,
        sync: bool,
    ) -> Result<Task> {
        let uri = self.fileshare_query(path)?;
        let vpool_uri = self.vpool_query(vpool, VpoolType::File)?;
        let body = json!({
            "share": {"label": new_name, "vpool": {"id": vpool_uri}}
        });
        let ret = self
            .put(&fileshare_path(&uri), &body)
            .map_err(|e| e.context(&format!("Filesystem {}: update failed", path)))?;
        self.finish_reply(ret, sync)
    }

    /// Grow a file system to `new_size_bytes`.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::InvalidArgument`][1] new size not larger than the
    ///    current one.
    ///
    /// [1]: enum.ViprError.html#variant.InvalidArgument
    pub fn fileshare_expand(
        &mut self,
        path: &str,
        new_size_bytes: u64,
        sync: bool,
    ) -> Result<Task> {
        let fs = self.fileshare_show(path)?;
        let current = (fs.capacity_gb.unwrap_or(0.0) * (1u64 << 30) as f64) as u64;
        if new_size_bytes <= current {
            return Err(ViprError::InvalidArgument(format!(
                "Incorrect value of new size: {} bytes, new size must be \
                 greater than current size: {} bytes",
                new_size_bytes, current
            )));
        }
        let ret = self.post(
            &format!("{}/expand", fileshare_path(&fs.id)),
            &json!({ "new_size": new_size_bytes.to_string() }),
        )?;
        self.finish_reply(ret, sync)
    }

    /// Export a file system over NFS.
    pub fn fileshare_export(
        &mut self,
        path: &str,
        spec: &NfsExportSpec,
        sync: bool,
    ) -> Result<Task> {
        if spec.endpoints.is_empty() {
            return Err(ViprError::InvalidArgument(
                "At least one export endpoint is required".to_string(),
            ));
        }
        let uri = self.fileshare_query(path)?;
        let mut args = Map::new();
        args.insert("type".to_string(), Value::from(spec.security_type.as_str()));
        args.insert(
            "permissions".to_string(),
            Value::from(spec.permissions.as_str()),
        );
        args.insert("root_user".to_string(), Value::from(spec.root_user.as_str()));
        args.insert("endpoints".to_string(), Value::from(spec.endpoints.clone()));
        args.insert("protocol".to_string(), Value::from(spec.protocol.as_str()));
        if let Some(ref d) = spec.sub_directory {
            args.insert("sub_directory".to_string(), Value::from(d.as_str()));
        }
        let ret = self
            .post(
                &format!("{}/exports", fileshare_path(&uri)),
                &Value::Object(args),
            )
            .map_err(|e| e.context(&format!("Filesystem {}: export failed", path)))?;
        self.finish_reply(ret, sync)
    }

    /// Remove the NFS export matching `spec`'s protocol, security type,
    /// permissions and root user.
    pub fn fileshare_unexport(
        &mut self,
        path: &str,
        spec: &NfsExportSpec,
        sync: bool,
    ) -> Result<Task> {
        let uri = self.fileshare_query(path)?;
        let mut req = format!(
            "{}/exports/{},{},{},{}",
            fileshare_path(&uri),
            spec.protocol,
            spec.security_type,
            spec.permissions,
            spec.root_user
        );
        if let Some(ref d) = spec.sub_directory {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("subDirectory", d)
                .finish();
            req = format!("{}?{}", req, query);
        }
        let ret = self.delete(&req)?;
        self.finish_reply(ret, sync)
    }

    pub fn fileshare_exports(&mut self, path: &str) -> Result<Vec<FileSystemExport>> {
        let uri = self.fileshare_query(path)?;
        let val = self.get(&format!("{}/exports", fileshare_path(&uri)))?;
        list_field(&val, "filesystem_export")
    }

    pub fn fileshare_tasks(&mut self, path: &str) -> Result<Vec<Task>> {
        let uri = self.fileshare_query(path)?;
        self.list_tasks(&uri)
    }
}
