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
use tracing::debug;

use super::client::Client;
use super::data::*;
use super::error::*;
use super::misc::{is_uri, parent_child_from_path};
use super::task::Task;
use super::transport::RestTransport;

const URI_VOLUMES: &str = "/block/volumes";

impl<T: RestTransport> Client<T> {
    fn volume_search(&mut self, project_uri: &str) -> Result<Vec<String>> {
        self.search(&format!("{}/search?project={}", URI_VOLUMES, project_uri))
    }

    /// Active volume by URI, `None` once it has been deleted.
    fn volume_show_by_uri(&mut self, uri: &str) -> Result<Option<Volume>> {
        let val = self.get(&ResourceKind::Volume.resource_path(uri))?;
        if val.is_null() {
            return Ok(None);
        }
        let vol: Volume = serde_json::from_value(val)?;
        Ok(if vol.inactive { None } else { Some(vol) })
    }

    /// Active volumes of project `tenant/project`.
    pub fn volume_list(&mut self, project_path: &str) -> Result<Vec<Volume>> {
        let project_uri = self.project_query(project_path)?;
        let mut ret = Vec::new();
        for uri in self.volume_search(&project_uri)? {
            if let Some(v) = self.volume_show_by_uri(&uri)? {
                ret.push(v);
            }
        }
        Ok(ret)
    }

    /// Volume at `tenant/project/name`, or by URI.
    pub fn volume_show(&mut self, path: &str) -> Result<Volume> {
        let uri = self.volume_query(path)?;
        self.volume_show_by_uri(&uri)?.ok_or_else(|| {
            ViprError::NotFound(format!("Volume {}: not found", path))
        })
    }

    /// Resolve `tenant/project/name` into the volume URI.
    pub fn volume_query(&mut self, path: &str) -> Result<String> {
        if is_uri(path) {
            return Ok(path.to_string());
        }
        let (project_path, name) = parent_child_from_path(path);
        if project_path.is_empty() {
            return Err(ViprError::InvalidArgument(format!(
                "Project not specified in volume path '{}'",
                path
            )));
        }
        let project_uri = self.project_query(project_path)?;
        for uri in self.volume_search(&project_uri)? {
            if let Some(v) = self.volume_show_by_uri(&uri)? {
                if v.name == name {
                    return Ok(v.id);
                }
            }
        }
        Err(ViprError::NotFound(format!("Volume {}: not found", name)))
    }

    /// Create `count` volumes of `size_bytes` named `name` (suffixed by the
    /// controller when `count` > 1).
    ///
    ///  * `varray` and `vpool` are names or URIs.
    ///  * `sync` waits for every creation task to complete.
    pub fn volume_create(
        &mut self,
        project_path: &str,
        name: &str,
        size_bytes: u64,
        varray: &str,
        vpool: &str,
        count: u32,
        sync: bool,
    ) -> Result<Vec<Task>> {
        if count == 0 {
            return Err(ViprError::InvalidArgument(
                "Volume count should be at least 1".to_string(),
            ));
        }
        let project_uri = self.project_query(project_path)?;
        let varray_uri = self.varray_query(varray)?;
        let vpool_uri = self.vpool_query(vpool, VpoolType::Block)?;

        let mut args = Map::new();
        args.insert("name".to_string(), Value::from(name));
        args.insert("size".to_string(), Value::from(size_bytes.to_string()));
        args.insert("count".to_string(), Value::from(count));
        args.insert("project".to_string(), Value::from(project_uri));
        args.insert("varray".to_string(), Value::from(varray_uri));
        args.insert("vpool".to_string(), Value::from(vpool_uri));
        debug!("Creating volume {} of {} bytes", name, size_bytes);

        let ret = self.post(URI_VOLUMES, &Value::Object(args))?;
        self.finish_list(ret, sync)
    }

    /// Full copy of the volume at `src_path`, created in `project_path`.
    pub fn volume_clone(
        &mut self,
        project_path: &str,
        name: &str,
        src_path: &str,
        sync: bool,
    ) -> Result<Vec<Task>> {
        let src_uri = if is_uri(src_path) {
            src_path.to_string()
        } else {
            let (_, src_name) = parent_child_from_path(src_path);
            self.volume_query(&format!("{}/{}", project_path, src_name))?
        };
        let mut args = Map::new();
        args.insert("name".to_string(), Value::from(name));
        args.insert("count".to_string(), Value::from(1));

        let ret = self.post(
            &format!(
                "{}/protection/full-copies",
                ResourceKind::Volume.resource_path(&src_uri)
            ),
            &Value::Object(args),
        )?;
        self.finish_list(ret, sync)
    }

    pub fn volume_delete(&mut self, path: &str, sync: bool) -> Result<Task> {
        let uri = self.volume_query(path)?;
        let ret = self.post(
            &format!("{}/deactivate", ResourceKind::Volume.resource_path(&uri)),
            &json!({}),
        )?;
        self.finish_reply(ret, sync)
    }

    /// Initiator-target-LUN paths through which the volume is exported.
    pub fn volume_exports(&mut self, uri: &str) -> Result<Vec<Itl>> {
        let val =
            self.get(&format!("{}/exports", ResourceKind::Volume.resource_path(uri)))?;
        list_field(&val, "itl")
    }

    pub fn volume_tags(&mut self, path: &str) -> Result<Vec<String>> {
        let uri = self.volume_query(path)?;
        let val =
            self.get(&format!("{}/tags", ResourceKind::Volume.resource_path(&uri)))?;
        list_field(&val, "tag")
    }

    /// Add and remove tags in one call.
    pub fn volume_modify_tags(
        &mut self,
        path: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }
        let uri = self.volume_query(path)?;
        let mut args = Map::new();
        if !add.is_empty() {
            args.insert("add".to_string(), Value::from(add.to_vec()));
        }
        if !remove.is_empty() {
            args.insert("remove".to_string(), Value::from(remove.to_vec()));
        }
        self.put(
            &format!("{}/tags", ResourceKind::Volume.resource_path(&uri)),
            &Value::Object(args),
        )?;
        Ok(())
    }

    /// Capacity of a block virtual pool within a virtual array.
    pub fn vpool_varray_capacity(
        &mut self,
        vpool_uri: &str,
        varray_uri: &str,
    ) -> Result<Capacity> {
        Ok(serde_json::from_value(self.get(&format!(
            "{}/{}/varrays/{}/capacity",
            VpoolType::Block.list_path(),
            vpool_uri,
            varray_uri
        ))?)?)
    }
}
