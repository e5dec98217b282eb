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

use super::client::Client;
use super::data::*;
use super::error::*;
use super::misc::{is_uri, parent_child_from_path};
use super::transport::{Method, RestTransport};

const URI_TENANT: &str = "/tenant";
const URI_VARRAYS: &str = "/vdc/varrays";

/// URI of the first entry of `refs` named `name`.
pub(crate) fn id_by_name(refs: &[ResourceRef], name: &str) -> Option<String> {
    refs.iter()
        .find(|r| r.name.as_ref().map(|n| n.as_str()) == Some(name))
        .map(|r| r.id.clone())
}

impl<T: RestTransport> Client<T> {
    /// Tenant of the logged in user.
    pub fn tenant_root(&mut self) -> Result<Tenant> {
        Ok(serde_json::from_value(self.get(URI_TENANT)?)?)
    }

    /// Resolve a tenant name into its URI.
    ///
    /// An empty name is the tenant of the logged in user, a URI is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::NotFound`][1] no active tenant of that name.
    ///
    /// [1]: enum.ViprError.html#variant.NotFound
    pub fn tenant_query(&mut self, name: &str) -> Result<String> {
        if is_uri(name) {
            return Ok(name.to_string());
        }
        let root = self.tenant_root()?;
        if name.is_empty() || root.name == name {
            return Ok(root.id);
        }
        for sub in self.subtenants(&root.id)? {
            if sub.name.as_ref().map(|n| n.as_str()) != Some(name) {
                continue;
            }
            if !self.tenant_show_by_uri(&sub.id)?.inactive {
                return Ok(sub.id);
            }
        }
        Err(ViprError::NotFound(format!("Tenant {}: not found", name)))
    }

    /// Subtenants of the tenant of the logged in user.
    pub fn tenant_list(&mut self) -> Result<Vec<ResourceRef>> {
        let root = self.tenant_root()?;
        self.subtenants(&root.id)
    }

    pub fn tenant_show(&mut self, name: &str) -> Result<Tenant> {
        let uri = self.tenant_query(name)?;
        self.tenant_show_by_uri(&uri)
    }

    /// Create a subtenant of the tenant of the logged in user. Users of
    /// `domain` whose `key` attribute has `value` are mapped to it.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::NameConflict`][1] a tenant of that name exists.
    ///
    /// [1]: enum.ViprError.html#variant.NameConflict
    pub fn tenant_create(
        &mut self,
        name: &str,
        domain: &str,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<ResourceRef> {
        match self.tenant_query(name) {
            Ok(_) => {
                return Err(ViprError::NameConflict(format!(
                    "Tenant {}: create failed: subtenant with same name \
                     already exists",
                    name
                )))
            }
            Err(ViprError::NotFound(_)) => (),
            Err(e) => return Err(e),
        }
        let mut attr = Map::new();
        if let Some(k) = key {
            attr.insert("key".to_string(), Value::from(k));
        }
        if let Some(v) = value {
            attr.insert("value".to_string(), json!([v]));
        }
        let attrs = if attr.is_empty() {
            Vec::new()
        } else {
            vec![Value::Object(attr)]
        };
        let body = json!({
            "name": name,
            "user_mappings": [{"attributes": attrs, "domain": domain}]
        });
        let root = self.tenant_root()?;
        let ret = self
            .post(&format!("/tenants/{}/subtenants", root.id), &body)
            .map_err(|e| e.context(&format!("Tenant {}: create failed", name)))?;
        Ok(serde_json::from_value(ret)?)
    }

    pub fn tenant_delete(&mut self, name: &str) -> Result<()> {
        let uri = self.tenant_query(name)?;
        self.request(Method::POST, &format!("/tenants/{}/deactivate", uri), None)
            .map_err(|e| e.context("Tenant delete failed"))?;
        Ok(())
    }

    fn tenant_show_by_uri(&mut self, uri: &str) -> Result<Tenant> {
        Ok(serde_json::from_value(self.get(&format!("/tenants/{}", uri))?)?)
    }

    fn subtenants(&mut self, tenant_uri: &str) -> Result<Vec<ResourceRef>> {
        let val = self.get(&format!("/tenants/{}/subtenants", tenant_uri))?;
        list_field(&val, "subtenant")
    }

    /// Resolve `tenant/project` into the project URI.
    pub fn project_query(&mut self, path: &str) -> Result<String> {
        if is_uri(path) {
            return Ok(path.to_string());
        }
        let (tenant, project) = parent_child_from_path(path);
        if project.is_empty() {
            return Err(ViprError::InvalidArgument(format!(
                "Project name not specified in '{}'",
                path
            )));
        }
        let tenant_uri = self.tenant_query(tenant)?;
        let val = self.get(&format!("/tenants/{}/projects", tenant_uri))?;
        let projects: Vec<ResourceRef> = list_field(&val, "project")?;
        id_by_name(&projects, project).ok_or_else(|| {
            ViprError::NotFound(format!("Project {}: not found", project))
        })
    }

    pub fn varray_query(&mut self, name: &str) -> Result<String> {
        if is_uri(name) {
            return Ok(name.to_string());
        }
        let val = self.get(URI_VARRAYS)?;
        let varrays: Vec<ResourceRef> = list_field(&val, "varray")?;
        id_by_name(&varrays, name).ok_or_else(|| {
            ViprError::NotFound(format!("Varray {}: not found", name))
        })
    }

    pub fn vpool_query(&mut self, name: &str, vtype: VpoolType) -> Result<String> {
        if is_uri(name) {
            return Ok(name.to_string());
        }
        let val = self.get(vtype.list_path())?;
        let vpools: Vec<ResourceRef> = list_field(&val, "virtualpool")?;
        id_by_name(&vpools, name).ok_or_else(|| {
            ViprError::NotFound(format!("VPool {}: not found", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::fake::{fake_client, Reply};
    use crate::transport::Method;
    use crate::*;

    const ROOT: &str = "urn:storageos:TenantOrg:root:global";
    const SUB: &str = "urn:storageos:TenantOrg:sub:global";

    fn with_tenants() -> Client<crate::fake::FakeTransport> {
        let mut c = fake_client();
        c.transport_mut()
            .on(
                Method::GET,
                "/tenant",
                Reply::Json(json!({"id": ROOT, "name": "Provider Tenant"})),
            )
            .on(
                Method::GET,
                &format!("/tenants/{}/subtenants", ROOT),
                Reply::Json(json!({"subtenant": [
                    {"id": SUB, "name": "acme"}
                ]})),
            )
            .on(
                Method::GET,
                &format!("/tenants/{}", SUB),
                Reply::Json(json!({"id": SUB, "name": "acme"})),
            );
        c
    }

    #[test]
    fn tenant_names() {
        let mut c = with_tenants();
        assert_eq!(c.tenant_query("").unwrap(), ROOT);
        assert_eq!(c.tenant_query("Provider Tenant").unwrap(), ROOT);
        assert_eq!(c.tenant_query("acme").unwrap(), SUB);
        assert_eq!(c.tenant_query(SUB).unwrap(), SUB);
        match c.tenant_query("nobody") {
            Err(ViprError::NotFound(m)) => {
                assert_eq!(m, "Tenant nobody: not found")
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn create_and_delete() {
        let mut c = with_tenants();
        let subtenants = format!("/tenants/{}/subtenants", ROOT);
        c.transport_mut().on(
            Method::POST,
            &subtenants,
            Reply::Json(json!({"id": "urn:storageos:TenantOrg:new:global",
                               "name": "beta"})),
        );
        match c.tenant_create("acme", "example.com", None, None) {
            Err(ViprError::NameConflict(_)) => (),
            r => panic!("unexpected {:?}", r),
        }
        let t = c
            .tenant_create("beta", "example.com", Some("ou"), Some("beta"))
            .unwrap();
        assert_eq!(t.id, "urn:storageos:TenantOrg:new:global");
        assert_eq!(
            c.transport().bodies(Method::POST, &subtenants),
            vec![json!({
                "name": "beta",
                "user_mappings": [{
                    "attributes": [{"key": "ou", "value": ["beta"]}],
                    "domain": "example.com"
                }]
            })]
        );

        let deactivate = format!("/tenants/{}/deactivate", SUB);
        c.transport_mut().on(Method::POST, &deactivate, Reply::Empty);
        c.tenant_delete("acme").unwrap();
        assert_eq!(c.transport().count(Method::POST, &deactivate), 1);
        assert!(c.tenant_delete("nobody").is_err());
    }

    #[test]
    fn project_and_pools() {
        let mut c = with_tenants();
        c.transport_mut()
            .on(
                Method::GET,
                &format!("/tenants/{}/projects", SUB),
                Reply::Json(json!({"project": [
                    {"id": "urn:storageos:Project:p1:global", "name": "openstack"}
                ]})),
            )
            .on(
                Method::GET,
                "/file/vpools",
                Reply::Json(json!({"virtualpool": {
                    "id": "urn:storageos:VirtualPool:fp:vdc1", "name": "nfs"
                }})),
            );
        assert_eq!(
            c.project_query("acme/openstack").unwrap(),
            "urn:storageos:Project:p1:global"
        );
        assert!(c.project_query("acme/other").is_err());
        assert_eq!(
            c.vpool_query("nfs", VpoolType::File).unwrap(),
            "urn:storageos:VirtualPool:fp:vdc1"
        );
    }
}
