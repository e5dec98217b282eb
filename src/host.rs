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
use super::misc::{is_uri, verify_initiator_port};
use super::task::Task;
use super::transport::RestTransport;

const HOST_TYPE_OTHER: &str = "Other";

impl<T: RestTransport> Client<T> {
    /// Hosts of a tenant (empty for the tenant of the logged in user).
    pub fn host_list(&mut self, tenant: &str) -> Result<Vec<ResourceRef>> {
        let tenant_uri = self.tenant_query(tenant)?;
        let val = self.get(&format!("/tenants/{}/hosts", tenant_uri))?;
        list_field(&val, "host")
    }

    pub fn host_show(&mut self, uri: &str) -> Result<Host> {
        Ok(serde_json::from_value(
            self.get(&ResourceKind::Host.resource_path(uri))?,
        )?)
    }

    pub fn host_query(&mut self, name: &str, tenant: &str) -> Result<String> {
        if is_uri(name) {
            return Ok(name.to_string());
        }
        super::tenant::id_by_name(&self.host_list(tenant)?, name).ok_or_else(
            || ViprError::NotFound(format!("Host {}: not found", name)),
        )
    }

    /// Register a host. `host_name` is the FQDN or IP address the
    /// controller knows the host by.
    pub fn host_create(
        &mut self,
        name: &str,
        tenant: &str,
        host_name: &str,
        sync: bool,
    ) -> Result<Task> {
        let tenant_uri = self.tenant_query(tenant)?;
        let mut args = Map::new();
        args.insert("type".to_string(), Value::from(HOST_TYPE_OTHER));
        args.insert("name".to_string(), Value::from(name));
        args.insert("host_name".to_string(), Value::from(host_name));
        args.insert("discoverable".to_string(), Value::from(false));
        let ret = self.post(
            &format!("/tenants/{}/hosts", tenant_uri),
            &Value::Object(args),
        )?;
        self.finish_reply(ret, sync)
    }

    pub fn host_initiators(&mut self, host_uri: &str) -> Result<Vec<Initiator>> {
        let val = self.get(&format!(
            "{}/initiators",
            ResourceKind::Host.resource_path(host_uri)
        ))?;
        list_field(&val, "initiator")
    }

    /// Add an initiator to a host.
    ///
    /// # Errors
    ///
    ///  * [`ViprError::InvalidArgument`][1] `port` is not a valid identifier
    ///    for `protocol`.
    ///
    /// [1]: enum.ViprError.html#variant.InvalidArgument
    pub fn host_add_initiator(
        &mut self,
        host_uri: &str,
        protocol: InitiatorProtocol,
        node: &str,
        port: &str,
        sync: bool,
    ) -> Result<Task> {
        verify_initiator_port(port, protocol)?;
        let mut args = Map::new();
        args.insert("protocol".to_string(), Value::from(protocol.to_string()));
        args.insert("initiator_node".to_string(), Value::from(node));
        args.insert("initiator_port".to_string(), Value::from(port));
        let ret = self.post(
            &format!(
                "{}/initiators",
                ResourceKind::Host.resource_path(host_uri)
            ),
            &Value::Object(args),
        )?;
        self.finish_reply(ret, sync)
    }
}
