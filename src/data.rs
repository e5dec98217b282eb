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

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use super::error::*;

const URI_PREFIX: &str = "urn:storageos:";

/// Kind of a controller resource, as encoded in its URI
/// (`urn:storageos:<Kind>:<uuid>:<vdc>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Volume,
    BlockSnapshot,
    ExportGroup,
    FileShare,
    FileSnapshot,
    Host,
    Initiator,
}

impl ResourceKind {
    pub fn from_uri(uri: &str) -> Result<ResourceKind> {
        if !uri.starts_with(URI_PREFIX) {
            return Err(ViprError::InvalidArgument(format!(
                "Not a resource URI: '{}'",
                uri
            )));
        }
        let kind = uri[URI_PREFIX.len()..].split(':').next().unwrap_or("");
        match kind {
            "Volume" => Ok(ResourceKind::Volume),
            "BlockSnapshot" => Ok(ResourceKind::BlockSnapshot),
            "ExportGroup" => Ok(ResourceKind::ExportGroup),
            "FileShare" => Ok(ResourceKind::FileShare),
            "Snapshot" => Ok(ResourceKind::FileSnapshot),
            "Host" => Ok(ResourceKind::Host),
            "Initiator" => Ok(ResourceKind::Initiator),
            _ => Err(ViprError::InvalidArgument(format!(
                "Unsupported resource type '{}' in URI '{}'",
                kind, uri
            ))),
        }
    }

    /// Collection path the resource lives under.
    pub fn base_path(self) -> &'static str {
        match self {
            ResourceKind::Volume => "/block/volumes",
            ResourceKind::BlockSnapshot => "/block/snapshots",
            ResourceKind::ExportGroup => "/block/exports",
            ResourceKind::FileShare => "/file/filesystems",
            ResourceKind::FileSnapshot => "/file/snapshots",
            ResourceKind::Host => "/compute/hosts",
            ResourceKind::Initiator => "/compute/initiators",
        }
    }

    pub fn resource_path(self, uri: &str) -> String {
        format!("{}/{}", self.base_path(), uri)
    }

    pub fn tasks_path(self, uri: &str) -> String {
        format!("{}/tasks", self.resource_path(uri))
    }

    pub fn task_path(self, uri: &str, op_id: &str) -> String {
        format!("{}/{}", self.tasks_path(uri), op_id)
    }
}

/// Hyperlink embedded in resource references.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Reference to another resource, embedded in replies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ResourceRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<Link>,
}

/// A search result: URI of a matching resource.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    #[serde(default, rename = "match")]
    pub matched: Option<String>,
}

/// Tenant (or subtenant).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_tenant: Option<ResourceRef>,
    #[serde(default)]
    pub inactive: bool,
}

/// Block volume.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub varray: Option<ResourceRef>,
    #[serde(default)]
    pub vpool: Option<ResourceRef>,
    #[serde(default)]
    pub project: Option<ResourceRef>,
    #[serde(default)]
    pub tenant: Option<ResourceRef>,
    #[serde(default)]
    pub wwn: Option<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Tags the controller reports inline. Use
    /// [`Client::volume_tags()`][1] for the authoritative list.
    ///
    /// [1]: struct.Client.html#method.volume_tags
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "opt_num_or_str_to_f64")]
    pub provisioned_capacity_gb: Option<f64>,
    #[serde(default, deserialize_with = "opt_num_or_str_to_f64")]
    pub allocated_capacity_gb: Option<f64>,
}

/// File system (file share).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileSystem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default, deserialize_with = "opt_num_or_str_to_f64")]
    pub capacity_gb: Option<f64>,
    #[serde(default)]
    pub varray: Option<ResourceRef>,
    #[serde(default)]
    pub vpool: Option<ResourceRef>,
    #[serde(default)]
    pub project: Option<ResourceRef>,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub mount_path: Option<String>,
}

/// NFS export of a file system as reported by the controller.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileSystemExport {
    #[serde(default)]
    pub mount_point: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default, rename = "type")]
    pub security_type: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub root_user: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub sub_directory: Option<String>,
}

/// Block snapshot.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub parent: Option<ResourceRef>,
}

/// Host initiator.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Initiator {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub initiator_port: Option<String>,
    #[serde(default)]
    pub initiator_node: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Initiator {
    /// Port identifier (IQN or WWPN). Listings only fill `name`, details
    /// fill `initiator_port`.
    pub fn port(&self) -> Option<&str> {
        self.initiator_port
            .as_ref()
            .or_else(|| self.name.as_ref())
            .map(|s| s.as_str())
    }
}

/// Compute host.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Host {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default, rename = "type")]
    pub host_type: Option<String>,
    #[serde(default)]
    pub tenant: Option<ResourceRef>,
}

/// Volume membership of an export group.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportedVolume {
    pub id: String,
    #[serde(default, deserialize_with = "opt_num_or_str_to_i64")]
    pub lun: Option<i64>,
}

/// Export group: the set of initiators/hosts a set of volumes is exported to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default, rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub varray: Option<ResourceRef>,
    #[serde(default)]
    pub project: Option<ResourceRef>,
    #[serde(default)]
    pub initiators: Vec<Initiator>,
    #[serde(default)]
    pub volumes: Vec<ExportedVolume>,
}

impl ExportGroup {
    pub fn has_initiator(&self, port: &str) -> bool {
        self.initiators.iter().any(|i| i.port() == Some(port))
    }
}

/// One end of an initiator-target-LUN path.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ItlEndpoint {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Exported device behind an ITL.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ItlDevice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub wwn: Option<String>,
}

/// Initiator-target-LUN path of an exported volume.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Itl {
    /// Host LUN id. `None` or `-1` while the export is in progress.
    #[serde(default, deserialize_with = "opt_num_or_str_to_i64")]
    pub hlu: Option<i64>,
    #[serde(default)]
    pub initiator: Option<ItlEndpoint>,
    #[serde(default)]
    pub target: Option<ItlEndpoint>,
    #[serde(default)]
    pub device: Option<ItlDevice>,
}

/// Capacity of a virtual pool within a virtual array, in GB.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Capacity {
    #[serde(deserialize_with = "num_or_str_to_f64")]
    pub free_gb: f64,
    #[serde(deserialize_with = "num_or_str_to_f64")]
    pub used_gb: f64,
    #[serde(deserialize_with = "num_or_str_to_f64")]
    pub provisioned_gb: f64,
}

/// Virtual pool type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpoolType {
    Block,
    File,
}

impl VpoolType {
    pub(crate) fn list_path(self) -> &'static str {
        match self {
            VpoolType::Block => "/block/vpools",
            VpoolType::File => "/file/vpools",
        }
    }
}

/// Storage protocol of an initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorProtocol {
    Iscsi,
    Fc,
}

impl fmt::Display for InitiatorProtocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InitiatorProtocol::Iscsi => write!(f, "iSCSI"),
            InitiatorProtocol::Fc => write!(f, "FC"),
        }
    }
}

impl ::std::str::FromStr for InitiatorProtocol {
    type Err = ViprError;

    fn from_str(s: &str) -> Result<InitiatorProtocol> {
        match s.to_lowercase().as_str() {
            "iscsi" => Ok(InitiatorProtocol::Iscsi),
            "fc" => Ok(InitiatorProtocol::Fc),
            _ => Err(ViprError::InvalidArgument(format!(
                "Invalid initiator protocol '{}', should be iSCSI or FC",
                s
            ))),
        }
    }
}

impl serde::Serialize for InitiatorProtocol {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Extract the list stored under `key` of a controller reply.
///
/// Missing or `null` keys give an empty list, and a lone object is treated
/// as a list of one: older controllers collapse single-element lists.
pub(crate) fn list_field<T: DeserializeOwned>(
    val: &Value,
    key: &str,
) -> Result<Vec<T>> {
    match val.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(a)) => Ok(a
            .iter()
            .map(|v| serde_json::from_value(v.clone()))
            .collect::<::std::result::Result<Vec<T>, _>>()?),
        Some(v @ Value::Object(_)) => Ok(vec![serde_json::from_value(v.clone())?]),
        Some(v) => Err(ViprError::BackendBug(format!(
            "Controller returned unexpected '{}' data: {}",
            key, v
        ))),
    }
}

fn value_to_f64<E: serde::de::Error>(v: &Value) -> ::std::result::Result<f64, E> {
    match *v {
        Value::Number(ref n) => n
            .as_f64()
            .ok_or_else(|| E::custom(format!("invalid number {}", n))),
        Value::String(ref s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid number '{}'", s))),
        _ => Err(E::custom(format!("expecting a number, got {}", v))),
    }
}

fn num_or_str_to_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<f64, D::Error> {
    let v: Value = Deserialize::deserialize(deserializer)?;
    value_to_f64(&v)
}

fn opt_num_or_str_to_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<Option<f64>, D::Error> {
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(None),
        Value::String(ref s) if s.trim().is_empty() => Ok(None),
        _ => value_to_f64(&v).map(Some),
    }
}

fn opt_num_or_str_to_i64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<Option<i64>, D::Error> {
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::Null => Ok(None),
        Value::Number(ref n) => n.as_i64().map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid integer {}", n))
        }),
        Value::String(ref s) if s.trim().is_empty() => Ok(None),
        Value::String(ref s) => s.trim().parse::<i64>().map(Some).map_err(
            |_| serde::de::Error::custom(format!("invalid integer '{}'", s)),
        ),
        _ => Err(serde::de::Error::custom(format!(
            "expecting an integer, got {}",
            v
        ))),
    }
}
