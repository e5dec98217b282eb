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

//! Block storage volume driver on top of [`Client`][1].
//!
//! [1]: ../struct.Client.html

use std::cmp::min;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::thread::sleep;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::client::Client;
use super::config::ViprConfig;
use super::data::*;
use super::error::*;
use super::exportgroup::ExportGroupType;
use super::misc::unique_suffix;
use super::transport::{HttpTransport, RestTransport};

/// Prefix of every tag the driver puts on volumes.
pub const OPENSTACK_TAG: &str = "OpenStack";
/// Volume type extra spec naming the virtual pool.
pub const VPOOL_EXTRA_SPEC: &str = "ViPR:VPOOL";

pub const DRIVER_VERSION: &str = "1.0";
pub const VENDOR_NAME: &str = "EMC";
pub const VOLUME_BACKEND_NAME: &str = "EMCViPRISCSIDriver";
pub const STORAGE_PROTOCOL: &str = "iSCSI";

const EXPORT_GROUP_SUFFIX_LEN: usize = 6;
const HLU_PENDING: i64 = -1;

/// A volume as handed over by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct VolumeSpec {
    pub name: String,
    pub display_name: Option<String>,
    pub size_gb: u64,
    /// Extra specs of the volume type.
    pub extra_specs: HashMap<String, String>,
    /// Every other volume property, copied to tags by
    /// [`ViprDriver::set_tags()`][1].
    ///
    /// [1]: struct.ViprDriver.html#method.set_tags
    pub properties: BTreeMap<String, String>,
}

impl VolumeSpec {
    /// Name the volume has on the controller: the display name when set,
    /// the orchestrator's internal name otherwise.
    pub fn volume_name(&self) -> &str {
        match self.display_name {
            Some(ref n) if !n.is_empty() => n,
            _ => &self.name,
        }
    }

    fn size_bytes(&self) -> Result<u64> {
        self.size_gb.checked_mul(1u64 << 30).ok_or_else(|| {
            ViprError::InvalidArgument(format!(
                "Volume size {} GiB is too large",
                self.size_gb
            ))
        })
    }

    fn vpool(&self) -> Result<&str> {
        match self.extra_specs.get(VPOOL_EXTRA_SPEC) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ViprError::InvalidArgument(format!(
                "Volume type of {} has no {} extra spec",
                self.volume_name(),
                VPOOL_EXTRA_SPEC
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotSpec {
    pub name: String,
    pub volume: VolumeSpec,
}

/// The host asking for a volume to be attached.
#[derive(Debug, Clone)]
pub struct Connector {
    pub protocol: InitiatorProtocol,
    pub initiator_node: String,
    pub initiator_port: String,
    pub hostname: String,
}

/// Where an attached volume shows up.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub host_lun_id: i64,
    pub endpoint: Option<String>,
    pub ip_address: Option<String>,
}

/// Backend capacity report. Capacities are `None` while the project holds
/// no volume to derive the pools from.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VolumeStats {
    pub driver_version: String,
    pub vendor_name: String,
    pub volume_backend_name: String,
    pub storage_protocol: String,
    pub free_capacity_gb: Option<f64>,
    pub total_capacity_gb: Option<f64>,
    pub reserved_percentage: f64,
}

impl Default for VolumeStats {
    fn default() -> Self {
        VolumeStats {
            driver_version: DRIVER_VERSION.to_string(),
            vendor_name: VENDOR_NAME.to_string(),
            volume_backend_name: VOLUME_BACKEND_NAME.to_string(),
            storage_protocol: STORAGE_PROTOCOL.to_string(),
            free_capacity_gb: None,
            total_capacity_gb: None,
            reserved_percentage: 0.0,
        }
    }
}

/// Callbacks a block storage orchestrator drives a backend with.
pub trait VolumeDriver {
    fn create_volume(&mut self, vol: &VolumeSpec) -> Result<()>;

    fn create_cloned_volume(
        &mut self,
        vol: &VolumeSpec,
        src: &VolumeSpec,
    ) -> Result<()>;

    fn delete_volume(&mut self, vol: &VolumeSpec) -> Result<()>;

    fn create_snapshot(&mut self, snap: &SnapshotSpec) -> Result<()>;

    fn delete_snapshot(&mut self, snap: &SnapshotSpec) -> Result<()>;

    /// Export the volume to the connector's host and wait until the host
    /// LUN is known.
    fn initialize_connection(
        &mut self,
        vol: &VolumeSpec,
        connector: &Connector,
    ) -> Result<DeviceInfo>;

    fn terminate_connection(
        &mut self,
        vol: &VolumeSpec,
        connector: &Connector,
    ) -> Result<()>;

    fn update_volume_stats(&mut self) -> Result<VolumeStats>;
}

/// Where the driver puts its volumes.
#[derive(Debug, Clone)]
struct Placement {
    tenant: String,
    project: String,
    varray: String,
}

impl Placement {
    fn project_path(&self) -> String {
        format!("{}/{}", self.tenant, self.project)
    }

    fn volume_path(&self, name: &str) -> String {
        format!("{}/{}/{}", self.tenant, self.project, name)
    }
}

/// [`VolumeDriver`][1] backed by a controller. Every callback waits for the
/// controller tasks it starts and logs in again once if the session
/// expired meanwhile.
///
/// [1]: trait.VolumeDriver.html
pub struct ViprDriver<T: RestTransport = HttpTransport> {
    client: Client<T>,
    placement: Placement,
}

impl ViprDriver<HttpTransport> {
    pub fn new(cfg: &ViprConfig) -> Result<ViprDriver> {
        ViprDriver::with_client(
            Client::new(cfg)?,
            &cfg.tenant,
            &cfg.project,
            &cfg.varray,
        )
    }
}

impl<T: RestTransport> ViprDriver<T> {
    /// `tenant` may be empty for the tenant of the logged in user;
    /// `project` and `varray` are required.
    pub fn with_client(
        client: Client<T>,
        tenant: &str,
        project: &str,
        varray: &str,
    ) -> Result<ViprDriver<T>> {
        if project.is_empty() || varray.is_empty() {
            return Err(ViprError::InvalidArgument(
                "Both project and varray are required by the volume driver"
                    .to_string(),
            ));
        }
        Ok(ViprDriver {
            client,
            placement: Placement {
                tenant: tenant.to_string(),
                project: project.to_string(),
                varray: varray.to_string(),
            },
        })
    }

    pub fn client_mut(&mut self) -> &mut Client<T> {
        &mut self.client
    }

    /// Replace the driver's tags on the volume by one
    /// `OpenStack:<property>:<value>` tag per volume property, skipping
    /// `status*` properties. Failures to change tags are logged only.
    ///
    /// Return the tags of the volume afterwards.
    pub fn set_tags(&mut self, vol: &VolumeSpec) -> Result<Vec<String>> {
        let path = self.placement.volume_path(vol.volume_name());
        let add: Vec<String> = vol
            .properties
            .iter()
            .filter(|(k, _)| !k.starts_with("status"))
            .map(|(k, v)| format!("{}:{}:{}", OPENSTACK_TAG, k, v))
            .collect();
        self.client.with_auth_retry(|c| {
            let remove: Vec<String> = c
                .volume_tags(&path)?
                .into_iter()
                .filter(|t| t.starts_with(OPENSTACK_TAG))
                .collect();
            tolerate_tag_failure(c.volume_modify_tags(&path, &[], &remove))?;
            tolerate_tag_failure(c.volume_modify_tags(&path, &add, &[]))?;
            c.volume_tags(&path)
        })
    }
}

/// Poll the volume's exports until the controller reports the host
/// LUN through `initiator_port`. Paths to other initiators are ignored.
fn wait_for_device<T: RestTransport>(
    c: &mut Client<T>,
    volume_path: &str,
    initiator_port: &str,
) -> Result<DeviceInfo> {
    let poller = c.poller();
    let deadline = Instant::now().checked_add(poller.timeout());
    let vol_uri = c.volume_query(volume_path)?;
    loop {
        let itls = c.volume_exports(&vol_uri)?;
        debug!("Volume {} exports: {:?}", volume_path, itls);
        let itl = itls.iter().find(|i| {
            i.initiator.as_ref().and_then(|e| e.port.as_deref())
                == Some(initiator_port)
        });
        if let Some(itl) = itl {
            match itl.hlu {
                Some(hlu) if hlu != HLU_PENDING => {
                    info!("Found host LUN {} for {}", hlu, volume_path);
                    let target = itl.target.clone().unwrap_or_default();
                    return Ok(DeviceInfo {
                        host_lun_id: hlu,
                        endpoint: target.port,
                        ip_address: target.ip_address,
                    });
                }
                _ => (),
            }
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(ViprError::TimeOut(format!(
                        "No host LUN reported for volume {} after {:?}",
                        volume_path,
                        poller.timeout()
                    )));
                }
                min(poller.interval(), deadline - now)
            }
            None => poller.interval(),
        };
        debug!("Host LUN of {} not known yet, retrying", volume_path);
        sleep(pause);
    }
}

fn tolerate_tag_failure(r: Result<()>) -> Result<()> {
    match r {
        Err(ref e) if !e.is_auth_failure() => {
            warn!("Failed to update volume tags: {}", e);
            Ok(())
        }
        r => r,
    }
}

/// Name of the export group holding `initiator_port`, and whether it
/// exports any volume yet.
fn find_export_group<T: RestTransport>(
    c: &mut Client<T>,
    project_path: &str,
    initiator_port: &str,
) -> Result<Option<(String, bool)>> {
    for uri in c.exportgroup_list(project_path)? {
        let eg = c.exportgroup_show(&uri)?;
        if eg.inactive || !eg.has_initiator(initiator_port) {
            continue;
        }
        let mut has_volumes = false;
        for vol in &eg.volumes {
            if !c.volume_exports(&vol.id)?.is_empty() {
                info!("Export group {} has volume {}", eg.name, vol.id);
                has_volumes = true;
                break;
            }
        }
        return Ok(Some((eg.name, has_volumes)));
    }
    Ok(None)
}

/// Name of the host holding `initiator_port`.
fn find_host<T: RestTransport>(
    c: &mut Client<T>,
    tenant: &str,
    initiator_port: &str,
) -> Result<Option<String>> {
    for host in c.host_list(tenant)? {
        let initiators = c.host_initiators(&host.id)?;
        if initiators.iter().any(|i| i.port() == Some(initiator_port)) {
            return Ok(host.name);
        }
    }
    Ok(None)
}

/// Host named `connector.hostname` holding the connector's initiator,
/// created as needed.
fn register_host<T: RestTransport>(
    c: &mut Client<T>,
    tenant: &str,
    connector: &Connector,
) -> Result<String> {
    let hosts = c.host_list(tenant)?;
    let host_uri = match super::tenant::id_by_name(&hosts, &connector.hostname) {
        Some(uri) => uri,
        None => {
            let task = c.host_create(
                &connector.hostname,
                tenant,
                &connector.hostname,
                true,
            )?;
            info!("Created host {}", connector.hostname);
            task.resource_uri()?.to_string()
        }
    };
    c.host_add_initiator(
        &host_uri,
        connector.protocol,
        &connector.initiator_node,
        &connector.initiator_port,
        true,
    )?;
    info!(
        "Initiator {} added to host {}",
        connector.initiator_port, connector.hostname
    );
    Ok(connector.hostname.clone())
}

impl<T: RestTransport> VolumeDriver for ViprDriver<T> {
    fn create_volume(&mut self, vol: &VolumeSpec) -> Result<()> {
        let name = vol.volume_name();
        let size = vol.size_bytes()?;
        let vpool = vol.vpool()?;
        let project_path = self.placement.project_path();
        let varray = &self.placement.varray;
        self.client
            .with_auth_retry(|c| {
                c.volume_create(&project_path, name, size, varray, vpool, 1, true)
            })
            .map_err(|e| e.context(&format!("Volume {}: create failed", name)))?;
        info!("Created volume {}", name);
        Ok(())
    }

    fn create_cloned_volume(
        &mut self,
        vol: &VolumeSpec,
        src: &VolumeSpec,
    ) -> Result<()> {
        let name = vol.volume_name();
        let src_name = src.volume_name();
        let project_path = self.placement.project_path();
        self.client
            .with_auth_retry(|c| c.volume_clone(&project_path, name, src_name, true))
            .map_err(|e| e.context(&format!("Volume {}: clone failed", name)))?;
        info!("Cloned volume {} from {}", name, src_name);
        Ok(())
    }

    fn delete_volume(&mut self, vol: &VolumeSpec) -> Result<()> {
        let name = vol.volume_name();
        let path = self.placement.volume_path(name);
        self.client
            .with_auth_retry(|c| c.volume_delete(&path, true))
            .map_err(|e| e.context(&format!("Volume {}: delete failed", name)))?;
        info!("Deleted volume {}", name);
        Ok(())
    }

    fn create_snapshot(&mut self, snap: &SnapshotSpec) -> Result<()> {
        let path = self.placement.volume_path(snap.volume.volume_name());
        self.client
            .with_auth_retry(|c| {
                let vol_uri = c.volume_query(&path)?;
                c.snapshot_create(&vol_uri, &snap.name, false, true)
            })
            .map_err(|e| {
                e.context(&format!("Snapshot {}: create failed", snap.name))
            })?;
        Ok(())
    }

    fn delete_snapshot(&mut self, snap: &SnapshotSpec) -> Result<()> {
        let path = self.placement.volume_path(snap.volume.volume_name());
        self.client
            .with_auth_retry(|c| {
                let vol_uri = c.volume_query(&path)?;
                c.snapshot_delete(&vol_uri, &snap.name, true)
            })
            .map_err(|e| {
                e.context(&format!("Snapshot {}: delete failed", snap.name))
            })?;
        Ok(())
    }

    fn initialize_connection(
        &mut self,
        vol: &VolumeSpec,
        connector: &Connector,
    ) -> Result<DeviceInfo> {
        let name = vol.volume_name();
        let placement = &self.placement;
        let project_path = placement.project_path();
        let volume_path = placement.volume_path(name);
        let port = connector.initiator_port.as_str();

        self.client
            .with_auth_retry(|c| {
                let (group, has_volumes) =
                    match find_export_group(c, &project_path, port)? {
                        Some(found) => found,
                        None => {
                            let host = match find_host(c, &placement.tenant, port)? {
                                Some(h) => {
                                    info!(
                                        "Found host {} containing initiator {}",
                                        h, port
                                    );
                                    h
                                }
                                None => {
                                    register_host(c, &placement.tenant, connector)?
                                }
                            };
                            let group = format!(
                                "{}SG-{}",
                                connector.hostname,
                                unique_suffix(EXPORT_GROUP_SUFFIX_LEN)
                            );
                            let task = c.exportgroup_create(
                                &group,
                                &project_path,
                                &placement.varray,
                                ExportGroupType::Host,
                                Some(&host),
                                true,
                            )?;
                            info!("Created export group {}", group);
                            (task.resource_uri()?.to_string(), false)
                        }
                    };
                // The first volume of a group gets its host LUN reported
                // only when it was requested explicitly.
                let hlu = if has_volumes {
                    None
                } else {
                    info!(
                        "Export group {} exports no volume, requesting host LUN 0",
                        group
                    );
                    Some(0)
                };
                c.exportgroup_add_volumes(
                    &group,
                    &project_path,
                    &volume_path,
                    hlu,
                    true,
                )?;
                wait_for_device(c, &volume_path, port)
            })
            .map_err(|e| {
                e.context(&format!(
                    "Attach volume ({}) to host ({}) initiator ({}) failed",
                    name, connector.hostname, port
                ))
            })
    }

    fn terminate_connection(
        &mut self,
        vol: &VolumeSpec,
        connector: &Connector,
    ) -> Result<()> {
        let name = vol.volume_name();
        let project_path = self.placement.project_path();
        let volume_path = self.placement.volume_path(name);
        let port = connector.initiator_port.as_str();
        self.client
            .with_auth_retry(|c| {
                match find_export_group(c, &project_path, port)? {
                    Some((group, _)) => {
                        c.exportgroup_remove_volumes(
                            &group,
                            &project_path,
                            &volume_path,
                            true,
                        )?;
                        info!("Removed volume {} from export group {}", name, group);
                    }
                    None => warn!("No export group holds initiator {}", port),
                }
                Ok(())
            })
            .map_err(|e| {
                e.context(&format!("Removing volume {} from export group failed", name))
            })
    }

    fn update_volume_stats(&mut self) -> Result<VolumeStats> {
        debug!("Updating volume stats");
        let project_path = self.placement.project_path();
        self.client.with_auth_retry(|c| {
            let mut pairs = BTreeSet::new();
            for vol in c.volume_list(&project_path)? {
                if let (Some(vpool), Some(varray)) = (vol.vpool, vol.varray) {
                    pairs.insert((vpool.id, varray.id));
                }
            }
            let mut stats = VolumeStats::default();
            if pairs.is_empty() {
                return Ok(stats);
            }
            let mut sum = Capacity::default();
            for (vpool, varray) in &pairs {
                let cap = c.vpool_varray_capacity(vpool, varray)?;
                sum.free_gb += cap.free_gb;
                sum.used_gb += cap.used_gb;
                sum.provisioned_gb += cap.provisioned_gb;
            }
            let total = sum.free_gb + sum.used_gb;
            stats.free_capacity_gb = Some(sum.free_gb);
            stats.total_capacity_gb = Some(total);
            if total > 0.0 {
                stats.reserved_percentage = 100.0 * sum.provisioned_gb / total;
            }
            Ok(stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{fake_client, FakeTransport, Reply};
    use crate::task::TaskPoller;
    use crate::transport::Method;
    use std::time::Duration;

    const ROOT: &str = "urn:storageos:TenantOrg:root:global";
    const PROJECT: &str = "urn:storageos:Project:p1:global";
    const EG: &str = "urn:storageos:ExportGroup:eg1:vdc1";
    const VOL: &str = "urn:storageos:Volume:v1:vdc1";
    const PORT: &str = "iqn.1993-08.org.debian:01:56aafff0227d";

    fn driver() -> ViprDriver<FakeTransport> {
        let mut c = fake_client();
        c.transport_mut()
            .on(
                Method::GET,
                "/tenant",
                Reply::Json(json!({"id": ROOT, "name": "Provider Tenant"})),
            )
            .on(
                Method::GET,
                &format!("/tenants/{}/projects", ROOT),
                Reply::Json(json!({"project": [{"id": PROJECT, "name": "openstack"}]})),
            );
        ViprDriver::with_client(c, "", "openstack", "varray1").unwrap()
    }

    fn vol1() -> VolumeSpec {
        VolumeSpec {
            name: "volume-6ba4".to_string(),
            display_name: Some("vol1".to_string()),
            size_gb: 1,
            ..Default::default()
        }
    }

    fn connector() -> Connector {
        Connector {
            protocol: InitiatorProtocol::Iscsi,
            initiator_node: "iqn.1993-08.org.debian:01".to_string(),
            initiator_port: PORT.to_string(),
            hostname: "hostA".to_string(),
        }
    }

    #[test]
    fn volume_name_falls_back() {
        let mut v = vol1();
        assert_eq!(v.volume_name(), "vol1");
        v.display_name = Some(String::new());
        assert_eq!(v.volume_name(), "volume-6ba4");
        v.display_name = None;
        assert_eq!(v.volume_name(), "volume-6ba4");
        assert_eq!(v.size_bytes().unwrap(), 1 << 30);
    }

    #[test]
    fn create_volume_requires_vpool() {
        let mut d = driver();
        match d.create_volume(&vol1()) {
            Err(ViprError::InvalidArgument(m)) => assert!(m.contains("ViPR:VPOOL")),
            r => panic!("unexpected {:?}", r),
        }
        assert!(d.client_mut().transport().calls.is_empty());
    }

    #[test]
    fn attach_to_existing_group() {
        let mut d = driver();
        let exports = format!("/block/volumes/{}/exports", VOL);
        let task = format!("/block/exports/{}/tasks/op-1", EG);
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &format!("/block/exports/search?project={}", PROJECT),
                Reply::Json(json!({"resource": [{"id": EG}]})),
            )
            .on(
                Method::GET,
                &format!("/block/exports/{}", EG),
                Reply::Json(json!({
                    "id": EG,
                    "name": "hostASG-ABC123",
                    "initiators": [{"initiator_port": PORT}],
                    "volumes": []
                })),
            )
            .on(
                Method::GET,
                &format!("/block/volumes/search?project={}", PROJECT),
                Reply::Json(json!({"resource": [{"id": VOL}]})),
            )
            .on(
                Method::GET,
                &format!("/block/volumes/{}", VOL),
                Reply::Json(json!({"id": VOL, "name": "vol1"})),
            )
            .on(
                Method::PUT,
                &format!("/block/exports/{}", EG),
                Reply::Json(json!({
                    "op_id": "op-1", "state": "pending", "resource": {"id": EG}
                })),
            )
            .on(
                Method::GET,
                &task,
                Reply::Json(json!({
                    "op_id": "op-1", "state": "ready", "resource": {"id": EG}
                })),
            )
            .on(Method::GET, &exports, Reply::Json(json!({"itl": [{"hlu": -1}]})))
            .on(
                Method::GET,
                &exports,
                Reply::Json(json!({"itl": [{
                    "hlu": "000000",
                    "initiator": {"port": PORT},
                    "target": {"port": "iqn.1992-04.com.emc:cx.a8",
                               "ip_address": "10.0.0.5"}
                }]})),
            );

        let info = d.initialize_connection(&vol1(), &connector()).unwrap();
        assert_eq!(
            info,
            DeviceInfo {
                host_lun_id: 0,
                endpoint: Some("iqn.1992-04.com.emc:cx.a8".to_string()),
                ip_address: Some("10.0.0.5".to_string()),
            }
        );
        let tp = d.client_mut().transport();
        assert_eq!(
            tp.bodies(Method::PUT, &format!("/block/exports/{}", EG)),
            vec![json!({"volume_changes": {"add": [{"id": VOL, "lun": 0}]}})]
        );
        assert_eq!(tp.count(Method::GET, &exports), 2);
    }

    #[test]
    fn stats_sum_unique_pools() {
        let vol2 = "urn:storageos:Volume:v2:vdc1";
        let mut d = driver();
        let pool = json!({"id": "urn:storageos:VirtualPool:vp1:vdc1"});
        let varray = json!({"id": "urn:storageos:VirtualArray:va1:vdc1"});
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &format!("/block/volumes/search?project={}", PROJECT),
                Reply::Json(json!({"resource": [{"id": VOL}, {"id": vol2}]})),
            )
            .on(
                Method::GET,
                &format!("/block/volumes/{}", VOL),
                Reply::Json(json!({
                    "id": VOL, "name": "vol1", "vpool": pool, "varray": varray
                })),
            )
            .on(
                Method::GET,
                &format!("/block/volumes/{}", vol2),
                Reply::Json(json!({
                    "id": vol2, "name": "vol2", "vpool": pool, "varray": varray
                })),
            )
            .on(
                Method::GET,
                "/block/vpools/urn:storageos:VirtualPool:vp1:vdc1/varrays/\
                 urn:storageos:VirtualArray:va1:vdc1/capacity",
                Reply::Json(json!({
                    "free_gb": "60", "used_gb": "40", "provisioned_gb": "50"
                })),
            );
        let stats = d.update_volume_stats().unwrap();
        assert_eq!(stats.free_capacity_gb, Some(60.0));
        assert_eq!(stats.total_capacity_gb, Some(100.0));
        assert_eq!(stats.reserved_percentage, 50.0);
        assert_eq!(stats.volume_backend_name, "EMCViPRISCSIDriver");
    }

    #[test]
    fn stats_without_volumes() {
        let mut d = driver();
        d.client_mut().transport_mut().on(
            Method::GET,
            &format!("/block/volumes/search?project={}", PROJECT),
            Reply::Json(json!({"resource": []})),
        );
        let stats = d.update_volume_stats().unwrap();
        assert_eq!(stats.total_capacity_gb, None);
        assert_eq!(stats.reserved_percentage, 0.0);
        assert_eq!(stats.vendor_name, "EMC");
    }

    fn with_vol1(d: &mut ViprDriver<FakeTransport>) {
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &format!("/block/volumes/search?project={}", PROJECT),
                Reply::Json(json!({"resource": [{"id": VOL}]})),
            )
            .on(
                Method::GET,
                &format!("/block/volumes/{}", VOL),
                Reply::Json(json!({"id": VOL, "name": "vol1"})),
            );
    }

    fn task_reply(op_id: &str, uri: &str, state: &str) -> Reply {
        Reply::Json(json!({"op_id": op_id, "state": state, "resource": {"id": uri}}))
    }

    #[test]
    fn delete_volume_logs_in_again_once() {
        let mut d = driver();
        with_vol1(&mut d);
        let deactivate = format!("/block/volumes/{}/deactivate", VOL);
        d.client_mut()
            .transport_mut()
            .on(Method::POST, &deactivate, Reply::Status(401))
            .on(Method::POST, &deactivate, task_reply("op-d", VOL, "pending"))
            .on(
                Method::GET,
                &format!("/block/volumes/{}/tasks/op-d", VOL),
                task_reply("op-d", VOL, "ready"),
            );
        d.delete_volume(&vol1()).unwrap();
        let tp = d.client_mut().transport();
        assert_eq!(tp.logins, 2);
        assert_eq!(tp.count(Method::POST, &deactivate), 2);
        assert_eq!(tp.tokens.last().unwrap().as_deref(), Some("token-2"));
    }

    #[test]
    fn delete_volume_failure_keeps_variant() {
        let mut d = driver();
        with_vol1(&mut d);
        d.client_mut().transport_mut().on(
            Method::POST,
            &format!("/block/volumes/{}/deactivate", VOL),
            Reply::Status(403),
        );
        match d.delete_volume(&vol1()) {
            Err(ViprError::PermissionDenied(m)) => {
                assert!(m.starts_with("Volume vol1: delete failed: "))
            }
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(d.client_mut().transport().logins, 1);
    }

    #[test]
    fn set_tags_replaces_driver_tags() {
        let mut d = driver();
        with_vol1(&mut d);
        let tags = format!("/block/volumes/{}/tags", VOL);
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &tags,
                Reply::Json(json!({"tag": ["OpenStack:old:1", "user-tag"]})),
            )
            .on(
                Method::GET,
                &tags,
                Reply::Json(json!({"tag": ["OpenStack:display_name:vol1", "user-tag"]})),
            )
            .on(Method::PUT, &tags, Reply::Status(500))
            .on(Method::PUT, &tags, Reply::Empty);

        let mut vol = vol1();
        vol.properties.insert("display_name".to_string(), "vol1".to_string());
        vol.properties.insert("status".to_string(), "creating".to_string());
        vol.properties
            .insert("status_detail".to_string(), "none".to_string());

        let after = d.set_tags(&vol).unwrap();
        assert_eq!(after, vec!["OpenStack:display_name:vol1", "user-tag"]);
        assert_eq!(
            d.client_mut().transport().bodies(Method::PUT, &tags),
            vec![
                json!({"remove": ["OpenStack:old:1"]}),
                json!({"add": ["OpenStack:display_name:vol1"]}),
            ]
        );
    }

    #[test]
    fn detach_from_group() {
        let mut d = driver();
        with_vol1(&mut d);
        let eg = format!("/block/exports/{}", EG);
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &format!("/block/exports/search?project={}", PROJECT),
                Reply::Json(json!({"resource": [{"id": EG}]})),
            )
            .on(
                Method::GET,
                &eg,
                Reply::Json(json!({
                    "id": EG,
                    "name": "hostASG-ABC123",
                    "initiators": [{"initiator_port": PORT}],
                    "volumes": []
                })),
            )
            .on(Method::PUT, &eg, task_reply("op-2", EG, "pending"))
            .on(
                Method::GET,
                &format!("/block/exports/{}/tasks/op-2", EG),
                task_reply("op-2", EG, "ready"),
            );
        d.terminate_connection(&vol1(), &connector()).unwrap();
        assert_eq!(
            d.client_mut().transport().bodies(Method::PUT, &eg),
            vec![json!({"volume_changes": {"remove": [VOL]}})]
        );
    }

    #[test]
    fn detach_without_group() {
        let mut d = driver();
        d.client_mut().transport_mut().on(
            Method::GET,
            &format!("/block/exports/search?project={}", PROJECT),
            Reply::Json(json!({"resource": []})),
        );
        d.terminate_connection(&vol1(), &connector()).unwrap();
        let tp = d.client_mut().transport();
        assert!(tp.calls.iter().all(|(m, _, _)| *m == Method::GET));
    }

    #[test]
    fn attach_registers_host_and_group() {
        let host = "urn:storageos:Host:h1:vdc1";
        let init = "urn:storageos:Initiator:i1:vdc1";
        let hosts = format!("/tenants/{}/hosts", ROOT);
        let exports = format!("/block/volumes/{}/exports", VOL);
        let mut d = driver();
        with_vol1(&mut d);
        d.client_mut()
            .transport_mut()
            .on(
                Method::GET,
                &format!("/block/exports/search?project={}", PROJECT),
                Reply::Json(json!({"resource": []})),
            )
            .on(Method::GET, &hosts, Reply::Json(json!({"host": []})))
            .on(Method::GET, &hosts, Reply::Json(json!({"host": []})))
            .on(
                Method::GET,
                &hosts,
                Reply::Json(json!({"host": [{"id": host, "name": "hostA"}]})),
            )
            .on(Method::POST, &hosts, task_reply("op-h", host, "pending"))
            .on(
                Method::GET,
                &format!("/compute/hosts/{}/tasks/op-h", host),
                task_reply("op-h", host, "ready"),
            )
            .on(
                Method::POST,
                &format!("/compute/hosts/{}/initiators", host),
                task_reply("op-i", init, "pending"),
            )
            .on(
                Method::GET,
                &format!("/compute/initiators/{}/tasks/op-i", init),
                task_reply("op-i", init, "ready"),
            )
            .on(
                Method::GET,
                "/vdc/varrays",
                Reply::Json(json!({"varray": [{
                    "id": "urn:storageos:VirtualArray:va1:vdc1", "name": "varray1"
                }]})),
            )
            .on(Method::POST, "/block/exports", task_reply("op-e", EG, "pending"))
            .on(
                Method::GET,
                &format!("/block/exports/{}/tasks/op-e", EG),
                task_reply("op-e", EG, "ready"),
            )
            .on(
                Method::PUT,
                &format!("/block/exports/{}", EG),
                task_reply("op-1", EG, "pending"),
            )
            .on(
                Method::GET,
                &format!("/block/exports/{}/tasks/op-1", EG),
                task_reply("op-1", EG, "ready"),
            )
            .on(
                Method::GET,
                &exports,
                Reply::Json(json!({"itl": [{
                    "hlu": 0,
                    "initiator": {"port": PORT},
                    "target": {"port": "iqn.1992-04.com.emc:cx.a8"}
                }]})),
            );

        let info = d.initialize_connection(&vol1(), &connector()).unwrap();
        assert_eq!(info.host_lun_id, 0);

        let tp = d.client_mut().transport();
        assert_eq!(
            tp.bodies(Method::POST, &hosts),
            vec![json!({
                "type": "Other",
                "name": "hostA",
                "host_name": "hostA",
                "discoverable": false
            })]
        );
        assert_eq!(
            tp.bodies(Method::POST, &format!("/compute/hosts/{}/initiators", host)),
            vec![json!({
                "protocol": "iSCSI",
                "initiator_node": "iqn.1993-08.org.debian:01",
                "initiator_port": PORT
            })]
        );
        let created = tp.bodies(Method::POST, "/block/exports");
        assert_eq!(created.len(), 1);
        let name = created[0]["name"].as_str().unwrap();
        assert!(
            regex::Regex::new("^hostASG-[A-Z0-9]{6}$").unwrap().is_match(name),
            "bad export group name {}",
            name
        );
        assert_eq!(created[0]["type"], json!("Host"));
        assert_eq!(created[0]["hosts"], json!([host]));
        assert_eq!(
            tp.bodies(Method::PUT, &format!("/block/exports/{}", EG)),
            vec![json!({"volume_changes": {"add": [{"id": VOL, "lun": 0}]}})]
        );
    }

    #[test]
    fn device_wait_ignores_other_initiators() {
        let mut d = driver();
        with_vol1(&mut d);
        d.client_mut().set_poller(TaskPoller::new(
            Duration::from_millis(50),
            Duration::from_millis(5),
        ));
        d.client_mut().transport_mut().on(
            Method::GET,
            &format!("/block/volumes/{}/exports", VOL),
            Reply::Json(json!({"itl": [
                {"hlu": 3, "initiator": {"port": "iqn.1993-08.org.debian:01:other"}},
                {"hlu": -1, "initiator": {"port": PORT}}
            ]})),
        );
        match wait_for_device(d.client_mut(), "/openstack/vol1", PORT) {
            Err(ViprError::TimeOut(m)) => assert!(m.contains("/openstack/vol1")),
            r => panic!("unexpected {:?}", r),
        }
    }
}
