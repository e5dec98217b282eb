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
use super::task::Task;
use super::transport::RestTransport;

fn snapshots_path(volume_uri: &str) -> String {
    format!(
        "{}/protection/snapshots",
        ResourceKind::Volume.resource_path(volume_uri)
    )
}

impl<T: RestTransport> Client<T> {
    /// Snapshots of a volume, as name/URI references.
    pub fn snapshot_list(&mut self, volume_uri: &str) -> Result<Vec<ResourceRef>> {
        let val = self.get(&snapshots_path(volume_uri))?;
        list_field(&val, "snapshot")
    }

    pub fn snapshot_show(&mut self, snapshot_uri: &str) -> Result<Snapshot> {
        Ok(serde_json::from_value(self.get(
            &ResourceKind::BlockSnapshot.resource_path(snapshot_uri),
        )?)?)
    }

    /// URI of the active snapshot `name` of a volume.
    pub fn snapshot_query(&mut self, volume_uri: &str, name: &str) -> Result<String> {
        for snap in self.snapshot_list(volume_uri)? {
            if snap.name.as_ref().map(|n| n.as_str()) != Some(name) {
                continue;
            }
            if !self.snapshot_show(&snap.id)?.inactive {
                return Ok(snap.id);
            }
        }
        Err(ViprError::NotFound(format!("Snapshot {}: not found", name)))
    }

    /// Snapshot a volume. With `inactive` the snapshot is created but not
    /// activated on the array.
    pub fn snapshot_create(
        &mut self,
        volume_uri: &str,
        name: &str,
        inactive: bool,
        sync: bool,
    ) -> Result<Vec<Task>> {
        let mut args = Map::new();
        args.insert("name".to_string(), Value::from(name));
        args.insert("create_inactive".to_string(), Value::from(inactive));
        let ret = self.post(&snapshots_path(volume_uri), &Value::Object(args))?;
        self.finish_list(ret, sync)
    }

    pub fn snapshot_delete(
        &mut self,
        volume_uri: &str,
        name: &str,
        sync: bool,
    ) -> Result<Vec<Task>> {
        let uri = self.snapshot_query(volume_uri, name)?;
        let ret = self.post(
            &format!(
                "{}/deactivate",
                ResourceKind::BlockSnapshot.resource_path(&uri)
            ),
            &json!({}),
        )?;
        self.finish_list(ret, sync)
    }
}

#[cfg(test)]
mod tests {
    use crate::fake::{fake_client, Reply};
    use crate::transport::Method;

    const VOL: &str = "urn:storageos:Volume:v1:vdc1";
    const SNAP: &str = "urn:storageos:BlockSnapshot:s1:vdc1";

    #[test]
    fn delete_skips_inactive_snapshots() {
        let old = "urn:storageos:BlockSnapshot:s0:vdc1";
        let mut c = fake_client();
        c.transport_mut()
            .on(
                Method::GET,
                &format!("/block/volumes/{}/protection/snapshots", VOL),
                Reply::Json(json!({"snapshot": [
                    {"id": old, "name": "snap1"},
                    {"id": SNAP, "name": "snap1"}
                ]})),
            )
            .on(
                Method::GET,
                &format!("/block/snapshots/{}", old),
                Reply::Json(json!({"id": old, "name": "snap1", "inactive": true})),
            )
            .on(
                Method::GET,
                &format!("/block/snapshots/{}", SNAP),
                Reply::Json(json!({"id": SNAP, "name": "snap1"})),
            )
            .on(
                Method::POST,
                &format!("/block/snapshots/{}/deactivate", SNAP),
                Reply::Json(json!({"task": [
                    {"op_id": "op-9", "state": "pending", "resource": {"id": SNAP}}
                ]})),
            );
        let tasks = c.snapshot_delete(VOL, "snap1", false).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].op_id, "op-9");
        assert!(c.snapshot_delete(VOL, "snap2", false).is_err());
    }

    #[test]
    fn create_waits_in_sync_mode() {
        let mut c = fake_client();
        let task_path = format!("/block/snapshots/{}/tasks/op-1", SNAP);
        c.transport_mut()
            .on(
                Method::POST,
                &format!("/block/volumes/{}/protection/snapshots", VOL),
                Reply::Json(json!({"task": [
                    {"op_id": "op-1", "state": "pending", "resource": {"id": SNAP}}
                ]})),
            )
            .on(
                Method::GET,
                &task_path,
                Reply::Json(json!({
                    "op_id": "op-1", "state": "ready", "resource": {"id": SNAP}
                })),
            );
        let tasks = c.snapshot_create(VOL, "snap1", false, true).unwrap();
        assert_eq!(tasks[0].state.to_string(), "ready");
        let sent = c.transport().bodies(
            Method::POST,
            &format!("/block/volumes/{}/protection/snapshots", VOL),
        );
        assert_eq!(sent, vec![json!({"name": "snap1", "create_inactive": false})]);
    }
}
