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
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vipr::{
    is_uri, to_bytes, Client, NfsExportSpec, TaskResult, ViprConfig,
    DEFAULT_PORT,
};

#[derive(Parser, Debug)]
#[command(name = "viprcli", version, about = "ViPR storage controller CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Controller host name or IP address
    #[arg(long, env = "VIPR_HOSTNAME", global = true, default_value = "")]
    hostname: String,

    #[arg(long, env = "VIPR_PORT", global = true, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, env = "VIPR_USERNAME", global = true, default_value = "")]
    username: String,

    #[arg(long, env = "VIPR_PASSWORD", global = true, default_value = "",
          hide_env_values = true)]
    password: String,

    /// Tenant, empty for the tenant of the logged in user
    #[arg(long, env = "VIPR_TENANT", global = true, default_value = "")]
    tenant: String,

    #[arg(long, env = "VIPR_PROJECT", global = true, default_value = "")]
    project: String,

    #[arg(long, env = "VIPR_VARRAY", global = true, default_value = "")]
    varray: String,

    /// Verify the controller TLS certificate
    #[arg(long, env = "VIPR_VERIFY_TLS", global = true)]
    verify_tls: bool,

    /// Seconds to wait for synchronous operations
    #[arg(long, env = "VIPR_TASK_TIMEOUT", global = true, default_value_t = 300)]
    timeout: u64,

    /// More logging, repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("tenant", &self.tenant)
            .field("project", &self.project)
            .field("varray", &self.varray)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl GlobalArgs {
    fn config(&self) -> anyhow::Result<ViprConfig> {
        if self.hostname.is_empty() {
            bail!("--hostname or VIPR_HOSTNAME is required");
        }
        if self.username.is_empty() || self.password.is_empty() {
            bail!("Both user name and password are required");
        }
        let mut cfg =
            ViprConfig::new(&self.hostname, &self.username, &self.password);
        cfg.port = self.port;
        cfg.tenant = self.tenant.clone();
        cfg.project = self.project.clone();
        cfg.varray = self.varray.clone();
        cfg.verify_tls = self.verify_tls;
        cfg.task_timeout = Duration::from_secs(self.timeout);
        Ok(cfg)
    }

    fn project_path(&self) -> String {
        format!("{}/{}", self.tenant, self.project)
    }

    /// `tenant/project/name`, URIs untouched.
    fn resource_path(&self, name: &str) -> String {
        if is_uri(name) {
            name.to_string()
        } else {
            format!("{}/{}", self.project_path(), name)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the user name
    Authenticate,
    #[command(subcommand)]
    Task(TaskCmd),
    #[command(subcommand)]
    Volume(VolumeCmd),
    #[command(subcommand)]
    Snapshot(SnapshotCmd),
    #[command(subcommand)]
    Filesystem(FilesystemCmd),
    #[command(subcommand)]
    Tenant(TenantCmd),
}

#[derive(Subcommand, Debug)]
enum TaskCmd {
    Show { resource_uri: String, op_id: String },
    /// Wait until the task completes, fails or times out
    Wait {
        resource_uri: String,
        op_id: String,
        /// Seconds, overrides --timeout
        #[arg(long = "wait-timeout")]
        wait_timeout: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum VolumeCmd {
    Create {
        name: String,
        /// Size like 10G, 512M or bytes
        #[arg(long)]
        size: String,
        #[arg(long)]
        vpool: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long)]
        sync: bool,
    },
    Delete {
        name: String,
        #[arg(long)]
        sync: bool,
    },
    List,
    Show { name: String },
}

#[derive(Subcommand, Debug)]
enum SnapshotCmd {
    Create {
        volume: String,
        name: String,
        #[arg(long)]
        sync: bool,
    },
    Delete {
        volume: String,
        name: String,
        #[arg(long)]
        sync: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FilesystemCmd {
    Create {
        name: String,
        #[arg(long)]
        size: String,
        #[arg(long)]
        vpool: String,
        /// NFS, NFSv4 or CIFS; repeat for several
        #[arg(long = "protocol")]
        protocols: Vec<String>,
        #[arg(long)]
        sync: bool,
    },
    Delete {
        name: String,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        sync: bool,
    },
    Expand {
        name: String,
        /// New size, larger than the current one
        #[arg(long)]
        size: String,
        #[arg(long)]
        sync: bool,
    },
    Export {
        name: String,
        /// Host names, IP addresses or netgroups
        #[arg(long = "endpoint", required = true)]
        endpoints: Vec<String>,
        #[arg(long, default_value = "rw")]
        permissions: String,
        #[arg(long, default_value = "nobody")]
        root_user: String,
        #[arg(long)]
        sync: bool,
    },
    Exports { name: String },
    /// Rename a filesystem and move it to another vpool
    Update {
        name: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        vpool: String,
        #[arg(long)]
        sync: bool,
    },
    List,
    Show { name: String },
    Tasks { name: String },
}

#[derive(Subcommand, Debug)]
enum TenantCmd {
    /// Create a subtenant mapped to users of a domain
    Create {
        name: String,
        #[arg(long)]
        domain: String,
        /// Directory attribute to map users by
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    Delete { name: String },
    List,
    Show {
        #[arg(default_value = "")]
        name: String,
    },
}

fn print_json<T: Serialize>(val: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn parse_size(s: &str) -> anyhow::Result<u64> {
    match to_bytes(s) {
        Some(b) if b > 0 => Ok(b),
        _ => bail!("Invalid size '{}'", s),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let g = &cli.global;
    let cfg = g.config()?;
    let mut c = Client::new(&cfg).context("Failed to set up controller client")?;

    match cli.command {
        Command::Authenticate => {
            let s = c.authenticate().context("Login failed")?;
            println!("{}", s.user());
        }
        Command::Task(TaskCmd::Show {
            resource_uri,
            op_id,
        }) => match c.show_task(&resource_uri, &op_id)? {
            Some(t) => print_json(&t)?,
            None => bail!("No data for task {}", op_id),
        },
        Command::Task(TaskCmd::Wait {
            resource_uri,
            op_id,
            wait_timeout,
        }) => {
            let r = c.with_auth_retry(|c| {
                c.wait_for_task(
                    &resource_uri,
                    &op_id,
                    wait_timeout.map(Duration::from_secs),
                )
            })?;
            match r {
                TaskResult::Completed(t) => print_json(&t)?,
                TaskResult::Failed { op_id, detail } => {
                    bail!("Task {} is in ERROR state: {}", op_id, detail)
                }
                TaskResult::TimedOut => {
                    bail!("Operation timed out waiting for task {}", op_id)
                }
            }
        }
        Command::Volume(cmd) => volume(&mut c, g, cmd)?,
        Command::Snapshot(cmd) => snapshot(&mut c, g, cmd)?,
        Command::Filesystem(cmd) => filesystem(&mut c, g, cmd)?,
        Command::Tenant(TenantCmd::Create {
            name,
            domain,
            key,
            value,
        }) => print_json(&c.tenant_create(
            &name,
            &domain,
            key.as_deref(),
            value.as_deref(),
        )?)?,
        Command::Tenant(TenantCmd::Delete { name }) => c.tenant_delete(&name)?,
        Command::Tenant(TenantCmd::List) => print_json(&c.tenant_list()?)?,
        Command::Tenant(TenantCmd::Show { name }) => {
            print_json(&c.tenant_show(&name)?)?
        }
    }
    c.logout();
    Ok(())
}

fn volume(c: &mut Client, g: &GlobalArgs, cmd: VolumeCmd) -> anyhow::Result<()> {
    match cmd {
        VolumeCmd::Create {
            name,
            size,
            vpool,
            count,
            sync,
        } => {
            let size = parse_size(&size)?;
            let tasks = c
                .volume_create(
                    &g.project_path(),
                    &name,
                    size,
                    &g.varray,
                    &vpool,
                    count,
                    sync,
                )
                .with_context(|| format!("Volume {}: create failed", name))?;
            print_json(&tasks)
        }
        VolumeCmd::Delete { name, sync } => {
            let task = c
                .volume_delete(&g.resource_path(&name), sync)
                .with_context(|| format!("Volume {}: delete failed", name))?;
            print_json(&task)
        }
        VolumeCmd::List => print_json(&c.volume_list(&g.project_path())?),
        VolumeCmd::Show { name } => {
            print_json(&c.volume_show(&g.resource_path(&name))?)
        }
    }
}

fn snapshot(
    c: &mut Client,
    g: &GlobalArgs,
    cmd: SnapshotCmd,
) -> anyhow::Result<()> {
    match cmd {
        SnapshotCmd::Create { volume, name, sync } => {
            let vol_uri = c.volume_query(&g.resource_path(&volume))?;
            print_json(&c.snapshot_create(&vol_uri, &name, false, sync)?)
        }
        SnapshotCmd::Delete { volume, name, sync } => {
            let vol_uri = c.volume_query(&g.resource_path(&volume))?;
            print_json(&c.snapshot_delete(&vol_uri, &name, sync)?)
        }
    }
}

fn filesystem(
    c: &mut Client,
    g: &GlobalArgs,
    cmd: FilesystemCmd,
) -> anyhow::Result<()> {
    match cmd {
        FilesystemCmd::Create {
            name,
            size,
            vpool,
            protocols,
            sync,
        } => {
            let size = parse_size(&size)?;
            debug!("Creating filesystem {} of {} bytes", name, size);
            print_json(&c.fileshare_create(
                &g.project_path(),
                &name,
                size,
                &g.varray,
                &vpool,
                &protocols,
                sync,
            )?)
        }
        FilesystemCmd::Delete { name, force, sync } => {
            print_json(&c.fileshare_delete(&g.resource_path(&name), force, sync)?)
        }
        FilesystemCmd::Expand { name, size, sync } => {
            let size = parse_size(&size)?;
            print_json(&c.fileshare_expand(&g.resource_path(&name), size, sync)?)
        }
        FilesystemCmd::Export {
            name,
            endpoints,
            permissions,
            root_user,
            sync,
        } => {
            let spec = NfsExportSpec {
                endpoints,
                permissions,
                root_user,
                ..Default::default()
            };
            print_json(&c.fileshare_export(&g.resource_path(&name), &spec, sync)?)
        }
        FilesystemCmd::Update {
            name,
            label,
            vpool,
            sync,
        } => print_json(&c.fileshare_update(
            &g.resource_path(&name),
            &label,
            &vpool,
            sync,
        )?),
        FilesystemCmd::Exports { name } => {
            print_json(&c.fileshare_exports(&g.resource_path(&name))?)
        }
        FilesystemCmd::List => print_json(&c.fileshare_list(&g.project_path())?),
        FilesystemCmd::Show { name } => {
            print_json(&c.fileshare_show(&g.resource_path(&name))?)
        }
        FilesystemCmd::Tasks { name } => {
            print_json(&c.fileshare_tasks(&g.resource_path(&name))?)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.global.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_args_debug_hides_password() {
        let cli = Cli::try_parse_from(&[
            "viprcli",
            "--hostname",
            "vipr.example.com",
            "--username",
            "root",
            "--password",
            "ChangeMe",
            "tenant",
            "list",
        ])
        .unwrap();
        let out = format!("{:?}", cli);
        assert!(out.contains("vipr.example.com"));
        assert!(!out.contains("ChangeMe"));
        assert_eq!(cli.global.config().unwrap().password, "ChangeMe");
    }
}
