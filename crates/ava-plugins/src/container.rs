//! `container` runtime: the plugin image is a container image.
//!
//! Every invocation starts a fresh, auto-removed container with the message on
//! stdin:
//!
//! ```text
//! docker run --rm -i --name ava-<uuid> -e KEY=VALUE … <image>
//! ```
//!
//! Names of in-flight containers are tracked so `stop` can force-remove
//! anything still running at teardown.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ava_core::PluginFilter;

use crate::{
    error::{PluginError, Result},
    plugin::Plugin,
    process::run_with_input,
    spec::PluginSpec,
};

const CONTAINER_PREFIX: &str = "ava-";

pub struct ContainerPlugin {
    spec: PluginSpec,
    stopped: AtomicBool,
    /// Names of containers started by `run` that have not exited yet.
    running: Mutex<HashSet<String>>,
}

impl ContainerPlugin {
    /// Make sure the image is available locally, pulling it if needed.
    ///
    /// # Errors
    ///
    /// - `LoadFailed`: neither `image inspect` nor `pull` succeeded.
    pub async fn load(spec: PluginSpec) -> Result<Self> {
        if !cli_succeeds(&spec.container_cli, &["image", "inspect", &spec.image]).await {
            info!(image = %spec.image, "image not present locally, pulling");
            let pulled = Command::new(&spec.container_cli)
                .args(["pull", &spec.image])
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| PluginError::LoadFailed {
                    image: spec.image.clone(),
                    reason: format!("{} not runnable: {e}", spec.container_cli),
                })?;
            if !pulled.status.success() {
                return Err(PluginError::LoadFailed {
                    image: spec.image.clone(),
                    reason: String::from_utf8_lossy(&pulled.stderr).trim().to_string(),
                });
            }
        }

        info!(image = %spec.image, cli = %spec.container_cli, "container plugin loaded");
        Ok(Self {
            spec,
            stopped: AtomicBool::new(false),
            running: Mutex::new(HashSet::new()),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Arguments passed to the container CLI for one invocation.
    pub fn run_args(&self, container_name: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            "--name".to_string(),
            container_name.to_string(),
        ];
        for (key, value) in &self.spec.environment {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(self.spec.image.clone());
        args
    }

    fn track(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn force_remove(&self, name: &str) -> bool {
        cli_succeeds(&self.spec.container_cli, &["rm", "-f", name]).await
    }
}

#[async_trait]
impl Plugin for ContainerPlugin {
    fn name(&self) -> &str {
        &self.spec.image
    }

    fn filter(&self) -> &PluginFilter {
        &self.spec.filter
    }

    async fn run(&self, input: &str) -> Result<String> {
        if self.is_stopped() {
            return Err(PluginError::Stopped(self.spec.image.clone()));
        }

        let name = format!("{CONTAINER_PREFIX}{}", Uuid::new_v4().simple());
        let mut cmd = Command::new(&self.spec.container_cli);
        cmd.args(self.run_args(&name));

        self.track().insert(name.clone());
        debug!(image = %self.spec.image, container = %name, "starting plugin container");
        let result = run_with_input(cmd, input, self.spec.timeout).await;
        self.track().remove(&name);

        // Killing the CLI does not stop the container itself.
        if matches!(result, Err(PluginError::Timeout { .. })) && !self.force_remove(&name).await {
            warn!(container = %name, "could not remove timed-out plugin container");
        }

        result?.into_reply()
    }

    async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let leftovers: Vec<String> = self.track().drain().collect();
        let mut failed = Vec::new();
        for name in leftovers {
            if !self.force_remove(&name).await {
                failed.push(name);
            }
        }

        info!(image = %self.spec.image, "container plugin stopped");
        if failed.is_empty() {
            Ok(())
        } else {
            Err(PluginError::Teardown(format!(
                "containers still present: {}",
                failed.join(", ")
            )))
        }
    }
}

async fn cli_succeeds(cli: &str, args: &[&str]) -> bool {
    Command::new(cli)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
