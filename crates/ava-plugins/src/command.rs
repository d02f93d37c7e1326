//! `command` runtime: the plugin image is a local shell command.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use ava_core::PluginFilter;

use crate::{
    error::{PluginError, Result},
    plugin::Plugin,
    process::run_with_input,
    spec::PluginSpec,
};

/// Runs `sh -c <image>` once per invocation with the configured environment.
pub struct CommandPlugin {
    spec: PluginSpec,
    stopped: AtomicBool,
}

impl CommandPlugin {
    pub fn new(spec: PluginSpec) -> Self {
        info!(command = %spec.image, "command plugin loaded");
        Self {
            spec,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.spec.image).envs(&self.spec.environment);
        cmd
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
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
        debug!(command = %self.spec.image, bytes = input.len(), "running command plugin");
        run_with_input(self.command(), input, self.spec.timeout)
            .await?
            .into_reply()
    }

    async fn stop(&self) -> Result<()> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(command = %self.spec.image, "command plugin stopped");
        }
        Ok(())
    }
}
