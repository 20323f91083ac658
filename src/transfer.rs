//! Container-transfer collaborator: shuttles staged chunk files into an
//! isolated database container with `docker cp`, for deployments where the
//! MySQL server cannot read the local staging directory. The core pipeline
//! does not depend on this; it is wired in only when a container name is
//! configured.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ContainerTransfer {
    container: String,
    dest_dir: String,
}

impl ContainerTransfer {
    pub fn new(container: impl Into<String>, dest_dir: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            dest_dir: dest_dir.into(),
        }
    }

    /// Copy a staged file into the container; returns the in-container path
    /// to hand to the bulk import statement.
    pub fn copy_in(&self, local: &Path) -> Result<String> {
        if !local.exists() {
            bail!("staged file not found: {}", local.display());
        }
        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("staged file has no usable name: {}", local.display()))?;
        let dest = format!("{}/{file_name}", self.dest_dir.trim_end_matches('/'));
        let status = Command::new("docker")
            .args([
                "cp",
                &local.display().to_string(),
                &format!("{}:{dest}", self.container),
            ])
            .status()
            .context("failed to spawn docker cp")?;
        if !status.success() {
            bail!("docker cp into {} failed: {status}", self.container);
        }
        info!(container = %self.container, dest = %dest, "staged chunk copied into container");
        Ok(dest)
    }

    /// Delete a previously copied file from inside the container.
    pub fn remove(&self, container_path: &str) -> Result<()> {
        let status = Command::new("docker")
            .args(["exec", &self.container, "rm", "-f", container_path])
            .status()
            .context("failed to spawn docker exec")?;
        if !status.success() {
            bail!("docker exec rm -f {container_path} failed: {status}");
        }
        info!(container = %self.container, path = %container_path, "staged chunk deleted from container");
        Ok(())
    }
}
