//! Preparing and tearing down worker directories: clone, branch, install,
//! `.env` files. These are plain sequential shell steps.

pub mod package_manager;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SquadError};

pub use package_manager::PackageManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePlan {
    pub repo_url: String,
    pub directory: PathBuf,
    pub branch: String,
    pub port: u16,
    pub install: bool,
    pub dev_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedWorkspace {
    /// Present when the checkout has a `package.json` and a dev server was wanted.
    pub dev_command: Option<String>,
}

#[async_trait]
pub trait WorkspaceSetup: Send + Sync {
    async fn prepare(&self, plan: &WorkspacePlan) -> Result<PreparedWorkspace>;

    async fn remove(&self, directory: &Path) -> Result<()>;
}

pub struct ShellSetup {
    env_source: Option<PathBuf>,
}

impl ShellSetup {
    pub fn new(env_source: Option<PathBuf>) -> Self {
        Self { env_source }
    }

    async fn run(step: &str, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        debug!("{}: {} {}", step, program, args.join(" "));
        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .await
            .map_err(|e| SquadError::setup(step, e.to_string()))?;

        if !output.status.success() {
            return Err(SquadError::setup(
                step,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn copy_env_files(&self, directory: &Path) -> Result<usize> {
        let Some(source) = &self.env_source else {
            return Ok(0);
        };

        let mut entries = tokio::fs::read_dir(source).await?;
        let mut copied = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_env = name.to_string_lossy().starts_with(".env");
            if is_env && entry.file_type().await?.is_file() {
                tokio::fs::copy(entry.path(), directory.join(&name)).await?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}

#[async_trait]
impl WorkspaceSetup for ShellSetup {
    async fn prepare(&self, plan: &WorkspacePlan) -> Result<PreparedWorkspace> {
        if let Some(parent) = plan.directory.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let directory = plan.directory.to_string_lossy().to_string();
        info!("Cloning {} into {}", plan.repo_url, directory);
        Self::run("git clone", "git", &["clone", &plan.repo_url, &directory], None).await?;
        Self::run(
            "git checkout",
            "git",
            &["checkout", "-b", &plan.branch],
            Some(&plan.directory),
        )
        .await?;

        let copied = self.copy_env_files(&plan.directory).await?;
        if copied > 0 {
            debug!("Copied {} env files", copied);
        }

        if !plan.directory.join("package.json").exists() {
            return Ok(PreparedWorkspace { dev_command: None });
        }

        let manager = PackageManager::detect(&plan.directory);
        if plan.install {
            info!("Installing dependencies with {}", manager.program());
            Self::run("install", manager.program(), &["install"], Some(&plan.directory)).await?;
        }

        Ok(PreparedWorkspace {
            dev_command: plan.dev_server.then(|| manager.dev_command(plan.port)),
        })
    }

    async fn remove(&self, directory: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(directory).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => warn!("Removing {} failed ({}), forcing", directory.display(), e),
        }

        let path = directory.to_string_lossy().to_string();
        Self::run("rm -rf", "rm", &["-rf", &path], None).await
    }
}
