use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    Bun,
    Pnpm,
    Yarn,
    Npm,
}

/// Lockfiles in precedence order.
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("bun.lockb", PackageManager::Bun),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
];

impl PackageManager {
    /// First matching lockfile wins; npm when there is none.
    pub fn detect(directory: &Path) -> Self {
        LOCKFILES
            .iter()
            .find(|(lockfile, _)| directory.join(lockfile).exists())
            .map(|(_, manager)| *manager)
            .unwrap_or(PackageManager::Npm)
    }

    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Bun => "bun",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
        }
    }

    pub fn run_command(&self) -> &'static str {
        match self {
            PackageManager::Bun => "bun run",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm run",
        }
    }

    pub fn dev_command(&self, port: u16) -> String {
        format!("PORT={} {} dev", port, self.run_command())
    }
}
