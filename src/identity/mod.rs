//! Worker identity allocation: names, branches, ports and repository names.
//!
//! Everything here is a pure function of its inputs (plus randomness or the
//! clock where noted). The registry is the only source of truth for what is
//! already taken.

mod words;

use chrono::{Local, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::config::SquadConfig;
use crate::error::{Result, SquadError};
use crate::registry::RegistryState;

pub use words::{ADJECTIVES, ANIMALS};

pub const MAX_NAME_ATTEMPTS: usize = 100;
pub const MAX_SLUG_LEN: usize = 40;
const FALLBACK_REPO_NAME: &str = "repo";

pub fn generate_worker_name(existing: &HashSet<String>) -> String {
    generate_worker_name_with(&mut rand::thread_rng(), existing)
}

/// Draws `adjective-animal` names until one is free. After
/// `MAX_NAME_ATTEMPTS` collisions the last draw gets a millisecond suffix.
pub fn generate_worker_name_with<R: Rng + ?Sized>(rng: &mut R, existing: &HashSet<String>) -> String {
    let mut candidate = String::new();
    for _ in 0..MAX_NAME_ATTEMPTS {
        candidate = draw_name(rng);
        if !existing.contains(&candidate) {
            return candidate;
        }
    }

    let mut fallback = format!("{}-{}", candidate, Utc::now().timestamp_millis());
    let mut bump = 1;
    while existing.contains(&fallback) {
        fallback = format!("{}-{}-{}", candidate, Utc::now().timestamp_millis(), bump);
        bump += 1;
    }
    fallback
}

fn draw_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("swift");
    let animal = ANIMALS.choose(rng).copied().unwrap_or("otter");
    format!("{}-{}", adjective, animal)
}

pub fn generate_branch_name(task: &str, worker_name: &str) -> String {
    generate_branch_name_on(task, worker_name, Local::now().date_naive())
}

/// `feat/<slug>-<worker>-<YYYYMMDD>`; the slug is dropped entirely when the
/// task has no alphanumerics, giving `feat/<worker>-<YYYYMMDD>`.
pub fn generate_branch_name_on(task: &str, worker_name: &str, date: NaiveDate) -> String {
    let slug = slugify(task);
    let date = date.format("%Y%m%d");
    if slug.is_empty() {
        format!("feat/{}-{}", worker_name, date)
    } else {
        format!("feat/{}-{}-{}", slug, worker_name, date)
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen {
                slug.push('-');
                pending_hyphen = false;
            }
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    if pending_hyphen {
        slug.push('-');
    }

    // ASCII only from here on, so byte truncation is safe.
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_matches('-').to_string()
}

/// Port the next worker would get. Reading it does not reserve it; the
/// offset only moves when a worker record is persisted.
///
/// Fails once the sequence runs past the last valid port instead of handing
/// out a port twice.
pub fn next_port(state: &RegistryState, config: &SquadConfig) -> Result<u16> {
    let offset = state.next_port_offset;
    offset
        .checked_mul(u32::from(config.port_increment))
        .and_then(|step| step.checked_add(u32::from(config.base_port)))
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(SquadError::PortsExhausted { offset })
}

pub fn repo_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() {
        FALLBACK_REPO_NAME.to_string()
    } else {
        name.to_string()
    }
}
