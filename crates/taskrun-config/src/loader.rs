// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Config layers, lowest priority first.
fn layer_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/taskrun/config.toml")];

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/taskrun/config.toml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        let p = cfg.join("taskrun/config.toml");
        if !paths.contains(&p) {
            paths.push(p);
        }
    }

    paths.push(PathBuf::from(".taskrun/config.toml"));
    paths.push(PathBuf::from("taskrun.toml"));
    paths
}

fn read_layer(path: &Path) -> anyhow::Result<toml::Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Merge every config file that exists, then `extra` (the `--config` flag)
/// on top.  An explicit path that cannot be read is an error; missing
/// discovered layers are skipped.
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in layer_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            merge_toml(&mut merged, read_layer(&path)?);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        merge_toml(&mut merged, read_layer(p)?);
    }

    let config: Config = merged.try_into().context("invalid configuration")?;
    Ok(config)
}

/// Deep-merge `src` into `dst`; src wins on scalar conflicts and arrays
/// are replaced wholesale.
fn merge_toml(dst: &mut toml::Value, src: toml::Value) {
    match (dst, src) {
        (toml::Value::Table(d), toml::Value::Table(s)) => {
            for (k, v) in s {
                match d.get_mut(&k) {
                    Some(existing) => merge_toml(existing, v),
                    None => {
                        d.insert(k, v);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
