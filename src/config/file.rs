use crate::variant::{Variant, VariantMeta};
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../default.toml");

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    Read { err: std::io::Error, path: String },

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A matrix.toml file, merged over the built-in defaults.
#[derive(Deserialize, Debug)]
pub struct File {
    pub description: Option<String>,
    #[serde(default)]
    pub release: Release,
    pub runtime: Runtime,
    pub variants: Variants,
    /// Metadata keyed by variant name.
    #[serde(default = "BTreeMap::new")]
    pub variant: BTreeMap<String, VariantMeta>,
    pub templates: Templates,
    pub output: Output,
}

impl Default for File {
    fn default() -> Self {
        // The default config is compiled into the program, so
        // make sure to test default() to catch panics compile-time.
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }
}

impl File {
    /// Read a user configuration file and merge it over the defaults.
    pub fn default_with_user_config_file(path: &str) -> Result<Self, Error> {
        let user_config = std::fs::read_to_string(path).map_err(|err| Error::Read {
            err,
            path: path.to_string(),
        })?;
        Self::default_with_user_config(&user_config)
    }

    /// Tables are merged key by key; any other value in the user
    /// configuration, arrays included, replaces the default outright.
    pub fn default_with_user_config(user_config: &str) -> Result<Self, Error> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let user: toml::Table = toml::from_str(user_config)?;
        merge(&mut merged, user);
        Ok(toml::Value::Table(merged).try_into()?)
    }
}

fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge(base_table, overlay_table)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Release {
    pub version: Option<String>,
    pub checksum: Option<String>,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct Runtime {
    pub versions: Vec<String>,
    pub default: String,
    /// Inserted between the version alias and the runtime version in tags.
    #[serde_inline_default("runtime".to_string())]
    pub tag_prefix: String,
}

#[derive(Deserialize, Debug)]
pub struct Variants {
    pub enabled: Vec<Variant>,
    pub default: Variant,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct Templates {
    #[serde_inline_default(PathBuf::from("templates"))]
    pub directory: PathBuf,
    /// File name of the build recipe; `{base}` expands to the base image.
    #[serde_inline_default("Dockerfile-{base}.template".to_string())]
    pub recipe: String,
    #[serde_inline_default("post_push.template".to_string())]
    pub hook: String,
    #[serde_inline_default("docker-entrypoint.sh".to_string())]
    pub entrypoint: String,
}

#[serde_inline_default]
#[derive(Deserialize, Debug)]
pub struct Output {
    #[serde_inline_default(PathBuf::from("."))]
    pub directory: PathBuf,
}
