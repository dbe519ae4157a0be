use crate::config::file;
use crate::variant::{BaseImage, Variant, VariantMeta};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use Error::*;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("release {0} is not set; add it to the [release] section or pass it on the command line")]
    MissingRelease(&'static str),

    #[error("no runtime versions configured")]
    NoRuntimes,

    #[error("no variants enabled")]
    NoVariants,

    #[error("runtime version '{0}' cannot be used as a directory name")]
    InvalidRuntime(String),

    #[error("runtime version '{0}' is listed more than once")]
    DuplicateRuntime(String),

    #[error("variant '{0}' is enabled more than once")]
    DuplicateVariant(Variant),

    #[error("default runtime '{0}' is not among the configured runtime versions")]
    UnknownDefaultRuntime(String),

    #[error("default variant '{0}' is not among the enabled variants")]
    UnknownDefaultVariant(Variant),

    #[error("variant '{0}' has no [variant.{0}] metadata")]
    MissingVariantMetadata(Variant),

    #[error("metadata given for unknown variant '{0}'")]
    UnknownVariantMetadata(String),
}

/// Values given on the command line, taking precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub release_version: Option<String>,
    pub checksum: Option<String>,
    pub templates: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// The upstream release being packaged.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub version: String,
    pub checksum: String,
}

/// Where templates are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Templates {
    pub directory: PathBuf,
    recipe: String,
    hook: String,
    entrypoint: String,
}

impl Templates {
    /// Build recipe template file for the given base image.
    pub fn recipe(&self, base: BaseImage) -> PathBuf {
        self.directory.join(self.recipe.replace("{base}", base.as_str()))
    }

    pub fn hook(&self) -> PathBuf {
        self.directory.join(&self.hook)
    }

    pub fn entrypoint(&self) -> PathBuf {
        self.directory.join(&self.entrypoint)
    }
}

/// Validated, read-only configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub release: Release,
    pub runtimes: Vec<String>,
    pub default_runtime: String,
    pub tag_prefix: String,
    pub variants: Vec<Variant>,
    pub default_variant: Variant,
    pub variant_meta: BTreeMap<Variant, VariantMeta>,
    pub templates: Templates,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn new(cfg: &file::File, overrides: Overrides) -> Result<Self, Error> {
        let release = Release {
            version: overrides
                .release_version
                .or_else(|| cfg.release.version.clone())
                .ok_or(MissingRelease("version"))?,
            checksum: overrides
                .checksum
                .or_else(|| cfg.release.checksum.clone())
                .ok_or(MissingRelease("checksum"))?,
        };

        if cfg.runtime.versions.is_empty() {
            return Err(NoRuntimes);
        }
        if let Some(label) = cfg.runtime.versions.iter().find(|r| !is_directory_name(r)) {
            return Err(InvalidRuntime(label.clone()));
        }
        if let Some(dup) = first_duplicate(&cfg.runtime.versions) {
            return Err(DuplicateRuntime(dup.clone()));
        }
        if !cfg.runtime.versions.contains(&cfg.runtime.default) {
            return Err(UnknownDefaultRuntime(cfg.runtime.default.clone()));
        }

        if cfg.variants.enabled.is_empty() {
            return Err(NoVariants);
        }
        if let Some(dup) = first_duplicate(&cfg.variants.enabled) {
            return Err(DuplicateVariant(*dup));
        }
        if !cfg.variants.enabled.contains(&cfg.variants.default) {
            return Err(UnknownDefaultVariant(cfg.variants.default));
        }

        let mut variant_meta = BTreeMap::new();
        for (name, meta) in &cfg.variant {
            let variant = name
                .parse::<Variant>()
                .map_err(|err| UnknownVariantMetadata(err.0))?;
            variant_meta.insert(variant, meta.clone());
        }
        if let Some(variant) = cfg
            .variants
            .enabled
            .iter()
            .find(|variant| !variant_meta.contains_key(*variant))
        {
            return Err(MissingVariantMetadata(*variant));
        }

        Ok(Self {
            release,
            runtimes: cfg.runtime.versions.clone(),
            default_runtime: cfg.runtime.default.clone(),
            tag_prefix: cfg.runtime.tag_prefix.clone(),
            variants: cfg.variants.enabled.clone(),
            default_variant: cfg.variants.default,
            variant_meta,
            templates: Templates {
                directory: overrides
                    .templates
                    .unwrap_or_else(|| cfg.templates.directory.clone()),
                recipe: cfg.templates.recipe.clone(),
                hook: cfg.templates.hook.clone(),
                entrypoint: cfg.templates.entrypoint.clone(),
            },
            output_dir: overrides
                .output
                .unwrap_or_else(|| cfg.output.directory.clone()),
        })
    }

    /// Metadata of an enabled variant. Presence is checked in [`Config::new`].
    pub fn meta(&self, variant: Variant) -> &VariantMeta {
        &self.variant_meta[&variant]
    }
}

/// Runtime labels name a directory below the output root, so they must be
/// a single plain path component.
fn is_directory_name(label: &str) -> bool {
    !label.is_empty() && label != "." && label != ".." && !label.contains(['/', '\\'])
}

fn first_duplicate<T: Eq + std::hash::Hash>(items: &[T]) -> Option<&T> {
    let mut seen = HashSet::new();
    items.iter().find(|item| !seen.insert(*item))
}

#[cfg(test)]
mod tests {
    use super::{Config, Error, Overrides};
    use crate::config::file::File;
    use crate::variant::{BaseImage, Variant};
    use std::path::PathBuf;

    fn overrides() -> Overrides {
        Overrides {
            release_version: Some("5.15.0".into()),
            checksum: Some("deadbeef".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_with_release_overrides() {
        let cfg = Config::new(&File::default(), overrides()).unwrap();
        assert_eq!(cfg.release.version, "5.15.0");
        assert_eq!(cfg.release.checksum, "deadbeef");
        assert_eq!(cfg.default_runtime, "8.1");
        assert_eq!(cfg.variants, vec![Variant::Apache, Variant::Fpm, Variant::FpmAlpine]);
        assert_eq!(cfg.meta(Variant::FpmAlpine).base, BaseImage::Alpine);
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        assert_eq!(
            cfg.templates.recipe(BaseImage::Alpine),
            PathBuf::from("templates/Dockerfile-alpine.template")
        );
        assert_eq!(cfg.templates.hook(), PathBuf::from("templates/post_push.template"));
    }

    #[test]
    fn command_line_takes_precedence() {
        let file = File::default_with_user_config(
            "[release]\nversion = \"1.0\"\nchecksum = \"cafe\"\n",
        )
        .unwrap();
        let cfg = Config::new(
            &file,
            Overrides {
                release_version: Some("2.0".into()),
                templates: Some("/srv/templates".into()),
                output: Some("/srv/out".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.release.version, "2.0");
        assert_eq!(cfg.release.checksum, "cafe");
        assert_eq!(cfg.templates.entrypoint(), PathBuf::from("/srv/templates/docker-entrypoint.sh"));
        assert_eq!(cfg.output_dir, PathBuf::from("/srv/out"));
    }

    #[test]
    fn missing_release() {
        let err = Config::new(&File::default(), Overrides::default()).unwrap_err();
        assert_eq!(err, Error::MissingRelease("version"));

        let err = Config::new(
            &File::default(),
            Overrides {
                release_version: Some("5".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, Error::MissingRelease("checksum"));
    }

    #[test]
    fn invalid_axes() {
        let cases = [
            ("[runtime]\nversions = []\ndefault = \"8.1\"", Error::NoRuntimes),
            (
                "[runtime]\nversions = [\"8.1\", \"8.1\"]\ndefault = \"8.1\"",
                Error::DuplicateRuntime("8.1".into()),
            ),
            (
                "[runtime]\nversions = [\"8.2\"]\ndefault = \"8.1\"",
                Error::UnknownDefaultRuntime("8.1".into()),
            ),
            (
                "[runtime]\nversions = [\"../escaped\", \"8.1\"]\ndefault = \"8.1\"",
                Error::InvalidRuntime("../escaped".into()),
            ),
            (
                "[runtime]\nversions = [\"8.1\", \"./8.1\"]\ndefault = \"8.1\"",
                Error::InvalidRuntime("./8.1".into()),
            ),
            (
                "[runtime]\nversions = [\"/abs\"]\ndefault = \"/abs\"",
                Error::InvalidRuntime("/abs".into()),
            ),
            (
                "[runtime]\nversions = [\"8.1\", \"..\"]\ndefault = \"8.1\"",
                Error::InvalidRuntime("..".into()),
            ),
            (
                "[runtime]\nversions = [\"\"]\ndefault = \"\"",
                Error::InvalidRuntime("".into()),
            ),
            (
                "[runtime]\nversions = ['8\\1']\ndefault = \"8.1\"",
                Error::InvalidRuntime("8\\1".into()),
            ),
            ("[variants]\nenabled = []\ndefault = \"fpm\"", Error::NoVariants),
            (
                "[variants]\nenabled = [\"fpm\", \"fpm\"]\ndefault = \"fpm\"",
                Error::DuplicateVariant(Variant::Fpm),
            ),
            (
                "[variants]\nenabled = [\"fpm\"]\ndefault = \"apache\"",
                Error::UnknownDefaultVariant(Variant::Apache),
            ),
            (
                "[variant.nginx]\nbase = \"alpine\"\ncmd = \"nginx\"",
                Error::UnknownVariantMetadata("nginx".into()),
            ),
        ];

        for (user_config, expected) in cases {
            let file = File::default_with_user_config(user_config).unwrap();
            assert_eq!(Config::new(&file, overrides()).unwrap_err(), expected, "{user_config}");
        }
    }

    #[test]
    fn enabled_variant_without_metadata() {
        let mut file = File::default();
        file.variant.remove("fpm");
        assert_eq!(
            Config::new(&file, overrides()).unwrap_err(),
            Error::MissingVariantMetadata(Variant::Fpm)
        );

        file.variants.enabled = vec![Variant::Apache];
        assert!(Config::new(&file, overrides()).is_ok());
    }
}
