use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("unknown variant '{0}', expected one of: apache, fpm, fpm-alpine")]
pub struct UnknownVariant(pub String);

/// Packaging variant of the generated image.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Apache httpd with mod_php.
    Apache,
    /// PHP-FPM on Debian.
    Fpm,
    /// PHP-FPM on Alpine.
    FpmAlpine,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Apache, Variant::Fpm, Variant::FpmAlpine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Apache => "apache",
            Variant::Fpm => "fpm",
            Variant::FpmAlpine => "fpm-alpine",
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Base image family. Selects which build recipe template is rendered.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BaseImage {
    Debian,
    Alpine,
}

impl BaseImage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseImage::Debian => "debian",
            BaseImage::Alpine => "alpine",
        }
    }
}

impl Display for BaseImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant metadata injected into the templates.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct VariantMeta {
    pub base: BaseImage,

    /// Default container command, e.g. `apache2-foreground`.
    pub cmd: String,

    /// Free-form Dockerfile instructions, inserted verbatim.
    #[serde(default)]
    pub extras: String,
}
