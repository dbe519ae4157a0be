use crate::variant::Variant;

/// One (runtime, variant) cell of the build matrix, and the defaults it is
/// compared against.
#[derive(Debug, Clone, Copy)]
pub struct Axis<'a> {
    pub runtime: &'a str,
    pub variant: Variant,
    pub default_runtime: &'a str,
    pub default_variant: Variant,
}

impl Axis<'_> {
    /// The default cell also publishes the bare version aliases.
    pub fn is_default(&self) -> bool {
        self.runtime == self.default_runtime && self.variant == self.default_variant
    }
}

/// Generate the publish tags for one matrix cell.
///
/// Every alias yields `{alias}-{prefix}{runtime}-{variant}`. On the default
/// axis the bare alias follows its fully qualified counterpart, so
/// `["5.15", "5"]` becomes `["5.15-runtime8.1-apache", "5.15",
/// "5-runtime8.1-apache", "5"]`.
pub fn generate(aliases: &[String], prefix: &str, axis: &Axis) -> Vec<String> {
    let bare = axis.is_default();
    let mut tags = Vec::with_capacity(if bare { aliases.len() * 2 } else { aliases.len() });

    for alias in aliases {
        tags.push(format!("{alias}-{prefix}{}-{}", axis.runtime, axis.variant));
        if bare {
            tags.push(alias.clone());
        }
    }

    tags
}
