//! Placeholder substitution over template text.
//!
//! A placeholder is an upper-case name wrapped in double percent signs, e.g.
//! `%%VERSION%%`. Substitution is purely textual and happens in a single pass:
//! values are inserted verbatim and never scanned for placeholders themselves.
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

const DELIMITER: &str = "%%";

/// Placeholders recognized in the bundled templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    Version,
    Checksum,
    RuntimeVersion,
    Variant,
    VariantExtras,
    Cmd,
    /// Space-separated list of publish tags.
    Tags,
}

impl Placeholder {
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Version => "VERSION",
            Placeholder::Checksum => "CHECKSUM",
            Placeholder::RuntimeVersion => "RUNTIME_VERSION",
            Placeholder::Variant => "VARIANT",
            Placeholder::VariantExtras => "VARIANT_EXTRAS",
            Placeholder::Cmd => "CMD",
            Placeholder::Tags => "TAGS",
        }
    }
}

impl Display for Placeholder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{DELIMITER}{}{DELIMITER}", self.name())
    }
}

/// Mapping of placeholder names to substitution values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.insert(placeholder.name(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Replace every placeholder known to `context`; leave all others as they are.
pub fn render(template: &str, context: &Context) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(DELIMITER) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + DELIMITER.len()..];

        let value = after_open
            .find(DELIMITER)
            .map(|end| &after_open[..end])
            .filter(|name| is_name(name))
            .and_then(|name| context.get(name).map(|value| (name, value)));

        match value {
            Some((name, value)) => {
                output.push_str(value);
                rest = &after_open[name.len() + DELIMITER.len()..];
            }
            None => {
                // Not a placeholder here; a match may still start on the next '%'.
                output.push('%');
                rest = &rest[start + 1..];
            }
        }
    }

    output.push_str(rest);
    output
}

fn is_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::{render, Context, Placeholder};

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(render("X=%%UNKNOWN%%", &Context::new()), "X=%%UNKNOWN%%");
        assert_eq!(render("100%% sure %%", &Context::new()), "100%% sure %%");
        assert_eq!(render("%%", &Context::new()), "%%");
        assert_eq!(render("%%%%", &Context::new()), "%%%%");
    }

    #[test]
    fn replaces_every_occurrence() {
        let context = Context::new()
            .with(Placeholder::Version, "5.15.0")
            .with(Placeholder::Variant, "fpm");
        assert_eq!(
            render("v%%VERSION%% (%%VARIANT%%) v%%VERSION%% %%CMD%%", &context),
            "v5.15.0 (fpm) v5.15.0 %%CMD%%"
        );
    }

    #[test]
    fn adjacent_placeholders() {
        let context = Context::new()
            .with(Placeholder::Version, "1")
            .with(Placeholder::RuntimeVersion, "8.1");
        assert_eq!(render("%%VERSION%%%%RUNTIME_VERSION%%", &context), "18.1");
        assert_eq!(render("%%%VERSION%%", &context), "%1");
    }

    #[test]
    fn values_are_inserted_literally() {
        let extras = "RUN sed -i 's/a/b&c/' /etc/x \\\n    && echo %%VERSION%%\n";
        let context = Context::new()
            .with(Placeholder::Version, "5")
            .with(Placeholder::VariantExtras, extras);
        let rendered = render("FROM base\n%%VARIANT_EXTRAS%%\nCMD [\"%%VERSION%%\"]\n", &context);
        assert_eq!(
            rendered,
            "FROM base\nRUN sed -i 's/a/b&c/' /etc/x \\\n    && echo %%VERSION%%\n\nCMD [\"5\"]\n"
        );
    }

    #[test]
    fn empty_value() {
        let context = Context::new().with(Placeholder::VariantExtras, "");
        assert_eq!(render("a\n%%VARIANT_EXTRAS%%\nb", &context), "a\n\nb");
    }

    #[test]
    fn placeholder_display() {
        assert_eq!(Placeholder::RuntimeVersion.to_string(), "%%RUNTIME_VERSION%%");
    }
}
