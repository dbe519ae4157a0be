use thiserror::Error;

/// Maximum number of dot-separated components in a release version.
const MAX_COMPONENTS: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid release version '{0}': expected 1-3 dot-separated numbers without leading zeros")]
    InvalidVersion(String),
}

/// Resolve a release version into its alias tree, most specific first.
///
/// `5.15.0` resolves to `["5.15.0", "5.15", "5"]`. Prerelease suffixes,
/// prefixes such as `v` and leading zeros are rejected.
pub fn resolve(version: &str) -> Result<Vec<String>, Error> {
    let components: Vec<&str> = version.split('.').collect();

    if components.len() > MAX_COMPONENTS || !components.iter().all(|c| is_component(c)) {
        return Err(Error::InvalidVersion(version.to_string()));
    }

    Ok((1..=components.len())
        .rev()
        .map(|n| components[..n].join("."))
        .collect())
}

/// `0`, or a run of digits that does not start with `0`.
fn is_component(component: &str) -> bool {
    match component.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        digits => digits.iter().all(u8::is_ascii_digit),
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, Error};

    #[test]
    fn full_version_tree() {
        assert_eq!(resolve("5.15.0").unwrap(), vec!["5.15.0", "5.15", "5"]);
        assert_eq!(resolve("5.15").unwrap(), vec!["5.15", "5"]);
        assert_eq!(resolve("5").unwrap(), vec!["5"]);
    }

    #[test]
    fn zero_components() {
        assert_eq!(resolve("0").unwrap(), vec!["0"]);
        assert_eq!(resolve("1.0.0").unwrap(), vec!["1.0.0", "1.0", "1"]);
        assert_eq!(resolve("10.20.30").unwrap(), vec!["10.20.30", "10.20", "10"]);
    }

    #[test]
    fn rejects_malformed_versions() {
        for version in [
            "5.15.0.1",
            "v5.15",
            "5.15.0-beta",
            "5.15.0rc1",
            "05.1",
            "5.01",
            "",
            ".",
            "5.",
            ".5",
            "5..1",
            " 5.1",
            "5.1 ",
            "+5",
        ] {
            assert_eq!(
                resolve(version),
                Err(Error::InvalidVersion(version.to_string())),
                "{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn aliases_shrink_by_one_segment() {
        let aliases = resolve("12.3.45").unwrap();
        for pair in aliases.windows(2) {
            let (longer, shorter) = (&pair[0], &pair[1]);
            assert!(longer.starts_with(&format!("{shorter}.")));
        }
    }
}
