//! Configuration is read from a TOML file merged over the built-in
//! `default.toml` ([`file`]), then validated into a [`runtime::Config`].
pub mod file;
pub mod runtime;
