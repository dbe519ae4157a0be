//! Generate Docker build contexts for one upstream release across a matrix
//! of runtime versions and packaging variants.
//!
//! For every (runtime, variant) cell a directory `{runtime}/{variant}` is
//! written, holding a rendered `Dockerfile`, a `hooks/post_push` script that
//! knows the tags to publish, and a copy of the entrypoint script.
//!
//! The release version is expanded into a version tree (`5.15.0`, `5.15`,
//! `5`, see [`version::resolve`]), combined with each cell into publish tags
//! ([`tag::generate`]), and substituted into the templates
//! ([`template::render`]). [`matrix::run`] ties the steps together.

pub mod config;
pub mod matrix;
pub mod tag;
pub mod template;
pub mod variant;
pub mod version;
