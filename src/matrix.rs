use crate::config::runtime::{self, Config, Release};
use crate::tag::{self, Axis};
use crate::template::{self, Context, Placeholder};
use crate::variant::{BaseImage, Variant, VariantMeta};
use crate::version;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rendered build recipe, relative to a matrix cell directory.
pub const RECIPE_FILE: &str = "Dockerfile";
pub const HOOK_DIR: &str = "hooks";
pub const HOOK_FILE: &str = "post_push";

const FILE_MODE: u32 = 0o644;
const EXECUTABLE_MODE: u32 = 0o755;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidVersion(#[from] version::Error),

    #[error("missing template {path}: {err}")]
    MissingTemplate { err: std::io::Error, path: String },

    #[error("{path}: {err}")]
    Filesystem { err: std::io::Error, path: String },
}

fn filesystem(path: &Path, err: std::io::Error) -> Error {
    Error::Filesystem {
        err,
        path: path.display().to_string(),
    }
}

/// One cell of the build matrix, with everything needed to render it.
#[derive(Debug, Serialize)]
pub struct Job<'a> {
    pub runtime: &'a str,
    pub variant: Variant,
    #[serde(skip)]
    pub meta: &'a VariantMeta,
    /// Output directory relative to the output root, `{runtime}/{variant}`.
    pub directory: PathBuf,
    pub tags: Vec<String>,
}

impl Job<'_> {
    /// Substitution values shared by every template of this cell.
    pub fn context(&self, release: &Release) -> Context {
        Context::new()
            .with(Placeholder::Version, release.version.as_str())
            .with(Placeholder::Checksum, release.checksum.as_str())
            .with(Placeholder::RuntimeVersion, self.runtime)
            .with(Placeholder::Variant, self.variant.as_str())
            .with(Placeholder::VariantExtras, self.meta.extras.as_str())
            .with(Placeholder::Cmd, self.meta.cmd.as_str())
    }
}

/// Compute every matrix cell, runtimes outer and variants inner, in
/// declaration order. Fails before anything is computed if the release
/// version is not a plain dotted version.
pub fn plan(config: &Config) -> Result<Vec<Job<'_>>, Error> {
    let aliases = version::resolve(&config.release.version)?;
    debug!("version aliases: {}", aliases.join(" "));

    let mut jobs = Vec::with_capacity(config.runtimes.len() * config.variants.len());
    for runtime in &config.runtimes {
        for &variant in &config.variants {
            let axis = Axis {
                runtime,
                variant,
                default_runtime: &config.default_runtime,
                default_variant: config.default_variant,
            };
            jobs.push(Job {
                runtime,
                variant,
                meta: config.meta(variant),
                directory: Path::new(runtime).join(variant.as_str()),
                tags: tag::generate(&aliases, &config.tag_prefix, &axis),
            });
        }
    }

    Ok(jobs)
}

#[derive(Error, Debug)]
#[error("{runtime}/{variant} is not part of the build matrix")]
pub struct UnknownCell {
    pub runtime: String,
    pub variant: Variant,
}

/// Look up the planned cell for a runtime and variant.
pub fn find_job<'j, 'a>(
    jobs: &'j [Job<'a>],
    runtime: &str,
    variant: Variant,
) -> Result<&'j Job<'a>, UnknownCell> {
    jobs.iter()
        .find(|job| job.runtime == runtime && job.variant == variant)
        .ok_or_else(|| UnknownCell {
            runtime: runtime.to_string(),
            variant,
        })
}

/// Template contents, read up front so that a missing file aborts the
/// run before any output is written.
pub struct Templates {
    recipe_paths: runtime::Templates,
    recipes: BTreeMap<BaseImage, String>,
    hook: String,
    entrypoint: Vec<u8>,
    entrypoint_name: OsString,
}

impl Templates {
    pub fn load<'a, 'b: 'a>(
        paths: &runtime::Templates,
        jobs: impl IntoIterator<Item = &'a Job<'b>>,
    ) -> Result<Self, Error> {
        let mut recipes = BTreeMap::new();
        for job in jobs {
            let base = job.meta.base;
            if !recipes.contains_key(&base) {
                recipes.insert(base, read_template(&paths.recipe(base))?);
            }
        }

        let entrypoint_path = paths.entrypoint();
        let entrypoint_name = entrypoint_path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| Error::MissingTemplate {
                err: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file name"),
                path: entrypoint_path.display().to_string(),
            })?;
        let entrypoint = std::fs::read(&entrypoint_path).map_err(|err| Error::MissingTemplate {
            err,
            path: entrypoint_path.display().to_string(),
        })?;

        Ok(Self {
            recipe_paths: paths.clone(),
            recipes,
            hook: read_template(&paths.hook())?,
            entrypoint,
            entrypoint_name,
        })
    }

    /// Build recipe for a job. Fails if the job's base image was not among
    /// the jobs passed to [`Templates::load`].
    pub fn render_recipe(&self, job: &Job, release: &Release) -> Result<String, Error> {
        let recipe = self.recipes.get(&job.meta.base).ok_or_else(|| Error::MissingTemplate {
            err: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no {} recipe loaded", job.meta.base),
            ),
            path: self.recipe_paths.recipe(job.meta.base).display().to_string(),
        })?;
        Ok(template::render(recipe, &job.context(release)))
    }

    pub fn render_hook(&self, job: &Job, release: &Release) -> String {
        let context = job
            .context(release)
            .with(Placeholder::Tags, job.tags.join(" "));
        template::render(&self.hook, &context)
    }
}

fn read_template(path: &Path) -> Result<String, Error> {
    debug!("reading template {}", path.display());
    std::fs::read_to_string(path).map_err(|err| Error::MissingTemplate {
        err,
        path: path.display().to_string(),
    })
}

/// Outcome of a generation run.
#[derive(Debug, Default, PartialEq)]
pub struct Report {
    /// Generated cell directories, in generation order.
    pub directories: Vec<PathBuf>,
    pub written: usize,
    pub unchanged: usize,
}

impl Report {
    fn record(&mut self, written: bool) {
        if written {
            self.written += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

/// Materialize the whole build matrix below the configured output directory.
///
/// Nothing is written unless the release version resolves and every
/// template exists. Existing files in the output directories that this
/// run does not generate are left in place.
pub fn run(config: &Config) -> Result<Report, Error> {
    let jobs = plan(config)?;
    let templates = Templates::load(&config.templates, &jobs)?;
    let mut report = Report::default();

    for job in &jobs {
        info!(
            "{}/{}: base image {}, command {}",
            job.runtime, job.variant, job.meta.base, job.meta.cmd
        );
        info!("{}/{}: tags {}", job.runtime, job.variant, job.tags.join(" "));

        let directory = config.output_dir.join(&job.directory);
        let hooks = directory.join(HOOK_DIR);
        std::fs::create_dir_all(&hooks).map_err(|err| filesystem(&hooks, err))?;

        let recipe = templates.render_recipe(job, &config.release)?;
        report.record(write_file(&directory.join(RECIPE_FILE), recipe.as_bytes(), FILE_MODE)?);

        let hook = templates.render_hook(job, &config.release);
        report.record(write_file(&hooks.join(HOOK_FILE), hook.as_bytes(), FILE_MODE)?);

        report.record(write_file(
            &directory.join(&templates.entrypoint_name),
            &templates.entrypoint,
            EXECUTABLE_MODE,
        )?);

        report.directories.push(directory);
    }

    Ok(report)
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory. Returns `false` if the file already had this content and mode.
fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<bool, Error> {
    if is_current(path, contents, mode) {
        debug!("unchanged {}", path.display());
        return Ok(false);
    }

    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file =
        tempfile::NamedTempFile::new_in(directory).map_err(|err| filesystem(directory, err))?;
    file.write_all(contents)
        .map_err(|err| filesystem(file.path(), err))?;
    set_mode(file.as_file(), mode).map_err(|err| filesystem(file.path(), err))?;
    file.persist(path).map_err(|err| filesystem(path, err.error))?;

    debug!("wrote {}", path.display());
    Ok(true)
}

fn is_current(path: &Path, contents: &[u8], mode: u32) -> bool {
    match (std::fs::read(path), std::fs::metadata(path)) {
        (Ok(existing), Ok(metadata)) => existing == contents && has_mode(&metadata, mode),
        _ => false,
    }
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn has_mode(metadata: &std::fs::Metadata, mode: u32) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777 == mode
}

#[cfg(not(unix))]
fn has_mode(_metadata: &std::fs::Metadata, _mode: u32) -> bool {
    true
}
