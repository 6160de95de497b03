//! Invocation of the external container builder over the staged tree.

use crate::config::{string_list, ConfigStore, Configuration};
use crate::constants::BUILD_DESCRIPTOR;
use crate::error::{Error, Result};
use log::info;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// One top-level unit to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub name: String,
    pub dir: PathBuf,
    pub tag: String,
}

impl BuildTarget {
    /// Tags the unit `<repository>/<name>`, or just `<name>` without a repository.
    pub fn new(name: &str, output_root: &Path, repository: Option<&str>) -> Self {
        let tag = match repository {
            Some(repo) if !repo.is_empty() => format!("{}/{}", repo.trim_end_matches('/'), name),
            _ => name.to_string(),
        };
        Self { name: name.to_string(), dir: output_root.join(name), tag }
    }
}

/// Runs a container build and reports its exit status.
pub trait ContainerBuilder {
    fn build(&self, target: &BuildTarget, options: &[String]) -> Result<ExitStatus>;
}

/// Shells out to `<program> build -t <tag> <options...> <dir>`.
pub struct CommandBuilder {
    program: String,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn args(target: &BuildTarget, options: &[String]) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), target.tag.clone()];
        args.extend(options.iter().cloned());
        args.push(target.dir.display().to_string());
        args
    }
}

impl ContainerBuilder for CommandBuilder {
    fn build(&self, target: &BuildTarget, options: &[String]) -> Result<ExitStatus> {
        let args = Self::args(target, options);
        info!("{} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(Error::IoError)?;
        Ok(status)
    }
}

/// Builds every configured top-level unit in declaration order.
pub struct BuildRunner<'a> {
    builder: &'a dyn ContainerBuilder,
    store: ConfigStore,
    source_root: PathBuf,
    output_root: PathBuf,
}

impl<'a> BuildRunner<'a> {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        builder: &'a dyn ContainerBuilder,
        source_root: P,
        output_root: Q,
    ) -> Self {
        Self {
            builder,
            store: ConfigStore::new(),
            source_root: source_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
        }
    }

    /// Resolves the build targets from the root configuration.
    ///
    /// # Errors
    /// * `Error::EmptySubdirList` if no top-level unit is configured
    /// * `Error::MissingSubdirectory` if a unit was never staged
    /// * `Error::MissingBuildDescriptor` if a staged unit lacks its descriptor
    pub fn targets(&self, config: &Configuration) -> Result<Vec<BuildTarget>> {
        let subdirs = config.subdirs()?;
        if subdirs.is_empty() {
            return Err(Error::EmptySubdirList { path: self.source_root.clone() });
        }
        let repository = config.lookup("repository").and_then(|v| v.as_str());
        subdirs
            .iter()
            .map(|name| {
                let target = BuildTarget::new(name, &self.output_root, repository);
                if !target.dir.is_dir() {
                    return Err(Error::MissingSubdirectory { path: target.dir });
                }
                let descriptor = target.dir.join(BUILD_DESCRIPTOR);
                if !descriptor.is_file() {
                    return Err(Error::MissingBuildDescriptor {
                        unit: target.name,
                        path: descriptor,
                    });
                }
                Ok(target)
            })
            .collect()
    }

    /// Builds each unit, stopping at the first failure.
    ///
    /// Returns the units built.
    pub fn run(&self, extra_subdirs: &[String]) -> Result<Vec<BuildTarget>> {
        let config = self
            .store
            .load(&self.source_root)?
            .with_extra_subdirs(extra_subdirs)?;
        let options = match config.get("build_options") {
            Some(Value::String(options)) => {
                options.split_whitespace().map(str::to_string).collect()
            }
            other => string_list(other, "build_options")?,
        };
        let targets = self.targets(&config)?;

        for target in &targets {
            println!("Building '{}' as '{}'", target.dir.display(), target.tag);
            let status = self.builder.build(target, &options)?;
            if !status.success() {
                return Err(Error::ExternalBuildFailure {
                    unit: target.name.clone(),
                    status: status.to_string(),
                });
            }
        }
        Ok(targets)
    }
}
