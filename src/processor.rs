//! Core generation orchestration.
//! Walks the source tree depth-first along the declared `subdirs`, merging
//! configuration at every level, and stages each directory into a parallel
//! output tree by rendering templates and copying everything else.

use crate::config::{strip_template_suffix, ConfigStore, Configuration};
use crate::error::{Error, Result};
use crate::ignore::{EntryClass, EntryPatterns};
use crate::renderer::TemplateEngine;
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// What happens to a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Copy the source byte-for-byte
    Copy,
    /// Render the source as a template
    Render,
}

impl fmt::Display for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageAction::Copy => write!(f, "Copied"),
            StageAction::Render => write!(f, "Rendered"),
        }
    }
}

/// One file to materialise in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingUnit {
    pub source: PathBuf,
    pub target: PathBuf,
    pub action: StageAction,
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    fs::write(path, content).map_err(Error::IoError)
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    fs::copy(source, dest).map(|_| ()).map_err(Error::IoError)
}

/// Removes `path` recursively if present and creates it empty.
fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        debug!("Removing {}", path.display());
        fs::remove_dir_all(path).map_err(Error::IoError)?;
    }
    fs::create_dir_all(path).map_err(Error::IoError)
}

/// Absolute form of a path that may not exist yet.
fn normalize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(fs::canonicalize(path)?);
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => Ok(fs::canonicalize(parent)?.join(name)),
        _ => Ok(absolute),
    }
}

/// Generates the output tree for one source tree.
pub struct Processor {
    engine: Arc<TemplateEngine>,
    patterns: EntryPatterns,
    store: ConfigStore,
    source_root: PathBuf,
    output_root: PathBuf,
}

impl Processor {
    /// Creates a processor for templates ending in `.<suffix>`.
    ///
    /// # Errors
    /// * `Error::PatternError` if `suffix` yields invalid patterns
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        source_root: P,
        output_root: Q,
        suffix: &str,
    ) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(TemplateEngine::new(suffix)),
            patterns: EntryPatterns::new(suffix)?,
            store: ConfigStore::new(),
            source_root: source_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
        })
    }

    /// Generates the whole output tree.
    ///
    /// `extra_subdirs` are appended to the root configuration's `subdirs`.
    ///
    /// # Errors
    /// * `Error::EmptySubdirList` if no top-level unit is configured
    /// * `Error::MissingSubdirectory` if a declared directory does not exist
    /// * `Error::OutputOverlapsSource` if generating would remove part of the
    ///   source tree
    /// * any error raised while loading configuration or staging files
    pub fn generate(&self, extra_subdirs: &[String]) -> Result<()> {
        if !self.source_root.is_dir() {
            return Err(Error::MissingSubdirectory { path: self.source_root.clone() });
        }

        let root_config = self
            .store
            .load(&self.source_root)?
            .with_extra_subdirs(extra_subdirs)?;
        let mut visited = Vec::new();
        self.collect_source_dirs(&self.source_root, &root_config, &mut visited)?;
        self.check_overlap(&visited)?;
        if visited.is_empty() {
            return Err(Error::EmptySubdirList { path: self.source_root.clone() });
        }

        self.process_dir(Path::new(""), root_config)
    }

    /// Collects the canonical source directories reachable through `subdirs`
    /// below `dir`, failing on the first one that does not exist.
    fn collect_source_dirs(
        &self,
        dir: &Path,
        config: &Configuration,
        visited: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for subdir in config.subdirs()? {
            let path = dir.join(&subdir);
            if !path.is_dir() {
                return Err(Error::MissingSubdirectory { path });
            }
            visited.push(fs::canonicalize(&path)?);
            let child_config = self.store.load(&path)?;
            self.collect_source_dirs(&path, &child_config, visited)?;
        }
        Ok(())
    }

    /// Rejects an output root that contains the source root, or that lies
    /// inside or contains any traversed source subdirectory.
    fn check_overlap(&self, source_dirs: &[PathBuf]) -> Result<()> {
        let source = normalize(&self.source_root)?;
        let output = normalize(&self.output_root)?;
        if source.starts_with(&output) {
            return Err(Error::OutputOverlapsSource { source_dir: source, output });
        }
        for dir in source_dirs {
            if output.starts_with(dir) || dir.starts_with(&output) {
                return Err(Error::OutputOverlapsSource { source_dir: dir.clone(), output });
            }
        }
        Ok(())
    }

    /// Stages the directory at `relative` (to both roots) with its effective
    /// configuration, then descends into its `subdirs`.
    fn process_dir(&self, relative: &Path, config: Configuration) -> Result<()> {
        let source_dir = self.source_root.join(relative);
        let output_dir = self.output_root.join(relative);
        info!("Entering {}/", source_dir.display());

        recreate_dir(&output_dir)?;

        let config = Arc::new(config);
        let units = self.plan(&source_dir, &output_dir, &config)?;
        let subdirs = config.subdirs()?;
        if units.is_empty() && subdirs.is_empty() {
            return Err(Error::EmptyDirectory { path: source_dir });
        }

        for unit in &units {
            self.stage(unit, &config, &output_dir)?;
        }

        let inherited = config.inheritable();
        for subdir in subdirs {
            let child = relative.join(&subdir);
            let child_source = self.source_root.join(&child);
            if !child_source.is_dir() {
                return Err(Error::MissingSubdirectory { path: child_source });
            }
            let child_config = inherited.deep_merge(&self.store.load(&child_source)?);
            self.process_dir(&child, child_config)?;
        }
        Ok(())
    }

    /// Classifies the files of `source_dir` into staging units.
    ///
    /// Entries of `files` are rendered to their declared destination. The
    /// remaining directory entries are classified by name; subdirectories are
    /// only reached through `subdirs`.
    pub fn plan(
        &self,
        source_dir: &Path,
        output_dir: &Path,
        config: &Configuration,
    ) -> Result<Vec<StagingUnit>> {
        let files = config.files()?;
        let mut units = Vec::new();
        let mut claimed = HashSet::new();

        for spec in &files {
            let source = source_dir.join(&spec.source);
            if !source.is_file() {
                return Err(Error::ConfigError(format!(
                    "file '{}' listed in files does not exist",
                    source.display()
                )));
            }
            claimed.insert(fs::canonicalize(&source)?);
            units.push(StagingUnit {
                source,
                target: output_dir.join(spec.target(self.engine.suffix())),
                action: StageAction::Render,
            });
        }

        for entry in WalkDir::new(source_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                debug!("Skipping directory {}", path.display());
                continue;
            }
            if claimed.contains(&fs::canonicalize(path)?) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match self.patterns.classify(&name) {
        Ok(units)
    }

    fn stage(
        &self,
        unit: &StagingUnit,
        config: &Arc<Configuration>,
        output_dir: &Path,
    ) -> Result<()> {
        match unit.action {
            StageAction::Copy => copy_file(&unit.source, &unit.target)?,
            StageAction::Render => {
                let content = self.engine.render_file(&unit.source, config, output_dir)?;
                write_file(&unit.target, &content)?;
            }
        }
        println!("{}: '{}'", unit.action, unit.target.display());
        Ok(())
    }
}
