//! Configuration handling for dockergen source trees.
//! Every directory taking part in generation may carry a `config.yml`; the
//! effective configuration of a directory is its parent's configuration
//! deep-merged with its own.

use crate::constants::{CONFIG_FILE, FILES_KEY, SAMPLE_FILE, SUBDIRS_KEY};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A mapping from string keys to scalars, sequences or nested mappings.
///
/// Values are never mutated once a directory's configuration is merged; every
/// operation returns a new `Configuration`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Configuration(IndexMap<String, Value>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML document. An empty document is an empty configuration.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())? {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(format!("expected a mapping at the top level, found {}", kind(&other))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Walks a dot-separated key path through nested mappings.
    ///
    /// A missing segment, or a segment that is not a mapping, yields `None`;
    /// lookups never fail.
    pub fn lookup(&self, key_path: &str) -> Option<&Value> {
        let mut segments = key_path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Looks up a string at `key_path`, falling back to `default`.
    pub fn lookup_str(&self, key_path: &str, default: &str) -> String {
        self.lookup(key_path)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Merges `other` over `self`.
    ///
    /// Nested mappings merge recursively; any other value in `other` replaces
    /// the value in `self` wholesale. Keys only present in `self` survive.
    pub fn deep_merge(&self, other: &Configuration) -> Configuration {
        let mut merged = self.0.clone();
        for (key, value) in &other.0 {
            let next = match merged.get(key) {
                Some(base) => merge_values(base, value),
                None => value.clone(),
            };
            merged.insert(key.clone(), next);
        }
        Configuration(merged)
    }

    /// Returns a copy without the `files` and `subdirs` keys, the part of a
    /// configuration a child directory inherits.
    pub fn inheritable(&self) -> Configuration {
        let mut map = self.0.clone();
        map.shift_remove(FILES_KEY);
        map.shift_remove(SUBDIRS_KEY);
        Configuration(map)
    }

    /// Returns a copy whose `subdirs` list has `extra` appended, skipping names
    /// already declared.
    pub fn with_extra_subdirs(&self, extra: &[String]) -> Result<Configuration> {
        let mut subdirs = self.subdirs()?;
        for name in extra {
            if !subdirs.contains(name) {
                subdirs.push(name.clone());
            }
        }
        let mut map = self.0.clone();
        map.insert(
            SUBDIRS_KEY.to_string(),
            Value::Array(subdirs.into_iter().map(Value::String).collect()),
        );
        Ok(Configuration(map))
    }

    /// Subdirectory names declared under `subdirs`, in declaration order.
    pub fn subdirs(&self) -> Result<Vec<String>> {
        string_list(self.get(SUBDIRS_KEY), SUBDIRS_KEY)
    }

    /// File specs declared under `files`.
    pub fn files(&self) -> Result<Vec<FileSpec>> {
        string_list(self.get(FILES_KEY), FILES_KEY)?
            .iter()
            .map(|spec| FileSpec::parse(spec))
            .collect()
    }
}

fn merge_values(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            for (key, value) in over {
                let next = match merged.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => over.clone(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Reads an optional list of strings. A single scalar counts as a one-item list.
pub(crate) fn string_list(value: Option<&Value>, key: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Number(n)) => Ok(vec![n.to_string()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(Error::ConfigError(format!(
                    "'{}' entries must be strings, found {}",
                    key,
                    kind(other)
                ))),
            })
            .collect(),
        Some(other) => Err(Error::ConfigError(format!(
            "'{}' must be a list of strings, found {}",
            key,
            kind(other)
        ))),
    }
}

/// One `files` entry: `"src"` or `"src:dst"`, both relative to the owning directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub source: PathBuf,
    pub dest: Option<PathBuf>,
}

impl FileSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let (source, dest) = match spec.split_once(':') {
            Some((source, dest)) => (source.trim(), Some(dest.trim())),
            None => (spec.trim(), None),
        };
        if source.is_empty() || dest.is_some_and(str::is_empty) {
            return Err(Error::ConfigError(format!("invalid files entry '{}'", spec)));
        }
        Ok(Self { source: without_cur_dir(source), dest: dest.map(without_cur_dir) })
    }

    /// Destination relative to the output directory: the explicit remap, or the
    /// source with the template suffix dropped.
    pub fn target(&self, suffix: &str) -> PathBuf {
        match &self.dest {
            Some(dest) => dest.clone(),
            None => strip_template_suffix(&self.source, suffix),
        }
    }
}

fn without_cur_dir(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Drops a trailing `.<suffix>` from the file name, if present.
pub fn strip_template_suffix(path: &Path, suffix: &str) -> PathBuf {
    let dotted = format!(".{}", suffix);
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => match name.strip_suffix(&dotted) {
            Some(stem) if !stem.is_empty() => path.with_file_name(stem),
            _ => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    }
}

/// Loads per-directory configuration files.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Loads `config.yml` from `dir`.
    ///
    /// When only `config.yml.sample` exists it is copied into place first.
    /// A directory with neither yields an empty configuration.
    ///
    /// # Errors
    /// * `Error::ConfigUnreadable` if the sample cannot be copied or the
    ///   configuration cannot be read or parsed
    pub fn load<P: AsRef<Path>>(&self, dir: P) -> Result<Configuration> {
        let dir = dir.as_ref();
        let config_path = dir.join(CONFIG_FILE);
        let sample_path = dir.join(SAMPLE_FILE);

        if !config_path.is_file() {
            if !sample_path.is_file() {
                debug!("No configuration in {}", dir.display());
                return Ok(Configuration::new());
            }
            info!(
                "{} missing, copying from {}",
                config_path.display(),
                sample_path.display()
            );
            fs::copy(&sample_path, &config_path).map_err(|e| Error::ConfigUnreadable {
                path: sample_path.clone(),
                reason: e.to_string(),
            })?;
        }

        debug!("Loading configuration from {}", config_path.display());
        let content = fs::read_to_string(&config_path).map_err(|e| Error::ConfigUnreadable {
            path: config_path.clone(),
            reason: e.to_string(),
        })?;
        Configuration::from_yaml_str(&content)
            .map_err(|reason| Error::ConfigUnreadable { path: config_path, reason })
    }

    /// Materialises every `config.yml` reachable through `subdirs` from `root`,
    /// copying samples where needed. Returns the directories visited.
    pub fn init<P: AsRef<Path>>(&self, root: P) -> Result<Vec<PathBuf>> {
        let mut visited = Vec::new();
        self.init_dir(root.as_ref(), &mut visited)?;
        Ok(visited)
    }

    fn init_dir(&self, dir: &Path, visited: &mut Vec<PathBuf>) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::MissingSubdirectory { path: dir.to_path_buf() });
        }
        info!("Initializing '{}'", dir.display());
        let config = self.load(dir)?;
        visited.push(dir.to_path_buf());
        for subdir in config.subdirs()? {
            self.init_dir(&dir.join(subdir), visited)?;
        }
        Ok(())
    }
}
