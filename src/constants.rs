//! Common constants used throughout the dockergen application.

/// Per-directory configuration file name
pub const CONFIG_FILE: &str = "config.yml";

/// Sample configuration copied to [`CONFIG_FILE`] on first use
pub const SAMPLE_FILE: &str = "config.yml.sample";

/// Suffix marking files that are rendered rather than copied
pub const DEFAULT_TEMPLATE_SUFFIX: &str = "j2";

/// Output directory used when none is given, relative to the source root
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// File the container builder expects at the root of every staged unit
pub const BUILD_DESCRIPTOR: &str = "Dockerfile";

/// Container builder invoked by `build` when none is given
pub const DEFAULT_BUILDER: &str = "docker";

/// Entries never staged, in addition to the configuration files
pub const DEFAULT_IGNORE_PATTERNS: [&str; 2] = [".git", ".DS_Store"];

/// Reserved key listing explicitly rendered files
pub const FILES_KEY: &str = "files";

/// Reserved key listing subdirectories to descend into
pub const SUBDIRS_KEY: &str = "subdirs";
