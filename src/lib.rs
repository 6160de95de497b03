//! dockergen generates a tree of Dockerfiles and companion files from a
//! directory of templates and per-directory `config.yml` files, then hands
//! every top-level unit to an external container builder.

/// Invocation of the external container builder
pub mod build;

/// Command-line interface module for the dockergen application
pub mod cli;

/// Hierarchical `config.yml` loading and deep merging
pub mod config;

/// Common constants
pub mod constants;

/// Error types and handling for the dockergen application
pub mod error;

/// Helper namespaces callable from templates: apt, git, docker, misc
pub mod helpers;

/// Classification of directory entries into render, copy or ignore
pub mod ignore;

/// Logger initialization
pub mod logger;

/// Core traversal and staging orchestration
/// Combines all components to generate the final output tree
pub mod processor;

/// Template rendering with recursive imports
pub mod renderer;
