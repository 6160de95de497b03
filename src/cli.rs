//! Command-line interface implementation for dockergen.
//! Provides argument parsing and help text formatting using clap.

use crate::constants::{DEFAULT_BUILDER, DEFAULT_OUTPUT_DIR, DEFAULT_TEMPLATE_SUFFIX};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line arguments structure for dockergen.
#[derive(Parser, Debug)]
#[command(author, version, about = "dockergen: hierarchical Dockerfile generator", long_about = None)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Source and output locations shared by the subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct Dirs {
    /// Directory holding the templates and config.yml files
    #[arg(value_name = "SOURCE_DIR", default_value = ".")]
    pub source_dir: PathBuf,

    /// Directory receiving the generated tree [default: SOURCE_DIR/output]
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Additional top-level subdirectory, appended to the root `subdirs`.
    /// May be given several times.
    #[arg(long = "subdir", value_name = "NAME")]
    pub subdirs: Vec<String>,
}

impl Dirs {
    /// The explicit output directory, or `output/` under the source directory.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self.source_dir.join(DEFAULT_OUTPUT_DIR),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render templates and stage the output tree
    Generate {
        #[command(flatten)]
        dirs: Dirs,

        /// Suffix marking template files, without the leading dot
        #[arg(long, default_value = DEFAULT_TEMPLATE_SUFFIX)]
        suffix: String,
    },

    /// Run the container builder for every staged top-level subdirectory
    Build {
        #[command(flatten)]
        dirs: Dirs,

        /// Container builder program
        #[arg(long, default_value = DEFAULT_BUILDER)]
        builder: String,
    },

    /// Create missing config.yml files from their samples
    Init {
        /// Directory holding the templates and config.yml files
        #[arg(value_name = "SOURCE_DIR", default_value = ".")]
        source_dir: PathBuf,
    },
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingSubcommand
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
