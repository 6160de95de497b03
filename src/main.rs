//! dockergen's main application entry point.
//! Handles command-line argument parsing and dispatches to generation,
//! build or initialization.

use dockergen::{
    build::{BuildRunner, CommandBuilder},
    cli::{get_args, Command},
    config::ConfigStore,
    error::{default_error_handler, Result},
    logger::init_logger,
    processor::Processor,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    init_logger(args.verbose);

    if let Err(err) = run(args.command) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// * `generate`: loads the root configuration, appends `--subdir` units,
///   then renders and stages the whole tree under the output directory
/// * `build`: checks every staged unit for a Dockerfile and runs the builder
///   on each, stopping at the first failure
/// * `init`: copies `config.yml.sample` to `config.yml` where missing
fn run(command: Command) -> Result<()> {
    match command {
        Command::Generate { dirs, suffix } => {
            let output_dir = dirs.output_dir();
            let processor = Processor::new(dirs.source_dir(), &output_dir, &suffix)?;
            processor.generate(&dirs.subdirs)?;
            println!("Generation completed successfully in {}.", output_dir.display());
        }
        Command::Build { dirs, builder } => {
            let builder = CommandBuilder::new(builder);
            let runner = BuildRunner::new(&builder, dirs.source_dir(), dirs.output_dir());
            let built = runner.run(&dirs.subdirs)?;
            println!("Built {} image(s) successfully.", built.len());
        }
        Command::Init { source_dir } => {
            let visited = ConfigStore::new().init(&source_dir)?;
            println!("Initialized {} director(ies).", visited.len());
        }
    }
    Ok(())
}
