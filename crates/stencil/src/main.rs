//! Stencil CLI - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(version)]
#[command(about = "Line-oriented file templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that render templates.
#[derive(Args, Debug, Clone, Default)]
struct TemplateOptions {
    /// Template value (KEY=VALUE); VALUE is read as JSON when it parses
    #[arg(short = 'V', long = "value", value_name = "KEY=VALUE")]
    values: Vec<String>,

    /// JSON file with template values, applied before --value
    #[arg(long = "values", value_name = "FILE")]
    values_file: Option<PathBuf>,

    /// Number of spaces to indent every output line by
    #[arg(long, default_value_t = 0)]
    indent: usize,

    /// Use «expr» placeholders instead of $(expr)
    #[arg(long)]
    bracket: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template file to stdout
    Render {
        /// Template file
        file: PathBuf,

        #[command(flatten)]
        options: TemplateOptions,

        /// Terminate every output line with a newline
        #[arg(long)]
        lines: bool,
    },

    /// List the templates of a template directory
    List {
        /// Template directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Directory the templates would be instantiated in
        target: Option<PathBuf>,
    },

    /// Create a file from a template
    New {
        /// Template name, as shown by `stencil list`
        template: String,

        /// Value of the `name` variable
        #[arg(long)]
        name: String,

        /// Template directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Directory to create the file in
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        options: TemplateOptions,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stencil=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render {
            file,
            options,
            lines,
        } => commands::render::execute(commands::render::RenderArgs {
            file,
            values: options.values,
            values_file: options.values_file,
            indent: options.indent,
            bracket: options.bracket,
            lines,
        }),
        Commands::List { templates, target } => {
            commands::list::execute(commands::list::ListArgs { templates, target })
        }
        Commands::New {
            template,
            name,
            templates,
            dir,
            options,
            force,
        } => commands::new::execute(commands::new::NewArgs {
            template,
            name,
            templates,
            dir,
            values: options.values,
            values_file: options.values_file,
            indent: options.indent,
            bracket: options.bracket,
            force,
        }),
    }
}
