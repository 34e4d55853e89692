// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fileway CLI
//!
//! Uniform file operations over local storage and FTP servers.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "fw")]
#[command(author, version, about = "Fileway - uniform file operations across backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the per-user config file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Path to list (fw://backend/path or an absolute local path)
        #[arg(default_value = ".")]
        path: String,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,

        /// Only entries with this extension (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Glob matched against entry names
        #[arg(long)]
        mask: Option<String>,

        /// Only files
        #[arg(long, conflicts_with = "dirs_only")]
        files_only: bool,

        /// Only directories
        #[arg(long)]
        dirs_only: bool,
    },

    /// Display file contents
    Cat {
        /// File to display
        path: String,
    },

    /// Write a file from stdin or a local file
    Put {
        /// Destination path
        path: String,

        /// Read content from this local file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        replace: bool,

        /// Append to an existing file
        #[arg(long)]
        append: bool,

        /// Discard existing content first
        #[arg(long)]
        truncate: bool,
    },

    /// Create directories
    Mkdir {
        /// Directory path(s) to create
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Copy a file or directory tree into a directory
    Cp {
        /// Source path
        source: String,

        /// Destination directory
        dest: String,

        /// Name to give the copy
        #[arg(long)]
        name: Option<String>,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Move a file or directory tree into a directory
    Mv {
        /// Source path
        source: String,

        /// Destination directory
        dest: String,

        /// Name to give the moved entry
        #[arg(long)]
        name: Option<String>,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Remove files or directory trees
    Rm {
        /// Path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show file or directory information
    Stat {
        /// Path to inspect
        path: String,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change permission bits
    Chmod {
        /// Octal mode, e.g. 644
        mode: String,

        path: String,
    },

    /// Change owner
    Chown {
        owner: String,

        path: String,
    },

    /// Change group
    Chgrp {
        group: String,

        path: String,
    },

    /// Create a file or update its timestamps
    Touch {
        path: String,
    },

    /// List configured backends
    Backends,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = match commands::Context::load(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ls {
            path,
            long,
            recursive,
            human,
            extensions,
            mask,
            files_only,
            dirs_only,
        } => {
            let filter = commands::LsFilter {
                recursive,
                extensions,
                mask,
                files_only,
                dirs_only,
            };
            commands::ls(&mut ctx, &path, &filter, long, human)
        }
        Commands::Cat { path } => commands::cat(&mut ctx, &path),
        Commands::Put {
            path,
            from,
            replace,
            append,
            truncate,
        } => commands::put(&mut ctx, &path, from.as_deref(), replace, append, truncate),
        Commands::Mkdir { paths } => commands::mkdir(&mut ctx, &paths),
        Commands::Cp { source, dest, name, force } => {
            commands::cp(&mut ctx, &source, &dest, name, force)
        }
        Commands::Mv { source, dest, name, force } => {
            commands::mv(&mut ctx, &source, &dest, name, force)
        }
        Commands::Rm { paths } => commands::rm(&mut ctx, &paths),
        Commands::Stat { path, json } => commands::stat(&mut ctx, &path, json),
        Commands::Chmod { mode, path } => commands::chmod(&mut ctx, &mode, &path),
        Commands::Chown { owner, path } => commands::chown(&mut ctx, &owner, &path),
        Commands::Chgrp { group, path } => commands::chgrp(&mut ctx, &group, &path),
        Commands::Touch { path } => commands::touch(&mut ctx, &path),
        Commands::Backends => commands::backends(&ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
