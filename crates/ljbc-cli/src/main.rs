//! ljdis - disassemble, verify and dump LuaJIT bytecode files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "ljdis",
    version,
    about = "Disassemble and verify LuaJIT bytecode dumps",
    long_about = "Reads files produced by `luajit -b` and renders them as text.\n\n\
                  Disassemble:  ljdis disasm script.luac\n\
                  Round-trip:   ljdis verify script.luac"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a disassembly listing
    Disasm(commands::disasm::DisasmCommand),

    /// Check that decoding and re-encoding reproduces the file
    Verify(commands::verify::VerifyCommand),

    /// Write the decoded tree as JSON
    Dump(commands::dump::DumpCommand),

    /// Summarize a bytecode file
    Info(commands::info::InfoCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Disasm(cmd) => cmd.run(&config),
        Commands::Verify(cmd) => cmd.run(),
        Commands::Dump(cmd) => cmd.run(),
        Commands::Info(cmd) => cmd.run(),
    }
}
