//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Jetty - a self-hosting build engine for C and C++
#[derive(Parser)]
#[command(name = "jetty")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print every command before running it
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run commands on a pseudo-terminal so compilers keep their colors
    #[arg(long, global = true)]
    pub pty: bool,

    /// Append all command output to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build build.jetty in the current directory
    Build(BuildArgs),

    /// Build an explicit build description file
    BuildFile(BuildFileArgs),

    /// Invoke a toolchain's C compiler; `-target <triple>` selects a cross toolchain
    Cc(CcArgs),

    /// Create build.jetty and src/main.c in the current directory
    Init,

    /// Create a project that builds without jetty: build.jetty, jetty.h and build.sh
    InitFreestanding,

    /// Print the engine header
    Library,

    /// Write a file's bytes as a C array initializer body
    Embed(EmbedArgs),

    /// Show the toolchain for a triple
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Arguments passed to the builder
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct BuildFileArgs {
    /// Build description to compile and run
    pub file: PathBuf,

    /// Arguments passed to the builder
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct CcArgs {
    /// Compiler arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct EmbedArgs {
    /// File to embed
    pub input: PathBuf,

    /// Generated file
    pub output: PathBuf,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Target triple (defaults to the host)
    pub triple: Option<String>,

    /// Use the LLVM toolchain layout
    #[arg(long)]
    pub llvm: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_builder_args_are_forwarded_verbatim() {
        let cli = Cli::parse_from(["jetty", "build", "release", "--fast", "-j4"]);
        match cli.command {
            Commands::Build(args) => assert_eq!(args.args, vec!["release", "--fast", "-j4"]),
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_cc_keeps_target_switch() {
        let cli = Cli::parse_from(["jetty", "cc", "-target", "aarch64-linux-gnu", "-c", "x.c"]);
        match cli.command {
            Commands::Cc(args) => {
                assert_eq!(args.args, vec!["-target", "aarch64-linux-gnu", "-c", "x.c"])
            }
            _ => panic!("expected cc"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["jetty", "--pty", "--log-file", "out.log", "init", "-v"]);
        assert!(cli.pty);
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("out.log")));
        assert!(matches!(cli.command, Commands::Init));
    }

    #[test]
    fn test_init_freestanding_subcommand() {
        let cli = Cli::parse_from(["jetty", "init-freestanding"]);
        assert!(matches!(cli.command, Commands::InitFreestanding));
    }

    #[test]
    fn test_build_file_args() {
        let cli = Cli::parse_from(["jetty", "build-file", "tools/x.jetty", "a", "b"]);
        match cli.command {
            Commands::BuildFile(args) => {
                assert_eq!(args.file, PathBuf::from("tools/x.jetty"));
                assert_eq!(args.args, vec!["a", "b"]);
            }
            _ => panic!("expected build-file"),
        }
    }
}
