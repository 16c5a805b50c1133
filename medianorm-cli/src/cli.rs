// ============================================================================
// medianorm-cli/src/cli.rs
// ============================================================================
//
// COMMAND LINE INTERFACE: Argument Definitions
//
// This module defines the command-line argument structures using clap.
//
// KEY COMPONENTS:
// - Cli: Top-level parser with global output and logging flags
// - Commands: convert, strip-metadata, transcode, check-tools
// - ToolArgs: Overridable paths for the wrapped external programs
//
// AI-ASSISTANT-INFO: Command-line argument definitions for the Medianorm CLI

// ---- External crate imports ----
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use medianorm_core::config::{
    DEFAULT_EXIFTOOL, DEFAULT_FFMPEG, DEFAULT_FFPROBE, DEFAULT_HANDBRAKE, DEFAULT_MARKER,
};
use medianorm_core::{GpuVendor, Operation, RecycleTarget, ToolPaths, VideoBackend};

// ---- Standard library imports ----
use std::path::PathBuf;

// ============================================================================
// TOP-LEVEL PARSER
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Medianorm: batch media normalization",
    long_about = "Converts images to marked JPEG, strips image metadata, and transcodes \
                  videos to H.265 using exiftool, ffprobe, ffmpeg and HandBrakeCLI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase console log detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Explicit console log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Also write the diagnostic log to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Emit events as JSON lines on stdout instead of terminal output
    #[arg(long, global = true)]
    pub json: bool,
}

impl Cli {
    /// Console level from `--log-level`, otherwise from `-v` / `-q`.
    pub fn console_level(&self) -> LevelFilter {
        if let Some(level) = self.log_level {
            return level;
        }
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert every image under DIR to a marked JPEG
    Convert(ConvertArgs),
    /// Clear description, title, subject and comment fields of JPEG files
    StripMetadata(StripArgs),
    /// Transcode every video under DIR to H.265 in an MP4 container
    Transcode(TranscodeArgs),
    /// Check that the external tools are installed
    CheckTools(CheckToolsArgs),
}

// ============================================================================
// SHARED ARGUMENTS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Root directory to process recursively
    #[arg(value_name = "DIR")]
    pub root: PathBuf,

    /// Move originals into this directory instead of the system recycle bin
    #[arg(long, value_name = "DIR")]
    pub recycle_dir: Option<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

impl RunArgs {
    pub fn recycle_target(&self) -> RecycleTarget {
        match &self.recycle_dir {
            Some(dir) => RecycleTarget::Directory(dir.clone()),
            None => RecycleTarget::SystemTrash,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// exiftool program name or path
    #[arg(long, value_name = "PATH", env = "MEDIANORM_EXIFTOOL", default_value = DEFAULT_EXIFTOOL)]
    pub exiftool: PathBuf,

    /// ffprobe program name or path
    #[arg(long, value_name = "PATH", env = "MEDIANORM_FFPROBE", default_value = DEFAULT_FFPROBE)]
    pub ffprobe: PathBuf,

    /// ffmpeg program name or path
    #[arg(long, value_name = "PATH", env = "MEDIANORM_FFMPEG", default_value = DEFAULT_FFMPEG)]
    pub ffmpeg: PathBuf,

    /// HandBrakeCLI program name or path
    #[arg(long, value_name = "PATH", env = "MEDIANORM_HANDBRAKE", default_value = DEFAULT_HANDBRAKE)]
    pub handbrake: PathBuf,
}

impl From<ToolArgs> for ToolPaths {
    fn from(args: ToolArgs) -> Self {
        ToolPaths {
            exiftool: args.exiftool,
            ffprobe: args.ffprobe,
            ffmpeg: args.ffmpeg,
            handbrake: args.handbrake,
        }
    }
}

// ============================================================================
// SUBCOMMAND ARGUMENTS
// ============================================================================

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Use one image worker per logical core instead of two
    #[arg(long)]
    pub max_cores: bool,

    /// Comment written to converted files and used to skip them next time
    #[arg(long, value_name = "TEXT", env = "MEDIANORM_MARKER", default_value = DEFAULT_MARKER)]
    pub marker: String,
}

#[derive(Args, Debug)]
pub struct StripArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Use one worker per logical core instead of two
    #[arg(long)]
    pub max_cores: bool,
}

#[derive(Args, Debug)]
pub struct TranscodeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Encoder program driving the transcode
    #[arg(long, value_enum, default_value_t = BackendArg::Ffmpeg)]
    pub backend: BackendArg,

    /// Hardware encoder vendor (software x265 when omitted)
    #[arg(long, value_enum)]
    pub gpu: Option<GpuArg>,
}

#[derive(Args, Debug)]
pub struct CheckToolsArgs {
    /// Only check the tools this operation needs
    #[arg(long = "for", value_enum, value_name = "OPERATION")]
    pub operation: Option<OperationArg>,

    /// Encoder backend assumed for `--for transcode`
    #[arg(long, value_enum, default_value_t = BackendArg::Ffmpeg)]
    pub backend: BackendArg,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Ffmpeg,
    #[value(name = "handbrake")]
    HandBrake,
}

impl From<BackendArg> for VideoBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ffmpeg => VideoBackend::Ffmpeg,
            BackendArg::HandBrake => VideoBackend::HandBrake,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuArg {
    Nvidia,
    Amd,
}

impl From<GpuArg> for GpuVendor {
    fn from(arg: GpuArg) -> Self {
        match arg {
            GpuArg::Nvidia => GpuVendor::Nvidia,
            GpuArg::Amd => GpuVendor::Amd,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationArg {
    Convert,
    StripMetadata,
    Transcode,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Convert => Operation::ImageConvert,
            OperationArg::StripMetadata => Operation::MetadataStrip,
            OperationArg::Transcode => Operation::VideoTranscode,
        }
    }
}
