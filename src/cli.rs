use clap::Parser;
use std::path::PathBuf;

#[cfg(windows)]
const EXAMPLE_ROOT: &str = r"C:\Users\MyUser\Pictures";
#[cfg(target_os = "macos")]
const EXAMPLE_ROOT: &str = "/Users/myuser/Pictures";
#[cfg(not(any(windows, target_os = "macos")))]
const EXAMPLE_ROOT: &str = "/home/user/Pictures";

fn examples() -> String {
    format!(
        "Examples:\n  \
         batchjpg {root}\n  \
         batchjpg {root} --delete-original\n  \
         batchjpg {root} --exclude=screenshots --exclude=archive/2019\n  \
         batchjpg {root} --dry-run",
        root = EXAMPLE_ROOT
    )
}

#[derive(Parser, Debug)]
#[command(name = "batchjpg")]
#[command(
    author,
    version,
    about = "Recursively convert PNG images to JPEG using all available cores",
    after_help = examples()
)]
pub struct Cli {
    /// Directory to convert recursively
    pub root: Option<PathBuf>,

    /// Delete each PNG after its JPEG was written successfully
    #[arg(long)]
    pub delete_original: bool,

    /// Skip files and directories whose path relative to the root starts
    /// with this prefix (repeatable)
    #[arg(long = "exclude", value_name = "PATH")]
    pub exclude: Vec<String>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// JPEG quality (overrides the config file)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Number of concurrent conversions (default: cores minus reserved)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// List what would be converted without running the encoder
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}
