use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "clipfetch", about = "Read an X11 selection and print its contents")]
pub struct Cli {
    /// Selection to read: clipboard, primary, secondary, or an atom name
    #[arg(short, long, default_value = "clipboard")]
    pub selection: String,

    /// Target type to request; repeat to set the fallback order
    /// (default: UTF8_STRING, then STRING)
    #[arg(short, long = "target", value_name = "TYPE")]
    pub targets: Vec<String>,

    /// X display to connect to (defaults to $DISPLAY)
    #[arg(short, long)]
    pub display: Option<String>,

    /// Give up waiting for the selection owner after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Write the contents to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the returned type and size to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
