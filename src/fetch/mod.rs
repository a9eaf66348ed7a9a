//! Fetch command — read one selection and write it out.
//!
//! Validates the command line into a [`FetchConfig`], runs the blocking
//! X11 retrieval on a tokio blocking thread, then writes the bytes to
//! stdout or a file. Ctrl-C while waiting on the owner aborts the fetch.

mod format;

use std::path::PathBuf;
use std::time::Duration;

use x11rb::protocol::xproto::Atom;

use crate::cli::Cli;
use crate::selection::SelectionError;
use crate::x11::X11Clipboard;

/// Fetch command errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Selection(#[from] SelectionError),
    #[error("invalid arguments: {0}")]
    Config(String),
    #[error("interrupted")]
    Interrupted,
    #[error("retrieval task failed: {0}")]
    Task(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FetchError::Config(_) => 2,
            FetchError::Selection(SelectionError::Timeout) => 3,
            FetchError::Selection(SelectionError::AllocationFailure { .. }) => 4,
            FetchError::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Validated fetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Selection atom name (`CLIPBOARD`, `PRIMARY`, ...).
    pub selection: String,
    /// Candidate targets in fallback order. Empty means UTF-8 text, then
    /// `STRING`.
    pub targets: Vec<String>,
    pub display: Option<String>,
    pub timeout: Option<Duration>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

impl FetchConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, FetchError> {
        let selection = selection_atom_name(&cli.selection)?;

        if let Some(empty) = cli.targets.iter().position(|t| t.trim().is_empty()) {
            return Err(FetchError::Config(format!(
                "--target #{} is empty",
                empty + 1
            )));
        }

        let timeout = match cli.timeout {
            Some(0) => {
                return Err(FetchError::Config(
                    "--timeout must be greater than zero".into(),
                ));
            }
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        Ok(Self {
            selection,
            targets: cli.targets,
            display: cli.display,
            timeout,
            output: cli.output,
            verbose: cli.verbose,
        })
    }
}

/// Map the well-known selection aliases to their atom names. Anything
/// else is taken as an atom name verbatim.
fn selection_atom_name(name: &str) -> Result<String, FetchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FetchError::Config("--selection is empty".into()));
    }
    Ok(match name.to_ascii_lowercase().as_str() {
        "clipboard" | "c" => "CLIPBOARD".into(),
        "primary" | "p" => "PRIMARY".into(),
        "secondary" | "s" => "SECONDARY".into(),
        _ => name.to_string(),
    })
}

/// A retrieval result with atom names resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub target: String,
    pub data_type: String,
}

/// Run the fetch command.
///
/// Called from `main.rs`. The retrieval itself blocks on the X server, so
/// it runs under `spawn_blocking`; the async side only waits for it or
/// for Ctrl-C.
pub async fn run(config: FetchConfig) -> Result<(), FetchError> {
    let request = config.clone();
    let retrieval = tokio::task::spawn_blocking(move || fetch_blocking(&request));

    let fetched = tokio::select! {
        joined = retrieval => joined.map_err(|e| FetchError::Task(e.to_string()))??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted while waiting for selection owner");
            return Err(FetchError::Interrupted);
        }
    };

    if config.verbose {
        format::print_summary(&config.selection, &fetched);
    }
    format::write_contents(&fetched.bytes, config.output.as_deref()).await?;
    Ok(())
}

fn fetch_blocking(config: &FetchConfig) -> Result<Fetched, SelectionError> {
    let clipboard =
        X11Clipboard::connect(config.display.as_deref())?.with_timeout(config.timeout);

    let contents = if config.targets.is_empty() {
        clipboard.read(&config.selection)?
    } else {
        clipboard.read_with_targets(&config.selection, &config.targets)?
    };

    let name = |atom: Atom| {
        clipboard
            .atom_name(atom)
            .unwrap_or_else(|_| atom.to_string())
    };

    Ok(Fetched {
        target: name(contents.target),
        data_type: name(contents.data_type),
        bytes: contents.bytes,
    })
}
