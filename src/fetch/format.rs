//! Output for the fetch command.
//!
//! Selection bytes go to stdout (or the `--output` file) untouched so that
//! piping works; the verbose summary goes to stderr.

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use super::Fetched;

/// Print the retrieval summary to stderr.
pub fn print_summary(selection: &str, fetched: &Fetched) {
    for line in summary_lines(selection, fetched) {
        eprintln!("{line}");
    }
}

fn summary_lines(selection: &str, fetched: &Fetched) -> Vec<String> {
    let mut lines = vec![
        format!("Selection: {selection}"),
        format!("Target:    {}", fetched.target),
    ];
    if fetched.data_type != fetched.target {
        lines.push(format!("Type:      {}", fetched.data_type));
    }
    lines.push(format!("Size:      {}", format_size(fetched.bytes.len())));
    lines
}

fn format_size(len: usize) -> String {
    if len == 1 {
        "1 byte".to_string()
    } else {
        format!("{len} bytes")
    }
}

/// Write the selection contents verbatim.
///
/// An empty selection writes nothing to stdout but still creates (or
/// truncates) the output file.
pub async fn write_contents(bytes: &[u8], output: Option<&Path>) -> Result<(), io::Error> {
    match output {
        Some(path) => tokio::fs::write(path, bytes).await,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await?;
            stdout.flush().await
        }
    }
}
