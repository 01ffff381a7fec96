//! Output formatting utilities for the CLI
//!
//! Colored status lines and the table of console URLs shown once the
//! master node is known.

use dpx_core::config::ConsolePorts;
use dpx_core::Target;
use tabled::{settings::Style, Table, Tabled};

/// Format the consoles that will be opened for `target` as an ASCII table
///
/// The built-in consoles come first, followed by any extra URLs the user
/// asked for.
pub fn format_consoles(target: &Target, ports: &ConsolePorts, extra_uris: &[String]) -> String {
    #[derive(Tabled)]
    struct ConsoleRow {
        #[tabled(rename = "CONSOLE")]
        name: String,
        #[tabled(rename = "URL")]
        url: String,
    }

    let names = ["YARN ResourceManager", "HDFS NameNode", "MapReduce JobHistory"];
    let rows: Vec<ConsoleRow> = names
        .iter()
        .zip(ports.urls(&target.node))
        .map(|(name, url)| ConsoleRow {
            name: name.to_string(),
            url,
        })
        .chain(extra_uris.iter().map(|uri| ConsoleRow {
            name: "extra".to_string(),
            url: uri.clone(),
        }))
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr so errors survive redirected stdout.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in blue
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpx_core::config::ConsoleProfile;

    fn target() -> Target {
        Target {
            project: "proj1".to_string(),
            region: "global".to_string(),
            cluster: "clusterA".to_string(),
            job: None,
            node: "clusterA-m".to_string(),
            zone: "us-central1-a".to_string(),
        }
    }

    #[test]
    fn test_console_table_lists_urls() {
        let table = format_consoles(
            &target(),
            &ConsoleProfile::Hadoop3.ports(),
            &["http://clusterA-w-0:8042".to_string()],
        );
        assert!(table.contains("CONSOLE"));
        assert!(table.contains("http://clusterA-m:8088"));
        assert!(table.contains("http://clusterA-m:9870"));
        assert!(table.contains("http://clusterA-m:19888/jobhistory/"));
        assert!(table.contains("http://clusterA-w-0:8042"));
    }

    #[test]
    fn test_console_table_hadoop2() {
        let table = format_consoles(&target(), &ConsoleProfile::Hadoop2.ports(), &[]);
        assert!(table.contains("http://clusterA-m:50070"));
        assert!(!table.contains("extra"));
    }
}
