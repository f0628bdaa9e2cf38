//! Output formatting utilities for the CLI
//!
//! Tables for devices and forward rules, plus colored status messages.

use tabled::{settings::Style, Table, Tabled};

use hdc_core::DeviceSnapshot;

/// Format the connected devices as an ASCII table
///
/// Rows keep the daemon's reporting order.
pub fn format_devices(snapshot: &DeviceSnapshot) -> String {
    if snapshot.is_empty() {
        return "No devices connected".to_string();
    }

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "DEVICE")]
        id: String,
    }

    let rows: Vec<DeviceRow> = snapshot
        .iter()
        .enumerate()
        .map(|(i, id)| DeviceRow {
            index: i + 1,
            id: id.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the daemon's forward rule lines as an ASCII table
///
/// Lines are `"<first> <second> [kind]"`; anything after the two node specs
/// goes into the TYPE column.
pub fn format_forwards(rules: &[String]) -> String {
    if rules.is_empty() {
        return "No forward rules".to_string();
    }

    #[derive(Tabled)]
    struct ForwardRow {
        #[tabled(rename = "FROM")]
        from: String,
        #[tabled(rename = "TO")]
        to: String,
        #[tabled(rename = "TYPE")]
        kind: String,
    }

    let rows: Vec<ForwardRow> = rules
        .iter()
        .map(|line| {
            let mut parts = line.split_whitespace();
            let from = parts.next().unwrap_or("-").to_string();
            let to = parts.next().unwrap_or("-").to_string();
            let rest: Vec<&str> = parts.collect();
            ForwardRow {
                from,
                to,
                kind: if rest.is_empty() {
                    "-".to_string()
                } else {
                    rest.join(" ").trim_matches(|c| c == '[' || c == ']').to_string()
                },
            }
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message in green with a checkmark prefix
///
/// Outputs to stdout with green coloring for positive feedback to the user.
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
/// Outputs to stderr.
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

/// Print a warning message in yellow to stderr
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

/// Print an informational message in cyan to stderr
///
/// Kept off stdout so that command output stays pipeable.
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
