//! Output formatting helpers.

use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dimmed progress note.
pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}
