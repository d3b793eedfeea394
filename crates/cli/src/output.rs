//! Terminal output. Results go to stdout, toasts and errors to stderr.

use std::fmt::Display;

use cablestore_client::Toast;

#[allow(clippy::print_stdout)]
pub fn line(text: impl Display) {
    println!("{text}");
}

#[allow(clippy::print_stderr)]
pub fn toast(toast: &Toast) {
    eprintln!("[{}] {}", toast.severity, toast.message);
}

#[allow(clippy::print_stderr)]
pub fn failure(error: &impl Display) {
    eprintln!("error: {error}");
}

/// Render an optional amount, `-` when absent.
pub fn amount(value: Option<impl Display>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
