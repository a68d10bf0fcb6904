use std::io::{self, Write};
use std::sync::Mutex;

/// Shows a message to the user
pub trait DialogService: Send + Sync + 'static {
    fn show_message_dialog(&self, message: &str, title: &str);
}

/// Prints each dialog as a framed block of text
pub struct ConsoleDialog {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleDialog {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl DialogService for ConsoleDialog {
    fn show_message_dialog(&self, message: &str, title: &str) {
        let rendered = render_dialog(message, title);

        let Ok(mut out) = self.out.lock() else {
            tracing::warn!("Dialog output is poisoned, message dropped");
            return;
        };
        if let Err(e) = out.write_all(rendered.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Failed to show dialog");
        }
    }
}

fn render_dialog(message: &str, title: &str) -> String {
    let lines: Vec<&str> = message.lines().collect();
    let inner = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0);

    let rule = "-".repeat(inner + 2);
    let mut out = String::new();
    out.push_str(&format!("+{rule}+\n"));
    out.push_str(&format!("| {title:<inner$} |\n"));
    out.push_str(&format!("+{rule}+\n"));
    for line in lines {
        out.push_str(&format!("| {line:<inner$} |\n"));
    }
    out.push_str(&format!("+{rule}+\n"));
    out
}
