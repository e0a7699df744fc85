// User-facing alerts, confirmations and text input

use colored::Colorize;
use std::io::{BufRead, Write};

/// Blocking interactions with the user
pub trait Prompt {
    /// Show a validation message
    fn alert(&mut self, message: &str);

    /// Ask a yes/no question; anything but yes is no
    fn confirm(&mut self, message: &str) -> bool;

    /// Ask for a line of text, offering `default`; `None` when cancelled
    fn input(&mut self, message: &str, default: &str) -> Option<String>;
}

/// Prompt on the controlling terminal
pub struct TerminalPrompt<R> {
    reader: R,
    assume_yes: bool,
}

impl TerminalPrompt<std::io::StdinLock<'static>> {
    pub fn stdin(assume_yes: bool) -> Self {
        Self::new(std::io::stdin().lock(), assume_yes)
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn new(reader: R, assume_yes: bool) -> Self {
        Self { reader, assume_yes }
    }

    /// Next raw line without its line ending; `None` at end of input
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl<R: BufRead> Prompt for TerminalPrompt<R> {
    fn alert(&mut self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message.yellow());
    }

    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", message);
        let _ = std::io::stderr().flush();
        matches!(
            self.read_line().map(|l| l.trim().to_ascii_lowercase()).as_deref(),
            Some("y") | Some("yes")
        )
    }

    fn input(&mut self, message: &str, default: &str) -> Option<String> {
        eprint!("{} [{}] ", message, default);
        let _ = std::io::stderr().flush();
        let line = self.read_line()?;
        if line.trim().is_empty() {
            Some(default.to_string())
        } else {
            Some(line)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm_reads_answer() {
        let mut prompt = TerminalPrompt::new(Cursor::new("y\nno\nYES\n"), false);
        assert!(prompt.confirm("Delete?"));
        assert!(!prompt.confirm("Delete?"));
        assert!(prompt.confirm("Delete?"));
        // EOF counts as no
        assert!(!prompt.confirm("Delete?"));
    }

    #[test]
    fn test_assume_yes_skips_reading() {
        let mut prompt = TerminalPrompt::new(Cursor::new(""), true);
        assert!(prompt.confirm("Delete ALL tasks?"));
    }

    #[test]
    fn test_input_defaults_on_blank() {
        let mut prompt = TerminalPrompt::new(Cursor::new("\nnew text\r\n"), false);
        assert_eq!(prompt.input("Edit task:", "old").as_deref(), Some("old"));
        assert_eq!(prompt.input("Edit task:", "old").as_deref(), Some("new text"));
        assert_eq!(prompt.input("Edit task:", "old"), None);
    }
}
