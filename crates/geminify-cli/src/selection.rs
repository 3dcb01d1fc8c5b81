use std::io::{self, IsTerminal, Read};

use arboard::Clipboard;
use geminify_core::GeminiError;

/// Finds the "selected text" for a command.
///
/// Sources in order: the `--selection` argument, piped stdin, the clipboard.
pub fn read_selection(explicit: Option<&str>) -> Result<String, GeminiError> {
    if let Some(text) = explicit {
        return Ok(text.to_string());
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut piped = String::new();
        stdin
            .lock()
            .read_to_string(&mut piped)
            .map_err(|e| GeminiError::SelectionUnavailable(e.to_string()))?;
        if !piped.trim().is_empty() {
            return Ok(piped);
        }
    }

    read_clipboard()
}

pub fn read_clipboard() -> Result<String, GeminiError> {
    let text = Clipboard::new()
        .and_then(|mut clipboard| clipboard.get_text())
        .map_err(|e| GeminiError::SelectionUnavailable(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(GeminiError::SelectionUnavailable("no text selected".to_string()));
    }
    Ok(text)
}

pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_selection_wins() {
        assert_eq!(read_selection(Some("chosen")).unwrap(), "chosen");
    }
}
