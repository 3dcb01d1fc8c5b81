use std::path::PathBuf;

use anyhow::Result;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input};
use geminify_core::{RequestSpec, Session};

use crate::selection;
use crate::terminal::TerminalUi;

/// Typing this on the prompt line appends the clipboard text to the draft.
const APPEND_SELECTION: &str = ":append";

/// Interactive form page: asks for the prompt (and an optional file) and
/// builds the request.
pub fn run(session: &mut Session, ui: &mut TerminalUi) -> Result<RequestSpec> {
    if let Some(selected) = session.selection() {
        eprintln!("{}", "Selected text:".bold());
        eprintln!("{}\n", selected.dimmed());
    }
    eprintln!(
        "{}",
        format!("Type {} to append the selected text.", APPEND_SELECTION).dimmed()
    );

    loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Prompt")
            .with_initial_text(session.draft())
            .allow_empty(true)
            .interact_text()?;

        match input.strip_suffix(APPEND_SELECTION) {
            Some(rest) => {
                session.set_draft(rest);
                session.append_selection(selection::read_clipboard(), ui);
            }
            None => {
                session.set_draft(input);
                break;
            }
        }
    }

    let mut files = Vec::new();
    if session.accepts_files() {
        let path: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Image or file to analyze (optional)")
            .allow_empty(true)
            .interact_text()?;
        if !path.trim().is_empty() {
            files.push(PathBuf::from(path.trim()));
        }
    }

    let draft = session.draft().to_string();
    Ok(session.submit_form(&draft, &files))
}
