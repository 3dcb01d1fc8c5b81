//! UI-agnostic state of one command invocation
//!
//! This module holds the page/markdown/loading state a front end renders,
//! and decides at launch whether to show the input form or submit right away.
//! It does not depend on any specific UI framework.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GeminiError;
use crate::notify::{Notification, Notifier};
use crate::request::{load_attachments, query_prompt, selection_prompt, Attachment, RequestSpec};
use crate::stream::StreamState;

/// A chat message handed off to a chat front end ("continue in chat")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// How a command binds the shared flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub context: Option<String>,
    /// Per-command model or `"default"`.
    pub model: Option<String>,
    pub allow_paste: bool,
    pub use_selected: bool,
    pub show_diff: bool,
    pub disable_thinking: bool,
    /// Attachments supplied by the caller up front.
    pub buffer: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Form,
    Detail,
}

/// What the front end should do after [`Session::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    ShowForm,
    Submit(RequestSpec),
}

#[derive(Debug)]
pub struct Session {
    options: CommandOptions,
    page: Page,
    stream: StreamState,
    markdown: String,
    /// Selected text held while the form is shown.
    selection: Option<String>,
    draft: String,
    last_query: Option<String>,
    last_response: Option<String>,
}

impl Session {
    pub fn new(options: CommandOptions) -> Self {
        Self {
            options,
            page: Page::Detail,
            stream: StreamState::new(),
            markdown: String::new(),
            selection: None,
            draft: String::new(),
            last_query: None,
            last_response: None,
        }
    }

    /// Decides between the form and an immediate request.
    ///
    /// `fetch_selection` is only called when the command uses selected text.
    /// If it fails, a warning is shown and the flow continues without it.
    pub fn launch<F, N>(&mut self, arg_query: &str, fetch_selection: F, notifier: &mut N) -> Launch
    where
        F: FnOnce() -> Result<String, GeminiError>,
        N: Notifier + ?Sized,
    {
        if self.options.use_selected {
            match fetch_selection() {
                Ok(selected) if arg_query.is_empty() => {
                    self.selection = Some(selected);
                    self.page = Page::Form;
                    return Launch::ShowForm;
                }
                Ok(selected) => {
                    let prompt = selection_prompt(self.context(), arg_query, &selected);
                    let attachments = self.options.buffer.clone();
                    return Launch::Submit(self.request(prompt, attachments, Some(&selected)));
                }
                Err(e) => {
                    warn!("{}", e);
                    notifier.notify(Notification::failed(
                        "Could not get the selected text. Continue without it.",
                        None,
                    ));
                    self.selection = None;
                }
            }
        }

        if arg_query.is_empty() {
            self.page = Page::Form;
            return Launch::ShowForm;
        }

        let prompt = query_prompt(self.context(), arg_query);
        let attachments = self.options.buffer.clone();
        Launch::Submit(self.request(prompt, attachments, None))
    }

    /// Builds the request for a submitted form.
    ///
    /// Only existing regular files among `files` are attached; with no
    /// files the caller's buffer is used.
    pub fn submit_form<P: AsRef<Path>>(&mut self, query: &str, files: &[P]) -> RequestSpec {
        self.markdown.clear();

        let attachments = if files.is_empty() {
            self.options.buffer.clone()
        } else {
            load_attachments(files)
        };

        match self.selection.clone() {
            Some(selected) => {
                let prompt = selection_prompt(self.context(), query, &selected);
                self.request(prompt, attachments, Some(&selected))
            }
            None => {
                let prompt = query_prompt(self.context(), query);
                self.request(prompt, attachments, None)
            }
        }
    }

    /// "Append Selected Text" form action.
    pub fn append_selection<N>(&mut self, selection: Result<String, GeminiError>, notifier: &mut N)
    where
        N: Notifier + ?Sized,
    {
        match selection {
            Ok(text) => self.draft.push_str(&text),
            Err(e) => {
                warn!("{}", e);
                notifier.notify(Notification::failed("Could not get the selected text", None));
            }
        }
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    fn context(&self) -> Option<&str> {
        self.options.context.as_deref()
    }

    fn request(&self, prompt: String, attachments: Vec<Attachment>, reference: Option<&str>) -> RequestSpec {
        RequestSpec::new(prompt)
            .with_context(self.context())
            .with_model(self.options.model.as_deref())
            .with_attachments(attachments)
            .with_reference(reference)
    }

    pub(crate) fn begin_request(&mut self, query: &str) {
        self.page = Page::Detail;
        self.markdown.clear();
        self.last_query = Some(query.to_string());
        self.last_response = None;
        self.stream.begin();
    }

    pub(crate) fn stream_mut(&mut self) -> &mut StreamState {
        &mut self.stream
    }

    pub(crate) fn complete(&mut self, response: String, markdown: String) {
        self.last_response = Some(response);
        self.markdown = markdown;
        self.stream.end();
    }

    pub(crate) fn fail(&mut self, markdown: &str) {
        self.markdown = markdown.to_string();
        self.stream.end();
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// The live buffer while streaming, the final markdown afterwards.
    pub fn markdown(&self) -> &str {
        if self.stream.is_loading() {
            self.stream.text()
        } else {
            &self.markdown
        }
    }

    pub fn is_loading(&self) -> bool {
        self.stream.is_loading()
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// The file picker is only offered when no attachments were supplied up front.
    pub fn accepts_files(&self) -> bool {
        self.options.buffer.is_empty()
    }

    /// The last exchange as chat messages, once there is one.
    pub fn chat_handoff(&self) -> Option<Vec<ChatMessage>> {
        let query = self.last_query.as_deref().filter(|q| !q.is_empty())?;
        let response = self.last_response.as_deref().filter(|r| !r.is_empty())?;
        Some(vec![
            ChatMessage {
                role: ChatRole::User,
                content: query.to_string(),
            },
            ChatMessage {
                role: ChatRole::Assistant,
                content: response.to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Recorder;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn selected_options(context: &str) -> CommandOptions {
        CommandOptions {
            context: Some(context.to_string()),
            model: Some("default".to_string()),
            allow_paste: true,
            use_selected: true,
            ..Default::default()
        }
    }

    fn no_selection() -> Result<String, GeminiError> {
        Err(GeminiError::SelectionUnavailable("nothing selected".to_string()))
    }

    #[test]
    fn test_plain_query_submits_immediately() {
        let mut session = Session::new(CommandOptions::default());
        let mut notes = Recorder::default();

        let launch = session.launch("Summarize", no_selection, &mut notes);

        match launch {
            Launch::Submit(spec) => {
                assert_eq!(spec.query, "Summarize");
                assert_eq!(spec.reference_text, None);
            }
            other => panic!("unexpected launch {:?}", other),
        }
        assert!(notes.notifications.is_empty());
    }

    #[test]
    fn test_selection_without_query_shows_form() {
        let mut session = Session::new(selected_options("Fix grammar."));
        let mut notes = Recorder::default();

        let launch = session.launch("", || Ok("Hello world".to_string()), &mut notes);

        assert_eq!(launch, Launch::ShowForm);
        assert_eq!(session.page(), Page::Form);
        assert_eq!(session.selection(), Some("Hello world"));
        assert!(session.last_query().is_none());
    }

    #[test]
    fn test_selection_with_query_submits() {
        let mut session = Session::new(selected_options("Fix grammar."));
        let mut notes = Recorder::default();

        let launch = session.launch("be formal", || Ok("hi there".to_string()), &mut notes);

        let Launch::Submit(spec) = launch else {
            panic!("expected submit");
        };
        assert_eq!(spec.query, "Fix grammar.\nbe formal\nhi there");
        assert_eq!(spec.reference_text.as_deref(), Some("hi there"));
        assert_eq!(spec.model.as_deref(), Some("default"));
    }

    #[test]
    fn test_selection_failure_warns_and_continues() {
        let mut session = Session::new(selected_options("ctx"));
        let mut notes = Recorder::default();

        let launch = session.launch("question", no_selection, &mut notes);

        let Launch::Submit(spec) = launch else {
            panic!("expected submit");
        };
        assert_eq!(spec.query, "ctx\n\nquestion");
        assert_eq!(spec.reference_text, None);
        assert_eq!(notes.notifications.len(), 1);
        assert_eq!(
            notes.notifications[0].title(),
            "Could not get the selected text. Continue without it."
        );
    }

    #[test]
    fn test_selection_failure_with_empty_query_shows_form() {
        let mut session = Session::new(selected_options("ctx"));
        let mut notes = Recorder::default();

        assert_eq!(session.launch("", no_selection, &mut notes), Launch::ShowForm);
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn test_form_submit_with_selection() {
        let mut session = Session::new(selected_options("Translate."));
        let mut notes = Recorder::default();
        session.launch("", || Ok("Bonjour".to_string()), &mut notes);

        let files: Vec<PathBuf> = Vec::new();
        let spec = session.submit_form("", &files);
        assert_eq!(spec.query, "Translate.\nBonjour");
        assert_eq!(spec.reference_text.as_deref(), Some("Bonjour"));

        let spec = session.submit_form("to German", &files);
        assert_eq!(spec.query, "Translate.\nto German\nBonjour");
    }

    #[test]
    fn test_form_submit_filters_files() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("shot.png");
        fs::write(&image, b"\x89PNG\r\n\x1a\ndata").unwrap();

        let mut session = Session::new(CommandOptions::default());
        let spec = session.submit_form("describe", &[image, dir.path().to_path_buf(), dir.path().join("gone")]);

        assert_eq!(spec.query, "describe");
        assert_eq!(spec.attachments.len(), 1);
        assert_eq!(spec.attachments[0].mime_type, "image/png");
    }

    #[test]
    fn test_form_submit_uses_buffer_without_files() {
        let options = CommandOptions {
            buffer: vec![Attachment::new(b"buffered".to_vec())],
            ..Default::default()
        };
        let mut session = Session::new(options);
        assert!(!session.accepts_files());

        let files: Vec<PathBuf> = Vec::new();
        let spec = session.submit_form("q", &files);
        assert_eq!(spec.attachments.len(), 1);
    }

    #[test]
    fn test_append_selection() {
        let mut session = Session::new(CommandOptions::default());
        let mut notes = Recorder::default();
        session.set_draft("Explain: ");

        session.append_selection(Ok("the text".to_string()), &mut notes);
        assert_eq!(session.draft(), "Explain: the text");

        session.append_selection(no_selection(), &mut notes);
        assert_eq!(session.draft(), "Explain: the text");
        assert_eq!(notes.notifications.len(), 1);
    }

    #[test]
    fn test_chat_handoff_requires_both_sides() {
        let mut session = Session::new(CommandOptions::default());
        assert!(session.chat_handoff().is_none());

        session.begin_request("q");
        assert!(session.chat_handoff().is_none());

        session.complete("r".to_string(), "r".to_string());
        let messages = session.chat_handoff().unwrap();
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].content, "r");
    }
}
