//! Accumulates streamed chunks for one in-flight request.

use std::time::Instant;

use tracing::error;

use crate::error::GeminiError;
use crate::notify::{LiveView, Notification, Notifier};

/// Mutable state of a single request. Reset before every new request.
#[derive(Debug)]
pub struct StreamState {
    accumulated: String,
    is_loading: bool,
    started_at: Instant,
    fault_reported: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            accumulated: String::new(),
            is_loading: false,
            started_at: Instant::now(),
            fault_reported: false,
        }
    }
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any previous buffer and marks the state as loading.
    pub fn begin(&mut self) {
        self.accumulated.clear();
        self.is_loading = true;
        self.started_at = Instant::now();
        self.fault_reported = false;
    }

    pub fn end(&mut self) {
        self.is_loading = false;
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Handles one chunk from the transport.
    ///
    /// `None` is skipped. The buffer is republished after every append; if
    /// the view rejects it the fault is logged and reported once per request.
    pub fn on_chunk<U>(&mut self, chunk: Option<&str>, ui: &mut U)
    where
        U: LiveView + Notifier + ?Sized,
    {
        let Some(chunk) = chunk else {
            return;
        };

        self.accumulated.push_str(chunk);

        if let Err(e) = ui.publish(&self.accumulated) {
            let fault = GeminiError::StreamCallbackFault(format!("{:#}", e));
            error!("{}", fault);
            if !self.fault_reported {
                self.fault_reported = true;
                ui.notify(Notification::failed("Response Failed", Some(fault.message().to_string())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Recorder;
    use anyhow::anyhow;

    #[derive(Default)]
    struct FlakyView {
        calls: usize,
        fail_on: Vec<usize>,
        seen: Vec<String>,
        notes: Vec<Notification>,
    }

    impl LiveView for FlakyView {
        fn publish(&mut self, text: &str) -> anyhow::Result<()> {
            self.calls += 1;
            if self.fail_on.contains(&self.calls) {
                return Err(anyhow!("view closed"));
            }
            self.seen.push(text.to_string());
            Ok(())
        }

        fn finish(&mut self, _markdown: &str) {}
    }

    impl Notifier for FlakyView {
        fn notify(&mut self, notification: Notification) {
            self.notes.push(notification);
        }
    }

    #[test]
    fn test_chunks_accumulate_in_order() {
        let mut state = StreamState::new();
        let mut ui = Recorder::default();
        state.begin();

        for chunk in ["Hel", "lo", " world"] {
            state.on_chunk(Some(chunk), &mut ui);
        }

        assert_eq!(state.text(), "Hello world");
        assert_eq!(ui.published, vec!["Hel", "Hello", "Hello world"]);
        assert!(ui.notifications.is_empty());
    }

    #[test]
    fn test_none_chunk_is_noop() {
        let mut state = StreamState::new();
        let mut ui = Recorder::default();
        state.begin();

        state.on_chunk(Some("abc"), &mut ui);
        state.on_chunk(None, &mut ui);
        state.on_chunk(None, &mut ui);

        assert_eq!(state.text(), "abc");
        assert_eq!(ui.published.len(), 1);
    }

    #[test]
    fn test_view_fault_reported_once_and_stream_continues() {
        let mut state = StreamState::new();
        let mut view = FlakyView {
            fail_on: vec![1, 2],
            ..Default::default()
        };
        state.begin();

        state.on_chunk(Some("a"), &mut view);
        state.on_chunk(Some("b"), &mut view);
        state.on_chunk(Some("c"), &mut view);

        assert_eq!(state.text(), "abc");
        assert_eq!(view.seen, vec!["abc"]);
        assert_eq!(view.notes.len(), 1);
        assert_eq!(view.notes[0].title(), "Response Failed");
    }

    #[test]
    fn test_begin_discards_previous_buffer() {
        let mut state = StreamState::new();
        let mut ui = Recorder::default();

        state.begin();
        state.on_chunk(Some("first"), &mut ui);
        state.end();
        assert!(!state.is_loading());

        state.begin();
        assert!(state.is_loading());
        assert_eq!(state.text(), "");
        state.on_chunk(Some("second"), &mut ui);
        assert_eq!(state.text(), "second");
    }
}
