//! Outbound UI seams: toast notifications and the live text view.

use std::time::Duration;

/// A toast shown by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Request issued, waiting for the first tokens.
    Waiting,
    Finished { elapsed: Duration },
    Failed { title: String, message: Option<String> },
}

impl Notification {
    pub fn failed(title: impl Into<String>, message: Option<String>) -> Self {
        Notification::Failed {
            title: title.into(),
            message,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Notification::Waiting => "Waiting for Gemini...",
            Notification::Finished { .. } => "Response Finished",
            Notification::Failed { title, .. } => title,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Notification::Waiting => None,
            Notification::Finished { elapsed } => {
                Some(format!("{} seconds", elapsed.as_millis() as f64 / 1000.0))
            }
            Notification::Failed { message, .. } => message.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Waiting)
    }
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Receives the growing response text.
pub trait LiveView {
    /// Called with the whole buffer after every chunk. An error here is
    /// reported but never stops the stream.
    fn publish(&mut self, text: &str) -> anyhow::Result<()>;

    /// Called once with the final markdown: diff, raw response, or an error explanation.
    fn finish(&mut self, markdown: &str);
}

/// Collects everything it is sent. Handy for tests and headless callers.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub notifications: Vec<Notification>,
    pub published: Vec<String>,
    pub finished: Option<String>,
}

impl Notifier for Recorder {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

impl LiveView for Recorder {
    fn publish(&mut self, text: &str) -> anyhow::Result<()> {
        self.published.push(text.to_string());
        Ok(())
    }

    fn finish(&mut self, markdown: &str) {
        self.finished = Some(markdown.to_string());
    }
}
