//! Issues one streaming request per invocation and turns the outcome into
//! final markdown, toasts and a history entry.

use futures_util::StreamExt;
use tracing::{debug, error, warn};

use crate::ai::{GenerateRequest, LanguageModel};
use crate::config::Preferences;
use crate::diff::render_diff;
use crate::error::{ApiError, GeminiError};
use crate::history::HistorySink;
use crate::model::{needs_zero_thinking_budget, resolve_with_preferences};
use crate::notify::{LiveView, Notification, Notifier};
use crate::request::RequestSpec;
use crate::state::Session;

pub struct Orchestrator<M, H> {
    model: M,
    history: H,
    prefs: Preferences,
}

impl<M, H> Orchestrator<M, H>
where
    M: LanguageModel,
    H: HistorySink,
{
    pub fn new(model: M, history: H, prefs: Preferences) -> Self {
        Self {
            model,
            history,
            prefs,
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn resolve_model(&self, per_call: Option<&str>) -> String {
        resolve_with_preferences(per_call, &self.prefs)
    }

    /// Runs `spec` to completion.
    ///
    /// The session is borrowed for the whole request, so one view never has
    /// two streams writing into it. Every outcome leaves the session
    /// non-loading with renderable markdown and exactly one terminal toast.
    pub async fn acquire_response<U>(
        &mut self,
        spec: RequestSpec,
        session: &mut Session,
        ui: &mut U,
    ) -> Result<String, GeminiError>
    where
        U: LiveView + Notifier + ?Sized,
    {
        session.begin_request(&spec.query);
        ui.notify(Notification::Waiting);

        let model = self.resolve_model(spec.model.as_deref());
        let disable_thinking = session.options().disable_thinking;
        let request = GenerateRequest {
            prompt: spec.query.clone(),
            model: model.clone(),
            attachments: spec.attachments.clone(),
            thinking_budget: needs_zero_thinking_budget(disable_thinking, &model).then_some(0),
        };

        match self.stream_into(request, session, ui).await {
            Ok(response) => {
                let markdown = match spec.reference_text.as_deref() {
                    Some(reference)
                        if session.options().show_diff
                            && !reference.is_empty()
                            && spec.attachments.is_empty() =>
                    {
                        render_diff(reference, &response)
                    }
                    _ => response.clone(),
                };

                let elapsed = session.stream_mut().started_at().elapsed();
                session.complete(response.clone(), markdown.clone());
                ui.finish(&markdown);

                if let Err(e) = self.history.add(&spec.query, &response, &model) {
                    warn!("Failed to record history entry: {:#}", e);
                }

                ui.notify(Notification::Finished { elapsed });
                Ok(response)
            }
            Err(api_error) => {
                let err = GeminiError::from(api_error);
                error!(model = %model, "Gemini request failed: {}", err);

                let explanation = err.explanation();
                session.fail(explanation);
                ui.finish(explanation);

                let (title, message) = err.toast();
                ui.notify(Notification::failed(title, Some(message)));
                Err(err)
            }
        }
    }

    async fn stream_into<U>(
        &self,
        request: GenerateRequest,
        session: &mut Session,
        ui: &mut U,
    ) -> Result<String, ApiError>
    where
        U: LiveView + Notifier + ?Sized,
    {
        debug!(model = %request.model, "Starting response stream");
        let mut chunks = self.model.stream(request).await?;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            session.stream_mut().on_chunk(chunk.as_deref(), ui);
        }

        Ok(session.stream_mut().text().to_string())
    }
}
