use crate::config::{CommandPreferences, Preferences};
use crate::state::CommandOptions;

/// The quick commands built on the shared response flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Comment,
    Explain,
    Ask,
    Translate,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Comment => "comment",
            Command::Explain => "explain",
            Command::Ask => "ask",
            Command::Translate => "translate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "comment" => Some(Command::Comment),
            "explain" => Some(Command::Explain),
            "ask" | "ask-about-selected-text" => Some(Command::Ask),
            "translate" => Some(Command::Translate),
            _ => None,
        }
    }

    pub fn all() -> Vec<Command> {
        vec![Command::Comment, Command::Explain, Command::Ask, Command::Translate]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Command::Comment => "Comment",
            Command::Explain => "Explain",
            Command::Ask => "Ask About Selected Text",
            Command::Translate => "Translate",
        }
    }

    /// Explain only shows its answer; the others can paste it back.
    pub fn allows_paste(&self) -> bool {
        !matches!(self, Command::Explain)
    }

    pub fn preferences<'a>(&self, prefs: &'a Preferences) -> &'a CommandPreferences {
        match self {
            Command::Comment => &prefs.commands.comment,
            Command::Explain => &prefs.commands.explain,
            Command::Ask => &prefs.commands.ask,
            Command::Translate => &prefs.commands.translate,
        }
    }

    /// Binds the command to the shared flow.
    ///
    /// `target_language` only matters for [`Command::Translate`].
    pub fn options(&self, prefs: &Preferences, target_language: Option<&str>) -> CommandOptions {
        let command_prefs = self.preferences(prefs);
        let context = match self {
            Command::Translate => translate_context(
                target_language,
                &prefs.default_target_language,
                &prefs.second_target_language,
                &command_prefs.prompt,
            ),
            _ => command_prefs.prompt.clone(),
        };

        CommandOptions {
            context: Some(context),
            model: Some(command_prefs.model.clone()),
            allow_paste: self.allows_paste(),
            use_selected: true,
            show_diff: prefs.show_diff,
            disable_thinking: prefs.disable_thinking,
            buffer: Vec::new(),
        }
    }
}

/// Context template for translation. An explicit language wins; otherwise
/// text already in the default language goes to the second language.
pub fn translate_context(
    target_language: Option<&str>,
    default_language: &str,
    second_language: &str,
    prompt: &str,
) -> String {
    match target_language.filter(|l| !l.trim().is_empty()) {
        Some(language) => format!("Translate following text to {}. {}", language, prompt),
        None => format!(
            "If the following text is in {default} then translate it to {second}, otherwise Translate following text to {default}. {prompt}",
            default = default_language,
            second = second_language,
            prompt = prompt,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for command in Command::all() {
            assert_eq!(Command::from_str(command.as_str()), Some(command));
        }
        assert_eq!(Command::from_str("ASK-about-selected-text"), Some(Command::Ask));
        assert_eq!(Command::from_str("chat"), None);
    }

    #[test]
    fn test_translate_context_explicit_language() {
        assert_eq!(
            translate_context(Some("French"), "English", "Chinese", "Be literal."),
            "Translate following text to French. Be literal."
        );
    }

    #[test]
    fn test_translate_context_default_pair() {
        assert_eq!(
            translate_context(None, "English", "Chinese", ""),
            "If the following text is in English then translate it to Chinese, otherwise Translate following text to English. "
        );
        assert_eq!(
            translate_context(Some("  "), "English", "German", "x"),
            "If the following text is in English then translate it to German, otherwise Translate following text to English. x"
        );
    }

    #[test]
    fn test_options_bind_preferences() {
        let mut prefs = Preferences::new();
        prefs.show_diff = true;
        prefs.commands.comment.model = "gemini-1.5-pro".to_string();

        let options = Command::Comment.options(&prefs, None);
        assert_eq!(options.context.as_deref(), Some(prefs.commands.comment.prompt.as_str()));
        assert_eq!(options.model.as_deref(), Some("gemini-1.5-pro"));
        assert!(options.use_selected);
        assert!(options.allow_paste);
        assert!(options.show_diff);

        let explain = Command::Explain.options(&prefs, None);
        assert!(!explain.allow_paste);
        assert_eq!(explain.model.as_deref(), Some("default"));
    }

    #[test]
    fn test_translate_options_use_language() {
        let prefs = Preferences::new();
        let options = Command::Translate.options(&prefs, Some("Japanese"));
        let context = options.context.unwrap();
        assert!(context.starts_with("Translate following text to Japanese. "));
    }
}
