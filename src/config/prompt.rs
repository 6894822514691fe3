use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

/// Persona injected as the first message of every upstream request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a professional life coach and personal growth mentor. You are good at listening \
to the user's concerns and offering positive, constructive advice that helps them solve \
problems in their life and keep growing. Your answers should be warm, supportive and \
inspiring. Use friendly, natural language and avoid overly technical expressions.";

#[derive(Debug)]
pub enum PromptError {
    EmptyPrompt(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptyPrompt(source) => write!(f, "System prompt from {} is empty", source),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Shape of the prompt file, e.g. `{"system_prompt": "You are ..."}`.
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
}

pub fn load_prompt_file<P: AsRef<Path>>(path: P) -> Result<String, PromptError> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path)?;
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    let prompt = config.system_prompt.trim();
    if prompt.is_empty() {
        return Err(PromptError::EmptyPrompt(path.display().to_string()));
    }
    info!("Loaded system prompt from {}", path.display());
    Ok(prompt.to_string())
}

/// A prompt file wins over an inline prompt, which wins over the built-in persona.
pub fn resolve_system_prompt(
    inline: Option<&str>,
    path: Option<&str>
) -> Result<String, PromptError> {
    if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
        return load_prompt_file(path);
    }
    match inline {
        Some(prompt) if prompt.trim().is_empty() => {
            Err(PromptError::EmptyPrompt("SYSTEM_PROMPT".to_string()))
        }
        Some(prompt) => Ok(prompt.trim().to_string()),
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn falls_back_to_default_persona() {
        assert_eq!(resolve_system_prompt(None, None).unwrap(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn inline_prompt_is_trimmed() {
        let prompt = resolve_system_prompt(Some("  Be brief.  "), None).unwrap();
        assert_eq!(prompt, "Be brief.");
        assert!(matches!(resolve_system_prompt(Some("   "), None), Err(PromptError::EmptyPrompt(_))));
    }

    #[test]
    fn prompt_file_takes_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"system_prompt": "You are a chess tutor."}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let prompt = resolve_system_prompt(Some("ignored"), Some(&path)).unwrap();
        assert_eq!(prompt, "You are a chess tutor.");
    }

    #[test]
    fn broken_prompt_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert!(matches!(resolve_system_prompt(None, Some(&path)), Err(PromptError::JsonError(_))));
        assert!(matches!(
            resolve_system_prompt(None, Some("/nonexistent/prompt.json")),
            Err(PromptError::IoError(_))
        ));
    }
}
