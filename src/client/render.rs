use std::io::Write;

use crate::models::chat::{ ChatMessage, Role };

/// Display surface driven by a chat session.
pub trait Renderer {
    fn show_user(&mut self, text: &str);
    /// Adds the empty assistant placeholder for the current turn.
    fn open_assistant(&mut self);
    /// Replaces the placeholder's text.
    fn update_assistant(&mut self, text: &str);
    fn set_input_enabled(&mut self, _enabled: bool) {}
}

/// Escapes markup-significant characters and turns newlines into `<br>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

/// Drops control characters so replies cannot inject terminal escape sequences.
pub fn sanitize_terminal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub class: &'static str,
    pub html: String,
}

/// In-memory model of the chat page: one escaped HTML fragment per message.
#[derive(Debug)]
pub struct HtmlTranscript {
    messages: Vec<RenderedMessage>,
    input_enabled: bool,
}

impl HtmlTranscript {
    pub fn new() -> Self {
        Self { messages: Vec::new(), input_enabled: true }
    }

    pub fn from_history(history: &[ChatMessage]) -> Self {
        let mut transcript = Self::new();
        for message in history {
            match message.role {
                Role::User => transcript.show_user(&message.content),
                Role::Assistant => {
                    transcript.open_assistant();
                    transcript.update_assistant(&message.content);
                }
                Role::System => {}
            }
        }
        transcript
    }

    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn to_html(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                format!(
                    "<div class=\"message {}\"><div class=\"content\"><p>{}</p></div></div>\n",
                    m.class,
                    m.html
                )
            })
            .collect()
    }
}

impl Default for HtmlTranscript {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HtmlTranscript {
    fn show_user(&mut self, text: &str) {
        self.messages.push(RenderedMessage { class: "user-message", html: escape_html(text) });
    }

    fn open_assistant(&mut self) {
        self.messages.push(RenderedMessage { class: "system-message", html: String::new() });
    }

    fn update_assistant(&mut self, text: &str) {
        if let Some(last) = self.messages.iter_mut().rev().find(|m| m.class == "system-message") {
            last.html = escape_html(text);
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }
}

/// Streams the reply to a terminal, printing only the newly arrived suffix.
pub struct TerminalRenderer<W: Write> {
    out: W,
    shown: String,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: String::new() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        // a closed stdout is not worth failing the turn over
        let _ = write!(self.out, "{}", sanitize_terminal(text));
        let _ = self.out.flush();
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_user(&mut self, text: &str) {
        self.emit(&format!("you > {}\n", text));
    }

    fn open_assistant(&mut self) {
        self.shown.clear();
        self.emit("coach > ");
    }

    fn update_assistant(&mut self, text: &str) {
        match text.strip_prefix(self.shown.as_str()) {
            Some(suffix) => {
                let suffix = suffix.to_string();
                self.emit(&suffix);
            }
            None => {
                let line = format!("\n{}", text);
                self.emit(&line);
            }
        }
        self.shown = text.to_string();
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if enabled {
            self.emit("\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_newlines() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>\nbye"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;<br>bye"
        );
    }

    #[test]
    fn strips_terminal_escapes() {
        assert_eq!(sanitize_terminal("ok\x1b[2J\tdone\n"), "ok[2J\tdone\n");
    }

    #[test]
    fn transcript_updates_only_the_placeholder() {
        let mut transcript = HtmlTranscript::new();
        transcript.show_user("<script>");
        transcript.open_assistant();
        transcript.update_assistant("Hi");
        transcript.update_assistant("Hi\nthere");

        assert_eq!(
            transcript.messages(),
            &[
                RenderedMessage { class: "user-message", html: "&lt;script&gt;".into() },
                RenderedMessage { class: "system-message", html: "Hi<br>there".into() },
            ]
        );
        assert!(transcript.to_html().contains("<p>Hi<br>there</p>"));
    }

    #[test]
    fn transcript_from_history_skips_system() {
        let transcript = HtmlTranscript::from_history(
            &[ChatMessage::system("persona"), ChatMessage::user("a"), ChatMessage::assistant("b")]
        );
        assert_eq!(transcript.messages().len(), 2);
    }

    #[test]
    fn terminal_prints_increments() {
        let mut term = TerminalRenderer::new(Vec::new());
        term.open_assistant();
        term.update_assistant("Hi");
        term.update_assistant("Hi there");
        term.update_assistant("Sorry");
        let out = String::from_utf8(term.into_inner()).unwrap();
        assert_eq!(out, "coach > Hi there\nSorry");
    }
}
