use research_assistant::{ChatMessage, Renderer, escape_markdown};
use std::io::Write;
use tracing::warn;

/// Streams a growing answer to a terminal, writing only what is new.
pub struct TerminalRenderer<W> {
    out: W,
    printed: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    /// End the answer's line, if anything was written.
    pub fn finish(&mut self) {
        if self.printed > 0
            && let Err(err) = writeln!(self.out).and_then(|()| self.out.flush())
        {
            warn!("Failed to write to terminal: {err}");
        }
        self.printed = 0;
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, text: &str) {
        // The text of one turn only ever grows
        let new = text.get(self.printed..).unwrap_or_default();
        if let Err(err) = self
            .out
            .write_all(new.as_bytes())
            .and_then(|()| self.out.flush())
        {
            warn!("Failed to write to terminal: {err}");
        }
        self.printed = text.len();
    }
}

/// Print one history entry.
pub fn print_message(out: &mut impl Write, message: &ChatMessage) -> std::io::Result<()> {
    writeln!(
        out,
        "[{} {}] {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        message.role,
        escape_markdown(&message.text)
    )
}
