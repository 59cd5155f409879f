//! # Console Device
//!
//! The output side of the operator console.
//!
//! Programs reach the console only through the CPU's system call. The
//! device accepts text and line breaks and nothing else; how the text is
//! drawn is a host concern.

/// Console output device
pub trait ConsoleDevice {
    /// Appends text to the current line
    fn put_text(&mut self, text: &str);

    /// Ends the current line
    fn advance_line(&mut self);
}

/// Console that buffers everything written to it
///
/// The host drains the buffer after each batch of clock ticks.
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    lines: Vec<String>,
    current: String,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns completed lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the line still being written
    pub fn current_line(&self) -> &str {
        &self.current
    }

    /// Returns everything written so far, lines joined with `\n`
    pub fn contents(&self) -> String {
        let mut out = self.lines.join("\n");
        if !self.lines.is_empty() && !self.current.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.current);
        out
    }

    /// Takes all buffered output, completed lines first
    pub fn take_output(&mut self) -> Vec<String> {
        let mut lines = std::mem::take(&mut self.lines);
        if !self.current.is_empty() {
            lines.push(std::mem::take(&mut self.current));
        }
        lines
    }
}

impl ConsoleDevice for BufferedConsole {
    fn put_text(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn advance_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }
}
