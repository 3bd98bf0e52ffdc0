use fanctl_traits::DiagnosticSink;
use std::io::Write;

/// Serial-terminal style sink: clear is a form feed, home a vertical tab.
pub struct TerminalSink<W: Write> {
    out: W,
    failed: bool,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn put(&mut self, bytes: &[u8]) {
        let res = self.out.write_all(bytes).and_then(|()| self.out.flush());
        // Diagnostics are best effort; complain once
        if let Err(e) = res
            && !self.failed
        {
            self.failed = true;
            tracing::warn!(error = %e, "diagnostic output failed");
        }
    }
}

impl<W: Write> DiagnosticSink for TerminalSink<W> {
    fn clear(&mut self) {
        self.put(b"\x0c");
    }

    fn home(&mut self) {
        self.put(b"\x0b");
    }

    fn write_str(&mut self, s: &str) {
        self.put(s.as_bytes());
    }
}

/// Sink that turns each completed line into a tracing event.
#[derive(Debug, Default)]
pub struct TracingSink {
    line: String,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self) {
        if !self.line.is_empty() {
            tracing::info!(target: "fanctl::diag", line = %self.line, "report");
            self.line.clear();
        }
    }
}

impl DiagnosticSink for TracingSink {
    fn clear(&mut self) {
        self.emit();
    }

    fn home(&mut self) {
        self.emit();
    }

    fn write_str(&mut self, s: &str) {
        self.line.push_str(s);
    }
}

impl Drop for TracingSink {
    fn drop(&mut self) {
        self.emit();
    }
}
