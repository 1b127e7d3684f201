//! Log forwarding: a `tracing` fmt subscriber whose writer hands each formatted line to a sink.
//! Inside the sandbox the sink is the host's console log import.

use std::io;

use tracing::Level;

/// Receives one formatted log line (no trailing newline).
pub type Sink = fn(&str);

/// Buffers what the formatter writes for one event and emits it on flush or drop.
pub struct ConsoleWriter {
    sink: Sink,
    line: Vec<u8>,
}

impl ConsoleWriter {
    pub fn new(sink: Sink) -> Self {
        Self {
            sink,
            line: Vec::new(),
        }
    }

    fn emit(&mut self) {
        if self.line.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.line);
        (self.sink)(text.trim_end_matches('\n'));
        self.line.clear();
    }
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.line.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        self.emit();
    }
}

/// Subscriber writing plain lines (no ANSI, no timestamps, no target) to `sink`.
pub fn subscriber(sink: Sink) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .with_max_level(Level::DEBUG)
        .with_writer(move || ConsoleWriter::new(sink))
        .finish()
}

/// Install the global subscriber. Returns `false`, and leaves the installed one in place,
/// when a subscriber was already set.
pub fn init(sink: Sink) -> bool {
    match tracing::subscriber::set_global_default(subscriber(sink)) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "log subscriber already installed");
            false
        }
    }
}
