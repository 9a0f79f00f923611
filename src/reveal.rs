//! Timed incremental reveal of assistant text.
//!
//! The reveal is a plain-text effect: chunks are appended to the target
//! verbatim while the reveal runs, and only once the full text is out does
//! the caller swap the partial plain text for rendered markup. The session
//! is an explicit iterator driven by an external loop, so ticks are
//! deterministic under test and cancellation is a matter of dropping the
//! session.

/// Render surface a reveal writes into. The terminal transcript implements
/// this; tests use a plain buffer.
pub trait RenderTarget {
    /// Append a plain-text chunk to the in-progress reveal.
    fn append_plain(&mut self, chunk: &str);
    /// Replace the partial plain text with final markup. Called exactly
    /// once per revealed message.
    fn finalize(&mut self, markup: &str);
}

/// Per-message reveal state: target text, cursor, chunk size. Yields
/// successive chunks on char boundaries.
#[derive(Debug, Clone)]
pub struct RevealSession {
    text: String,
    cursor: usize,
    chunk_size: usize,
}

impl RevealSession {
    pub fn new(text: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.text.len()
    }

    /// Full target text, available up front (the source is never a live
    /// stream).
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Iterator for RevealSession {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        let remaining = &self.text[self.cursor..];
        let len: usize = remaining
            .chars()
            .take(self.chunk_size)
            .map(|c| c.len_utf8())
            .sum();
        self.cursor += len;
        Some(remaining[..len].to_string())
    }
}

/// Result of driving the scheduler one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealTick {
    /// No reveal in flight, or the caller's handle was superseded.
    Idle,
    /// A chunk was appended; more remain.
    Progress,
    /// The last chunk was appended; carries the full raw text so the
    /// caller can substitute rendered markup.
    Complete(String),
}

/// Drives at most one reveal at a time. Starting a new reveal supersedes
/// any in-flight one: the old driver's handle goes stale and its ticks
/// become no-ops, so a target can never be double-appended.
#[derive(Debug)]
pub struct RevealScheduler {
    chunk_size: usize,
    generation: u64,
    active: Option<RevealSession>,
}

/// Opaque handle identifying one started reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealHandle(u64);

impl RevealScheduler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            generation: 0,
            active: None,
        }
    }

    /// Begin revealing `text`, invalidating any reveal still in flight.
    pub fn start(&mut self, text: impl Into<String>) -> RevealHandle {
        self.generation += 1;
        self.active = Some(RevealSession::new(text, self.chunk_size));
        RevealHandle(self.generation)
    }

    pub fn is_revealing(&self) -> bool {
        self.active.is_some()
    }

    /// Release the next chunk into `target`. A stale handle is ignored.
    pub fn tick(&mut self, handle: RevealHandle, target: &mut dyn RenderTarget) -> RevealTick {
        if handle.0 != self.generation {
            return RevealTick::Idle;
        }
        let Some(session) = self.active.as_mut() else {
            return RevealTick::Idle;
        };

        match session.next() {
            Some(chunk) => {
                target.append_plain(&chunk);
                if session.is_complete() {
                    let text = session.text().to_string();
                    self.active = None;
                    RevealTick::Complete(text)
                } else {
                    RevealTick::Progress
                }
            }
            None => {
                self.active = None;
                RevealTick::Complete(String::new())
            }
        }
    }
}
