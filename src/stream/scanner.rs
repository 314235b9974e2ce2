//! Sentinel-marker scanner for the agent's plain-text stream.
//!
//! The backend interleaves user-visible prose with fixed, icon-prefixed
//! marker lines that describe tool execution and research-iteration
//! progress. The scanner consumes decoded text in arbitrary slices and
//! re-emits it as an ordered sequence of [`ScanEvent`]s: plain content,
//! typed tool lifecycle events, and iteration pulses.
//!
//! Tokenization rules:
//! - the earliest complete marker in the unconsumed buffer wins;
//! - a marker line runs from its label to the next newline, and is only
//!   recognized once that newline has arrived;
//! - a buffer tail matching a strict prefix of any label is withheld until
//!   more text completes or disproves it, so a marker split across chunks is
//!   never shown as content;
//! - a marker line whose payload does not parse is handed through as plain
//!   content rather than dropped.

/// One classified slice of the stream, in original order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// User-visible text, exactly as it appeared.
    Content(String),
    /// A tool began executing.
    ToolStart {
        name: String,
        params: Vec<(String, String)>,
    },
    /// The most recent open tool finished with a result payload.
    ToolResult(String),
    /// The most recent open tool failed with an error payload.
    ToolError(String),
    /// Research-iteration pulse; never user-visible, only a flush trigger.
    Iteration(IterationKind),
}

/// Which iteration pulse a marker line carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    Start,
    Continuing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    ToolStart,
    ToolResult,
    ToolError,
    IterationStart,
    IterationContinuing,
    IterationComplete,
}

/// Recognized marker labels, with and without the markdown bold the backend
/// wraps around the keyword. Order within the table is irrelevant: matching
/// picks the earliest occurrence, and the longer label on a position tie.
const MARKER_LABELS: &[(&str, MarkerKind)] = &[
    ("🔧 **Executing Tool:**", MarkerKind::ToolStart),
    ("🔧 Executing Tool:", MarkerKind::ToolStart),
    ("✅ **Result:**", MarkerKind::ToolResult),
    ("✅ Result:", MarkerKind::ToolResult),
    ("❌ **Error:**", MarkerKind::ToolError),
    ("❌ Error:", MarkerKind::ToolError),
    ("📋 **Research Iteration", MarkerKind::IterationStart),
    ("📋 Research Iteration", MarkerKind::IterationStart),
    ("🔄 **Continuing research...**", MarkerKind::IterationContinuing),
    ("🔄 Continuing research...", MarkerKind::IterationContinuing),
    ("✨ **Research complete**", MarkerKind::IterationComplete),
    ("✨ Research complete", MarkerKind::IterationComplete),
];

/// Incremental scanner over the decoded-but-unclassified tail of the stream.
#[derive(Debug, Default)]
pub struct MarkerScanner {
    buf: String,
}

impl MarkerScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly decoded text and return every event that is now settled.
    ///
    /// Text that might still turn into a marker (a label prefix, or a
    /// complete label whose line has no newline yet) stays in the buffer.
    pub fn push(&mut self, text: &str) -> Vec<ScanEvent> {
        self.buf.push_str(text);
        self.drain()
    }

    /// End of stream: settle what can be settled, then emit the remainder as
    /// plain content. A withheld suspect tail can no longer complete into a
    /// marker, so showing it is the accurate choice.
    pub fn finish(&mut self) -> Vec<ScanEvent> {
        let mut events = self.drain();
        if !self.buf.is_empty() {
            events.push(ScanEvent::Content(std::mem::take(&mut self.buf)));
        }
        events
    }

    /// Bytes currently withheld from classification.
    #[must_use]
    pub fn withheld_len(&self) -> usize {
        self.buf.len()
    }

    fn drain(&mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();

        loop {
            let Some((pos, label, kind)) = earliest_label(&self.buf) else {
                break;
            };

            let line_start = pos + label.len();
            let Some(newline_offset) = self.buf[line_start..].find('\n') else {
                // Complete label, incomplete line: release the content before
                // it and wait for the rest of the line.
                if pos > 0 {
                    let before: String = self.buf.drain(..pos).collect();
                    events.push(ScanEvent::Content(before));
                }
                return events;
            };

            let line_end = line_start + newline_offset;
            let payload = self.buf[line_start..line_end].trim_end_matches('\r');

            match parse_marker(kind, payload) {
                Some(event) => {
                    if pos > 0 {
                        events.push(ScanEvent::Content(self.buf[..pos].to_string()));
                    }
                    events.push(event);
                    self.buf.drain(..=line_end);
                }
                None => {
                    // Unparsable payload: the whole line, newline included,
                    // degrades to content.
                    let raw: String = self.buf.drain(..=line_end).collect();
                    events.push(ScanEvent::Content(raw));
                }
            }
        }

        // No complete marker left. Withhold the longest tail that could still
        // grow into one; everything before it is settled content.
        let keep = suspect_suffix_len(&self.buf);
        if keep < self.buf.len() {
            let settled: String = self.buf.drain(..self.buf.len() - keep).collect();
            events.push(ScanEvent::Content(settled));
        }

        events
    }
}

/// Earliest label occurrence in `text`; on a position tie the longest label
/// wins, so the bold spelling is preferred over its plain twin.
fn earliest_label(text: &str) -> Option<(usize, &'static str, MarkerKind)> {
    MARKER_LABELS
        .iter()
        .filter_map(|&(label, kind)| text.find(label).map(|pos| (pos, label, kind)))
        .min_by_key(|&(pos, label, _)| (pos, std::cmp::Reverse(label.len())))
}

/// Length in bytes of the longest buffer suffix that is a non-empty strict
/// prefix of some marker label.
fn suspect_suffix_len(text: &str) -> usize {
    let mut longest = 0usize;
    for &(label, _) in MARKER_LABELS {
        for (end, _) in label.char_indices().skip(1) {
            if end > longest && text.ends_with(&label[..end]) {
                longest = end;
            }
        }
    }
    longest
}

fn parse_marker(kind: MarkerKind, payload: &str) -> Option<ScanEvent> {
    match kind {
        MarkerKind::ToolStart => {
            let (name, params) = parse_tool_invocation(payload)?;
            Some(ScanEvent::ToolStart { name, params })
        }
        MarkerKind::ToolResult => Some(ScanEvent::ToolResult(payload.trim().to_string())),
        MarkerKind::ToolError => Some(ScanEvent::ToolError(payload.trim().to_string())),
        // Iteration pulses carry nothing worth keeping; the iteration number
        // on the start line is recognized and discarded.
        MarkerKind::IterationStart => Some(ScanEvent::Iteration(IterationKind::Start)),
        MarkerKind::IterationContinuing => Some(ScanEvent::Iteration(IterationKind::Continuing)),
        MarkerKind::IterationComplete => Some(ScanEvent::Iteration(IterationKind::Complete)),
    }
}

/// Parse `name` or `name(key=value, key=value)` from a tool-start payload.
fn parse_tool_invocation(payload: &str) -> Option<(String, Vec<(String, String)>)> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    let (name, params) = match payload.find('(') {
        None => (payload, Vec::new()),
        Some(open) => {
            let rest = &payload[open + 1..];
            let close = rest.rfind(')')?;
            if !rest[close + 1..].trim().is_empty() {
                return None;
            }
            (payload[..open].trim_end(), parse_params(&rest[..close])?)
        }
    };

    if name.is_empty() || !name.chars().all(is_tool_name_char) {
        return None;
    }
    Some((name.to_string(), params))
}

fn is_tool_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Flat, comma-separated `key=value` list. Values keep their inner text
/// verbatim apart from surrounding whitespace.
fn parse_params(inner: &str) -> Option<Vec<(String, String)>> {
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
