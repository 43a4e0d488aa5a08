//! Log redaction of survey answers.
//!
//! Services log counts, the model name, the probability and the band, never
//! the answers themselves. This writer is the fallback for when an answer
//! reaches a formatted log line anyway (e.g. inside an error message): any
//! `<catalog id> = <number>` or `"<catalog id>": <number>` pair has its number
//! replaced before the line hits the sink.

use regex::Regex;
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FeatureCatalog;

static ANSWER_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Upper bound on buffered bytes for a line without a newline.
const MAX_LINE_BYTES: usize = 16 * 1024;

const REPLACEMENT: &str = "${key}${sep}[REDACTED]";

fn answer_pattern() -> Option<&'static Regex> {
    ANSWER_PATTERN
        .get_or_init(|| {
            let ids: Vec<String> = FeatureCatalog::standard()
                .iter()
                .map(|spec| regex::escape(spec.id))
                .collect();
            let pattern = format!(
                r#"(?P<key>"?\b(?:{})\b"?)(?P<sep>\s*[:=]\s*)-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?"#,
                ids.join("|")
            );
            Regex::new(&pattern).ok()
        })
        .as_ref()
}

/// Replace every survey answer in `input`.
#[must_use]
pub fn redact(input: &str) -> String {
    match answer_pattern() {
        Some(re) => re.replace_all(input, REPLACEMENT).into_owned(),
        None => input.to_string(),
    }
}

/// Whether `input` contains something that looks like a survey answer.
#[must_use]
pub fn contains_answer(input: &str) -> bool {
    answer_pattern().is_some_and(|re| re.is_match(input))
}

/// A `tracing_subscriber` writer wrapper that redacts formatted log lines
/// before they are written to the underlying sink.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct RedactingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> RedactingWriter<W> {
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(line);
        self.inner.write_all(redact(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_line(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush_lines()?;

        if self.buffer.len() > MAX_LINE_BYTES {
            let pending = std::mem::take(&mut self.buffer);
            self.write_line(&pending)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_line(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            buffer: Vec::new(),
        }
    }
}
