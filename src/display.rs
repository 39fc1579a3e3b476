//! Console output for research runs.
//!
//! [`StreamPrinter`] renders [`StreamEvent`]s as they arrive: a short
//! progress block per finished node and answer tokens printed inline.
//! It writes to any `io::Write`, so tests capture the output in a `Vec<u8>`.

use std::io::{self, Write};

use crate::graph::{StreamEvent, FINALIZE_ANSWER, GENERATE_QUERY, REFLECTION, WEB_RESEARCH};
use crate::state::{Message, StateUpdate};
use crate::utils::truncate;

/// Width of the `=` rules framing headings.
pub const RULE_WIDTH: usize = 50;

/// Characters of the first research result shown in the progress line.
pub const PREVIEW_CHARS: usize = 100;

/// A line of `ch` repeated `width` times.
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// `title` framed by `=` rules, one per line.
pub fn banner(title: &str) -> String {
    let line = rule('=', RULE_WIDTH);
    format!("{}\n{}\n{}", line, title, line)
}

/// Prints graph events to a writer.
pub struct StreamPrinter<W: Write> {
    out: W,
    final_messages: Option<Vec<Message>>,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            final_messages: None,
        }
    }

    /// Print one event.
    pub fn handle(&mut self, event: &StreamEvent) -> io::Result<()> {
        match event {
            StreamEvent::Updates { node, update } => self.print_update(node, update),
            StreamEvent::Messages { token, metadata } => {
                if token.is_empty() {
                    return Ok(());
                }
                write!(self.out, "🤖 [{}] {}", metadata.node, token)?;
                self.out.flush()
            }
        }
    }

    fn print_update(&mut self, node: &str, update: &StateUpdate) -> io::Result<()> {
        writeln!(self.out, "\n📍 {}:", node.to_uppercase())?;

        match node {
            GENERATE_QUERY => {
                if let Some(queries) = &update.search_query {
                    writeln!(self.out, "   🔗 {} queries generated:", queries.len())?;
                    for (i, query) in queries.iter().enumerate() {
                        writeln!(self.out, "   {}. {}", i + 1, query)?;
                    }
                }
            }
            WEB_RESEARCH => {
                if let Some(sources) = &update.sources_gathered {
                    writeln!(self.out, "   🌐 {} sources gathered", sources.len())?;
                }
                if let Some(first) = update.web_research_result.as_ref().and_then(|r| r.first()) {
                    writeln!(self.out, "   📄 Preview: {}", truncate(first, PREVIEW_CHARS))?;
                }
            }
            REFLECTION => {
                if let Some(loops) = update.research_loop_count {
                    let verdict = if update.is_sufficient.unwrap_or(false) {
                        "Sufficient"
                    } else {
                        "Needs more research"
                    };
                    writeln!(self.out, "   🤔 Loop {} - {}", loops, verdict)?;
                }
            }
            FINALIZE_ANSWER => {
                if let Some(messages) = &update.messages {
                    self.final_messages = Some(messages.clone());
                }
                writeln!(self.out, "   ✅ Answer finalized!")?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Messages captured from the `finalize_answer` update, if seen.
    pub fn final_messages(&self) -> Option<&[Message]> {
        self.final_messages.as_deref()
    }

    /// Print the final answer block, if an answer was captured.
    pub fn finish(&mut self) -> io::Result<()> {
        let Some(answer) = self.final_messages.as_ref().and_then(|m| m.last()) else {
            return Ok(());
        };
        let line = rule('=', RULE_WIDTH);
        writeln!(self.out, "\n{}", line)?;
        writeln!(self.out, "📝 FINAL ANSWER:")?;
        writeln!(self.out, "{}", line)?;
        writeln!(self.out, "{}", answer.content)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
