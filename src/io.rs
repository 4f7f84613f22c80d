// i/o collaborator boundary. the processor only ever talks to these
// two traits; the cli wires them to stdin/stdout, embedders and tests
// substitute the buffered variants.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Append-only, order-preserving sink for `out` values and for
/// error/debug messages.
pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

/// Synchronous integer input. A host may satisfy this asynchronously
/// (e.g. from a gui) as long as the call does not return until a value
/// or a failure is available; failures are reported by the processor
/// and substituted with 0 rather than halting.
pub trait InputSource {
    fn request_integer(&mut self, prompt: &str) -> Result<i64, String>;
}

/// Writes each emitted line to stdout, flushing as it goes.
#[derive(Debug, Default)]
pub struct StdOutput;

impl OutputSink for StdOutput {
    fn emit(&mut self, text: &str) {
        println!("{text}");
        let _ = io::stdout().flush();
    }
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdInput;

impl InputSource for StdInput {
    fn request_integer(&mut self, prompt: &str) -> Result<i64, String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| e.to_string())?;
        if read == 0 {
            return Err("end of input".into());
        }
        line.trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integer", line.trim()))
    }
}

/// Collects emitted lines in memory. Clones share the same buffer, so
/// a caller can keep a handle while the processor owns the sink.
#[derive(Debug, Clone, Default)]
pub struct BufferedSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl BufferedSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl OutputSink for BufferedSink {
    fn emit(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}

/// Serves integers from a pre-loaded buffer; runs dry with an error,
/// which the processor treats as a 0 read.
#[derive(Debug, Default)]
pub struct BufferedInput {
    values: VecDeque<i64>,
}

impl BufferedInput {
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        BufferedInput {
            values: values.into_iter().collect(),
        }
    }
}

impl InputSource for BufferedInput {
    fn request_integer(&mut self, _prompt: &str) -> Result<i64, String> {
        self.values
            .pop_front()
            .ok_or_else(|| "input buffer exhausted".to_string())
    }
}
