use once_cell::sync::Lazy;
use regex::Regex;

/// Joins physical lines into log records: stack-trace continuations attach to
/// the record above them and pretty-printed JSON objects are kept whole.
#[derive(Default)]
pub struct MultiLineAggregator {
    buf: String,
    in_json: bool,
    brace_balance: i32,
    // buffered record is a complete JSON object; nothing may attach to it
    sealed: bool,
}

static RE_CONT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s+\S|Caused by:|\.\.\. \d+ more)").unwrap()
});

fn is_json_start(line: &str) -> bool {
    line.trim_start().starts_with('{')
}

fn json_balance_delta(line: &str) -> i32 {
    let mut bal = 0;
    for ch in line.chars() {
        match ch {
            '{' | '[' => bal += 1,
            '}' | ']' => bal -= 1,
            _ => {}
        }
    }
    bal
}

impl MultiLineAggregator {
    pub fn push(&mut self, line: &str) -> Option<String> {
        if self.in_json {
            self.buf.push('\n');
            self.buf.push_str(line);
            self.brace_balance += json_balance_delta(line);
            if self.brace_balance <= 0 {
                self.in_json = false;
                self.brace_balance = 0;
                return Some(std::mem::take(&mut self.buf));
            }
            return None;
        }

        if line.trim().is_empty() {
            return None;
        }

        if RE_CONT.is_match(line) && !self.buf.is_empty() && !self.sealed {
            self.buf.push('\n');
            self.buf.push_str(line);
            return None;
        }

        // Anything else starts a new record
        let out = if self.buf.is_empty() { None } else { Some(std::mem::take(&mut self.buf)) };
        self.buf.push_str(line);
        self.sealed = false;
        if is_json_start(line) {
            self.brace_balance = json_balance_delta(line);
            self.in_json = self.brace_balance > 0;
            // single-line json
            self.sealed = !self.in_json;
        }
        out
    }

    pub fn finish(&mut self) -> Option<String> {
        self.in_json = false;
        self.sealed = false;
        self.brace_balance = 0;
        if self.buf.is_empty() { None } else { Some(std::mem::take(&mut self.buf)) }
    }
}
