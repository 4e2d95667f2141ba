//! Streaming VCD parser (spec component H).
//!
//! Grounded on `hdltools/vcd/streaming_parser.py` for the state machine and
//! per-line dispatch, and on the `pending_keyword`/`pending_body` technique
//! in the `aion_sim` VCD loader for buffering header statements that span
//! chunk or line boundaries.

use std::cell::Cell;
use std::fs::File;
use std::io::Read as _;
use std::path::Path;
use std::rc::Rc;

use log::warn;

use crate::error::VcdResult;
use crate::storage::VcdStorage;
use crate::timescale::Timescale;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A cloneable cooperative-cancellation flag. State hooks that observe an
/// abort condition (end-time exceeded, postcondition satisfied) capture this
/// handle and call [`AbortHandle::abort`] instead of holding a reference to
/// the parser itself.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Rc<Cell<bool>>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.set(true);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    Header,
    Initial,
    Dump,
}

/// Virtual hooks a consumer overrides to drive analysis. All have a no-op
/// default, mirroring the source's `header_statement_handler` and friends.
pub trait VcdHandlers {
    fn header_statement(&mut self, _line: &str, _fields: &[String]) {}
    fn initial_value(&mut self, _id: &str, _value: &str) {}
    fn value_change(&mut self, _id: &str, _value: &str, _time: u64) {}
    fn clock_change(&mut self, _time: u64) {}
    fn state_change(&mut self, _from: ParserState, _to: ParserState) {}
}

/// A [`VcdHandlers`] implementation that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandlers;
impl VcdHandlers for NoopHandlers {}

type StateHook = Box<dyn FnMut(ParserState, &str, &[String])>;

/// Drives a single-pass, single-threaded scan over VCD input, one line at a
/// time, updating [`VcdStorage`] and invoking handlers/hooks synchronously.
pub struct StreamingVcdParser<H: VcdHandlers> {
    pub handlers: H,
    pub storage: VcdStorage,
    pub timescale: Option<Timescale>,
    pub current_time: u64,
    pub last_cycle_time: u64,

    state: ParserState,
    chunk_size: usize,
    use_mmap: bool,
    abort: AbortHandle,
    current_line: u32,

    scope_stack: Vec<String>,
    in_dumpvars: bool,
    line_buffer: String,
    pending_keyword: Option<String>,
    pending_body: String,

    state_hooks: std::collections::HashMap<ParserState, Vec<StateHook>>,
}

impl<H: VcdHandlers> StreamingVcdParser<H> {
    pub fn new(handlers: H) -> Self {
        Self {
            handlers,
            storage: VcdStorage::new(),
            timescale: None,
            current_time: 0,
            last_cycle_time: 0,
            state: ParserState::Header,
            chunk_size: DEFAULT_CHUNK_SIZE,
            use_mmap: true,
            abort: AbortHandle::default(),
            current_line: 0,
            scope_stack: Vec::new(),
            in_dumpvars: false,
            line_buffer: String::new(),
            pending_keyword: None,
            pending_body: String::new(),
            state_hooks: std::collections::HashMap::new(),
        }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn add_state_hook(&mut self, state: ParserState, hook: StateHook) {
        self.state_hooks.entry(state).or_default().push(hook);
    }

    /// Cooperative cancellation: observed on the next line-dispatch iteration.
    pub fn abort_parser(&mut self) {
        self.abort.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// A cloneable handle state hooks can capture to call [`Self::abort_parser`]
    /// without holding a reference to the parser.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Parse an in-memory blob (string or decoded bytes).
    pub fn parse_str(&mut self, data: &str) -> VcdResult<()> {
        self.feed(data)?;
        self.finish()
    }

    /// Parse a file, preferring memory mapping and falling back to chunked
    /// reads when mapping isn't possible (pipes, special devices).
    pub fn parse_file(&mut self, path: &Path) -> VcdResult<()> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;

        if self.use_mmap && len > self.chunk_size {
            match unsafe { memmap2::Mmap::map(&file) } {
                Ok(mmap) => {
                    for window in mmap.chunks(self.chunk_size) {
                        if self.abort.is_aborted() {
                            break;
                        }
                        self.feed(&String::from_utf8_lossy(window))?;
                    }
                    return self.finish();
                }
                Err(err) => {
                    warn!("mmap failed ({err}), falling back to chunked reads");
                }
            }
        }

        self.parse_chunked_reader(file)
    }

    fn parse_chunked_reader(&mut self, mut file: File) -> VcdResult<()> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            if self.abort.is_aborted() {
                break;
            }
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.feed(&String::from_utf8_lossy(&buf[..n]))?;
        }
        self.finish()
    }

    fn feed(&mut self, chunk: &str) -> VcdResult<()> {
        self.line_buffer.push_str(chunk);
        while !self.abort.is_aborted() {
            let Some(pos) = self.line_buffer.find('\n') else { break };
            let line = self.line_buffer[..pos].to_string();
            self.line_buffer.drain(..=pos);
            self.process_line(&line)?;
            self.current_line += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> VcdResult<()> {
        if !self.abort.is_aborted() && !self.line_buffer.is_empty() {
            let remaining = std::mem::take(&mut self.line_buffer);
            self.process_line(&remaining)?;
        }
        Ok(())
    }

    fn change_state(&mut self, new_state: ParserState) {
        let old = self.state;
        self.state = new_state;
        self.handlers.state_change(old, new_state);
        self.fire_hooks(new_state, "state_change", &[]);
    }

    fn fire_hooks(&mut self, state: ParserState, stmt_type: &str, fields: &[String]) {
        if let Some(hooks) = self.state_hooks.get_mut(&state) {
            for hook in hooks.iter_mut() {
                hook(state, stmt_type, fields);
            }
        }
    }

    fn process_line(&mut self, raw: &str) -> VcdResult<()> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        if let Some(kw) = self.pending_keyword.clone() {
            if let Some(end_pos) = line.find("$end") {
                if end_pos > 0 {
                    self.pending_body.push(' ');
                    self.pending_body.push_str(line[..end_pos].trim());
                }
                let body = std::mem::take(&mut self.pending_body);
                self.pending_keyword = None;
                self.finalize_keyword(&kw, body.trim())?;
            } else {
                self.pending_body.push(' ');
                self.pending_body.push_str(line);
            }
            return Ok(());
        }

        if self.in_dumpvars {
            if line == "$end" || line.starts_with("$end") {
                self.in_dumpvars = false;
            } else {
                self.parse_value_change(line, true)?;
            }
            return Ok(());
        }

        match self.state {
            ParserState::Header => self.process_header_line(line),
            ParserState::Initial => self.process_initial_line(line),
            ParserState::Dump => self.process_dump_line(line),
        }
    }

    fn process_header_line(&mut self, line: &str) -> VcdResult<()> {
        if let Some(rest) = line.strip_prefix("$enddefinitions") {
            if !rest.contains("$end") {
                self.pending_keyword = Some("enddefinitions".to_string());
                self.pending_body.clear();
                return Ok(());
            }
            self.change_state(ParserState::Initial);
            return Ok(());
        }
        if let Some(rest) = line.strip_prefix('$') {
            self.start_header_statement(rest)
        } else {
            Ok(())
        }
    }

    fn process_initial_line(&mut self, line: &str) -> VcdResult<()> {
        if let Some(rest) = line.strip_prefix('#') {
            self.advance_clock(rest)?;
            self.change_state(ParserState::Dump);
            return Ok(());
        }
        if line.starts_with("$dumpvars") {
            self.in_dumpvars = true;
            return Ok(());
        }
        self.parse_value_change(line, true)
    }

    fn process_dump_line(&mut self, line: &str) -> VcdResult<()> {
        if let Some(rest) = line.strip_prefix('#') {
            return self.advance_clock(rest);
        }
        if line.starts_with("$dumpvars") || line.starts_with("$dumpall") {
            self.in_dumpvars = true;
            return Ok(());
        }
        self.parse_value_change(line, false)
    }

    fn advance_clock(&mut self, time_str: &str) -> VcdResult<()> {
        let Ok(time) = time_str.trim().parse::<u64>() else {
            warn!("malformed time tag #{time_str:?} at line {}", self.current_line);
            return Ok(());
        };
        self.last_cycle_time = self.current_time;
        self.current_time = time;
        self.handlers.clock_change(time);
        self.fire_hooks(self.state, "clock_change", &[]);
        Ok(())
    }

    fn start_header_statement(&mut self, rest: &str) -> VcdResult<()> {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let kw = parts.next().unwrap_or("").to_string();
        let body = parts.next().unwrap_or("").to_string();

        if let Some(end_pos) = body.find("$end") {
            self.finalize_keyword(&kw, body[..end_pos].trim())
        } else {
            self.pending_keyword = Some(kw);
            self.pending_body = body;
            Ok(())
        }
    }

    fn finalize_keyword(&mut self, kw: &str, body: &str) -> VcdResult<()> {
        let fields: Vec<String> = body.split_whitespace().map(str::to_string).collect();
        match kw {
            "comment" | "date" | "version" => {}
            "timescale" => match Timescale::parse(body) {
                Ok(ts) => self.timescale = Some(ts),
                Err(err) => warn!("ignoring malformed $timescale {body:?}: {err}"),
            },
            "scope" => {
                if let Some(name) = fields.get(1) {
                    self.scope_stack.push(name.clone());
                }
            }
            "upscope" => {
                self.scope_stack.pop();
            }
            "var" => self.parse_variable_declaration(&fields),
            "enddefinitions" => self.change_state(ParserState::Initial),
            _ => {}
        }

        self.handlers.header_statement(body, &fields);
        self.fire_hooks(ParserState::Header, kw, &fields);
        Ok(())
    }

    fn parse_variable_declaration(&mut self, fields: &[String]) {
        let (Some(var_type), Some(width_str), Some(id), Some(name)) =
            (fields.first(), fields.get(1), fields.get(2), fields.get(3))
        else {
            warn!("malformed $var declaration: {fields:?}");
            return;
        };
        let Ok(width) = width_str.parse::<u32>() else {
            warn!("malformed $var width {width_str:?}");
            return;
        };

        if self.storage.variables.contains_key(id) {
            if let Some(var) = self.storage.variables.get_mut(id) {
                var.aliases.push((self.scope_stack.clone(), name.clone()));
            }
            return;
        }
        self.storage.add_variable(id, name, var_type, width, self.scope_stack.clone());
    }

    fn parse_value_change(&mut self, line: &str, is_initial: bool) -> VcdResult<()> {
        if line.is_empty() {
            return Ok(());
        }

        let (value, id): (String, String) = if line.starts_with('b') || line.starts_with('r') {
            let mut parts = line.splitn(2, char::is_whitespace);
            let value = parts.next().unwrap_or("").to_string();
            let id = parts.next().unwrap_or("").trim().to_string();
            (value, id)
        } else {
            let mut chars = line.chars();
            let Some(first) = chars.next() else { return Ok(()) };
            if !matches!(first, '0' | '1' | 'x' | 'X' | 'z' | 'Z') {
                warn!("unrecognized value-change line {line:?} at line {}", self.current_line);
                return Ok(());
            }
            (first.to_string(), chars.as_str().to_string())
        };

        if id.is_empty() {
            warn!("value-change line {line:?} is missing a variable id");
            return Ok(());
        }
        if !self.storage.variables.contains_key(&id) {
            warn!("value change for unknown variable id {id:?}, ignoring");
            return Ok(());
        }

        if let Err(err) = self.storage.set_value_str(&id, self.current_time, &value) {
            warn!("failed to record value change for {id:?}: {err}");
            return Ok(());
        }

        if is_initial {
            self.handlers.initial_value(&id, &value);
        } else {
            self.handlers.value_change(&id, &value, self.current_time);
        }
        self.fire_hooks(self.state, "value_change", &[id, value]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
$timescale 1ns $end
$scope module top $end
$var wire 1 ! clk $end
$var wire 8 \" data $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
b00000000 \"
$end
#10
1!
#20
b00000101 \"
0!
";

    #[test]
    fn parses_header_and_dump_sections() {
        let mut parser = StreamingVcdParser::new(NoopHandlers);
        parser.parse_str(SAMPLE).unwrap();

        assert_eq!(parser.timescale, Some(Timescale::new(1, crate::timescale::TimescaleUnit::Ns)));
        assert_eq!(parser.storage.variables.len(), 2);

        let clk = parser.storage.variables.get("!").unwrap();
        assert_eq!(clk.scope_path, vec!["top".to_string()]);
        assert_eq!(clk.history.len(), 3);
        assert_eq!(clk.get_value_at(10).unwrap().to_int(), Some(1));
        assert_eq!(clk.get_value_at(20).unwrap().to_int(), Some(0));

        let data = parser.storage.variables.get("\"").unwrap();
        assert_eq!(data.get_value_at(0).unwrap().to_int(), Some(0));
        assert_eq!(data.get_value_at(20).unwrap().to_int(), Some(5));
    }

    #[test]
    fn abort_handle_stops_parsing_before_remaining_lines() {
        let mut parser = StreamingVcdParser::new(NoopHandlers);
        let abort = parser.abort_handle();
        parser.add_state_hook(
            ParserState::Initial,
            Box::new(move |_state, stmt_type, _fields| {
                if stmt_type == "clock_change" {
                    abort.abort();
                }
            }),
        );

        parser.parse_str(SAMPLE).unwrap();

        // The first `#10` advances the clock (while still in the `initial`
        // state) and fires the hook that aborts; the `1!` change that would
        // follow it, and everything after, is never processed.
        assert_eq!(parser.current_time, 10);
        let clk = parser.storage.variables.get("!").unwrap();
        assert_eq!(clk.history.len(), 1);
    }

    #[test]
    fn multiline_timescale_is_buffered_across_lines() {
        let src = "$timescale\n1ns\n$end\n$enddefinitions $end\n";
        let mut parser = StreamingVcdParser::new(NoopHandlers);
        parser.parse_str(src).unwrap();
        assert_eq!(parser.timescale, Some(Timescale::new(1, crate::timescale::TimescaleUnit::Ns)));
        assert_eq!(parser.state(), ParserState::Initial);
    }
}
