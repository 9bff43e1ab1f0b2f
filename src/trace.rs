use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::Path,
};

use xz2::read::XzDecoder;

use crate::error::{Error, Result};

/// Marker line that ends a trace before the end of the input.
pub const END_OF_TRACE: &str = "#eof";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub addr: usize,
}

impl Access {
    pub fn load(addr: usize) -> Self {
        Access {
            kind: AccessKind::Load,
            addr,
        }
    }

    pub fn store(addr: usize) -> Self {
        Access {
            kind: AccessKind::Store,
            addr,
        }
    }

    /// Parses one `l <hex>` / `s <hex>` record. `line` is only used in errors.
    pub fn parse(record: &str, line: usize) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedAccess { line, reason };

        let mut fields = record.split_whitespace();
        let kind = match fields.next() {
            Some("l") => AccessKind::Load,
            Some("s") => AccessKind::Store,
            Some(other) => return Err(malformed(format!("unrecognized access type `{other}`"))),
            None => return Err(malformed("empty record".into())),
        };
        let raw = fields
            .next()
            .ok_or_else(|| malformed("missing address".into()))?;
        if let Some(extra) = fields.next() {
            return Err(malformed(format!("unexpected trailing field `{extra}`")));
        }
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        if digits.starts_with(['+', '-']) {
            return Err(malformed(format!("signed address `{raw}`")));
        }
        let addr = usize::from_str_radix(digits, 16)
            .map_err(|err| malformed(format!("bad address `{raw}`: {err}")))?;
        Ok(Access { kind, addr })
    }
}

/// Line-oriented access trace. Yields one `Result` per record so a bad line
/// can be skipped without ending the run.
pub struct Trace {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl Trace {
    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Trace {
            reader,
            buf: Vec::new(),
            line: 0,
            done: false,
        }
    }

    /// Opens a trace file, decompressing it when the name ends in `.xz`.
    pub fn open(path: &Path) -> Result<Self> {
        let stream = fs::File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "xz") {
            Box::new(BufReader::new(XzDecoder::new(stream)))
        } else {
            Box::new(BufReader::new(stream))
        };
        Ok(Trace::new(reader))
    }

    pub fn stdin() -> Self {
        Trace::new(Box::new(io::stdin().lock()))
    }
}

impl Iterator for Trace {
    type Item = Result<Access>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
            self.line += 1;
            let record = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim(),
                Err(err) => {
                    return Some(Err(Error::MalformedAccess {
                        line: self.line,
                        reason: format!("not valid UTF-8: {err}"),
                    }))
                }
            };
            if record.is_empty() {
                continue;
            }
            if record == END_OF_TRACE {
                self.done = true;
                break;
            }
            return Some(Access::parse(record, self.line));
        }
        None
    }
}
