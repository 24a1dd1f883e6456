use std::io::{self, Write};

use crate::resolver::{ErrorKind, Outcome, QueryResult};

/// Writes one `<address>\t<name>` line per returned name, or
/// `<address>\t<TOKEN>` when the lookup failed. An empty name list counts
/// as `NODATA`, so every query yields at least one line.
pub struct ResultReporter<W: Write> {
    out: W,
}

impl<W: Write> ResultReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn report(&mut self, result: &QueryResult) -> io::Result<()> {
        match &result.outcome {
            Outcome::Names(names) if names.is_empty() => {
                writeln!(self.out, "{}\t{}", result.addr, ErrorKind::NoData)?
            }
            Outcome::Names(names) => {
                for name in names {
                    writeln!(self.out, "{}\t{}", result.addr, name)?;
                }
            }
            Outcome::Error(kind) => writeln!(self.out, "{}\t{}", result.addr, kind)?,
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ResultReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}
