use std::io::IsTerminal;

use colored::*;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

/// Prefixes every event with a coloured level marker, e.g. `[*] 10.0.0.1: ...`.
///
/// Debug and trace events also name the component that emitted them
/// (`[?] udp: ...`), since at those levels resolver and scheduler chatter
/// interleave.
pub struct RdnsFormatter;

impl<S, N> FormatEvent<S, N> for RdnsFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
            Level::TRACE => ("[ ]", |s| s.dimmed()),
            Level::DEBUG => ("[?]", |s| s.blue()),
            Level::INFO => ("[+]", |s| s.green().bold()),
            Level::WARN => ("[*]", |s| s.yellow().bold()),
            Level::ERROR => ("[-]", |s| s.red().bold()),
        };

        write!(writer, "{} ", color_func(symbol.into()))?;

        if *meta.level() >= Level::DEBUG {
            write!(writer, "{} ", format!("{}:", component(meta.target())).dimmed())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Last path segment of a tracing target, `rdns_core::resolver::udp` -> `udp`.
fn component(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// Sends diagnostics to stderr so stdout only carries results.
///
/// `RUST_LOG` takes precedence over `default_level`. Colours are dropped when
/// stderr is redirected, so captured logs stay plain text.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr = std::io::stderr();
    if !stderr.is_terminal() {
        colored::control::set_override(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(stderr.is_terminal())
        .event_format(RdnsFormatter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_is_last_module() {
        assert_eq!(component("rdns_core::resolver::udp"), "udp");
        assert_eq!(component("rdns_core::scheduler"), "scheduler");
        assert_eq!(component("async_rdns"), "async_rdns");
    }
}
