use std::fs::File;
use std::sync::Mutex;

use anyhow::Context;
use colored::*;
use gkprobe_common::config::TraceConfig;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Symbol and level marker, timestamp, target and source location.
pub struct ProbeFormatter;

impl<S, N> FormatEvent<S, N> for ProbeFormatter
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
        SystemTime.format_time(&mut writer)?;
        write!(writer, " {}", meta.target().dimmed())?;
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            write!(writer, " {}", format!("{file}:{line}").dimmed())?;
        }
        write!(writer, " ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Installs the subscriber when tracing was asked for, on the command line
/// or through `RUST_LOG`. Stdout is left to the verdict line.
pub fn init_logging(config: &TraceConfig) -> anyhow::Result<()> {
    let from_env: Option<EnvFilter> = EnvFilter::try_from_default_env().ok();
    if !config.is_enabled() && from_env.is_none() {
        return Ok(());
    }
    let filter: EnvFilter = from_env.unwrap_or_else(|| EnvFilter::new(config.level_directive()));

    match &config.output {
        Some(path) => {
            let file: File = File::create(path)
                .with_context(|| format!("can not open trace output {}", path.display()))?;
            colored::control::set_override(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .event_format(ProbeFormatter)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .event_format(ProbeFormatter)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }
    Ok(())
}
