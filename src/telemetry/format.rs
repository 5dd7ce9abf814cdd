use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

/// Writes the event's own fields and nothing else: no timestamp, level,
/// target or span context. A `display` call therefore lands in the log as
/// the bare rendered record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormat;

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::{info, info_span, warn};
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Sink {
        type Writer = Sink;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn span_context_and_level_are_left_out() {
        let sink = Sink::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(false)
            .event_format(RecordFormat)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!("receive", http.method = "POST");
            let _entered = span.enter();
            info!("{}", r#"{"data": 1, "type": t, "extensions": {}}"#);
            warn!(http.status_code = 400, "rejected event: boom");
        });

        let contents = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "{contents}");
        assert_eq!(lines[0], r#"{"data": 1, "type": t, "extensions": {}}"#);
        assert!(lines[1].starts_with("rejected event: boom"), "{contents}");
        assert!(lines[1].contains("http.status_code=400"), "{contents}");
        assert!(!contents.contains("receive"), "{contents}");
    }
}
