//! Diagnostic sinks.
//!
//! The crate logs through the `log` facade; `init` bridges those records into
//! a `tracing-subscriber` formatter. Warnings and errors go to stderr, access
//! records and everything else to stdout.

use crate::error::{ServerError, ServerResult};
use std::io;
use tracing::level_filters::LevelFilter;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Log target used for the one-line-per-request access log
pub const ACCESS_TARGET: &str = "webby::access";

/// Build a formatter routing `WARN` and `ERROR` to `errors`, the rest to `access`
pub fn subscriber<E, A>(
    level: LevelFilter,
    errors: E,
    access: A,
) -> impl Subscriber + Send + Sync + 'static
where
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    A: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(errors.with_max_level(Level::WARN).or_else(access))
        .finish()
}

/// Install the global subscriber and the `log` bridge
pub fn init(level: LevelFilter) -> ServerResult<()> {
    subscriber(level, io::stderr, io::stdout)
        .try_init()
        .map_err(|e| ServerError::Config(format!("logger already installed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Sink {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        fn writer(&self) -> impl Fn() -> Sink + Send + Sync + 'static {
            let sink = self.clone();
            move || sink.clone()
        }
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_records_are_split_by_severity() {
        let errors = Sink::default();
        let access = Sink::default();
        let subscriber = subscriber(LevelFilter::INFO, errors.writer(), access.writer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: ACCESS_TARGET, "127.0.0.1 \"GET /\" 200");
            tracing::warn!("connection from 127.0.0.1 failed");
            tracing::error!("server stopped");
            tracing::debug!("filtered out");
        });

        let access = access.contents();
        assert!(access.contains("webby::access"));
        assert!(access.contains("127.0.0.1 \"GET /\" 200"));
        assert!(!access.contains("failed"));
        assert!(!access.contains("filtered out"));

        let errors = errors.contents();
        assert!(errors.contains("WARN"));
        assert!(errors.contains("server stopped"));
        assert!(!errors.contains("GET /"));
    }

    #[test]
    fn test_level_filter_off_silences_everything() {
        let errors = Sink::default();
        let access = Sink::default();
        let subscriber = subscriber(LevelFilter::OFF, errors.writer(), access.writer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("nobody hears this");
        });

        assert!(errors.contents().is_empty());
        assert!(access.contents().is_empty());
    }
}
