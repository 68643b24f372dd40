//! Log subscriber setup. Events go to stderr so command output stays clean.

use shared::config::{LogFormat, LoggingConfig};
use std::io::{self, IsTerminal};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter},
};

/// Install the global subscriber.
pub fn initialize_tracing(config: &LoggingConfig) {
    let ansi = io::stderr().is_terminal();
    if tracing::subscriber::set_global_default(build_subscriber(config, io::stderr, ansi)).is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn build_subscriber<W>(
    config: &LoggingConfig,
    writer: W,
    ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let fmt_builder = fmt::fmt()
        .with_env_filter(build_env_filter(config))
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer);

    if matches!(config.format, LogFormat::Json) {
        Box::new(fmt_builder.json().with_ansi(false).finish())
    } else {
        Box::new(fmt_builder.with_ansi(ansi).finish())
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let default_level = config
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };
    use tracing::info;

    #[derive(Clone)]
    struct BufferMakeWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    struct BufferWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl<'a> MakeWriter<'a> for BufferMakeWriter {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            BufferWriter {
                buffer: Arc::clone(&self.buffer),
            }
        }
    }

    impl Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(config: &LoggingConfig, emit: impl FnOnce()) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = BufferMakeWriter {
            buffer: buffer.clone(),
        };
        let dispatch = tracing::dispatcher::Dispatch::new(build_subscriber(config, writer, false));
        tracing::dispatcher::with_default(&dispatch, emit);
        let contents = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        contents
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn json_format_produces_json_lines() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
        };

        let line = capture(&config, || info!(auth_type = "google", "session credential active"));

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["fields"]["message"], "session credential active");
        assert_eq!(value["fields"]["auth_type"], "google");
    }

    #[test]
    fn text_format_emits_plain_lines() {
        let config = LoggingConfig::default();

        let line = capture(&config, || info!("signed out"));

        assert!(serde_json::from_str::<Value>(&line).is_err());
        assert!(line.contains("signed out"));
    }
}
