//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,storyloom_worker=info,storyloom_pipeline=info,\
storyloom_notion=info,storyloom_core=info,storyloom_cloud=info,storyloom_comfyui=info,\
storyloom_llm=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON lines; anything else is plain text.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Plain,
        }
    }
}

/// Install the global subscriber. Format comes from `LOG_FORMAT`, level
/// filtering from `RUST_LOG`.
pub fn init_tracing() {
    let format = LogFormat::from_setting(std::env::var("LOG_FORMAT").ok().as_deref());

    let (plain, json) = match format {
        LogFormat::Plain => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(plain)
        .with(json)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_case_insensitive() {
        assert_eq!(LogFormat::from_setting(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_setting(Some(" json ")), LogFormat::Json);
    }

    #[test]
    fn anything_else_is_plain() {
        assert_eq!(LogFormat::from_setting(None), LogFormat::Plain);
        assert_eq!(LogFormat::from_setting(Some("pretty")), LogFormat::Plain);
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    /// Writer that appends formatted events to a shared buffer.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn default_filter_keeps_library_warnings() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_FILTER))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        tracing::subscriber::with_default(subscriber, || {
            storyloom_core::checkpoint::CheckpointStore::new(&path).load();
            tracing::debug!(target: "storyloom_core::checkpoint", "Checkpoint saved");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Checkpoint corrupt"), "output: {output:?}");
        assert!(!output.contains("Checkpoint saved"));
    }
}
