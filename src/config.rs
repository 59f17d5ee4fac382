use crate::duration::Duration;

/// Sink-wide configuration, read the way the rest of this codebase reads
/// configuration: environment variables, with an optional `.env` file
/// loaded through `dotenvy`, collected into one typed struct rather than
/// passed around as loose strings.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub manifest_name: String,
    /// When true, manifests are rewritten after every write. When false,
    /// they are only written once, at end_of_stream.
    pub windowed: bool,
    pub target_window_duration: Option<Duration>,
    pub target_fragment_duration: Duration,
    /// Whether evicted segments are retained so `from_beginning` can
    /// replay the full recording later.
    pub persisted: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            manifest_name: "index".to_string(),
            windowed: true,
            target_window_duration: None,
            target_fragment_duration: Duration::ZERO,
            persisted: false,
        }
    }
}

impl SinkConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let manifest_name =
            std::env::var("HLS_MANIFEST_NAME").unwrap_or_else(|_| "index".to_string());

        let windowed = std::env::var("HLS_WINDOWED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let target_window_duration = std::env::var("HLS_TARGET_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(Duration::from_secs_f64);

        let target_fragment_duration = std::env::var("HLS_TARGET_FRAGMENT_SECS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::ZERO);

        let persisted = std::env::var("HLS_PERSISTED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        SinkConfig {
            manifest_name,
            windowed,
            target_window_duration,
            target_fragment_duration,
            persisted,
        }
    }
}
