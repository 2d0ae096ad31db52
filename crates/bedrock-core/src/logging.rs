//! Logging integration for the bedrock engine.
//!
//! Provides a helper for installing a [`tracing`]-based subscriber and for
//! creating per-migration spans so every statement executed during a
//! migration run carries the migration ID.

/// Sets up the global tracing subscriber.
///
/// `level` is an env-filter directive string (e.g. "debug", "info",
/// "bedrock_migrations=debug"). When `json` is set a structured JSON format
/// is used, otherwise a human-readable pretty format. Installing twice is a
/// no-op.
pub fn setup_logging(level: &str, json: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for a migration application.
///
/// Enter this span while executing a migration so all log entries emitted
/// by the operations include the migration ID.
///
/// # Examples
///
/// ```
/// use bedrock_core::logging::migration_span;
///
/// let span = migration_span("20240115093000_blog");
/// let _guard = span.enter();
/// tracing::info!("applying");
/// ```
pub fn migration_span(migration_id: &str) -> tracing::Span {
    tracing::info_span!("migration", id = migration_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_is_idempotent() {
        setup_logging("info", false);
        setup_logging("debug", true);
    }

    #[test]
    fn test_migration_span_has_name() {
        setup_logging("info", false);
        let span = migration_span("20240101000000_app");
        assert_eq!(span.metadata().map(|m| m.name()), Some("migration"));
    }
}
