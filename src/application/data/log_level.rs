use clap::ValueEnum;

/// Verbosity of the diagnostics written to stderr. Rendered tree lines go to
/// stdout and are never affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogLevel {
    /// Pipeline chatter: polls, merges, queue traffic
    Debug,
    /// Discovered repositories and lifecycle events
    Info,
    /// Skipped polls and updates
    #[default]
    #[value(alias = "warning")]
    Warn,
    Error,
    /// No diagnostics at all
    #[value(alias = "quiet")]
    Silent,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<tracing::Level> {
        Some(match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Silent => return None,
        })
    }
}
