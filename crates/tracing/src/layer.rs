use std::fmt::{self, Display};

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Directive, registry::LookupSpan, EnvFilter, Layer};

/// The format log lines are rendered in.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// `key=value` pairs, one event per line.
    LogFmt,
    /// Human-readable, optionally colored.
    Terminal,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::LogFmt => write!(f, "log-fmt"),
            LogFormat::Terminal => write!(f, "terminal"),
        }
    }
}

/// Everything needed to build one `tracing_subscriber` layer: its format,
/// the default directive when no filter string is given, an explicit
/// filter override, and whether to emit ANSI color codes.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    directive: String,
    filter: String,
    color: Option<String>,
}

impl LayerInfo {
    pub fn new(format: LogFormat, directive: String, filter: String, color: Option<String>) -> Self {
        Self {
            format,
            directive,
            filter,
            color,
        }
    }

    /// Builds the `EnvFilter` for this layer: the explicit filter string if
    /// non-empty, otherwise the default directive.
    pub fn filter(&self) -> EnvFilter {
        let directive: Directive = self.directive.parse().unwrap_or(Directive::from(LevelFilter::INFO));

        if self.filter.is_empty() {
            EnvFilter::default().add_directive(directive)
        } else {
            EnvFilter::builder()
                .with_default_directive(directive)
                .parse_lossy(&self.filter)
        }
    }

    /// Builds the formatting layer itself, filtered by [`Self::filter`].
    pub fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber,
        for<'a> S: LookupSpan<'a>,
    {
        let ansi = self.color.is_some();

        match self.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_filter(self.filter())
                .boxed(),
            LogFormat::LogFmt => tracing_logfmt::layer().with_filter(self.filter()).boxed(),
            LogFormat::Terminal => tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_filter(self.filter())
                .boxed(),
        }
    }
}
