use std::path::PathBuf;

use rolling_file::{RollingConditionBasic, RollingFileAppender};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::LayerInfo;

/// Keeps a non-blocking file writer's background thread alive for the
/// lifetime of the process; dropping it flushes and joins the worker.
#[derive(Debug)]
pub struct FileWorkerGuard(#[allow(dead_code)] WorkerGuard);

impl FileWorkerGuard {
    fn new(guard: WorkerGuard) -> Self {
        Self(guard)
    }
}

/// Initializes the global `tracing` subscriber from accumulated layers.
/// Implemented by [`IndexerTracer`]; a trait mainly so call sites don't need
/// to know the builder's concrete type.
pub trait Tracer {
    /// Consumes the builder and installs the subscriber, returning the file
    /// worker guard if a file layer was configured.
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>>;
}

/// Builds the process's global tracing subscriber from a stdout layer, an
/// optional rolling file layer, and an optional journald layer.
#[derive(Debug, Default)]
pub struct IndexerTracer {
    stdout: Option<LayerInfo>,
    file: Option<(LayerInfo, PathBuf, String)>,
    journald: bool,
}

impl IndexerTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer writing to stdout.
    pub fn with_stdout(mut self, layer: LayerInfo) -> Self {
        self.stdout = Some(layer);
        self
    }

    /// Adds a layer writing to a daily-rotating file `directory/file_prefix.YYYY-MM-DD.log`.
    pub fn with_file(mut self, layer: LayerInfo, directory: PathBuf, file_prefix: String) -> Self {
        self.file = Some((layer, directory, file_prefix));
        self
    }

    /// Adds a layer forwarding to the systemd journal, when available.
    pub fn with_journald(mut self, enabled: bool) -> Self {
        self.journald = enabled;
        self
    }
}

impl Tracer for IndexerTracer {
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>> {
        let registry = tracing_subscriber::registry();

        let stdout_layer = self.stdout.as_ref().map(LayerInfo::layer);

        let (file_layer, guard) = match self.file {
            Some((layer_info, directory, file_prefix)) => {
                std::fs::create_dir_all(&directory)?;
                let appender = RollingFileAppender::new(
                    directory.join(&file_prefix),
                    RollingConditionBasic::new().daily(),
                    9,
                )?;
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let filter = layer_info.filter();
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(filter)
                    .boxed();
                (Some(layer), Some(FileWorkerGuard::new(guard)))
            }
            None => (None, None),
        };

        let journald_layer = if self.journald {
            Some(tracing_journald::layer()?)
        } else {
            None
        };

        registry.with(stdout_layer).with(file_layer).with(journald_layer).try_init()?;

        Ok(guard)
    }
}
