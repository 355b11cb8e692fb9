use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const ROTATION_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// Size-capped log file, trimmed to its newest lines when opened past the cap
#[derive(Debug, Clone)]
struct LogFile {
    path: PathBuf,
    max_bytes: u64,
    keep_bytes: u64,
}

impl LogFile {
    /// 5MB cap, keeping the last 1MB on rotation
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            max_bytes: 5 * 1024 * 1024,
            keep_bytes: 1024 * 1024,
        }
    }

    /// Size of the file, `None` when it does not exist yet
    fn len(&self) -> io::Result<Option<u64>> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Rewrite the file with only its trailing whole lines. Returns whether
    /// anything was dropped.
    fn rotate(&self) -> io::Result<bool> {
        let Some(len) = self.len()? else {
            return Ok(false);
        };
        if len <= self.max_bytes {
            return Ok(false);
        }

        let mut tail = Vec::new();
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(len - self.keep_bytes.min(len)))?;
        file.read_to_end(&mut tail)?;

        let first_line = tail.iter().position(|&b| b == b'\n').map_or(0, |i| i + 1);
        let mut file = File::create(&self.path)?;
        file.write_all(ROTATION_MARKER)?;
        file.write_all(&tail[first_line..])?;
        Ok(true)
    }

    /// Rotate if needed, then open for appending
    fn open(&self) -> io::Result<SharedFile> {
        if let Err(e) = self.rotate() {
            eprintln!("Warning: Failed to rotate log file: {e}");
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(SharedFile(Arc::new(Mutex::new(file))))
    }
}

/// Append handle shared by every event writer
#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("sweepstat={level},sweepstat_core=warn")
}

/// Initialize logging.
///
/// Diagnostics go to stderr so they never mix with report output on stdout.
/// With `log_file` set they are appended to that file instead, trimmed once
/// it grows past 5MB. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> color_eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        Some(log_path) => {
            let writer = LogFile::new(log_path).open()?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(false),
                )
                .try_init()?;
            tracing::info!(log_path = %log_path.display(), "sweepstat logging initialized");
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init()?;
        }
    }
    Ok(())
}
