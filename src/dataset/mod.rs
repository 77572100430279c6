//! Data loader for raw EEG recordings
//!
//! Accepts either a zip archive or an already-extracted directory of
//! recordings and yields a lazy, finite, restartable sequence of
//! [`Sample`]s. Zip input is extracted next to the archive; the extracted
//! files are left on disk and the caller owns their removal.
//!
//! Recording file format (one `.csv` per recording):
//!
//! ```text
//! label,<class index>,rate,<sample rate hz>
//! <channel 0: comma-separated f32 samples>
//! <channel 1: ...>
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Error, Result};

/// One raw EEG recording. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Recording identifier (file stem)
    pub id: String,
    /// Class label
    pub label: u32,
    /// Sampling rate in Hz
    pub sample_rate: u32,
    /// Raw signal, one inner vector per channel
    pub channels: Vec<Vec<f32>>,
}

impl Sample {
    /// Number of channels in this recording.
    #[must_use]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }
}

/// Handle over an extracted set of recordings.
///
/// Holds only the recording paths; file contents are read lazily when the
/// sample iterator visits them, and iterating again restarts the sequence.
#[derive(Debug)]
pub struct EegArchive {
    recordings: Vec<PathBuf>,
}

impl EegArchive {
    /// Open a zip archive or directory of recordings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] when the path is missing, the archive is
    /// corrupt, or it contains zero recordings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Load(format!(
                "input path does not exist: {}",
                path.display()
            )));
        }

        let root = if path.is_dir() {
            path.to_path_buf()
        } else {
            extract_zip(path)?
        };

        let mut recordings = Vec::new();
        collect_recordings(&root, &mut recordings)?;
        // Deterministic order regardless of directory iteration order
        recordings.sort();

        if recordings.is_empty() {
            return Err(Error::Load(format!(
                "no recordings found under {}",
                root.display()
            )));
        }

        info!(
            recordings = recordings.len(),
            root = %root.display(),
            "opened EEG archive"
        );
        Ok(Self { recordings })
    }

    /// Number of recordings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Whether the archive holds no recordings (never true after `open`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// Iterate over samples, reading each recording file on demand.
    #[must_use]
    pub fn samples(&self) -> SampleIter<'_> {
        SampleIter {
            recordings: &self.recordings,
            next_idx: 0,
        }
    }
}

/// Lazy iterator over the recordings of an [`EegArchive`].
pub struct SampleIter<'a> {
    recordings: &'a [PathBuf],
    next_idx: usize,
}

impl Iterator for SampleIter<'_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.recordings.get(self.next_idx)?;
        self.next_idx += 1;
        Some(parse_recording(path))
    }
}

impl ExactSizeIterator for SampleIter<'_> {
    fn len(&self) -> usize {
        self.recordings.len() - self.next_idx
    }
}

/// Extract a zip archive into a sibling directory named after its stem.
fn extract_zip(path: &Path) -> Result<PathBuf> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Load(format!("corrupt archive {}: {e}", path.display())))?;
    if archive.len() == 0 {
        return Err(Error::Load(format!(
            "archive {} contains no entries",
            path.display()
        )));
    }

    let stem = path
        .file_stem()
        .ok_or_else(|| Error::Load(format!("cannot derive work dir from {}", path.display())))?;
    let dest = path.with_file_name(stem);
    std::fs::create_dir_all(&dest)?;

    archive
        .extract(&dest)
        .map_err(|e| Error::Load(format!("failed to extract {}: {e}", path.display())))?;

    debug!(dest = %dest.display(), entries = archive.len(), "extracted archive");
    Ok(dest)
}

/// Recursively collect `.csv` recording files under `dir`.
fn collect_recordings(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_recordings(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "csv") {
            out.push(path);
        }
    }
    Ok(())
}

/// Parse one recording file into a [`Sample`].
fn parse_recording(path: &Path) -> Result<Sample> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Load(format!("cannot read recording {}: {e}", path.display())))?;

    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| Error::Load(format!("empty recording {}", path.display())))?;
    let (label, sample_rate) = parse_header(header)
        .ok_or_else(|| Error::Load(format!("bad header in {}: '{header}'", path.display())))?;

    let mut channels = Vec::new();
    for line in lines {
        let channel: std::result::Result<Vec<f32>, _> = line
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect();
        let channel = channel
            .map_err(|e| Error::Load(format!("bad sample value in {}: {e}", path.display())))?;
        channels.push(channel);
    }

    if channels.is_empty() {
        return Err(Error::Load(format!(
            "recording {} has no channel data",
            path.display()
        )));
    }

    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Sample {
        id,
        label,
        sample_rate,
        channels,
    })
}

/// Parse `label,<u32>[,rate,<u32>]`; rate defaults to 256 Hz.
fn parse_header(header: &str) -> Option<(u32, u32)> {
    let fields: Vec<&str> = header.split(',').map(str::trim).collect();
    match fields.as_slice() {
        ["label", label] => Some((label.parse().ok()?, 256)),
        ["label", label, "rate", rate] => Some((label.parse().ok()?, rate.parse().ok()?)),
        _ => None,
    }
}
