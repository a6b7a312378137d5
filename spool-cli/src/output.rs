use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

/// Give up after this many `name (n).ext` candidates.
const MAX_SUFFIX: u32 = 9999;

/// `name.ext` for `n == 0`, `name (n).ext` otherwise.
fn candidate_name(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{filename} ({n})"),
    }
}

/// Writes `bytes` into `dir` under `filename`, picking `name (1).ext`,
/// `name (2).ext`, ... when the name is taken. Existing files are never
/// overwritten.
pub async fn save_artifact(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    for n in 0..=MAX_SUFFIX {
        let path = dir.join(candidate_name(filename, n));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "File exists, trying next name");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        write_or_remove(&path, file, bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved media file");
        return Ok(path);
    }

    Err(AppError::NameExhausted(filename.to_string()))
}

/// Writes `bytes` to the freshly created `path`; on failure the partial file
/// is removed before the error is returned.
async fn write_or_remove<W>(path: &Path, mut writer: W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    drop(writer);

    if let Err(e) = written {
        warn!(path = %path.display(), error = %e, "Write failed, removing partial file");
        if let Err(remove_err) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %remove_err, "Could not remove partial file");
        }
        return Err(e.into());
    }
    Ok(())
}
