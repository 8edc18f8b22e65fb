use std::path::Path;

use anyhow::bail;
use tokio::fs::{create_dir_all, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Writes the fetched QR image to `path`, creating parent directories.
/// An existing file is replaced: every generation supersedes the last.
pub async fn save_visual<P: AsRef<Path>>(path: P, bytes: &[u8]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if bytes.is_empty() {
        bail!("Refusing to write an empty image to {}", path.display())
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).await?;
        }
    }
    let mut writer = BufWriter::new(File::create(path).await?);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}
