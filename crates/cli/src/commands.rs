//! Subcommand implementations.

use anyhow::{Context, Result};
use coffer_core::config::UploadConfig;
use coffer_core::{Checksum, ChecksumAlgorithm, FILE_DOC_TYPE};
use coffer_metadata::DocumentStore;
use coffer_storage::ByteStore;
use coffer_vfs::{UploadRequest, Uploader, body_from_reader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

pub struct UploadArgs {
    pub file: PathBuf,
    pub folder: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub executable: bool,
    pub checksum: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Digest of a local file, read in fixed-size blocks.
pub async fn file_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<Checksum> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = algorithm.hasher();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

pub async fn upload(
    storage: Arc<dyn ByteStore>,
    metadata: Arc<dyn DocumentStore>,
    config: UploadConfig,
    args: UploadArgs,
) -> Result<()> {
    let algorithm = config.checksum_algorithm;
    let name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a name from {}", args.file.display()))?,
    };
    let checksum = match args.checksum {
        Some(hex) => Checksum::from_hex(&hex).context("invalid --checksum")?,
        None => file_checksum(&args.file, algorithm).await?,
    };
    let size = tokio::fs::metadata(&args.file)
        .await
        .with_context(|| format!("failed to stat {}", args.file.display()))?
        .len();

    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let mut request = UploadRequest::file(
        args.folder,
        name,
        checksum.as_bytes(),
        body_from_reader(file),
    )
    .with_tags(args.tags)
    .with_executable(args.executable)
    .with_size(i64::try_from(size).unwrap_or(i64::MAX));
    if let Some(secs) = args.timeout_secs {
        request = request.with_deadline(tokio::time::Instant::now() + Duration::from_secs(secs));
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling upload");
            on_interrupt.cancel();
        }
    });

    let uploader = Uploader::new(storage, metadata, config);
    let doc = uploader
        .upload_with_cancel(request, &cancel)
        .await
        .context("upload failed")?;

    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

pub async fn stat(metadata: &dyn DocumentStore, id: &str) -> Result<()> {
    let stored = metadata
        .get_doc(FILE_DOC_TYPE, id)
        .await
        .context("failed to read record")?
        .with_context(|| format!("no file record with id {id}"))?;
    println!("{}", serde_json::to_string_pretty(&stored.body)?);
    Ok(())
}

pub async fn check(storage: &dyn ByteStore, metadata: &dyn DocumentStore) -> Result<()> {
    storage
        .health_check()
        .await
        .with_context(|| format!("byte store ({}) unhealthy", storage.backend_name()))?;
    println!("byte store ({}): ok", storage.backend_name());

    metadata
        .health_check()
        .await
        .context("document store unhealthy")?;
    println!("document store: ok");
    Ok(())
}
