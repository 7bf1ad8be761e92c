use crate::core::{FunctionAdmin, ObjectStore};
use crate::domain::model::{CodeSource, FunctionSummary};
use crate::utils::error::{OpsError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "__pycache__", "*.pyc", "node_modules", ".DS_Store"];

/// Zipped function code larger than this has to go through S3.
pub const DIRECT_UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub via_bucket: bool,
    pub publish_wait: bool,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            via_bucket: false,
            publish_wait: true,
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }
}

/// Bucket the archive is staged in when it cannot be uploaded inline.
pub struct ArtifactTarget<'a, O: ObjectStore> {
    pub store: &'a O,
    pub bucket: &'a str,
    pub prefix: &'a str,
}

/// `*.pyc` 為副檔名比對，其餘為檔名完全比對
pub fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    })
}

fn collect_files(root: &Path, dir: &Path, patterns: &[String], out: &mut Vec<String>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_excluded(&name, patterns) {
            tracing::debug!("Excluding {}", entry.path().display());
            continue;
        }

        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, patterns, out)?;
        } else {
            let relative = path.strip_prefix(root).map_err(|e| OpsError::ProcessingError {
                message: format!("{} is outside {}: {}", path.display(), root.display(), e),
            })?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(key);
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)?.permissions().mode();
    Ok(if mode & 0o111 != 0 { 0o755 } else { 0o644 })
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0o644)
}

/// Zips `source_dir` in sorted order with `/`-separated relative paths.
pub fn package_directory(source_dir: &Path, extra_excludes: &[String]) -> Result<Package> {
    if !source_dir.is_dir() {
        return Err(OpsError::InvalidConfigValueError {
            field: "source_dir".to_string(),
            value: source_dir.display().to_string(),
            reason: "Not a directory".to_string(),
        });
    }

    let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
    patterns.extend(extra_excludes.iter().cloned());

    let mut files = Vec::new();
    collect_files(source_dir, source_dir, &patterns, &mut files)?;
    if files.is_empty() {
        return Err(OpsError::DeployError {
            message: format!("nothing to package in {}", source_dir.display()),
        });
    }

    // 建立 ZIP 檔
    let bytes = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for file in &files {
            let path = source_dir.join(file);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(file_mode(&path)?);
            zip.start_file(file.as_str(), options)?;
            zip.write_all(&fs::read(&path)?)?;
        }
        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    tracing::info!(
        "📦 Packaged {} files from {} ({} bytes)",
        files.len(),
        source_dir.display(),
        bytes.len()
    );
    Ok(Package { bytes, files })
}

/// Persists the archive and returns where it went.
pub async fn write_package<O: ObjectStore>(store: &O, name: &str, package: &Package) -> Result<String> {
    store.write_object(name, &package.bytes).await?;
    Ok(store.location(name))
}

fn artifact_key(prefix: &str, function_name: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}-{}.zip", function_name, stamp)
    } else {
        format!("{}/{}-{}.zip", prefix, function_name, stamp)
    }
}

/// Uploads new code and waits for the function to settle.
pub async fn deploy<F: FunctionAdmin, O: ObjectStore>(
    functions: &F,
    artifacts: Option<ArtifactTarget<'_, O>>,
    function_name: &str,
    package: &Package,
    options: &DeployOptions,
) -> Result<FunctionSummary> {
    let too_large = package.bytes.len() > DIRECT_UPLOAD_LIMIT;
    let code = if options.via_bucket || too_large {
        let target = artifacts.ok_or_else(|| OpsError::DeployError {
            message: format!(
                "archive is {} bytes; an artifacts bucket is required for uploads over {} bytes",
                package.bytes.len(),
                DIRECT_UPLOAD_LIMIT
            ),
        })?;
        let key = artifact_key(target.prefix, function_name);
        target.store.write_object(&key, &package.bytes).await?;
        tracing::info!("☁️ Staged archive at {}", target.store.location(&key));
        CodeSource::Bucket {
            bucket: target.bucket.to_string(),
            key,
        }
    } else {
        CodeSource::ZipBytes(package.bytes.clone())
    };

    let updated = functions.update_code(function_name, code).await?;
    tracing::info!(
        "🚀 Updated code of {} (sha256 {})",
        function_name,
        updated.code_sha256.as_deref().unwrap_or("?")
    );

    if !options.publish_wait {
        return Ok(updated);
    }
    wait_for_update(functions, function_name, options).await
}

/// Polls until the last update leaves `InProgress`. `Failed` is an error.
pub async fn wait_for_update<F: FunctionAdmin>(
    functions: &F,
    function_name: &str,
    options: &DeployOptions,
) -> Result<FunctionSummary> {
    for attempt in 1..=options.max_polls {
        let summary = functions.get_function(function_name).await?;
        match summary.last_update_status.as_deref() {
            Some("InProgress") => {
                tracing::debug!("⏳ {} update in progress (poll {})", function_name, attempt);
                tokio::time::sleep(options.poll_interval).await;
            }
            Some("Failed") => {
                return Err(OpsError::DeployError {
                    message: format!("update of {} failed", function_name),
                });
            }
            _ => return Ok(summary),
        }
    }

    Err(OpsError::DeployError {
        message: format!(
            "{} still updating after {} polls",
            function_name, options.max_polls
        ),
    })
}
