use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub data_dir: PathBuf,
    /// File sink output, under the data dir.
    pub exports_dir: PathBuf,
    pub db_path: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(Path::new(&cfg.logs_dir))?;
    let data_dir = ensure_dir(Path::new(&cfg.data_dir))?;
    let exports_dir = ensure_dir(&data_dir.join("exports"))?;
    let db_path = data_dir.join(&cfg.db_filename);

    let probe_file = data_dir.join(".write-test");
    fs::write(&probe_file, b"ok")
        .with_context(|| format!("data directory {} is not writable", data_dir.display()))?;
    fs::remove_file(&probe_file)?;

    Ok(ResolvedPaths {
        logs_dir,
        data_dir,
        exports_dir,
        db_path,
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()))
}
