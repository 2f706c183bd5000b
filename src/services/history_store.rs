//! 历史记录服务
//!
//! 每条历史记录一个 JSON 文件，文件名为 `{unix 时间戳}_analysis.json`

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AssessmentReport, HistoryEntry, StoredHistoryEntry};

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 保存一次评估结果
    ///
    /// # 返回
    /// 写入的文件路径
    pub async fn save(&self, report: &AssessmentReport) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| AppError::Persistence {
                path: self.dir.clone(),
                source,
            })?;

        let entry = HistoryEntry::from_report(report);
        let json = serde_json::to_vec_pretty(&entry)?;

        // 同一秒内保存多次时顺延时间戳；create_new 保证不会覆盖已有文件
        let mut timestamp = Local::now().timestamp();
        let (path, mut file) = loop {
            let path = self.entry_path(timestamp);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => timestamp += 1,
                Err(source) => return Err(AppError::Persistence { path, source }),
            }
        };

        let written = async {
            file.write_all(&json).await?;
            file.flush().await
        }
        .await;
        written.map_err(|source| AppError::Persistence {
            path: path.clone(),
            source,
        })?;

        info!("✓ 已保存到历史记录: {}", path.display());
        Ok(path)
    }

    /// 读取全部历史记录，最新的在前
    ///
    /// 无法解析的文件会被跳过并记录警告
    pub async fn list(&self) -> AppResult<Vec<StoredHistoryEntry>> {
        let mut entries = Vec::new();
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Ok(entries);
        }

        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| AppError::Persistence {
                path: self.dir.clone(),
                source,
            })?;

        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!("读取历史记录目录中断 {}: {}", self.dir.display(), e);
                    break;
                }
            };
            let path = item.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match load_entry(&path).await {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("跳过无法读取的历史记录 {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }

    fn entry_path(&self, timestamp: i64) -> PathBuf {
        self.dir.join(format!("{}_analysis.json", timestamp))
    }
}

async fn load_entry(path: &Path) -> anyhow::Result<StoredHistoryEntry> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("文件名无效"))?
        .to_string();

    let timestamp: i64 = id
        .split('_')
        .next()
        .and_then(|ts| ts.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("文件名中没有时间戳: {}", id))?;
    let saved_at = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("时间戳无效: {}", timestamp))?;

    let bytes = tokio::fs::read(path).await?;
    let entry: HistoryEntry = serde_json::from_slice(&bytes)?;

    Ok(StoredHistoryEntry { id, saved_at, entry })
}
