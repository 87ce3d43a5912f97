//! 棋谱存储
//!
//! 将结束的对局以 JSON 文件形式保存到本地目录

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use protocol::{GameOutcome, GameRecord};

/// 存储管理器
pub struct StorageManager {
    records_dir: PathBuf,
}

impl StorageManager {
    /// 在指定目录创建存储管理器，目录不存在时自动创建
    pub fn new(records_dir: impl Into<PathBuf>) -> Result<Self> {
        let records_dir = records_dir.into();

        if !records_dir.exists() {
            fs::create_dir_all(&records_dir)
                .with_context(|| format!("无法创建存储目录: {:?}", records_dir))?;
        }

        Ok(Self { records_dir })
    }

    /// 使用平台默认目录
    pub fn with_default_dir() -> Result<Self> {
        Self::new(default_records_dir()?)
    }

    /// 保存棋谱，返回记录 ID（文件名）
    pub fn save_record(&self, record: &GameRecord) -> Result<String> {
        let filename = generate_filename(
            &Utc::now(),
            &record.metadata.player_one,
            &record.metadata.player_two,
        );
        let filepath = self.records_dir.join(&filename);

        let json_content = record.to_json().context("序列化棋谱失败")?;
        fs::write(&filepath, json_content)
            .with_context(|| format!("写入文件失败: {:?}", filepath))?;

        Ok(filename)
    }

    /// 加载棋谱
    pub fn load_record(&self, record_id: &str) -> Result<GameRecord> {
        let filepath = self.records_dir.join(record_id);

        if !filepath.exists() {
            anyhow::bail!("棋谱文件不存在: {}", record_id);
        }

        let file = fs::File::open(&filepath)
            .with_context(|| format!("读取文件失败: {:?}", filepath))?;
        serde_json::from_reader(BufReader::new(file)).context("解析棋谱文件失败")
    }

    /// 列出所有棋谱，最新的在前
    pub fn list_records(&self) -> Result<Vec<RecordInfo>> {
        let mut records = Vec::new();

        if !self.records_dir.exists() {
            return Ok(records);
        }

        let entries = fs::read_dir(&self.records_dir)
            .with_context(|| format!("读取存储目录失败: {:?}", self.records_dir))?;

        for entry in entries {
            let entry = entry.context("读取目录项失败")?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };

            // 跳过损坏的文件
            let Ok(record) = self.load_record(filename) else {
                tracing::warn!("跳过无法解析的棋谱: {}", filename);
                continue;
            };

            let saved_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());

            records.push(RecordInfo {
                record_id: filename.to_string(),
                player_one: record.metadata.player_one,
                player_two: record.metadata.player_two,
                result: record.metadata.result,
                saved_at,
                move_count: record.moves.len(),
            });
        }

        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then(b.record_id.cmp(&a.record_id)));
        Ok(records)
    }

    /// 删除棋谱
    pub fn delete_record(&self, record_id: &str) -> Result<()> {
        let filepath = self.records_dir.join(record_id);

        if filepath.exists() {
            fs::remove_file(&filepath)
                .with_context(|| format!("删除文件失败: {:?}", filepath))?;
        }

        Ok(())
    }

    /// 获取存储目录路径
    pub fn records_directory(&self) -> &Path {
        &self.records_dir
    }
}

/// 已保存的棋谱信息
#[derive(Debug, Clone)]
pub struct RecordInfo {
    /// 记录 ID（文件名）
    pub record_id: String,
    pub player_one: String,
    pub player_two: String,
    pub result: Option<GameOutcome>,
    /// 保存时间
    pub saved_at: DateTime<Utc>,
    /// 走法数量
    pub move_count: usize,
}

/// 平台默认存储目录
pub fn default_records_dir() -> Result<PathBuf> {
    let app_data_dir = dirs::data_dir().context("无法获取应用数据目录")?;
    Ok(app_data_dir.join("checkers").join("records"))
}

/// 生成文件名
fn generate_filename(timestamp: &DateTime<Utc>, player_one: &str, player_two: &str) -> String {
    let timestamp_str = timestamp.format("%Y%m%d_%H%M%S_%3f").to_string();
    format!(
        "{}_{}vs{}.json",
        timestamp_str,
        sanitize_filename(player_one),
        sanitize_filename(player_two)
    )
}

/// 清理文件名中的特殊字符
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
