//! Index Store - 파일 기반 벡터 인덱스 저장소
//!
//! 인덱스 하나가 파일 하나(`<root>/<name>.index`)에 저장됩니다.
//!
//! 파일 구조 (자기 기술적):
//! ```text
//! {"format":"scholarbot-index","version":1,...,"checksum":"<sha256>"}\n
//! [ {"chunk":{...},"vector":[...]}, ... ]
//! ```
//! 첫 줄은 JSON 헤더, 나머지는 엔트리 배열입니다. `checksum`은 본문 바이트의
//! SHA-256이며, 로드 시 헤더/버전/체크섬/개수/차원 중 하나라도 맞지 않으면
//! `CorruptIndex`로 거부합니다.
//!
//! 쓰기는 같은 디렉토리의 임시 파일에 기록 → fsync → rename 순서라서
//! 읽는 쪽은 이전 인덱스 또는 완성된 새 인덱스만 보게 됩니다.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{RagError, Result};

use super::vector::{DistanceMetric, IndexEntry, VectorIndex, VectorStore};

/// 파일 포맷 식별자
const INDEX_FORMAT: &str = "scholarbot-index";
/// 파일 포맷 버전
const INDEX_VERSION: u32 = 1;
/// 인덱스 파일 확장자
const INDEX_EXTENSION: &str = "index";
/// 인덱스 이름 최대 길이
const MAX_NAME_LEN: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 파일 헤더 (첫 줄)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format: String,
    pub version: u32,
    pub name: String,
    /// 인덱스를 만든 임베딩 모델
    pub embedder: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub entry_count: usize,
    pub built_at: DateTime<Utc>,
    /// 본문 SHA-256 (hex)
    pub checksum: String,
}

// ============================================================================
// FileIndexStore
// ============================================================================

/// 파일 기반 인덱스 저장소
///
/// `build`는 저장소 단위 잠금으로 직렬화됩니다.
#[derive(Clone)]
pub struct FileIndexStore {
    root: PathBuf,
    build_lock: Arc<Mutex<()>>,
}

impl FileIndexStore {
    /// 저장소 열기 (디렉토리가 없으면 생성)
    pub fn open(root: &Path) -> Result<Self> {
        if !root.exists() {
            std::fs::create_dir_all(root)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            build_lock: Arc::new(Mutex::new(())),
        })
    }

    /// 저장소 디렉토리
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 인덱스 파일 경로
    pub fn index_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.{}", name, INDEX_EXTENSION)))
    }

    /// 헤더만 읽기 (status 표시용, 본문 검증 없음)
    pub fn info(&self, name: &str) -> Result<IndexHeader> {
        let path = self.index_path(name)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut line = String::new();
        BufReader::new(file).read_line(&mut line)?;
        parse_header(name, line.trim_end().as_bytes())
    }

    /// 저장된 인덱스 이름 목록 (정렬됨)
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INDEX_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// 인덱스 삭제 (삭제했으면 true)
    pub fn remove(&self, name: &str) -> Result<bool> {
        let path = self.index_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed index '{}'", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 인덱스를 임시 파일에 쓰고 원자적으로 교체
    fn write_index(root: &Path, path: &Path, index: &VectorIndex) -> Result<()> {
        let bytes = encode_index(index)?;

        // 같은 파일시스템에서 rename 해야 원자적
        let mut tmp = tempfile::Builder::new()
            .prefix(".scholarbot-")
            .suffix(".tmp")
            .tempfile_in(root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RagError::Io(e.error))?;

        tracing::debug!("Persisted index to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn read_index(path: &Path, name: &str) -> Result<VectorIndex> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        decode_index(name, &bytes)
    }
}

#[async_trait]
impl VectorStore for FileIndexStore {
    async fn build(
        &self,
        name: &str,
        embedder: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<VectorIndex> {
        let path = self.index_path(name)?;
        let index = VectorIndex::new(name, embedder, entries)?;

        let _guard = self.build_lock.lock().await;

        let root = self.root.clone();
        let index = tokio::task::spawn_blocking(move || {
            Self::write_index(&root, &path, &index).map(|_| index)
        })
        .await
        .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        tracing::info!(
            "Built index '{}' ({} entries, dimension {})",
            index.name(),
            index.len(),
            index.dimension()
        );

        Ok(index)
    }

    async fn load(&self, name: &str) -> Result<VectorIndex> {
        let path = self.index_path(name)?;
        let name = name.to_string();

        let index = tokio::task::spawn_blocking(move || Self::read_index(&path, &name))
            .await
            .map_err(|e| RagError::Io(std::io::Error::other(e)))??;

        tracing::info!("Loaded index '{}' ({} entries)", index.name(), index.len());
        Ok(index)
    }

    async fn exists(&self, name: &str) -> bool {
        self.index_path(name).map(|p| p.is_file()).unwrap_or(false)
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn encode_index(index: &VectorIndex) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(index.entries())?;

    let header = IndexHeader {
        format: INDEX_FORMAT.to_string(),
        version: INDEX_VERSION,
        name: index.name().to_string(),
        embedder: index.embedder().to_string(),
        dimension: index.dimension(),
        metric: index.metric(),
        entry_count: index.len(),
        built_at: index.built_at(),
        checksum: sha256_hex(&body),
    };

    let mut out = serde_json::to_vec(&header)?;
    out.push(b'\n');
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode_index(name: &str, bytes: &[u8]) -> Result<VectorIndex> {
    let split = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| RagError::corrupt(name, "missing header line"))?;
    let (header_bytes, body) = (&bytes[..split], &bytes[split + 1..]);

    let header = parse_header(name, header_bytes)?;

    if sha256_hex(body) != header.checksum {
        return Err(RagError::corrupt(name, "checksum mismatch"));
    }

    let entries: Vec<IndexEntry> = serde_json::from_slice(body)
        .map_err(|e| RagError::corrupt(name, format!("invalid body: {}", e)))?;

    if entries.len() != header.entry_count {
        return Err(RagError::corrupt(
            name,
            format!(
                "expected {} entries, found {}",
                header.entry_count,
                entries.len()
            ),
        ));
    }

    let index = VectorIndex::with_built_at(&header.name, &header.embedder, entries, header.built_at)
        .map_err(|e| RagError::corrupt(name, e))?;

    if index.dimension() != header.dimension {
        return Err(RagError::corrupt(
            name,
            format!(
                "header dimension {} does not match vectors ({})",
                header.dimension,
                index.dimension()
            ),
        ));
    }

    Ok(index)
}

fn parse_header(name: &str, bytes: &[u8]) -> Result<IndexHeader> {
    let header: IndexHeader = serde_json::from_slice(bytes)
        .map_err(|e| RagError::corrupt(name, format!("invalid header: {}", e)))?;

    if header.format != INDEX_FORMAT {
        return Err(RagError::corrupt(
            name,
            format!("unknown format '{}'", header.format),
        ));
    }

    if header.version != INDEX_VERSION {
        return Err(RagError::corrupt(
            name,
            format!("unsupported version {}", header.version),
        ));
    }

    if header.name != name {
        return Err(RagError::corrupt(
            name,
            format!("file holds index '{}'", header.name),
        ));
    }

    Ok(header)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// 인덱스 이름 검사 (파일명으로 안전한 문자만 허용)
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(RagError::InvalidInput(format!(
            "invalid index name '{}': use up to {} ASCII letters, digits, '-' or '_'",
            name, MAX_NAME_LEN
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
