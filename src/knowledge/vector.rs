//! Vector Index - 청크 벡터 타입과 정확한(brute-force) 최근접 검색
//!
//! 1~3개 URL 또는 5MB 이하 PDF에서 나오는 수백~수천 청크 규모에서는
//! ANN 인덱스 없이 전수 비교가 충분하고, 결과가 결정적입니다.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

// ============================================================================
// Types
// ============================================================================

/// 텍스트 청크 (출처 포함)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 청크 텍스트
    pub text: String,
    /// 출처 (URL 또는 "파일명:page N")
    pub provenance: String,
    /// 같은 레코드 내 순번 (0-based)
    pub sequence_index: usize,
}

/// 인덱스 엔트리 (청크 + 임베딩)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: IndexEntry,
    /// 질의 벡터와의 거리 (작을수록 가까움)
    pub distance: f32,
}

/// 거리 척도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity` (0.0 ~ 2.0)
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
        }
    }
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 메모리 상의 벡터 인덱스
///
/// 엔트리는 삽입 순서를 유지하며, 모든 벡터는 같은 차원입니다.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    name: String,
    embedder: String,
    dimension: usize,
    metric: DistanceMetric,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// 새 인덱스 생성 (현재 시각 기록)
    pub fn new(name: &str, embedder: &str, entries: Vec<IndexEntry>) -> Result<Self> {
        Self::with_built_at(name, embedder, entries, Utc::now())
    }

    /// 생성 시각을 지정하여 생성 (저장된 인덱스 복원용)
    pub fn with_built_at(
        name: &str,
        embedder: &str,
        entries: Vec<IndexEntry>,
        built_at: DateTime<Utc>,
    ) -> Result<Self> {
        let first = entries.first().ok_or_else(|| {
            RagError::InvalidInput(format!("cannot build index '{}' from zero entries", name))
        })?;

        let dimension = first.vector.len();
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "embedding vectors must not be empty".to_string(),
            ));
        }

        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            embedder: embedder.to_string(),
            dimension,
            metric: DistanceMetric::Cosine,
            built_at,
            entries,
        })
    }

    /// 최근접 k개 검색
    ///
    /// 정확히 `min(k, len)`개를 거리 오름차순으로 반환합니다.
    /// 거리가 같으면 삽입 순서를 따릅니다 (안정 정렬).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, self.metric.distance(query, &e.vector)))
            .collect();

        // NaN은 가장 먼 것으로 취급
        scored.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
            (false, false) => a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => Ordering::Equal,
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| SearchHit {
                entry: self.entries[i].clone(),
                distance,
            })
            .collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 인덱스를 만든 임베딩 모델 이름
    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 이름 붙은 인덱스를 만들고 다시 읽는 저장소의 공통 인터페이스입니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 엔트리 전체로 새 인덱스를 만들고 `name`으로 저장
    ///
    /// 같은 이름의 기존 인덱스는 원자적으로 교체됩니다.
    async fn build(&self, name: &str, embedder: &str, entries: Vec<IndexEntry>)
        -> Result<VectorIndex>;

    /// 저장된 인덱스 로드 (없으면 `IndexNotFound`)
    async fn load(&self, name: &str) -> Result<VectorIndex>;

    /// 인덱스 존재 여부
    async fn exists(&self, name: &str) -> bool;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위이며, 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
