//! 문서 수집 파이프라인
//!
//! Loader → Chunker → Embedder → IndexStore 순서로 인덱스를 다시 만듭니다.
//! 어느 단계에서 실패하든 기존 인덱스는 그대로 남습니다.

use std::sync::Arc;

use crate::config::{ApiKeys, ScholarConfig};
use crate::embedding::{create_embedder, validate_batch, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::loader::{DocumentLoader, LoadInput, SkippedSource, SourceMode, SourceRecord};

use super::chunker::{window_chunker, ChunkConfig};
use super::store::FileIndexStore;
use super::vector::{IndexEntry, VectorIndex, VectorStore};

/// 수집 결과 요약
#[derive(Debug)]
pub struct IngestSummary {
    pub index_name: String,
    /// 로드된 레코드 수 (URL 또는 PDF 페이지)
    pub records: usize,
    pub chunks: usize,
    /// 건너뛴 URL
    pub skipped: Vec<SkippedSource>,
    /// 새로 만들어진 인덱스
    pub index: Arc<VectorIndex>,
}

/// 문서 수집기
pub struct Ingestor {
    loader: DocumentLoader,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_name: String,
    url_chunks: ChunkConfig,
    pdf_chunks: ChunkConfig,
}

impl Ingestor {
    pub fn new(
        config: &ScholarConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        Ok(Self {
            loader: DocumentLoader::new(config)?,
            store,
            embedder,
            index_name: config.index_name.clone(),
            url_chunks: config.url_chunks,
            pdf_chunks: config.pdf_chunks,
        })
    }

    /// 설정 + API 키로 생성 (파일 저장소 + Gemini 임베딩)
    pub fn from_config(config: &ScholarConfig, keys: &ApiKeys) -> Result<Self> {
        let store = FileIndexStore::open(&config.data_dir)?;
        let embedder = create_embedder(keys.require_gemini()?, &config.embedding)?;
        Self::new(config, Arc::new(store), Arc::new(embedder))
    }

    /// 입력을 로드하여 인덱스 재구축
    pub async fn ingest(&self, input: LoadInput) -> Result<IngestSummary> {
        let chunks = match input.mode() {
            SourceMode::Urls => self.url_chunks,
            SourceMode::Pdf => self.pdf_chunks,
        };

        let report = self.loader.load(input).await?;
        let index = self.index_records(&report.records, chunks).await?;

        Ok(IngestSummary {
            index_name: self.index_name.clone(),
            records: report.records.len(),
            chunks: index.len(),
            skipped: report.skipped,
            index: Arc::new(index),
        })
    }

    /// 레코드를 청킹/임베딩하여 인덱스 생성
    pub async fn index_records(
        &self,
        records: &[SourceRecord],
        config: ChunkConfig,
    ) -> Result<VectorIndex> {
        let chunker = window_chunker(config);
        let chunks = chunker.split(records);

        if chunks.is_empty() {
            return Err(RagError::NoContent(format!(
                "{} records produced no chunks",
                records.len()
            )));
        }

        tracing::info!(
            "Embedding {} chunks from {} records ({} {}/{})",
            chunks.len(),
            records.len(),
            chunker.name(),
            config.chunk_size(),
            config.chunk_overlap()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        validate_batch(&vectors, texts.len(), self.embedder.dimension())?;

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        self.store
            .build(&self.index_name, self.embedder.name(), entries)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
