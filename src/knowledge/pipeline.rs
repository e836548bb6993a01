//! 검색-답변 파이프라인
//!
//! 질문 → 질문 임베딩 → top-k 검색 → 프롬프트 → 언어 모델 → `AnswerResult`
//!
//! 인덱스는 첫 질문 때 저장소에서 읽어 캐시합니다.
//! 인덱스가 없으면 임베딩이나 모델 호출 전에 `IndexNotFound`로 실패합니다.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{ApiKeys, ScholarConfig};
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::llm::{create_language_model, LanguageModel};

use super::answer::{build_prompt, parse_answer, AnswerResult};
use super::store::FileIndexStore;
use super::vector::{VectorIndex, VectorStore};

/// 질의응답 파이프라인
pub struct QaPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn LanguageModel>,
    index_name: String,
    top_k: usize,
    cache: Mutex<Option<Arc<VectorIndex>>>,
}

impl QaPipeline {
    pub fn new(
        config: &ScholarConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            store,
            embedder,
            model,
            index_name: config.index_name.clone(),
            top_k: config.top_k,
            cache: Mutex::new(None),
        }
    }

    /// 설정 + API 키로 생성 (파일 저장소 + Gemini 임베딩 + OpenAI 채팅)
    pub fn from_config(config: &ScholarConfig, keys: &ApiKeys) -> Result<Self> {
        let store = FileIndexStore::open(&config.data_dir)?;
        let embedder = create_embedder(keys.require_gemini()?, &config.embedding)?;
        let model = create_language_model(keys.require_openai()?, &config.generation)?;

        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(embedder),
            Arc::new(model),
        ))
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// 캐시된 인덱스 (없으면 저장소에서 로드)
    pub async fn index(&self) -> Result<Arc<VectorIndex>> {
        let mut cache = self.cache.lock().await;

        if let Some(ref index) = *cache {
            return Ok(index.clone());
        }

        let index = Arc::new(self.store.load(&self.index_name).await?);
        if index.embedder() != self.embedder.name() {
            tracing::warn!(
                "Index '{}' was built with {}, querying with {}",
                index.name(),
                index.embedder(),
                self.embedder.name()
            );
        }

        *cache = Some(index.clone());
        Ok(index)
    }

    /// 새로 만든 인덱스로 캐시 교체
    pub async fn set_index(&self, index: Arc<VectorIndex>) -> Result<()> {
        if index.name() != self.index_name {
            return Err(RagError::InvalidInput(format!(
                "pipeline serves index '{}', got '{}'",
                self.index_name,
                index.name()
            )));
        }

        *self.cache.lock().await = Some(index);
        Ok(())
    }

    /// 캐시 비우기 (다음 질문에서 다시 로드)
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// 질문에 답변
    ///
    /// `k`가 없으면 설정의 `top_k`를 사용합니다.
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".into()));
        }

        let k = k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(RagError::InvalidInput("k must be at least 1".into()));
        }

        let index = self.index().await?;

        let query = self.embedder.embed_query(question).await?;
        let hits = index.search(&query, k)?;

        tracing::debug!(
            "Retrieved {} chunks for question ({} chars)",
            hits.len(),
            question.len()
        );

        let prompt = build_prompt(question, &hits);
        let raw = self.model.generate(&prompt).await?;

        let retrieved: Vec<&str> = hits
            .iter()
            .map(|h| h.entry.chunk.provenance.as_str())
            .collect();

        parse_answer(&raw, &retrieved)
    }
}

// ============================================================================
// Tests
// ============================================================================
