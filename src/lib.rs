//! scholarbot - 웹 문서/PDF 기반 질의응답 RAG 도구
//!
//! URL 1~3개 또는 PDF 하나를 청크로 나눠 임베딩한 뒤 이름 붙은 벡터 인덱스에
//! 저장하고, 질문에 관련 청크를 찾아 출처와 함께 답변합니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod loader;
pub mod scraper;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{ApiKeys, ScholarConfig};
pub use embedding::{EmbeddingProvider, GeminiEmbedding};
pub use error::{RagError, Result};
pub use knowledge::{
    AnswerResult, Chunk, ChunkConfig, Chunker, FileIndexStore, IndexEntry, IngestSummary,
    Ingestor, QaPipeline, SearchHit, VectorIndex, VectorStore,
};
pub use llm::{LanguageModel, OpenAiChat};
pub use loader::{DocumentLoader, LoadInput, LoadReport, SourceRecord};
pub use scraper::{ScrapedContent, WebScraper};
