//! Knowledge 모듈 - 벡터 인덱스와 질의응답
//!
//! - Chunker: 고정 크기 문자 윈도우 분할
//! - Vector: 청크/엔트리 타입과 정확한 코사인 검색
//! - Store: 체크섬이 있는 파일 기반 인덱스 저장소
//! - Ingest: Loader → Chunker → Embedder → Store
//! - Pipeline: 질문 → 검색 → 프롬프트 → 답변

mod answer;
mod chunker;
mod ingest;
mod pipeline;
mod store;
mod vector;

// Re-exports
pub use answer::{build_prompt, citation_line, parse_answer, AnswerResult};
pub use chunker::{window_chunker, ChunkConfig, Chunker, WindowChunker};
pub use ingest::{IngestSummary, Ingestor};
pub use pipeline::QaPipeline;
pub use store::{FileIndexStore, IndexHeader};
pub use vector::{
    cosine_similarity, Chunk, DistanceMetric, IndexEntry, SearchHit, VectorIndex, VectorStore,
};
