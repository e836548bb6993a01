//! 에러 타입
//!
//! 수집(ingest)과 질의(query) 단계에서 발생하는 에러를 종류별로 구분합니다.
//! CLI 계층에서는 `anyhow::Context`로 감싸서 출력합니다.

use thiserror::Error;

/// 라이브러리 공통 Result
pub type Result<T> = std::result::Result<T, RagError>;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// URL을 가져오지 못함 (연결 실패, 비정상 상태 코드, 텍스트가 아닌 응답)
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// 업로드 파일 크기 초과 (파싱 전에 검사)
    #[error("file is {size} bytes, exceeds the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// 문서 파싱 실패 (잘못된 PDF 등)
    #[error("failed to parse {document}: {reason}")]
    Parse { document: String, reason: String },

    /// 임베딩 실패 (배치 전체가 실패로 처리됨)
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// 이름에 해당하는 인덱스가 없음
    #[error("index '{0}' not found; ingest URLs or a PDF first")]
    IndexNotFound(String),

    /// 저장된 인덱스가 손상됨
    #[error("index '{name}' is corrupted: {reason}")]
    CorruptIndex { name: String, reason: String },

    /// 벡터 차원 불일치
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 언어 모델 호출 실패
    #[error("generation failed: {0}")]
    Generation(String),

    /// 수집은 성공했지만 인덱싱할 텍스트가 없음
    #[error("no indexable text: {0}")]
    NoContent(String),

    /// 잘못된 입력 (URL 개수, 빈 질문, 잘못된 설정값 등)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(document: &str, reason: impl ToString) -> Self {
        Self::Parse {
            document: document.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(name: &str, reason: impl ToString) -> Self {
        Self::CorruptIndex {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
