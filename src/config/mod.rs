//! 설정 모듈
//!
//! 데이터 디렉토리, 인덱스 이름, 청킹 정책, 타임아웃, 모델 설정을 한곳에 모읍니다.
//! 전역 상태 없이 각 컴포넌트 생성자에 명시적으로 전달됩니다.
//!
//! 환경변수 오버라이드:
//! - `SCHOLARBOT_DATA_DIR` - 데이터 디렉토리
//! - `SCHOLARBOT_INDEX` - 인덱스 이름
//! - `SCHOLARBOT_TOP_K` - 검색 청크 수
//! - `SCHOLARBOT_CHAT_MODEL` - 답변 생성 모델
//! - `SCHOLARBOT_EMBEDDING_DIMENSION` - 임베딩 차원 (768, 1536, 3072)
//! - `OPENAI_BASE_URL` - OpenAI 호환 API 주소

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::knowledge::ChunkConfig;

/// 기본 인덱스 이름
pub const DEFAULT_INDEX_NAME: &str = "scholar";

/// 기본 검색 청크 수
pub const DEFAULT_TOP_K: usize = 4;

/// 한 번에 수집할 수 있는 최대 URL 수
pub const MAX_URLS: usize = 3;

/// PDF 업로드 최대 크기 (5 MB)
pub const MAX_PDF_BYTES: u64 = 5 * 1024 * 1024;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.scholarbot/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scholarbot")
}

// ============================================================================
// Config Types
// ============================================================================

/// 임베딩 설정
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// 출력 차원 (768, 1536, 3072)
    pub dimension: usize,
    /// 요청당 타임아웃
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 768,
            timeout: Duration::from_secs(30),
        }
    }
}

/// 답변 생성 설정
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// 채팅 모델 이름
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// OpenAI 호환 API 주소 (끝에 `/chat/completions`가 붙음)
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct ScholarConfig {
    /// 인덱스 파일이 저장되는 디렉토리
    pub data_dir: PathBuf,
    /// 인덱스 이름 (수집할 때마다 같은 이름으로 교체됨)
    pub index_name: String,
    /// 질의 시 검색할 청크 수
    pub top_k: usize,
    /// URL 모드 청킹 (750/100)
    pub url_chunks: ChunkConfig,
    /// PDF 모드 청킹 (1000/150)
    pub pdf_chunks: ChunkConfig,
    pub max_urls: usize,
    pub max_pdf_bytes: u64,
    /// URL 요청 타임아웃
    pub fetch_timeout: Duration,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            top_k: DEFAULT_TOP_K,
            url_chunks: ChunkConfig::for_urls(),
            pdf_chunks: ChunkConfig::for_pdf(),
            max_urls: MAX_URLS,
            max_pdf_bytes: MAX_PDF_BYTES,
            fetch_timeout: Duration::from_secs(30),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl ScholarConfig {
    /// 기본값 + 환경변수 오버라이드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 구성 (테스트용으로도 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("SCHOLARBOT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(name) = get("SCHOLARBOT_INDEX") {
            config.index_name = name.trim().to_string();
        }

        if let Some(top_k) = get("SCHOLARBOT_TOP_K") {
            config.top_k = parse_positive("SCHOLARBOT_TOP_K", &top_k)?;
        }

        if let Some(model) = get("SCHOLARBOT_CHAT_MODEL") {
            config.generation.model = model.trim().to_string();
        }

        if let Some(dim) = get("SCHOLARBOT_EMBEDDING_DIMENSION") {
            config.embedding.dimension = parse_positive("SCHOLARBOT_EMBEDDING_DIMENSION", &dim)?;
        }

        if let Some(base_url) = get("OPENAI_BASE_URL") {
            config.generation.base_url = base_url.trim().trim_end_matches('/').to_string();
        }

        tracing::debug!(
            "Config: data_dir={}, index={}, top_k={}",
            config.data_dir.display(),
            config.index_name,
            config.top_k
        );

        Ok(config)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RagError::InvalidInput(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

// ============================================================================
// API Keys
// ============================================================================

/// 외부 서비스 API 키
///
/// 환경에서 한 번 읽은 뒤 생성자에 명시적으로 전달합니다.
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// Gemini 임베딩 키 (`GEMINI_API_KEY` > `GOOGLE_AI_API_KEY`)
    pub gemini: Option<String>,
    /// OpenAI 채팅 키 (`OPENAI_API_KEY`)
    pub openai: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            gemini: non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_AI_API_KEY")),
            openai: non_empty("OPENAI_API_KEY"),
        }
    }

    /// 임베딩 키 (없으면 설정 방법 안내 에러)
    pub fn require_gemini(&self) -> Result<&str> {
        self.gemini.as_deref().ok_or_else(|| {
            RagError::InvalidInput(
                "GEMINI_API_KEY or GOOGLE_AI_API_KEY not set.\n\
                 Set: export GEMINI_API_KEY=your-api-key\n\
                 Get your API key at: https://aistudio.google.com/app/apikey"
                    .to_string(),
            )
        })
    }

    /// 채팅 키 (없으면 설정 방법 안내 에러)
    pub fn require_openai(&self) -> Result<&str> {
        self.openai.as_deref().ok_or_else(|| {
            RagError::InvalidInput(
                "OPENAI_API_KEY not set.\nSet: export OPENAI_API_KEY=your-api-key".to_string(),
            )
        })
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &self.gemini.as_ref().map(|_| "***"))
            .field("openai", &self.openai.as_ref().map(|_| "***"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
