//! Text Chunking Module
//!
//! 고정 크기 문자 윈도우로 텍스트를 분할합니다.
//! 윈도우는 `chunk_size - chunk_overlap`씩 전진하며, 마지막 청크는 더 짧을 수 있습니다.
//! 문단/문장 경계 보정은 하지 않습니다 (문자 단위로 정확한 경계).

use crate::loader::SourceRecord;

use super::vector::Chunk;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
///
/// `chunk_overlap < chunk_size` 불변식은 생성 시점에 검사됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkConfig {
    /// 설정 생성
    ///
    /// # Panics
    /// `chunk_size == 0` 이거나 `chunk_overlap >= chunk_size` 인 경우
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be greater than zero");
        assert!(
            chunk_overlap < chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            chunk_overlap,
            chunk_size
        );

        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// 웹 문서용 설정 (750/100)
    pub fn for_urls() -> Self {
        Self::new(750, 100)
    }

    /// PDF용 설정 (1000/150)
    pub fn for_pdf() -> Self {
        Self::new(1000, 150)
    }

    /// 청크 최대 길이 (문자 수)
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 인접 청크 간 중첩 길이 (문자 수)
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// 윈도우 전진 폭
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;

    /// 레코드 목록을 청크로 분할 (출처 유지, 레코드별 0부터 순번)
    fn split(&self, records: &[SourceRecord]) -> Vec<Chunk> {
        records
            .iter()
            .flat_map(|record| {
                self.chunk(&record.text)
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Chunk {
                        text,
                        provenance: record.provenance.clone(),
                        sequence_index: i,
                    })
            })
            .collect()
    }
}

// ============================================================================
// WindowChunker
// ============================================================================

/// 슬라이딩 윈도우 청커
///
/// 길이와 중첩은 바이트가 아닌 문자(char) 기준이며 UTF-8 시퀀스를 자르지 않습니다.
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        // 각 문자의 시작 바이트 오프셋 + 끝
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let size = self.config.chunk_size;
        let step = self.config.step();

        let mut chunks = Vec::with_capacity(char_count / step + 1);
        let mut start = 0;

        loop {
            let end = (start + size).min(char_count);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());

            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WindowChunker"
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 윈도우 청커 생성
pub fn window_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(WindowChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================
