//! PDF 콘텐츠 추출 모듈
//!
//! 업로드된 PDF를 페이지별 `SourceRecord`로 변환합니다.
//!
//! 1. 크기 검사 (파싱 전, 초과 시 `SizeLimitExceeded`)
//! 2. 임시 파일에 기록 (모든 종료 경로에서 삭제됨)
//! 3. `spawn_blocking`에서 파싱 (파서 panic도 `ParseError`로 변환)

pub mod pdf;

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::loader::SourceRecord;

// ============================================================================
// PdfExtractor
// ============================================================================

/// PDF 추출기
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// 허용 최대 크기 (bytes, 경계값 포함)
    max_bytes: u64,
    /// 임시 파일 디렉토리 (None이면 시스템 임시 디렉토리)
    temp_dir: Option<PathBuf>,
}

impl PdfExtractor {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            temp_dir: None,
        }
    }

    /// 임시 파일 위치 지정
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// 크기 검사 (정확히 `max_bytes`는 허용)
    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(RagError::SizeLimitExceeded {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// 경로에서 추출 (파일을 읽기 전에 메타데이터로 크기 검사)
    pub async fn extract_path(&self, path: &Path) -> Result<Vec<SourceRecord>> {
        let metadata = tokio::fs::metadata(path).await?;
        self.check_size(metadata.len())?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("uploaded.pdf")
            .to_string();

        self.extract_bytes(&file_name, bytes).await
    }

    /// 업로드 바이트에서 추출
    ///
    /// 페이지마다 `"<file_name>:page N"` 출처의 레코드 하나를 만듭니다.
    pub async fn extract_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<Vec<SourceRecord>> {
        self.check_size(bytes.len() as u64)?;

        tracing::info!("Extracting PDF: {} ({} bytes)", file_name, bytes.len());

        let temp_dir = self.temp_dir.clone();
        let document = file_name.to_string();

        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let pages = tokio::task::spawn_blocking(move || -> Result<Vec<(usize, String)>> {
            // NamedTempFile은 drop 시 삭제됨 (에러/panic 경로 포함)
            let temp = write_temp_file(&bytes, temp_dir.as_deref())?;
            pdf::extract_text_from_pdf(temp.path(), &document)
        })
        .await
        .map_err(|e| RagError::parse(file_name, format!("PDF parser aborted: {}", e)))??;

        if pages.is_empty() {
            return Err(RagError::parse(
                file_name,
                "no extractable text (scanned or image-only PDF?)",
            ));
        }

        let total_pages = pages.len();
        tracing::debug!("Extracted {} pages with text from {}", total_pages, file_name);

        Ok(pages
            .into_iter()
            .map(|(page, text)| SourceRecord::new(text, format!("{}:page {}", file_name, page)))
            .collect())
    }
}

fn write_temp_file(bytes: &[u8], dir: Option<&Path>) -> Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("scholarbot-upload-").suffix(".pdf");

    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_PDF_BYTES;
    use crate::testing::pdf_with_pages;
    use tempfile::TempDir;

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_size_gate_boundary() {
        let extractor = PdfExtractor::new(MAX_PDF_BYTES);
        assert!(extractor.check_size(MAX_PDF_BYTES).is_ok());
        assert!(matches!(
            extractor.check_size(MAX_PDF_BYTES + 1),
            Err(RagError::SizeLimitExceeded { size, limit })
                if size == MAX_PDF_BYTES + 1 && limit == MAX_PDF_BYTES
        ));
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_temp_file() {
        let temp = TempDir::new().unwrap();
        let extractor = PdfExtractor::new(MAX_PDF_BYTES).with_temp_dir(temp.path());

        let bytes = vec![0u8; MAX_PDF_BYTES as usize + 1];
        let result = extractor.extract_bytes("big.pdf", bytes).await;

        assert!(matches!(result, Err(RagError::SizeLimitExceeded { .. })));
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_exact_limit_passes_size_gate() {
        let temp = TempDir::new().unwrap();
        let extractor = PdfExtractor::new(MAX_PDF_BYTES).with_temp_dir(temp.path());

        // 크기 검사는 통과하고 파싱 단계에서 실패해야 함
        let bytes = vec![b'x'; MAX_PDF_BYTES as usize];
        let result = extractor.extract_bytes("exact.pdf", bytes).await;

        assert!(matches!(result, Err(RagError::Parse { .. })));
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_parse_error_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let extractor = PdfExtractor::new(MAX_PDF_BYTES).with_temp_dir(temp.path());

        let result = extractor
            .extract_bytes("notes.pdf", b"this is not a pdf".to_vec())
            .await;

        match result {
            Err(RagError::Parse { document, .. }) => assert_eq!(document, "notes.pdf"),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_valid_pdf_yields_one_record_per_page() {
        let temp = TempDir::new().unwrap();
        let extractor = PdfExtractor::new(MAX_PDF_BYTES).with_temp_dir(temp.path());

        let bytes = pdf_with_pages(&["Alphaword first page text", "Betaword second page text"]);
        let records = extractor.extract_bytes("two.pdf", bytes).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].provenance, "two.pdf:page 1");
        assert!(records[0].text.contains("Alphaword"));
        assert!(!records[0].text.contains("Betaword"));
        assert_eq!(records[1].provenance, "two.pdf:page 2");
        assert!(records[1].text.contains("Betaword"));
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_pdf_without_text_is_parse_error() {
        let extractor = PdfExtractor::new(MAX_PDF_BYTES);
        let result = extractor
            .extract_bytes("scan.pdf", pdf_with_pages(&["", ""]))
            .await;
        assert!(matches!(result, Err(RagError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_extract_path_uses_file_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lecture notes.pdf");
        std::fs::write(&path, pdf_with_pages(&["Gammaword only page"])).unwrap();

        let records = PdfExtractor::new(MAX_PDF_BYTES)
            .extract_path(&path)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provenance, "lecture notes.pdf:page 1");
    }

    #[tokio::test]
    async fn test_extract_path_checks_metadata_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("small-limit.pdf");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let extractor = PdfExtractor::new(32);
        let result = extractor.extract_path(&path).await;
        assert!(matches!(
            result,
            Err(RagError::SizeLimitExceeded { size: 64, limit: 32 })
        ));
    }

    #[tokio::test]
    async fn test_extract_path_missing_file() {
        let extractor = PdfExtractor::new(MAX_PDF_BYTES);
        let result = extractor.extract_path(Path::new("/nonexistent/paper.pdf")).await;
        assert!(matches!(result, Err(RagError::Io(_))));
    }
}
