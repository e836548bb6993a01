//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트로 페이지별 텍스트를 추출합니다.

use std::path::Path;

use crate::error::{RagError, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작하며,
/// 텍스트가 없는 페이지는 번호를 유지한 채 제외됩니다.
pub fn extract_text_from_pdf(path: &Path, document: &str) -> Result<Vec<(usize, String)>> {
    let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| RagError::parse(document, e))?;
    let total = pages.len();

    let pages = number_pages(pages);
    if pages.is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {} ({} pages). It might be a scanned document.",
            document,
            total
        );
    }

    Ok(pages)
}

/// 1부터 페이지 번호 부여, 빈 페이지 제외
fn number_pages(pages: Vec<String>) -> Vec<(usize, String)> {
    pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text.trim().to_string()))
        .filter(|(_, text)| !text.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pdf_with_pages;
    use tempfile::TempDir;

    fn pages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_number_pages_keeps_numbering() {
        let numbered = number_pages(pages(&["First\n", "   \n ", "Third", ""]));
        assert_eq!(
            numbered,
            vec![(1, "First".to_string()), (3, "Third".to_string())]
        );
    }

    #[test]
    fn test_number_pages_blank() {
        assert!(number_pages(pages(&["  \n ", ""])).is_empty());
    }

    #[test]
    fn test_extract_two_page_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("two.pdf");
        std::fs::write(
            &path,
            pdf_with_pages(&["Alphaword first page text", "Betaword second page text"]),
        )
        .unwrap();

        let pages = extract_text_from_pdf(&path, "two.pdf").unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, 1);
        assert!(pages[0].1.contains("Alphaword"));
        assert!(!pages[0].1.contains("Betaword"));
        assert_eq!(pages[1].0, 2);
        assert!(pages[1].1.contains("Betaword"));
    }

    #[test]
    fn test_extract_skips_blank_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gap.pdf");
        std::fs::write(&path, pdf_with_pages(&["Opening page", "", "Closing page"])).unwrap();

        let pages = extract_text_from_pdf(&path, "gap.pdf").unwrap();
        let numbers: Vec<usize> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_extract_invalid_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        assert!(matches!(
            extract_text_from_pdf(&path, "bad.pdf"),
            Err(RagError::Parse { .. })
        ));
    }
}
