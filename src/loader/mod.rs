//! 문서 로더 모듈
//!
//! URL 목록(1~3개) 또는 PDF 하나를 받아 출처가 붙은 `SourceRecord` 목록을 만듭니다.
//!
//! URL 일부 실패 정책: 건너뛰고 경고 (skip-and-warn).
//! 실패한 URL은 로그와 `LoadReport::skipped`에 남고, 모든 URL이 실패한 경우에만
//! 첫 번째 `Fetch` 에러로 실패합니다.

use std::path::PathBuf;

use futures::future::join_all;

use crate::config::ScholarConfig;
use crate::error::{RagError, Result};
use crate::extractor::PdfExtractor;
use crate::scraper::WebScraper;

// ============================================================================
// Types
// ============================================================================

/// 원본 텍스트 + 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub text: String,
    /// URL 또는 "파일명:page N"
    pub provenance: String,
}

impl SourceRecord {
    pub fn new(text: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: provenance.into(),
        }
    }
}

/// 로드 입력
#[derive(Debug, Clone)]
pub enum LoadInput {
    /// 웹 문서 URL 목록
    Urls(Vec<String>),
    /// 업로드된 PDF 바이트
    Pdf { file_name: String, bytes: Vec<u8> },
    /// 디스크 상의 PDF 파일
    PdfPath(PathBuf),
}

impl LoadInput {
    pub fn mode(&self) -> SourceMode {
        match self {
            LoadInput::Urls(_) => SourceMode::Urls,
            LoadInput::Pdf { .. } | LoadInput::PdfPath(_) => SourceMode::Pdf,
        }
    }
}

/// 입력 종류 (청킹 정책 선택에 사용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Urls,
    Pdf,
}

/// 건너뛴 소스
#[derive(Debug)]
pub struct SkippedSource {
    pub source: String,
    pub error: RagError,
}

/// 로드 결과
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<SourceRecord>,
    pub skipped: Vec<SkippedSource>,
}

// ============================================================================
// DocumentLoader
// ============================================================================

/// 문서 로더
pub struct DocumentLoader {
    scraper: WebScraper,
    pdf: PdfExtractor,
    max_urls: usize,
}

impl DocumentLoader {
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        Ok(Self {
            scraper: WebScraper::new(config.fetch_timeout)?,
            pdf: PdfExtractor::new(config.max_pdf_bytes),
            max_urls: config.max_urls,
        })
    }

    /// 입력 로드
    pub async fn load(&self, input: LoadInput) -> Result<LoadReport> {
        match input {
            LoadInput::Urls(urls) => self.load_urls(&urls).await,
            LoadInput::Pdf { file_name, bytes } => Ok(LoadReport {
                records: self.pdf.extract_bytes(&file_name, bytes).await?,
                skipped: vec![],
            }),
            LoadInput::PdfPath(path) => Ok(LoadReport {
                records: self.pdf.extract_path(&path).await?,
                skipped: vec![],
            }),
        }
    }

    /// URL 동시 수집 (결과는 입력 순서 유지)
    async fn load_urls(&self, urls: &[String]) -> Result<LoadReport> {
        let urls = validate_urls(urls, self.max_urls)?;

        let results = join_all(urls.iter().map(|url| self.scraper.scrape(url))).await;

        let mut report = LoadReport::default();
        for (url, result) in urls.into_iter().zip(results) {
            match result {
                Ok(scraped) => report.records.push(SourceRecord::new(scraped.to_text(), url)),
                Err(error) => {
                    tracing::warn!("Skipping {}: {}", url, error);
                    report.skipped.push(SkippedSource { source: url, error });
                }
            }
        }

        if report.records.is_empty() {
            let first = report.skipped.into_iter().next().map(|s| s.error);
            return Err(first.unwrap_or_else(|| RagError::NoContent("no URLs loaded".into())));
        }

        Ok(report)
    }
}

/// URL 입력 검사
///
/// 빈 문자열은 무시하고, 1개 이상 `max` 이하의 http(s) URL이어야 합니다.
pub fn validate_urls(urls: &[String], max: usize) -> Result<Vec<String>> {
    let urls: Vec<String> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(RagError::InvalidInput("at least one URL is required".into()));
    }

    if urls.len() > max {
        return Err(RagError::InvalidInput(format!(
            "at most {} URLs can be processed at once, got {}",
            max,
            urls.len()
        )));
    }

    for raw in &urls {
        let parsed = url::Url::parse(raw)
            .map_err(|e| RagError::InvalidInput(format!("invalid URL '{}': {}", raw, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RagError::InvalidInput(format!(
                "unsupported URL scheme '{}' in {}",
                parsed.scheme(),
                raw
            )));
        }
    }

    Ok(urls)
}

// ============================================================================
// Tests
// ============================================================================
