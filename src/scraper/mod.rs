//! 웹 스크래퍼 모듈 - URL 콘텐츠 추출
//!
//! 기사 본문 텍스트만 추출합니다. 실패는 URL 단위 `RagError::Fetch`로 보고됩니다.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{RagError, Result};

/// 본문 후보 셀렉터 (우선순위 순)
const CONTENT_SELECTORS: [&str; 6] = [
    "article",
    "main",
    "[role=main]",
    ".content",
    "#content",
    "body",
];

/// 본문으로 인정하는 최소 길이
const MIN_CONTENT_CHARS: usize = 100;

/// 스크랩된 콘텐츠
#[derive(Debug, Clone)]
pub struct ScrapedContent {
    /// 페이지 제목
    pub title: Option<String>,
    /// 본문 텍스트 (HTML 태그 제거됨)
    pub content: String,
}

impl ScrapedContent {
    /// 제목을 헤더로 붙인 본문
    pub fn to_text(&self) -> String {
        match self.title {
            Some(ref title) => format!("# {}\n\n{}", title, self.content),
            None => self.content.clone(),
        }
    }
}

/// 웹 스크래퍼
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scholarbot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::fetch("-", format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// URL에서 콘텐츠 추출
    pub async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        tracing::info!("Scraping: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::fetch(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        let kind = classify_content_type(content_type.as_deref())
            .ok_or_else(|| {
                RagError::fetch(
                    url,
                    format!(
                        "non-text content type '{}'",
                        content_type.as_deref().unwrap_or("")
                    ),
                )
            })?;

        let body = response.text().await.map_err(|e| RagError::fetch(url, e))?;

        let scraped = match kind {
            BodyKind::Html => {
                let document = Html::parse_document(&body);
                ScrapedContent {
                    title: self.extract_title(&document),
                    content: self.extract_content(&document),
                }
            }
            BodyKind::PlainText => ScrapedContent {
                title: None,
                content: collapse_whitespace(&body),
            },
        };

        if scraped.content.is_empty() {
            return Err(RagError::fetch(url, "no text content found"));
        }

        tracing::debug!("Scraped {} chars from {}", scraped.content.len(), url);
        Ok(scraped)
    }

    /// 제목 추출
    fn extract_title(&self, document: &Html) -> Option<String> {
        for tag in ["title", "h1"] {
            if let Ok(selector) = Selector::parse(tag) {
                if let Some(element) = document.select(&selector).next() {
                    let title = element.text().collect::<String>().trim().to_string();
                    if !title.is_empty() {
                        return Some(collapse_whitespace(&title));
                    }
                }
            }
        }

        None
    }

    /// 본문 추출 (HTML 태그 제거)
    fn extract_content(&self, document: &Html) -> String {
        for selector_str in CONTENT_SELECTORS {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = self.extract_text_from_element(&element);
                    if text.len() > MIN_CONTENT_CHARS {
                        return text;
                    }
                }
            }
        }

        // 폴백: 짧더라도 body 전체
        if let Ok(selector) = Selector::parse("body") {
            if let Some(element) = document.select(&selector).next() {
                return self.extract_text_from_element(&element);
            }
        }

        String::new()
    }

    /// 요소에서 텍스트 추출 (스크립트/스타일 제외)
    fn extract_text_from_element(&self, element: &scraper::ElementRef) -> String {
        let mut text = String::new();

        for node in element.descendants() {
            let Some(fragment) = node.value().as_text() else {
                continue;
            };

            let inside_code = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });
            if inside_code {
                continue;
            }

            let trimmed = fragment.trim();
            if !trimmed.is_empty() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(trimmed);
            }
        }

        collapse_whitespace(&text)
    }
}

/// 응답 본문 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    PlainText,
}

/// Content-Type 분류 (텍스트가 아니면 None)
///
/// 헤더가 없으면 HTML로 간주합니다.
fn classify_content_type(content_type: Option<&str>) -> Option<BodyKind> {
    let Some(ct) = content_type else {
        return Some(BodyKind::Html);
    };

    let mime = ct.split(';').next().unwrap_or("").trim();
    match mime {
        "text/html" | "application/xhtml+xml" | "" => Some(BodyKind::Html),
        "text/plain" | "text/markdown" => Some(BodyKind::PlainText),
        _ => None,
    }
}

/// 연속 공백 정리
fn collapse_whitespace(text: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let re = WS.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"));
    re.replace_all(text, " ").trim().to_string()
}
