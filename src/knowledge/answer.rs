//! 답변 프롬프트 조립 및 응답 파싱
//!
//! 모델에는 검색된 청크를 `Content:` / `Source:` 블록으로 전달하고,
//! `FINAL ANSWER:` / `SOURCES:` 형식으로 답하도록 요구합니다.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RagError, Result};

use super::vector::SearchHit;

/// 질의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub answer: String,
    /// 인용된 출처 (중복 제거, 처음 등장 순서)
    pub sources: Vec<String>,
}

/// 프롬프트 조립
pub fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    let mut prompt = String::from(
        "Given the following extracted parts of one or more documents and a question, \
         write a final answer using only these extracts.\n\
         If you don't know the answer, say that you don't know. Don't make up an answer.\n\
         Always return a \"SOURCES\" part listing the Source values you used, \
         comma-separated and copied exactly.\n\n",
    );

    for hit in hits {
        prompt.push_str("Content: ");
        prompt.push_str(hit.entry.chunk.text.trim());
        prompt.push_str("\nSource: ");
        prompt.push_str(&hit.entry.chunk.provenance);
        prompt.push_str("\n\n");
    }

    prompt.push_str("QUESTION: ");
    prompt.push_str(question.trim());
    prompt.push_str("\n\nRespond in this format:\nFINAL ANSWER: <answer>\nSOURCES: <source>, <source>\n");

    prompt
}

/// 모델 응답 파싱
///
/// 답변은 마지막 `SOURCES:` 앞부분이고, 출처는 실제로 검색된 출처만 남깁니다.
/// `SOURCES:`가 없으면 전체가 답변이고 출처는 비어 있습니다.
pub fn parse_answer(raw: &str, retrieved: &[&str]) -> Result<AnswerResult> {
    static SOURCES_MARKER: OnceLock<Regex> = OnceLock::new();
    static ANSWER_PREFIX: OnceLock<Regex> = OnceLock::new();

    let marker = SOURCES_MARKER
        .get_or_init(|| Regex::new(r"(?i)\bSOURCES?\s*:").expect("Invalid regex"));
    let prefix = ANSWER_PREFIX
        .get_or_init(|| Regex::new(r"(?i)^\s*FINAL\s+ANSWER\s*:").expect("Invalid regex"));

    let (answer_part, sources_part) = match marker.find_iter(raw).last() {
        Some(m) => (&raw[..m.start()], &raw[m.end()..]),
        None => (raw, ""),
    };

    let answer = prefix.replace(answer_part, "").trim().to_string();
    if answer.is_empty() {
        return Err(RagError::Generation("model returned an empty answer".into()));
    }

    Ok(AnswerResult {
        answer,
        sources: cited_sources(sources_part, retrieved),
    })
}

/// `SOURCES:` 구간에서 검색된 출처 찾기 (구간 내 첫 등장 순서)
///
/// 출처 문자열 자체에 쉼표가 있을 수 있으므로 구간을 나누지 않고 출처를 직접 찾습니다.
/// 긴 출처부터 자리를 차지하므로 `a.pdf:page 1`은 `a.pdf:page 12` 안에서 매칭되지 않습니다.
fn cited_sources(section: &str, retrieved: &[&str]) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();
    for p in retrieved {
        if !p.is_empty() && !candidates.contains(p) {
            candidates.push(*p);
        }
    }
    candidates.sort_by_key(|p| std::cmp::Reverse(p.len()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, &str)> = Vec::new();

    for p in candidates {
        let mut first = None;
        for (start, _) in section.match_indices(p) {
            let end = start + p.len();
            if !is_delimited(section, start, end)
                || claimed.iter().any(|&(s, e)| start < e && s < end)
            {
                continue;
            }
            claimed.push((start, end));
            first.get_or_insert(start);
        }

        if let Some(position) = first {
            found.push((position, p));
        }
    }

    found.sort_by_key(|&(position, _)| position);
    found.into_iter().map(|(_, p)| p.to_string()).collect()
}

/// 매칭 앞뒤가 구분자(공백, 쉼표, 문장부호)이거나 구간 끝인지
fn is_delimited(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    before.map_or(true, |c| {
        c.is_whitespace() || matches!(c, ',' | ';' | '(' | '[' | '"' | '\'')
    }) && after.map_or(true, |c| {
        c.is_whitespace() || matches!(c, ',' | ';' | '.' | ')' | ']' | '"' | '\'')
    })
}

/// 출처별 인용 문구
pub fn citation_line(source: &str) -> String {
    format!("{} (n.d.). Accessed from document or article link.", source)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::vector::{Chunk, IndexEntry};

    fn hit(text: &str, provenance: &str) -> SearchHit {
        SearchHit {
            entry: IndexEntry {
                chunk: Chunk {
                    text: text.to_string(),
                    provenance: provenance.to_string(),
                    sequence_index: 0,
                },
                vector: vec![1.0],
            },
            distance: 0.0,
        }
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt(
            " What is X? ",
            &[hit("X is a letter.", "docX"), hit("Y follows X.", "https://y.example")],
        );

        assert!(prompt.contains("Content: X is a letter.\nSource: docX\n"));
        assert!(prompt.contains("Content: Y follows X.\nSource: https://y.example\n"));
        assert!(prompt.contains("QUESTION: What is X?"));
        assert!(prompt.find("docX").unwrap() < prompt.find("https://y.example").unwrap());
        assert!(prompt.contains("FINAL ANSWER:"));
        assert!(prompt.contains("SOURCES:"));
    }

    #[test]
    fn test_parse_answer_basic() {
        let result = parse_answer("FINAL ANSWER: X is a letter.\nSOURCES: docX", &["docX"]).unwrap();
        assert_eq!(result.answer, "X is a letter.");
        assert_eq!(result.sources, vec!["docX"]);
    }

    #[test]
    fn test_parse_answer_dedup_and_order() {
        let raw = "Answer.\nSOURCES: b.pdf:page 2, a.pdf:page 1,\nb.pdf:page 2";
        let result = parse_answer(raw, &["a.pdf:page 1", "b.pdf:page 2"]).unwrap();
        assert_eq!(result.sources, vec!["b.pdf:page 2", "a.pdf:page 1"]);
    }

    #[test]
    fn test_parse_answer_drops_unretrieved_sources() {
        let raw = "FINAL ANSWER: yes\nSOURCES: docX, made-up-source, docX.";
        let result = parse_answer(raw, &["docX", "docY"]).unwrap();
        assert_eq!(result.sources, vec!["docX"]);
    }

    #[test]
    fn test_parse_answer_source_with_comma() {
        let raw = "FINAL ANSWER: yes\nSOURCES: Smith, Jones 2020.pdf:page 3";
        let result = parse_answer(raw, &["Smith, Jones 2020.pdf:page 3"]).unwrap();
        assert_eq!(result.sources, vec!["Smith, Jones 2020.pdf:page 3"]);
    }

    #[test]
    fn test_parse_answer_order_follows_section() {
        let raw = "FINAL ANSWER: both\nSOURCES: https://b.example/?q=1,2, Smith, Jones 2020.pdf:page 3";
        let retrieved = ["Smith, Jones 2020.pdf:page 3", "https://b.example/?q=1,2"];
        let result = parse_answer(raw, &retrieved).unwrap();
        assert_eq!(
            result.sources,
            vec!["https://b.example/?q=1,2", "Smith, Jones 2020.pdf:page 3"]
        );
    }

    #[test]
    fn test_parse_answer_page_prefix_not_matched() {
        let raw = "FINAL ANSWER: ok\nSOURCES: a.pdf:page 12";
        let result = parse_answer(raw, &["a.pdf:page 1", "a.pdf:page 12"]).unwrap();
        assert_eq!(result.sources, vec!["a.pdf:page 12"]);
    }

    #[test]
    fn test_parse_answer_uses_last_marker() {
        let raw = "The paper lists SOURCES: of error.\nSOURCES: docY";
        let result = parse_answer(raw, &["docY"]).unwrap();
        assert_eq!(result.answer, "The paper lists SOURCES: of error.");
        assert_eq!(result.sources, vec!["docY"]);
    }

    #[test]
    fn test_parse_answer_without_marker() {
        let result = parse_answer("I don't know.", &["docX"]).unwrap();
        assert_eq!(result.answer, "I don't know.");
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_parse_answer_empty_is_generation_error() {
        assert!(matches!(
            parse_answer("FINAL ANSWER:   \nSOURCES: docX", &["docX"]),
            Err(RagError::Generation(_))
        ));
        assert!(matches!(parse_answer("  ", &[]), Err(RagError::Generation(_))));
    }

    #[test]
    fn test_citation_line() {
        assert_eq!(
            citation_line("https://a.example"),
            "https://a.example (n.d.). Accessed from document or article link."
        );
    }
}
