//! CLI 모듈
//!
//! scholarbot CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{ApiKeys, ScholarConfig};
use crate::knowledge::{
    citation_line, AnswerResult, FileIndexStore, IngestSummary, Ingestor, QaPipeline,
};
use crate::loader::LoadInput;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "scholarbot")]
#[command(version, about = "웹 문서/PDF 기반 질의응답 도구", long_about = None)]
pub struct Cli {
    /// 데이터 디렉토리 (기본: SCHOLARBOT_DATA_DIR 또는 ~/.scholarbot)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 인덱스 이름 (기본: scholar)
    #[arg(long, global = true)]
    pub index: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// URL(최대 3개) 또는 PDF 하나로 인덱스 재구축
    Ingest {
        /// 수집할 URL (반복 가능)
        #[arg(short, long, conflicts_with = "pdf", required_unless_present = "pdf")]
        url: Vec<String>,

        /// 수집할 PDF 파일 (5 MB 이하)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// 질문 하나에 답변
    Ask {
        /// 질문
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// 검색할 청크 수
        #[arg(short)]
        k: Option<usize>,
    },

    /// 대화형 질의응답 (/reload, /quit)
    Chat {
        /// 검색할 청크 수
        #[arg(short)]
        k: Option<usize>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let keys = ApiKeys::from_env();

    match cli.command {
        Commands::Ingest { url, pdf } => cmd_ingest(&config, &keys, url, pdf).await,
        Commands::Ask { question, k } => cmd_ask(&config, &keys, &question.join(" "), k).await,
        Commands::Chat { k } => cmd_chat(&config, &keys, k).await,
        Commands::Status => cmd_status(&config, &keys).await,
    }
}

/// 환경변수 설정 + 명령행 옵션
fn build_config(cli: &Cli) -> Result<ScholarConfig> {
    let mut config = ScholarConfig::from_env().context("설정 읽기 실패")?;

    if let Some(ref dir) = cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ref index) = cli.index {
        config.index_name = index.clone();
    }

    Ok(config)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 문서 수집 명령어 (ingest)
///
/// 기존 인덱스는 새 인덱스가 완성된 뒤에만 교체됩니다.
async fn cmd_ingest(
    config: &ScholarConfig,
    keys: &ApiKeys,
    urls: Vec<String>,
    pdf: Option<PathBuf>,
) -> Result<()> {
    let ingestor = Ingestor::from_config(config, keys).context("Ingestor 초기화 실패")?;

    let input = match pdf {
        Some(path) => LoadInput::PdfPath(path),
        None => LoadInput::Urls(urls),
    };

    run_ingest(&ingestor, input).await?;
    println!("     데이터 디렉토리: {}", config.data_dir.display());

    Ok(())
}

/// 수집 실행 및 결과 출력 (ingest 명령어와 chat의 /ingest, /pdf 공용)
async fn run_ingest(ingestor: &Ingestor, input: LoadInput) -> Result<IngestSummary> {
    match input {
        LoadInput::PdfPath(ref path) => println!("[*] PDF 처리 중: {}", path.display()),
        LoadInput::Pdf { ref file_name, .. } => println!("[*] PDF 처리 중: {}", file_name),
        LoadInput::Urls(ref urls) => println!("[*] URL 스크래핑 중: {} 건", urls.len()),
    }

    let summary = ingestor.ingest(input).await.context("문서 수집 실패")?;

    for skipped in &summary.skipped {
        println!("[!] 건너뜀: {} ({})", skipped.source, skipped.error);
    }

    println!(
        "[OK] 인덱스 '{}' 생성: 레코드 {}, 청크 {} ({}차원)",
        summary.index_name,
        summary.records,
        summary.chunks,
        summary.index.dimension()
    );

    Ok(summary)
}

/// 질문 명령어 (ask)
async fn cmd_ask(
    config: &ScholarConfig,
    keys: &ApiKeys,
    question: &str,
    k: Option<usize>,
) -> Result<()> {
    let qa = QaPipeline::from_config(config, keys).context("QaPipeline 초기화 실패")?;

    println!("[*] 질문: \"{}\"", truncate_text(question, 80));

    let result = qa.answer(question, k).await.context("답변 생성 실패")?;
    println!();
    print!("{}", render_answer(&result));

    Ok(())
}

/// 대화형 명령어 (chat)
///
/// 질문 하나가 실패해도 루프는 계속됩니다. `/ingest`, `/pdf`로 만든 인덱스는
/// 다시 읽지 않고 바로 질문에 쓰입니다.
async fn cmd_chat(config: &ScholarConfig, keys: &ApiKeys, k: Option<usize>) -> Result<()> {
    let qa = QaPipeline::from_config(config, keys).context("QaPipeline 초기화 실패")?;

    println!(
        "[*] 인덱스 '{}'에 질문하세요. /ingest <URL>... 또는 /pdf <파일> 수집, /reload 다시 읽기, /quit 종료",
        qa.index_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };

        let input = match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Reload => {
                qa.invalidate().await;
                println!("[OK] 다음 질문에서 인덱스를 다시 읽습니다");
                continue;
            }
            ChatInput::Usage(usage) => {
                println!("[!] 사용법: {}", usage);
                continue;
            }
            ChatInput::Question(question) => {
                match qa.answer(question, k).await {
                    Ok(result) => {
                        println!();
                        println!("{}", render_answer(&result));
                    }
                    Err(e) => println!("[!] {}", e),
                }
                continue;
            }
            ChatInput::Urls(urls) => LoadInput::Urls(urls.into_iter().map(str::to_string).collect()),
            ChatInput::Pdf(path) => LoadInput::PdfPath(PathBuf::from(path)),
        };

        let ingested = match Ingestor::from_config(config, keys) {
            Ok(ingestor) => run_ingest(&ingestor, input).await,
            Err(e) => Err(anyhow::Error::new(e).context("Ingestor 초기화 실패")),
        };

        match ingested {
            Ok(summary) => {
                if let Err(e) = qa.set_index(summary.index).await {
                    println!("[!] {}", e);
                }
            }
            Err(e) => println!("[!] {:#}", e),
        }
    }

    Ok(())
}

/// 상태 명령어 (status)
///
/// 시스템 상태를 확인합니다.
async fn cmd_status(config: &ScholarConfig, keys: &ApiKeys) -> Result<()> {
    println!("scholarbot v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // 데이터 디렉토리
    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());

    // API 키 상태
    if keys.gemini.is_some() {
        println!("[OK] 임베딩 API 키: 설정됨");
    } else {
        println!("[!] 임베딩 API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }
    if keys.openai.is_some() {
        println!("[OK] 답변 API 키: 설정됨 ({})", config.generation.model);
    } else {
        println!("[!] 답변 API 키: 미설정");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    let store = match FileIndexStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            println!("[!] 인덱스 저장소 열기 실패: {}", e);
            return Ok(());
        }
    };

    // 현재 인덱스
    match store.info(&config.index_name) {
        Ok(header) => {
            println!(
                "[OK] 인덱스 '{}': {} 청크, {}차원 ({})",
                header.name, header.entry_count, header.dimension, header.embedder
            );
            println!(
                "     생성: {}",
                header.built_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if let Ok(meta) = store
                .index_path(&config.index_name)
                .and_then(|p| std::fs::metadata(p).map_err(Into::into))
            {
                println!("     크기: {}", format_bytes(meta.len()));
            }
        }
        Err(e) => println!("[!] 인덱스 '{}': {}", config.index_name, e),
    }

    // 다른 인덱스
    match store.list() {
        Ok(names) => {
            let others: Vec<_> = names
                .into_iter()
                .filter(|n| *n != config.index_name)
                .collect();
            if !others.is_empty() {
                println!("[*] 다른 인덱스: {}", others.join(", "));
            }
        }
        Err(e) => tracing::debug!("인덱스 목록 조회 실패: {}", e),
    }

    println!(
        "[*] 제한: URL {} 개, PDF {}",
        config.max_urls,
        format_bytes(config.max_pdf_bytes)
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 대화형 입력 한 줄
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    Reload,
    /// `/ingest <URL>...`
    Urls(Vec<&'a str>),
    /// `/pdf <파일>`
    Pdf(&'a str),
    /// 인자가 빠진 명령어
    Usage(&'static str),
    Question(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => ChatInput::Empty,
            "/quit" | "/exit" => ChatInput::Quit,
            "/reload" => ChatInput::Reload,
            "/ingest" if rest.is_empty() => ChatInput::Usage("/ingest <URL> [URL]..."),
            "/ingest" => ChatInput::Urls(rest.split_whitespace().collect()),
            "/pdf" if rest.is_empty() => ChatInput::Usage("/pdf <파일>"),
            "/pdf" => ChatInput::Pdf(rest),
            _ => ChatInput::Question(line),
        }
    }
}

/// 답변 출력 형식 (답변, 출처 목록, 인용)
fn render_answer(result: &AnswerResult) -> String {
    let mut out = format!("[OK] 답변:\n{}\n", result.answer);

    if result.sources.is_empty() {
        out.push_str("\n[!] 인용된 출처 없음\n");
        return out;
    }

    out.push_str("\n[*] 출처:\n");
    for source in &result.sources {
        out.push_str(&format!("  - {}\n", source));
    }

    out.push_str("\n[*] 인용:\n");
    for source in &result.sources {
        out.push_str(&format!("  {}\n", citation_line(source)));
    }

    out
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
