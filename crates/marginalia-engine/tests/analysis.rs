//! End-to-end runs of the engine against files on disk

use async_trait::async_trait;
use marginalia_analyzers::{
    CategorizerConfig, LlmCategorizer, ScorerConfig, ScoringWeights, UsefulnessScorer,
};
use marginalia_domain::{
    AnalysableExport, AnalysisExport, AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord,
    ExportMetadata, ScoringMethod,
};
use marginalia_engine::{Engine, EngineConfig, EngineError, OutputConfig, PoolConfig};
use marginalia_llm::MockProvider;
use marginalia_sandbox::{SandboxConfig, ScriptAnalyzer, ScriptSandbox};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn bookmark(id: &str, text: &str, likes: u64) -> BookmarkRecord {
    BookmarkRecord {
        id: id.to_string(),
        url: format!("https://x.com/someone/status/{}", id),
        text: text.to_string(),
        author_username: "someone".to_string(),
        author_name: "Some One".to_string(),
        created_at: "2024-05-20T08:30:00.000Z".to_string(),
        like_count: likes,
        retweet_count: 4,
        reply_count: 2,
        extra: Default::default(),
    }
}

fn export(bookmarks: Vec<BookmarkRecord>) -> AnalysableExport {
    AnalysableExport {
        metadata: ExportMetadata {
            export_timestamp: "2024-06-01T12:00:00.000Z".to_string(),
            total_count: bookmarks.len() as u64,
            exporter_version: "2.1.0".to_string(),
            user_id: "987654".to_string(),
            username: "reader".to_string(),
            extra: Default::default(),
        },
        bookmarks,
    }
}

fn write_input(dir: &TempDir, export: &AnalysableExport) -> PathBuf {
    let path = dir.path().join("bookmarks.json");
    std::fs::write(&path, serde_json::to_string_pretty(export).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Sleeps longer for earlier bookmarks so completions arrive out of order
struct Staggered;

#[async_trait]
impl Analyzer for Staggered {
    fn name(&self) -> &str {
        "staggered"
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        let n: u64 = bookmark.id.parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((30 - n) * 2)).await;
        Ok(AnalysisResult::with_categories(vec![format!("item-{}", n)]))
    }
}

#[tokio::test]
async fn test_categories_applied_is_union_across_bookmarks() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        &export(vec![
            bookmark("1", "Transformers explained from scratch in PyTorch", 120),
            bookmark("2", "TypeScript 5.5 ships inferred type predicates", 80),
            bookmark("3", "The best sourdough recipe I have found", 40),
        ]),
    );

    let provider = MockProvider::new("unused");
    provider.queue_response(r#"["machine learning", "deep learning", "python"]"#);
    provider.queue_response("Categories: typescript, web development, programming languages");
    provider.queue_response("```json\n[\"food\", \"baking\", \"recipes\"]\n```");

    let categorizer =
        LlmCategorizer::new(Arc::new(provider.clone()), CategorizerConfig::default()).unwrap();
    let mut engine = Engine::new(vec![Arc::new(categorizer)], EngineConfig::default()).unwrap();

    let analysed = engine.analyze(&input, None).await.unwrap();

    assert_eq!(provider.call_count(), 3);
    assert_eq!(
        analysed.bookmarks[0].categories.as_deref(),
        Some(&["machine learning".to_string(), "deep learning".to_string(), "python".to_string()][..])
    );
    assert_eq!(
        analysed.bookmarks[1].categories.as_deref(),
        Some(
            &[
                "typescript".to_string(),
                "web development".to_string(),
                "programming languages".to_string()
            ][..]
        )
    );
    assert_eq!(
        analysed.bookmarks[2].categories.as_deref(),
        Some(&["food".to_string(), "baking".to_string(), "recipes".to_string()][..])
    );
    assert_eq!(analysed.metadata.categories_applied.len(), 9);
    assert_eq!(analysed.metadata.analyzers_used, vec!["llm-categorizer"]);
    assert!(analysed.metadata.error_summary.is_none());
}

#[tokio::test]
async fn test_original_fields_are_preserved() {
    let dir = TempDir::new().unwrap();
    let source = export(vec![
        bookmark("1", "Ünïcödé text with \"quotes\" and {braces}", 0),
        bookmark("2", "", 5),
    ]);
    let input = write_input(&dir, &source);
    let output = dir.path().join("analysed.json");

    let mut engine = Engine::new(
        vec![Arc::new(UsefulnessScorer::heuristic(ScorerConfig::default()).unwrap())],
        EngineConfig::default(),
    )
    .unwrap();
    let analysed = engine.analyze(&input, Some(&output)).await.unwrap();

    for (enriched, original) in analysed.bookmarks.iter().zip(&source.bookmarks) {
        assert_eq!(&enriched.bookmark, original);
        assert!(enriched.usefulness_score.unwrap() <= 100);
    }
    assert_eq!(analysed.metadata.source, source.metadata);

    let written: AnalysisExport = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, analysed);

    let raw = read_json(&output);
    assert_eq!(raw["bookmarks"][0]["authorName"], "Some One");
    assert_eq!(raw["metadata"]["exporterVersion"], "2.1.0");
    assert!(raw["bookmarks"][0].get("customAnalysis").is_none());
}

#[tokio::test]
async fn test_engagement_weighting_ranks_popular_bookmark_higher() {
    let weights = ScoringWeights {
        engagement: 1.0,
        recency: 0.0,
        content_quality: 0.0,
    };
    let scorer = UsefulnessScorer::heuristic(ScorerConfig::heuristic(weights)).unwrap();
    let config = EngineConfig {
        scoring_method: scorer.method(),
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(vec![Arc::new(scorer)], config).unwrap();

    let analysed = engine
        .analyze_export(export(vec![bookmark("1", "same", 1000), bookmark("2", "same", 1)]))
        .await;

    let popular = analysed.bookmarks[0].usefulness_score.unwrap();
    let obscure = analysed.bookmarks[1].usefulness_score.unwrap();
    assert!(popular > obscure, "{} <= {}", popular, obscure);
    assert_eq!(analysed.metadata.scoring_method, ScoringMethod::Heuristic);
}

#[tokio::test]
async fn test_pooled_run_preserves_input_order() {
    let bookmarks: Vec<BookmarkRecord> = (0..30)
        .map(|n| bookmark(&n.to_string(), "text", n))
        .collect();

    let config = EngineConfig {
        pool: PoolConfig {
            enabled: true,
            concurrency: 8,
            threshold: 10,
            batch_size: 12,
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(vec![Arc::new(Staggered)], config).unwrap();

    let analysed = engine.analyze_export(export(bookmarks.clone())).await;

    assert_eq!(analysed.bookmarks.len(), 30);
    for (n, (enriched, original)) in analysed.bookmarks.iter().zip(&bookmarks).enumerate() {
        assert_eq!(&enriched.bookmark, original);
        assert_eq!(enriched.categories, Some(vec![format!("item-{}", n)]));
    }
    let expected: Vec<String> = (0..30).map(|n| format!("item-{}", n)).collect();
    assert_eq!(analysed.metadata.categories_applied, expected);

    let stats = engine.pool_stats();
    assert_eq!(stats.processed_count, 30);
    assert_eq!(stats.active_workers, 0);
}

#[tokio::test]
async fn test_missing_input_leaves_partial_dump_and_returns_error() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.json");
    let mut engine = Engine::new(vec![], EngineConfig::default()).unwrap();

    let err = engine
        .analyze(&dir.path().join("absent.json"), Some(&output))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let partial = read_json(&dir.path().join("out_partial.json"));
    let critical = partial["metadata"]["errorSummary"]["criticalErrors"]
        .as_array()
        .unwrap();
    assert!(!critical.is_empty());
    assert_eq!(partial["bookmarks"], serde_json::json!([]));
    assert!(!output.exists());
    assert_eq!(engine.error_summary().critical_errors.len(), 1);
}

#[tokio::test]
async fn test_schema_violation_leaves_partial_dump_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.json");
    std::fs::write(
        &input,
        r#"{"metadata": {"exportTimestamp": "x", "totalCount": 1}, "bookmarks": [{"id": 1}]}"#,
    )
    .unwrap();
    let mut engine = Engine::new(vec![], EngineConfig::default()).unwrap();

    let err = engine.analyze(&input, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let partial = read_json(&dir.path().join("broken_analysis_partial.json"));
    let critical = partial["metadata"]["errorSummary"]["criticalErrors"][0]
        .as_str()
        .unwrap();
    assert!(critical.contains("bookmarks[0].id"));
}

#[tokio::test]
async fn test_unwritable_output_fails_run() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &export(vec![bookmark("1", "a", 1), bookmark("2", "b", 2)]));
    // A regular file where the output directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let output = blocker.join("out.json");
    let mut engine = Engine::new(vec![Arc::new(Staggered)], EngineConfig::default()).unwrap();

    let err = engine.analyze(&input, Some(&output)).await.unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
    assert!(!output.exists());
    assert!(engine.last_output().is_none());
    assert_eq!(engine.error_summary().critical_errors.len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_blank_script_categories_do_not_abort_run() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &export(vec![bookmark("1", "a", 1), bookmark("2", "b", 2)]));
    let output = dir.path().join("out.json");
    let script = dir.path().join("tagger.sh");
    std::fs::write(&script, "echo '{\"categories\": [\"\", \"  \"], \"usefulnessScore\": 55}'\n").unwrap();
    let analyzer = ScriptAnalyzer::new(ScriptSandbox::load(&script, SandboxConfig::default()).unwrap());
    let mut engine = Engine::new(vec![Arc::new(analyzer)], EngineConfig::default()).unwrap();

    let analysed = engine.analyze(&input, Some(&output)).await.unwrap();

    assert_eq!(engine.last_output(), Some(output.as_path()));
    for enriched in &analysed.bookmarks {
        assert!(enriched.categories.is_none());
        assert_eq!(enriched.usefulness_score, Some(55));
    }
    assert!(analysed.metadata.categories_applied.is_empty());
    let raw = read_json(&output);
    assert!(raw["bookmarks"][0].get("categories").is_none());
    assert!(!dir.path().join("out_partial.json").exists());
}

#[tokio::test]
async fn test_unknown_fields_survive_analysis() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bookmarks.json");
    std::fs::write(
        &input,
        r#"{
            "metadata": {"exportTimestamp": "2024-06-01T12:00:00.000Z", "totalCount": 1,
                         "exporterVersion": "2.1.0", "userId": "987654", "username": "reader",
                         "source": "xkit"},
            "bookmarks": [{"id": "1", "url": "https://x.com/someone/status/1", "text": "a photo",
                           "authorUsername": "someone", "authorName": "Some One",
                           "createdAt": "2024-05-20T08:30:00.000Z",
                           "likeCount": 3, "retweetCount": 0, "replyCount": 0,
                           "media": [{"type": "photo"}]}]
        }"#,
    )
    .unwrap();
    let output = dir.path().join("out.json");
    let mut engine = Engine::new(
        vec![Arc::new(UsefulnessScorer::heuristic(ScorerConfig::default()).unwrap())],
        EngineConfig::default(),
    )
    .unwrap();

    engine.analyze(&input, Some(&output)).await.unwrap();

    let raw = read_json(&output);
    assert_eq!(raw["metadata"]["source"], "xkit");
    assert_eq!(raw["bookmarks"][0]["media"], serde_json::json!([{"type": "photo"}]));
    assert!(raw["bookmarks"][0]["usefulnessScore"].is_u64());
}

#[tokio::test]
async fn test_existing_output_gets_sibling_and_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &export(vec![bookmark("1", "a", 1)]));
    let output = dir.path().join("out.json");
    std::fs::write(&output, "keep me").unwrap();
    let mut engine = Engine::new(vec![], EngineConfig::default()).unwrap();

    let analysed = engine.analyze(&input, Some(&output)).await.unwrap();

    let written = engine.last_output().unwrap().to_path_buf();
    assert_ne!(written, output);
    assert_eq!(written.parent(), Some(dir.path()));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");
    let reread: AnalysisExport = serde_json::from_value(read_json(&written)).unwrap();
    assert_eq!(reread, analysed);
}

#[tokio::test]
async fn test_repeated_writes_with_fixed_pattern_never_collide() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        output: OutputConfig {
            directory: dir.path().to_path_buf(),
            filename_pattern: "analysis.json".to_string(),
            pretty: true,
        },
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(vec![], config).unwrap();
    let analysed = engine.analyze_export(export(vec![bookmark("1", "a", 1)])).await;

    let first = engine.write_output(&analysed).unwrap();
    let second = engine.write_output(&analysed).unwrap();

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
    assert_eq!(read_json(&first), read_json(&second));
}

#[tokio::test]
async fn test_llm_failures_never_fail_bookmarks() {
    let categorizer =
        LlmCategorizer::new(Arc::new(MockProvider::failing()), CategorizerConfig::default()).unwrap();
    let scorer = UsefulnessScorer::new(
        ScorerConfig {
            method: ScoringMethod::Llm,
            ..ScorerConfig::default()
        },
        Some(Arc::new(MockProvider::failing())),
    )
    .unwrap();
    let mut engine = Engine::new(
        vec![Arc::new(categorizer), Arc::new(scorer)],
        EngineConfig::default(),
    )
    .unwrap();

    let analysed = engine.analyze_export(export(vec![bookmark("1", "text", 3)])).await;
    assert_eq!(analysed.bookmarks[0].categories, Some(vec!["uncategorized".to_string()]));
    assert!(analysed.bookmarks[0].usefulness_score.is_some());
    assert!(analysed.metadata.error_summary.is_none());
}
