use std::path::Path;
use std::sync::Arc;

use raglet_core::config::{Config, StoreBackend};
use raglet_core::vault::Secret;
use raglet_core::AppBuilder;
use raglet_index::{
    BlankLineChunker, ChunkStrategy, EmbeddingGateway, IndexerConfig, ProviderComposer, RagError,
    RetrievalPipeline, SourceIndexer, StoreIndex, Timeouts,
};
use raglet_llm::mock::MockProvider;
use raglet_llm::LlmError;
use raglet_memory::{LocalVectorStore, VectorStore};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CALCULATOR: &str = "\
import math

def add(a, b):
    return a + b

def subtract(a, b):
    return a - b

class Calculator:
    def multiply(self, a, b):
        return a * b

def divide(a, b):
    return a / b
";

const KEYWORDS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v: Vec<f32> = KEYWORDS
        .iter()
        .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
        .collect();
    v.push(0.1);
    v
}

struct KeywordEmbedder;

impl EmbeddingGateway for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        Ok(keyword_vector(text))
    }
}

struct BrokenEmbedder;

impl EmbeddingGateway for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(LlmError::Status {
            provider: "openai",
            status: 401,
        })
    }
}

fn local_index(root: &Path) -> StoreIndex {
    StoreIndex::new(Arc::new(LocalVectorStore::new(root)), "code_index")
}

#[test]
fn scenario_a_two_one_line_functions() {
    let chunks = BlankLineChunker::default().chunk("def a(): pass\n\ndef b(): pass\n");
    assert_eq!(chunks, vec!["def a(): pass\n", "def b(): pass\n"]);
}

#[tokio::test]
async fn scenario_b_reindexing_is_idempotent_and_persistent() {
    let dir = tempfile::tempdir().unwrap();
    let indexer = SourceIndexer::new(
        KeywordEmbedder,
        local_index(dir.path()),
        IndexerConfig::default(),
    );

    let first = indexer.index_source("calculator.py", CALCULATOR).await.unwrap();
    let second = indexer.index_source("calculator.py", CALCULATOR).await.unwrap();
    assert_eq!(first.chunks_indexed, 4);
    assert_eq!(second.chunks_indexed, 4);

    let reopened = LocalVectorStore::new(dir.path());
    assert_eq!(reopened.count("code_index").await.unwrap(), 4);

    let hits = reopened
        .search("code_index", keyword_vector("multiply"), 1)
        .await
        .unwrap();
    assert_eq!(hits[0].id, "calculator.py_2");
    assert_eq!(hits[0].payload["type"], "function");
    assert!(
        hits[0].payload["text"]
            .as_str()
            .unwrap()
            .starts_with("class Calculator:")
    );
}

#[tokio::test]
async fn scenario_c_empty_index_composes_with_empty_context() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::with_responses(vec![
        "No code has been indexed yet.".into(),
    ]));
    let pipeline = RetrievalPipeline::new(
        KeywordEmbedder,
        local_index(dir.path()),
        ProviderComposer::new(Arc::clone(&provider)),
        Timeouts::default(),
    );

    let answer = pipeline
        .answer_question("What does add do?", 3)
        .await
        .unwrap();
    assert_eq!(answer, "No code has been indexed yet.");

    let calls = provider.recorded_messages();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][1].content, "Context:\n\n\nQuestion: What does add do?");
}

#[tokio::test]
async fn scenario_d_embedding_failure_never_reaches_composer() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::default());
    let pipeline = RetrievalPipeline::new(
        BrokenEmbedder,
        local_index(dir.path()),
        ProviderComposer::new(Arc::clone(&provider)),
        Timeouts::default(),
    );

    let err = pipeline.answer_question("anything", 3).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Embedding(LlmError::Status { status: 401, .. })
    ));
    assert_eq!(provider.chat_calls(), 0);
}

#[tokio::test]
async fn index_then_ask_ranks_relevant_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    SourceIndexer::new(
        KeywordEmbedder,
        local_index(dir.path()),
        IndexerConfig::default(),
    )
    .index_source("calculator.py", CALCULATOR)
    .await
    .unwrap();

    let provider = Arc::new(MockProvider::with_responses(vec!["It divides.".into()]));
    let pipeline = RetrievalPipeline::new(
        KeywordEmbedder,
        local_index(dir.path()),
        ProviderComposer::new(Arc::clone(&provider)),
        Timeouts::default(),
    );

    let answer = pipeline.answer_question("how does divide work?", 2).await.unwrap();
    assert_eq!(answer, "It divides.");

    let user = &provider.recorded_messages()[0][1].content;
    let context = user
        .strip_prefix("Context:\n")
        .and_then(|rest| rest.split("\n\nQuestion: ").next())
        .unwrap();
    assert!(context.starts_with("def divide(a, b):"));
    assert_eq!(context.matches("def ").count(), 2);
}

/// Answers `/embeddings` requests with keyword vectors for each input.
struct KeywordEmbeddings;

impl Respond for KeywordEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = request.body_json().unwrap();
        let inputs: Vec<String> = match &body["input"] {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().unwrap().to_owned())
                .collect(),
            other => panic!("unexpected input: {other}"),
        };
        let data: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(index, text)| serde_json::json!({"index": index, "embedding": keyword_vector(text)}))
            .collect();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
    }
}

fn app_config(server: &MockServer, store: &Path) -> Config {
    let mut config = Config::default();
    config.llm.base_url = server.uri();
    config.store.backend = StoreBackend::Local;
    config.store.path = store.to_string_lossy().into_owned();
    config.secrets.openai_api_key = Some(Secret::new("sk-test"));
    config
}

#[tokio::test]
async fn openai_backed_index_and_ask() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(KeywordEmbeddings)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "add returns a + b"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("calculator.py");
    std::fs::write(&source, CALCULATOR).unwrap();

    let app = AppBuilder::from_config(app_config(&server, &dir.path().join("raglet_db")));
    let report = app.build_indexer().unwrap().index_file(&source).await.unwrap();
    assert_eq!(report.chunks_indexed, 4);
    assert_eq!(report.function_chunks, 4);
    assert!(dir.path().join("raglet_db").join("code_index.json").exists());

    let answer = app
        .build_pipeline()
        .unwrap()
        .answer_question("What does add do?", 3)
        .await
        .unwrap();
    assert_eq!(answer, "add returns a + b");

    let chat = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/chat/completions")
        .unwrap();
    let body: serde_json::Value = chat.body_json().unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("Context:\ndef add(a, b):"));
    assert!(user.ends_with("\n\nQuestion: What does add do?"));
}

#[tokio::test]
async fn rejected_api_key_surfaces_as_embedding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = app_config(&server, &dir.path().join("raglet_db"));
    config.secrets.openai_api_key = None;
    let app = AppBuilder::from_config(config);

    let err = app
        .build_indexer()
        .unwrap()
        .index_source("calculator.py", CALCULATOR)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::Embedding(LlmError::Status { status: 401, .. })
    ));
    assert!(!dir.path().join("raglet_db").exists());
}

#[tokio::test]
async fn missing_source_file_is_reported() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = AppBuilder::from_config(app_config(&server, dir.path()));

    let err = app
        .build_indexer()
        .unwrap()
        .index_file(&dir.path().join("nope.py"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::ChunkInput { .. }));
    assert!(err.to_string().contains("nope.py"));
}
