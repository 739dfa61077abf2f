//! Fake upstream services shared by the integration tests.
//!
//! One axum server on an ephemeral port stands in for Wikipedia, NewsAPI,
//! Serper and the chat-completion API. Every request is recorded so tests
//! can assert which services a turn touched.

#![allow(dead_code)]

use axum::extract::{Path as UrlPath, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use context_chat::config::Config;

pub const PHOTOSYNTHESIS: &str =
    "Photosynthesis is the process by which plants convert light energy into chemical energy.";
pub const NEWS_KEY_VAR: &str = "CCHAT_TEST_NEWS_KEY";
pub const WEB_KEY_VAR: &str = "CCHAT_TEST_SERPER_KEY";

pub struct Upstream {
    pub news_articles: Value,
    pub llm_down: bool,
    hits: Mutex<Vec<String>>,
    prompts: Mutex<Vec<Value>>,
}

impl Upstream {
    pub fn new() -> Self {
        Self {
            news_articles: headlines(5),
            llm_down: false,
            hits: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn without_news(mut self) -> Self {
        self.news_articles = json!([]);
        self
    }

    pub fn with_llm_down(mut self) -> Self {
        self.llm_down = true;
        self
    }

    fn hit(&self, what: String) {
        self.hits.lock().unwrap().push(what);
    }

    /// Recorded requests whose tag starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> Vec<String> {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// User messages of every answer (non-translation) completion request.
    pub fn answer_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|body| body["messages"][1]["content"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

pub fn headlines(n: usize) -> Value {
    let articles: Vec<Value> = (1..=n)
        .map(|i| {
            json!({
                "title": format!("Central bank holds rates, part {}", i),
                "publishedAt": format!("2024-05-0{}T08:00:00Z", i),
                "source": { "id": null, "name": "Reuters" }
            })
        })
        .collect();
    Value::Array(articles)
}

async fn wiki_search(
    State(up): State<Arc<Upstream>>,
    UrlQuery(params): UrlQuery<HashMap<String, String>>,
) -> Json<Value> {
    let term = params.get("srsearch").cloned().unwrap_or_default();
    up.hit(format!("wiki-search:{}", term));
    let hits = if term.to_lowercase().contains("photosynthesis") {
        json!([{ "title": "Photosynthesis", "pageid": 24544 }])
    } else {
        json!([])
    };
    Json(json!({ "query": { "search": hits } }))
}

async fn wiki_summary(
    State(up): State<Arc<Upstream>>,
    UrlPath(title): UrlPath<String>,
) -> Result<Json<Value>, StatusCode> {
    up.hit(format!("wiki-summary:{}", title));
    if title == "Photosynthesis" {
        Ok(Json(json!({ "title": "Photosynthesis", "extract": PHOTOSYNTHESIS })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn news(
    State(up): State<Arc<Upstream>>,
    UrlQuery(params): UrlQuery<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    up.hit(format!("news:{}", params.get("q").cloned().unwrap_or_default()));
    if params.get("apiKey").map(String::as_str) != Some("news-key") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "status": "ok",
        "totalResults": up.news_articles.as_array().map_or(0, |a| a.len()),
        "articles": up.news_articles
    })))
}

async fn serper(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> Json<Value> {
    up.hit(format!("web:{}", body["q"].as_str().unwrap_or_default()));
    Json(json!({
        "organic": [
            {
                "title": "Bitcoin price today",
                "snippet": "BTC trades near its high.",
                "link": "https://example.com/btc"
            },
            { "title": "BTC chart", "snippet": "Live chart.", "link": "https://example.com/chart" }
        ]
    }))
}

/// Translation requests (temperature 0) map one Spanish question to English
/// and echo anything else. Answer requests echo the user message.
async fn chat(
    State(up): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if up.llm_down {
        up.hit("llm:down".to_string());
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let user = body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let reply = if body["temperature"].as_f64() == Some(0.0) {
        up.hit("llm:translate".to_string());
        if user == "¿Qué es la fotosíntesis?" {
            "What is photosynthesis?".to_string()
        } else {
            user
        }
    } else {
        up.hit("llm:answer".to_string());
        up.prompts.lock().unwrap().push(body.clone());
        format!("ANSWER\n{}", user)
    };
    Ok(Json(json!({
        "id": "chatcmpl-test",
        "choices": [ { "index": 0, "message": { "role": "assistant", "content": reply } } ]
    })))
}

/// Start the fake upstream and return its base URL.
pub async fn spawn(upstream: Upstream) -> (String, Arc<Upstream>) {
    let upstream = Arc::new(upstream);
    let app = Router::new()
        .route("/w/api.php", get(wiki_search))
        .route("/summary/{title}", get(wiki_summary))
        .route("/news", get(news))
        .route("/search", post(serper))
        .route("/v1/chat/completions", post(chat))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), upstream)
}

/// One-page PDF showing `text` in Helvetica.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

pub fn set_keys() {
    std::env::set_var(NEWS_KEY_VAR, "news-key");
    std::env::set_var(WEB_KEY_VAR, "web-key");
}

/// A config pointing every service at `base` and all state into `root`.
pub fn config(base: &str, root: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.http.timeout_secs = 5;
    cfg.generation.base_url = format!("{}/v1", base);
    cfg.generation.api_key_env = "CCHAT_TEST_UNSET_LLM_KEY".to_string();
    cfg.providers.wikipedia.api_url = format!("{}/w/api.php", base);
    cfg.providers.wikipedia.summary_url = format!("{}/summary", base);
    cfg.providers.news.url = format!("{}/news", base);
    cfg.providers.news.api_key_env = NEWS_KEY_VAR.to_string();
    cfg.providers.web.url = format!("{}/search", base);
    cfg.providers.web.api_key_env = WEB_KEY_VAR.to_string();
    cfg.documents.upload_dir = root.join("uploads");
    cfg.history.path = root.join("chat_memory.json");
    cfg
}

/// The same settings as [`config`], as a TOML file for the CLI.
pub fn config_toml(base: &str, root: &Path) -> String {
    format!(
        r#"[http]
timeout_secs = 5

[generation]
base_url = "{base}/v1"
api_key_env = "CCHAT_TEST_UNSET_LLM_KEY"

[providers.wikipedia]
api_url = "{base}/w/api.php"
summary_url = "{base}/summary"

[providers.news]
url = "{base}/news"
api_key_env = "{news}"

[providers.web]
url = "{base}/search"
api_key_env = "{web}"

[documents]
upload_dir = "{root}/uploads"

[history]
path = "{root}/chat_memory.json"
"#,
        base = base,
        news = NEWS_KEY_VAR,
        web = WEB_KEY_VAR,
        root = root.display()
    )
}
