use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{CompletionBackend, ImageSynthesisBackend};
use crate::state::Role;
use crate::utils::http::get_http_client;

const GENERATION_PATH: &str = "services/aigc/text-generation/generation";
const IMAGE_SYNTHESIS_PATH: &str = "services/aigc/text2image/image-synthesis";
const ERROR_BODY_LOG_LIMIT: usize = 2000;

/// Status reported for a task that reached a terminal non-success state.
pub const TASK_FAILED_STATUS: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub result_format: String,
}

impl GenerationRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "model": self.model,
            "input": { "messages": self.messages },
            "parameters": {
                "temperature": self.temperature,
                "result_format": self.result_format,
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub output: Option<GenerationOutput>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOutput {
    #[serde(default)]
    pub choices: Vec<GenerationChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationChoice {
    #[serde(default)]
    pub message: Option<GenerationMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl GenerationResponse {
    #[cfg(test)]
    pub fn with_content(content: impl Into<String>) -> Self {
        GenerationResponse {
            output: Some(GenerationOutput {
                choices: vec![GenerationChoice {
                    message: Some(GenerationMessage {
                        content: Some(content.into()),
                    }),
                }],
            }),
            request_id: None,
        }
    }

    pub fn first_content(&self) -> Option<&str> {
        self.output
            .as_ref()?
            .choices
            .first()?
            .message
            .as_ref()?
            .content
            .as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSynthesisRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub prompt_extend: bool,
    pub watermark: bool,
}

impl ImageSynthesisRequest {
    pub fn to_body(&self) -> Value {
        json!({
            "model": self.model,
            "input": { "prompt": self.prompt },
            "parameters": {
                "n": self.n,
                "size": self.size,
                "prompt_extend": self.prompt_extend,
                "watermark": self.watermark,
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub actual_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSynthesisOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
    #[serde(default)]
    pub results: Vec<ImageResult>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawTaskResponse {
    #[serde(default)]
    output: Option<ImageSynthesisOutput>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// Image synthesis outcome in the shape the generator inspects:
/// an HTTP-like status, the task output, and an optional error code/message.
#[derive(Debug, Clone, Default)]
pub struct ImageSynthesisResponse {
    pub status_code: u16,
    pub output: ImageSynthesisOutput,
    pub code: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

impl ImageSynthesisResponse {
    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::OK.as_u16()
    }

    fn from_raw(status: StatusCode, raw: RawTaskResponse) -> Self {
        let output = raw.output.unwrap_or_default();
        let code = raw.code.or_else(|| output.code.clone());
        let message = raw.message.or_else(|| output.message.clone());
        ImageSynthesisResponse {
            status_code: status.as_u16(),
            output,
            code,
            message,
            request_id: raw.request_id,
        }
    }
}

/// DashScope task lifecycle. `Unrecognized` covers statuses added after this
/// list was written; those keep polling until the task timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Suspended,
    Succeeded,
    Failed,
    Canceled,
    Unknown,
    Unrecognized,
}

impl TaskStatus {
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return TaskStatus::Unknown;
        };
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "SUSPENDED" => TaskStatus::Suspended,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            "CANCELED" => TaskStatus::Canceled,
            "UNKNOWN" => TaskStatus::Unknown,
            _ => TaskStatus::Unrecognized,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled | TaskStatus::Unknown
        )
    }
}

/// Submission and lookup of asynchronous DashScope tasks.
trait TaskApi {
    fn submit(
        &self,
        request: &ImageSynthesisRequest,
    ) -> impl Future<Output = Result<ImageSynthesisResponse>> + Send;

    fn fetch(&self, task_id: &str) -> impl Future<Output = Result<ImageSynthesisResponse>> + Send;
}

/// Decides whether one poll finished the task. Terminal non-success states
/// are reported with `TASK_FAILED_STATUS`, keeping the task's code and message.
fn settle(task_id: &str, mut response: ImageSynthesisResponse) -> Option<ImageSynthesisResponse> {
    if !response.is_ok() {
        return Some(response);
    }

    let status = TaskStatus::parse(response.output.task_status.as_deref());
    debug!("DashScope task {} status={:?}", task_id, status);
    match status {
        TaskStatus::Succeeded => Some(response),
        status if status.is_terminal() => {
            warn!(
                "DashScope task {} ended with {:?}: code={:?}, message={:?}",
                task_id, status, response.code, response.message
            );
            response.status_code = TASK_FAILED_STATUS;
            Some(response)
        }
        _ => None,
    }
}

async fn run_image_task<A: TaskApi + Sync>(
    api: &A,
    request: &ImageSynthesisRequest,
    poll_interval: Duration,
    task_timeout: Duration,
) -> Result<ImageSynthesisResponse> {
    let submitted = api.submit(request).await?;
    if !submitted.is_ok() {
        return Ok(submitted);
    }
    let Some(task_id) = submitted.output.task_id.clone() else {
        return Err(anyhow!(
            "DashScope image synthesis accepted the request without a task id (request_id={:?})",
            submitted.request_id
        ));
    };
    info!("DashScope image task {} submitted", task_id);

    let started = Instant::now();
    loop {
        let response = api.fetch(&task_id).await?;
        if let Some(settled) = settle(&task_id, response) {
            return Ok(settled);
        }

        if started.elapsed() >= task_timeout {
            return Err(anyhow!(
                "DashScope task {} did not finish within {}s",
                task_id,
                task_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let code = value.get("code").and_then(|v| v.as_str());
        let message = value.get("message").and_then(|v| v.as_str());
        let detail = match (code, message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message.to_string()),
            (Some(code), None) => Some(code.to_string()),
            (None, None) => None,
        };
        return (detail, truncate_for_log(&value.to_string(), ERROR_BODY_LOG_LIMIT));
    }

    (None, truncate_for_log(trimmed, ERROR_BODY_LOG_LIMIT))
}

fn summarize_generation(request: &GenerationRequest) -> String {
    format!(
        "model={}, messages={}, temperature={}, result_format={}",
        request.model,
        request.messages.len(),
        request.temperature,
        request.result_format
    )
}

/// HTTP client for the DashScope text-generation and image-synthesis endpoints.
#[derive(Clone)]
pub struct DashScopeClient {
    http: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl DashScopeClient {
    pub fn new(config: &Config) -> Self {
        DashScopeClient {
            http: get_http_client().clone(),
            base_url: config.dashscope_base_url.trim_end_matches('/').to_string(),
            api_key: config.dashscope_api_key.clone(),
            request_timeout: Duration::from_secs(config.http_timeout_seconds.max(1)),
            poll_interval: config.image_task_poll_interval(),
            task_timeout: Duration::from_secs(config.image_task_timeout_seconds),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn call_generation_api(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        debug!("DashScope generation request: {}", summarize_generation(request));

        let response = self
            .http
            .post(self.endpoint(GENERATION_PATH))
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&request.to_body())
            .send()
            .await
            .context("DashScope generation request could not be sent")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (detail, body_summary) = summarize_error_body(&body);
            warn!(
                "DashScope generation error: status={}, body={}",
                status, body_summary
            );
            return Err(anyhow!(
                "DashScope generation failed with status {}: {}",
                status,
                detail.unwrap_or(body_summary)
            ));
        }

        let value = response
            .json::<GenerationResponse>()
            .await
            .context("DashScope generation returned malformed JSON")?;
        debug!(
            "DashScope generation response received: request_id={:?}, choices={}",
            value.request_id,
            value
                .output
                .as_ref()
                .map(|output| output.choices.len())
                .unwrap_or(0)
        );
        Ok(value)
    }

    async fn read_task_response(response: reqwest::Response) -> Result<ImageSynthesisResponse> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("DashScope task response body could not be read")?;

        if !status.is_success() {
            let (_, body_summary) = summarize_error_body(&body);
            warn!("DashScope task error: status={}, body={}", status, body_summary);
        }

        let raw = if body.trim().is_empty() {
            RawTaskResponse::default()
        } else {
            serde_json::from_str::<RawTaskResponse>(&body).with_context(|| {
                format!(
                    "DashScope task response is not valid JSON (status {}): {}",
                    status,
                    truncate_for_log(&body, 200)
                )
            })?
        };
        Ok(ImageSynthesisResponse::from_raw(status, raw))
    }

    async fn submit_image_task(&self, request: &ImageSynthesisRequest) -> Result<ImageSynthesisResponse> {
        debug!(
            "DashScope image task submit: model={}, size={}, n={}, prompt_extend={}, watermark={}",
            request.model, request.size, request.n, request.prompt_extend, request.watermark
        );
        let response = self
            .http
            .post(self.endpoint(IMAGE_SYNTHESIS_PATH))
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .timeout(self.request_timeout)
            .json(&request.to_body())
            .send()
            .await
            .context("DashScope image synthesis request could not be sent")?;
        Self::read_task_response(response).await
    }

    async fn fetch_task(&self, task_id: &str) -> Result<ImageSynthesisResponse> {
        let response = self
            .http
            .get(self.endpoint(&format!("tasks/{task_id}")))
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|| format!("DashScope task {task_id} could not be fetched"))?;
        Self::read_task_response(response).await
    }
}

impl CompletionBackend for DashScopeClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        self.call_generation_api(request).await
    }
}

impl TaskApi for DashScopeClient {
    async fn submit(&self, request: &ImageSynthesisRequest) -> Result<ImageSynthesisResponse> {
        self.submit_image_task(request).await
    }

    async fn fetch(&self, task_id: &str) -> Result<ImageSynthesisResponse> {
        self.fetch_task(task_id).await
    }
}

impl ImageSynthesisBackend for DashScopeClient {
    async fn synthesize(&self, request: &ImageSynthesisRequest) -> Result<ImageSynthesisResponse> {
        run_image_task(self, request, self.poll_interval, self.task_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn generation_body_nests_messages_and_parameters() {
        let request = GenerationRequest {
            model: "qwen-turbo".to_string(),
            messages: vec![
                ChatMessage::new(Role::System, "sys"),
                ChatMessage::new(Role::User, "画一只猫"),
            ],
            temperature: 0.7,
            result_format: "message".to_string(),
        };
        let body = request.to_body();
        assert_eq!(body["model"], "qwen-turbo");
        assert_eq!(body["input"]["messages"][0]["role"], "system");
        assert_eq!(body["input"]["messages"][1]["content"], "画一只猫");
        assert_eq!(body["parameters"]["result_format"], "message");
        let temperature = body["parameters"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn image_body_carries_fixed_parameters() {
        let request = ImageSynthesisRequest {
            model: "qwen-image-plus".to_string(),
            prompt: "a red fox in snow".to_string(),
            n: 1,
            size: "1328*1328".to_string(),
            prompt_extend: true,
            watermark: true,
        };
        let body = request.to_body();
        assert_eq!(body["input"]["prompt"], "a red fox in snow");
        assert_eq!(body["parameters"]["n"], 1);
        assert_eq!(body["parameters"]["size"], "1328*1328");
        assert_eq!(body["parameters"]["prompt_extend"], true);
        assert_eq!(body["parameters"]["watermark"], true);
    }

    #[test]
    fn first_content_walks_choices() {
        let raw = r#"{"output":{"choices":[{"finish_reason":"stop","message":{"role":"assistant","content":"  a red fox  "}}]},"request_id":"r1"}"#;
        let response: GenerationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.first_content(), Some("  a red fox  "));

        let empty: GenerationResponse = serde_json::from_str(r#"{"output":{"choices":[]}}"#).unwrap();
        assert_eq!(empty.first_content(), None);
        assert_eq!(GenerationResponse::default().first_content(), None);
    }

    #[test]
    fn task_response_lifts_output_error_fields() {
        let raw: RawTaskResponse = serde_json::from_str(
            r#"{"request_id":"r2","output":{"task_id":"t1","task_status":"FAILED","code":"DataInspectionFailed","message":"bad content"}}"#,
        )
        .unwrap();
        let response = ImageSynthesisResponse::from_raw(StatusCode::OK, raw);
        assert!(response.is_ok());
        assert_eq!(response.code.as_deref(), Some("DataInspectionFailed"));
        assert_eq!(response.message.as_deref(), Some("bad content"));
        assert_eq!(
            TaskStatus::parse(response.output.task_status.as_deref()),
            TaskStatus::Failed
        );
    }

    #[test]
    fn task_response_reads_results() {
        let raw: RawTaskResponse = serde_json::from_str(
            r#"{"output":{"task_id":"t1","task_status":"SUCCEEDED","results":[{"url":"https://x/y/img.png","actual_prompt":"fox"}]}}"#,
        )
        .unwrap();
        let response = ImageSynthesisResponse::from_raw(StatusCode::OK, raw);
        assert_eq!(response.output.results.len(), 1);
        assert_eq!(
            response.output.results[0].url.as_deref(),
            Some("https://x/y/img.png")
        );
    }

    #[test]
    fn task_status_terminal_states() {
        assert!(!TaskStatus::parse(Some("PENDING")).is_terminal());
        assert!(!TaskStatus::parse(Some("running")).is_terminal());
        assert!(TaskStatus::parse(Some("SUCCEEDED")).is_terminal());
        assert!(TaskStatus::parse(Some("FAILED")).is_terminal());
        assert!(TaskStatus::parse(Some("CANCELED")).is_terminal());
        assert!(TaskStatus::parse(Some("UNKNOWN")).is_terminal());
        assert_eq!(TaskStatus::parse(None), TaskStatus::Unknown);
        assert_eq!(TaskStatus::parse(Some("  ")), TaskStatus::Unknown);
    }

    #[test]
    fn suspended_task_is_still_alive() {
        let status = TaskStatus::parse(Some("SUSPENDED"));
        assert_eq!(status, TaskStatus::Suspended);
        assert!(!status.is_terminal());

        let status = TaskStatus::parse(Some("THROTTLED"));
        assert_eq!(status, TaskStatus::Unrecognized);
        assert!(!status.is_terminal());
    }

    struct ScriptedTasks {
        submitted: Mutex<Option<Result<ImageSynthesisResponse>>>,
        polls: Mutex<VecDeque<ImageSynthesisResponse>>,
        fetched: Mutex<Vec<String>>,
    }

    impl ScriptedTasks {
        fn new(submitted: Result<ImageSynthesisResponse>, polls: Vec<ImageSynthesisResponse>) -> Self {
            ScriptedTasks {
                submitted: Mutex::new(Some(submitted)),
                polls: Mutex::new(polls.into()),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl TaskApi for ScriptedTasks {
        async fn submit(&self, _request: &ImageSynthesisRequest) -> Result<ImageSynthesisResponse> {
            self.submitted
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(anyhow!("submitted twice")))
        }

        async fn fetch(&self, task_id: &str) -> Result<ImageSynthesisResponse> {
            self.fetched.lock().unwrap().push(task_id.to_string());
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("no poll reply left"))
        }
    }

    fn task(status: &str) -> ImageSynthesisResponse {
        ImageSynthesisResponse {
            status_code: 200,
            output: ImageSynthesisOutput {
                task_id: Some("t1".to_string()),
                task_status: Some(status.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fox_request() -> ImageSynthesisRequest {
        ImageSynthesisRequest {
            model: "qwen-image-plus".to_string(),
            prompt: "a red fox in snow".to_string(),
            n: 1,
            size: "1328*1328".to_string(),
            prompt_extend: true,
            watermark: true,
        }
    }

    async fn run(tasks: &ScriptedTasks, task_timeout: Duration) -> Result<ImageSynthesisResponse> {
        run_image_task(tasks, &fox_request(), Duration::ZERO, task_timeout).await
    }

    #[tokio::test]
    async fn polls_through_suspension_until_success() {
        let mut done = task("SUCCEEDED");
        done.output.results = vec![ImageResult {
            url: Some("https://x/y/img.png".to_string()),
            actual_prompt: None,
        }];
        let tasks = ScriptedTasks::new(
            Ok(task("PENDING")),
            vec![task("RUNNING"), task("SUSPENDED"), done],
        );

        let response = run(&tasks, Duration::from_secs(60)).await.unwrap();

        assert!(response.is_ok());
        assert_eq!(
            response.output.results[0].url.as_deref(),
            Some("https://x/y/img.png")
        );
        assert_eq!(tasks.fetched(), vec!["t1", "t1", "t1"]);
    }

    #[tokio::test]
    async fn failed_task_is_reported_with_failure_status() {
        let mut failed = task("FAILED");
        failed.code = Some("DataInspectionFailed".to_string());
        failed.message = Some("bad content".to_string());
        let tasks = ScriptedTasks::new(Ok(task("PENDING")), vec![failed]);

        let response = run(&tasks, Duration::from_secs(60)).await.unwrap();

        assert_eq!(response.status_code, TASK_FAILED_STATUS);
        assert_eq!(response.code.as_deref(), Some("DataInspectionFailed"));
        assert_eq!(response.message.as_deref(), Some("bad content"));
    }

    #[tokio::test]
    async fn canceled_task_is_reported_with_failure_status() {
        let tasks = ScriptedTasks::new(Ok(task("PENDING")), vec![task("CANCELED")]);
        let response = run(&tasks, Duration::from_secs(60)).await.unwrap();
        assert_eq!(response.status_code, TASK_FAILED_STATUS);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn rejected_submission_is_passed_through() {
        let rejected = ImageSynthesisResponse {
            status_code: 400,
            code: Some("InvalidParameter".to_string()),
            message: Some("size is not supported".to_string()),
            ..Default::default()
        };
        let tasks = ScriptedTasks::new(Ok(rejected), vec![]);

        let response = run(&tasks, Duration::from_secs(60)).await.unwrap();

        assert_eq!(response.status_code, 400);
        assert_eq!(response.code.as_deref(), Some("InvalidParameter"));
        assert!(tasks.fetched().is_empty());
    }

    #[tokio::test]
    async fn accepted_submission_without_task_id_is_an_error() {
        let mut accepted = task("PENDING");
        accepted.output.task_id = None;
        let tasks = ScriptedTasks::new(Ok(accepted), vec![]);

        let err = run(&tasks, Duration::from_secs(60)).await.unwrap_err();

        assert!(err.to_string().contains("without a task id"));
        assert!(tasks.fetched().is_empty());
    }

    #[tokio::test]
    async fn unfinished_task_times_out() {
        let tasks = ScriptedTasks::new(Ok(task("PENDING")), vec![task("RUNNING")]);
        let err = run(&tasks, Duration::ZERO).await.unwrap_err();
        assert!(err.to_string().contains("did not finish"));
        assert_eq!(tasks.fetched(), vec!["t1"]);
    }

    #[test]
    fn poll_failure_status_is_returned_as_is() {
        let mut failed = task("RUNNING");
        failed.status_code = 401;
        let settled = settle("t1", failed).unwrap();
        assert_eq!(settled.status_code, 401);
        assert!(settle("t1", task("PENDING")).is_none());
    }

    #[test]
    fn error_body_prefers_code_and_message() {
        let (detail, _) =
            summarize_error_body(r#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#);
        assert_eq!(
            detail.as_deref(),
            Some("InvalidApiKey: Invalid API-key provided.")
        );
        let (detail, summary) = summarize_error_body("  ");
        assert!(detail.is_none());
        assert_eq!(summary, "empty response body");
        let (detail, summary) = summarize_error_body("<html>gateway</html>");
        assert!(detail.is_none());
        assert_eq!(summary, "<html>gateway</html>");
    }
}
