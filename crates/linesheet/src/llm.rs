//! Generative model collaborator.
//!
//! The pipeline only depends on the [`GenerativeModel`] trait: give it a prompt (plus optional
//! image references and an output schema) and get back a [`ModelResponse`], which is either a
//! structured tool-call payload or free text approximating one. Everything after that is the
//! job of the [`response`](crate::response) normalizer.
//!
//! [`ChatClient`] implements the trait against any OpenAI-compatible `/chat/completions`
//! endpoint.
//!
//! # Examples
//!
//! ```no_run
//! use linesheet::llm::{ChatClient, GenerationRequest, GenerativeModel};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new("sk-...").with_model("gpt-4o");
//! let request = GenerationRequest::new("Describe this dress.")
//!   .with_system("You are a fashion copywriter.")
//!   .with_image("https://example.com/dress.jpg");
//!
//! let response = client.generate(&request).await?;
//! println!("{response:?}");
//! # Ok(())
//! # }
//! ```

use super::*;

/// Default OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// What a generative call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
  /// Arguments of a forced function/tool call, already meant to be JSON
  ToolCall(String),
  /// Plain message content, possibly JSON wrapped in prose or fences
  Text(String),
}

/// A function the model is asked to call, describing the requested output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
  /// Function name
  pub name:        String,
  /// Human-readable description of the function
  pub description: String,
  /// JSON schema of the arguments
  pub parameters:  Value,
}

/// A single prompt for the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
  /// Model override, the client's default is used when `None`
  pub model:  Option<String>,
  /// System message
  pub system: Option<String>,
  /// User prompt
  pub prompt: String,
  /// Image references (URLs or data URIs) sent alongside the prompt
  pub images: Vec<String>,
  /// Output schema the model is forced to call, if any
  pub tool:   Option<ToolSchema>,
}

impl GenerationRequest {
  /// Creates a request for `prompt`.
  pub fn new(prompt: impl Into<String>) -> Self {
    Self { prompt: prompt.into(), ..Self::default() }
  }

  /// Sets the model to use.
  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model.replace(model.into());
    self
  }

  /// Sets the system message.
  pub fn with_system(mut self, system: impl Into<String>) -> Self {
    self.system.replace(system.into());
    self
  }

  /// Adds an image reference.
  pub fn with_image(mut self, image: impl Into<String>) -> Self {
    self.images.push(image.into());
    self
  }

  /// Adds several image references.
  pub fn with_images<I, S>(mut self, images: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    self.images.extend(images.into_iter().map(Into::into));
    self
  }

  /// Forces the model to answer through `tool`.
  pub fn with_tool(mut self, tool: ToolSchema) -> Self {
    self.tool.replace(tool);
    self
  }
}

/// A generative text/image-understanding service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
  /// Runs one generation.
  ///
  /// Implementations return transport and API failures as errors; they do not retry. Retrying
  /// is the caller's decision, see [`RetryPolicy`](crate::retry::RetryPolicy).
  async fn generate(&self, request: &GenerationRequest) -> Result<ModelResponse>;
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct ChatClient {
  /// API root, without the `/chat/completions` suffix
  base_url:      String,
  /// Bearer token
  api_key:       String,
  /// Model used when a request does not name one
  default_model: String,
  /// Shared HTTP client
  http:          reqwest::Client,
}

impl std::fmt::Debug for ChatClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ChatClient")
      .field("base_url", &self.base_url)
      .field("api_key", &"<redacted>")
      .field("default_model", &self.default_model)
      .finish_non_exhaustive()
  }
}

impl ChatClient {
  /// Creates a client for the default endpoint and model.
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      base_url:      DEFAULT_BASE_URL.to_string(),
      api_key:       api_key.into(),
      default_model: DEFAULT_MODEL.to_string(),
      http:          reqwest::Client::new(),
    }
  }

  /// Sets the API root.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Sets the default model.
  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.default_model = model.into();
    self
  }

  /// Full URL of the completions endpoint.
  pub fn endpoint(&self) -> String {
    format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
  }

  /// Builds the wire request for `request`.
  fn chat_request(&self, request: &GenerationRequest) -> ChatRequest {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
      messages.push(ChatMessage { role: "system", content: MessageContent::Text(system.clone()) });
    }

    let content = if request.images.is_empty() {
      MessageContent::Text(request.prompt.clone())
    } else {
      let mut parts = vec![ContentPart::Text { text: request.prompt.clone() }];
      parts.extend(
        request
          .images
          .iter()
          .map(|url| ContentPart::ImageUrl { image_url: ImageUrl { url: url.clone() } }),
      );
      MessageContent::Parts(parts)
    };
    messages.push(ChatMessage { role: "user", content });

    let (tools, tool_choice) = match &request.tool {
      Some(tool) => (
        vec![ChatTool { kind: "function", function: tool.clone() }],
        Some(ToolChoice { kind: "function", function: ToolName { name: tool.name.clone() } }),
      ),
      None => (Vec::new(), None),
    };

    ChatRequest {
      model: request.model.clone().unwrap_or_else(|| self.default_model.clone()),
      messages,
      tools,
      tool_choice,
    }
  }
}

#[async_trait]
impl GenerativeModel for ChatClient {
  async fn generate(&self, request: &GenerationRequest) -> Result<ModelResponse> {
    let body = self.chat_request(request);
    debug!("Sending {} request to {} ({} images)", body.model, self.endpoint(), request.images.len());

    let response =
      self.http.post(self.endpoint()).bearer_auth(&self.api_key).json(&body).send().await?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(LinesheetError::Api(format!("{status}: {text}")));
    }

    let completion: ChatResponse = response.json().await?;
    trace!("Completion: {completion:?}");
    completion.into_model_response(request.tool.as_ref().map(|tool| tool.name.as_str()))
  }
}

/// Wire format of a chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest {
  /// Model name
  model:       String,
  /// Conversation
  messages:    Vec<ChatMessage>,
  /// Callable tools
  #[serde(skip_serializing_if = "Vec::is_empty")]
  tools:       Vec<ChatTool>,
  /// Forced tool choice
  #[serde(skip_serializing_if = "Option::is_none")]
  tool_choice: Option<ToolChoice>,
}

/// One message of the conversation.
#[derive(Debug, Serialize)]
struct ChatMessage {
  /// "system" or "user"
  role:    &'static str,
  /// Message body
  content: MessageContent,
}

/// Message body: plain text, or text plus images.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
  /// Plain text
  Text(String),
  /// Multi-part content
  Parts(Vec<ContentPart>),
}

/// One part of a multi-part message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  /// Text part
  Text {
    /// The text
    text: String,
  },
  /// Image part
  ImageUrl {
    /// The image reference
    image_url: ImageUrl,
  },
}

/// Image reference of a content part.
#[derive(Debug, Serialize)]
struct ImageUrl {
  /// URL or data URI
  url: String,
}

/// A callable tool.
#[derive(Debug, Serialize)]
struct ChatTool {
  /// Always "function"
  #[serde(rename = "type")]
  kind:     &'static str,
  /// The function schema
  function: ToolSchema,
}

/// Forces a specific tool.
#[derive(Debug, Serialize)]
struct ToolChoice {
  /// Always "function"
  #[serde(rename = "type")]
  kind:     &'static str,
  /// The forced function
  function: ToolName,
}

/// Name of a forced function.
#[derive(Debug, Serialize)]
struct ToolName {
  /// Function name
  name: String,
}

/// Wire format of a chat completion response, reduced to what is used.
#[derive(Debug, Deserialize)]
struct ChatResponse {
  /// Completion candidates
  #[serde(default)]
  choices: Vec<Choice>,
}

/// A completion candidate.
#[derive(Debug, Deserialize)]
struct Choice {
  /// The assistant message
  message: ResponseMessage,
}

/// The assistant message of a candidate.
#[derive(Debug, Deserialize)]
struct ResponseMessage {
  /// Text content, absent for pure tool calls
  #[serde(default)]
  content:    Option<String>,
  /// Tool calls made by the model
  #[serde(default)]
  tool_calls: Vec<ResponseToolCall>,
}

/// A tool call made by the model.
#[derive(Debug, Deserialize)]
struct ResponseToolCall {
  /// The called function
  function: FunctionCall,
}

/// Function name and JSON-encoded arguments of a tool call.
#[derive(Debug, Deserialize)]
struct FunctionCall {
  /// Function name
  name:      String,
  /// JSON-encoded arguments
  arguments: String,
}

impl ChatResponse {
  /// Picks a tool call of the first candidate if there is one, otherwise its text.
  ///
  /// A call to the `expected` tool wins over calls to other functions.
  fn into_model_response(self, expected: Option<&str>) -> Result<ModelResponse> {
    let message = self
      .choices
      .into_iter()
      .next()
      .map(|choice| choice.message)
      .ok_or_else(|| LinesheetError::Api("completion has no choices".into()))?;

    let mut calls = message.tool_calls;
    let index =
      calls.iter().position(|call| Some(call.function.name.as_str()) == expected).unwrap_or(0);
    if index < calls.len() {
      let call = calls.swap_remove(index);
      if expected.is_some_and(|name| name != call.function.name) {
        debug!("Model called {} instead of the requested tool", call.function.name);
      }
      return Ok(ModelResponse::ToolCall(call.function.arguments));
    }

    match message.content {
      Some(content) => Ok(ModelResponse::Text(content)),
      None => Err(LinesheetError::Api("completion has neither content nor tool calls".into())),
    }
  }
}
