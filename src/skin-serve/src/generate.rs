use std::time::Duration;

use bytes::Bytes;
use futures_util::{pin_mut, Stream, StreamExt};
use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;
use crate::error::Error;

/// Streaming generation endpoint for the menu-suggestion sample flow.
/// Override with `GENERATE_ENDPOINT` or an explicit [`GenerateConfig`].
pub const DEFAULT_GENERATE_ENDPOINT: &str = "https://us-central1-aiplatform.googleapis.com/v1/projects/beautywise-ai/locations/us-central1/publishers/google/models/gemini-1.5-flash:streamGenerateContent";

/// Theme used when the caller does not supply one.
pub const DEFAULT_SUBJECT: &str = "seafood";

const TEMPERATURE: f32 = 1.0;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
}

impl GenerateConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        GenerateConfig {
            endpoint: endpoint.into(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig::new(DEFAULT_GENERATE_ENDPOINT)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ChunkContent>,
}

#[derive(Deserialize)]
struct ChunkContent {
    #[serde(default)]
    parts: Vec<ChunkPart>,
}

#[derive(Deserialize)]
struct ChunkPart {
    #[serde(default)]
    text: String,
}

/// Streams model output for the menu-suggestion flow.
///
/// The model's answer arrives as a lazy, finite sequence of text fragments
/// fed to a sink callback as they come in. The sequence is not restartable;
/// when the sink reports its consumer has gone away, the upstream stream is
/// dropped and no further fragments are pulled.
#[derive(Clone)]
pub struct TextGenerator {
    http: reqwest::Client,
    config: GenerateConfig,
    token: TokenSource,
}

impl TextGenerator {
    pub fn new(config: GenerateConfig, token: TokenSource) -> Result<Self, Error> {
        // Only the connect phase is bounded; a healthy stream may take as
        // long as the model keeps talking.
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| Error::Internal(err.to_string()))?;

        Ok(TextGenerator {
            http,
            config,
            token,
        })
    }

    /// The sample flow: ask for one menu item for a themed restaurant.
    /// Returns the full concatenated answer once the stream ends.
    pub async fn suggest_menu_item<F>(&self, subject: &str, sink: F) -> Result<String, Error>
    where
        F: FnMut(&str) -> bool,
    {
        let prompt = format!(
            "Suggest an item for the menu of a {} themed restaurant",
            subject
        );
        self.generate(&prompt, sink).await
    }

    pub async fn generate<F>(&self, prompt: &str, mut sink: F) -> Result<String, Error>
    where
        F: FnMut(&str) -> bool,
    {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let token = self.token.resolve()?;

        info!("requesting generation stream");
        let response = self
            .http
            .post(format!("{}?alt=sse", self.config.endpoint))
            .bearer_auth(token.expose())
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::UpstreamUnavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamRejected {
                status: status.as_u16(),
                body,
            });
        }

        drain_sse(response.bytes_stream(), &mut sink).await
    }
}

/// Feed the text fragments of a server-sent-event stream to the sink.
/// Stops pulling as soon as the sink returns false.
async fn drain_sse<S, E, F>(stream: S, sink: &mut F) -> Result<String, Error>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    F: FnMut(&str) -> bool,
{
    pin_mut!(stream);

    let mut buf: Vec<u8> = Vec::new();
    let mut full = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| Error::UpstreamUnavailable(format!("stream interrupted: {}", err)))?;
        buf.extend_from_slice(&chunk);

        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            if !feed_line(&line, sink, &mut full)? {
                info!("consumer went away, stopping generation");
                return Ok(full);
            }
        }
    }

    // A final line without a trailing newline still counts.
    if !buf.is_empty() {
        feed_line(&buf, sink, &mut full)?;
    }

    Ok(full)
}

/// Returns false once the sink declines the fragment.
fn feed_line<F>(raw: &[u8], sink: &mut F, full: &mut String) -> Result<bool, Error>
where
    F: FnMut(&str) -> bool,
{
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(|c| c == '\n' || c == '\r');

    if let Some(text) = event_text(line)? {
        if !text.is_empty() {
            full.push_str(&text);
            return Ok(sink(&text));
        }
    }

    Ok(true)
}

/// Text carried by one SSE line, if it is a data line at all.
fn event_text(line: &str) -> Result<Option<String>, Error> {
    let payload = match line.strip_prefix("data:") {
        Some(payload) => payload.trim_start(),
        None => return Ok(None),
    };

    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|err| Error::MalformedPrediction(format!("bad stream chunk: {}", err)))?;

    let mut text = String::new();
    if let Some(candidate) = chunk.candidates.into_iter().next() {
        if let Some(content) = candidate.content {
            for part in content.parts {
                text.push_str(&part.text);
            }
        }
    }

    Ok(Some(text))
}
