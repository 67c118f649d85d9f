use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-haiku-4-5";
const MAX_TOKENS: u32 = 300;

// Both failure paths resolve to prose, never to an error the UI would have
// to handle. Offline mode still teaches the basics.
pub(crate) const OFFLINE_TEXT: &str = "Offline mode (no ANTHROPIC_API_KEY set). The short \
answer: air scatters short wavelengths far more strongly than long ones, so a high sun \
leaves the sky blue. Near the horizon the light crosses many times more atmosphere, the \
blues are scattered out of the beam before it reaches you, and the reds remain.";

pub(crate) const UNAVAILABLE_TEXT: &str = "The explanation service could not be reached. \
Press e to try again.";

#[derive(Clone)]
pub(crate) struct ExplanationClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl ExplanationClient {
    pub(crate) fn from_env() -> Self {
        Self::with_key(std::env::var("ANTHROPIC_API_KEY").ok())
    }

    pub(crate) fn with_key(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub(crate) fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Always returns prose: a missing credential, a transport failure, and
    /// an empty response each map to a fixed fallback string.
    pub(crate) async fn explain(&self, angle: f64, path_length: f64) -> String {
        let Some(key) = self.api_key.clone() else {
            return OFFLINE_TEXT.to_string();
        };
        match self.request(&key, angle, path_length).await {
            Ok(text) if !text.trim().is_empty() => text,
            _ => UNAVAILABLE_TEXT.to_string(),
        }
    }

    async fn request(&self, key: &str, angle: f64, path_length: f64) -> Result<String> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt(angle, path_length),
            }],
        };

        let resp = self
            .http
            .post(API_URL)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("explanation request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("explanation HTTP {}", resp.status()));
        }

        let parsed: MessagesResponse = resp.json().await.context("explanation JSON parse failed")?;
        Ok(parsed
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join(""))
    }
}

fn prompt(angle: f64, path_length: f64) -> String {
    format!(
        "The sun sits at {angle:.1} degrees on a 0-180 sweep (90 is solar noon), so its \
light crosses about {path_length:.2}x as much atmosphere as the straight-up path. In two \
or three plain sentences, explain what Rayleigh scattering does to the sky's color at \
this elevation. No headings, no lists."
    )
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}
