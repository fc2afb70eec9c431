//! Gateway boundary
//!
//! Inbound events arrive as [`GatewayEvent`]s on an mpsc channel; replies
//! leave through a [`ResponseSink`]. The stdio gateway reads JSON lines from
//! any async reader and writes responses as JSON lines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::interaction::{ExecutionError, RawInteraction};

/// Event received from the platform gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// An interaction to route
    Interaction { interaction: RawInteraction },
    /// Any other named gateway event, routed to the event registry
    Dispatch {
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Embed colours
pub mod colors {
    pub const ERROR: u32 = 0xED4245;
    pub const SUCCESS: u32 = 0x57F287;
    pub const INFO: u32 = 0x5865F2;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Rich message embed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: Some("Error".to_string()),
            description: Some(description.into()),
            color: Some(colors::ERROR),
            fields: Vec::new(),
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self {
            title: Some("Success".to_string()),
            description: Some(description.into()),
            color: Some(colors::SUCCESS),
            fields: Vec::new(),
        }
    }

    pub fn info() -> Self {
        Self {
            color: Some(colors::INFO),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Message reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub ephemeral: bool,
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    Message(Message),
    Autocomplete { choices: Vec<Choice> },
}

/// Reply to a single interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub interaction_id: String,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl InteractionResponse {
    pub fn message(interaction_id: impl Into<String>, message: Message) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            body: ResponseBody::Message(message),
        }
    }

    pub fn autocomplete(interaction_id: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            body: ResponseBody::Autocomplete { choices },
        }
    }
}

/// Outbound side of the gateway
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn send(&self, response: InteractionResponse) -> Result<(), ExecutionError>;
}

/// Sink writing one JSON line per response
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl JsonLineSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ResponseSink for JsonLineSink<W> {
    async fn send(&self, response: InteractionResponse) -> Result<(), ExecutionError> {
        let mut line = serde_json::to_vec(&response)
            .map_err(|e| ExecutionError::Internal(format!("Failed to encode response: {}", e)))?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| ExecutionError::Internal(format!("Failed to write response: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| ExecutionError::Internal(format!("Failed to flush response: {}", e)))
    }
}

/// Spawn a task that parses JSON lines from `reader` into gateway events
///
/// Malformed lines are logged and skipped. The channel closes at end of input.
pub fn spawn_line_reader<R>(reader: R, capacity: usize) -> mpsc::Receiver<GatewayEvent>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GatewayEvent>(line) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed gateway event: {}", e),
                    }
                }
                Ok(None) => {
                    debug!("Gateway input closed");
                    break;
                }
                Err(e) => {
                    warn!("Gateway read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Shared sink handle
pub type SharedSink = Arc<dyn ResponseSink>;
