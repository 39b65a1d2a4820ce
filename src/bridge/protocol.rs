// Bridge protocol
// The closed set of channels crossing the trust boundary, and decoding of
// untrusted UI payloads into typed commands.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::print::PrintRequest;

/// UI → host channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandChannel {
    CheckForUpdates,
    Print,
    PrintHtmlContent,
    PrintBytes,
}

impl CommandChannel {
    pub const ALL: [CommandChannel; 4] = [
        CommandChannel::CheckForUpdates,
        CommandChannel::Print,
        CommandChannel::PrintHtmlContent,
        CommandChannel::PrintBytes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandChannel::CheckForUpdates => "check-for-updates",
            CommandChannel::Print => "print",
            CommandChannel::PrintHtmlContent => "print-html-content",
            CommandChannel::PrintBytes => "print-bytes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

/// Host → UI channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    UpdateStatus,
    DownloadProgress,
    PrintError,
}

impl EventChannel {
    pub const ALL: [EventChannel; 3] = [
        EventChannel::UpdateStatus,
        EventChannel::DownloadProgress,
        EventChannel::PrintError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventChannel::UpdateStatus => "update-status",
            EventChannel::DownloadProgress => "download-progress",
            EventChannel::PrintError => "print-error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

/// Decoded UI command. Only these can reach host handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    CheckForUpdates,
    Print(PrintRequest),
}

/// Payload of a `print-error` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrintFailure {
    /// Channel the failed request came in on
    pub kind: String,
    pub printer_name: String,
    pub message: String,
}

/// Event sent to the attached UI surface
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Human-readable lifecycle notice
    UpdateStatus(String),
    /// Download completion in percent
    DownloadProgress(f64),
    PrintError(PrintFailure),
}

impl HostEvent {
    pub fn channel(&self) -> EventChannel {
        match self {
            HostEvent::UpdateStatus(_) => EventChannel::UpdateStatus,
            HostEvent::DownloadProgress(_) => EventChannel::DownloadProgress,
            HostEvent::PrintError(_) => EventChannel::PrintError,
        }
    }

    /// Plain-data payload as delivered to the UI
    pub fn payload(&self) -> Value {
        match self {
            HostEvent::UpdateStatus(text) => json!(text),
            HostEvent::DownloadProgress(percent) => json!(percent),
            HostEvent::PrintError(failure) => json!(failure),
        }
    }
}

/// Errors raised at the bridge boundary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum BridgeError {
    /// Message arrived on a channel that is not declared
    UnknownChannel(String),

    /// Declared channel, but the payload does not match its shape
    MalformedPayload { channel: String, reason: String },

    /// The attached surface could not take the event
    Delivery(String),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::UnknownChannel(name) => write!(f, "Unknown bridge channel: {}", name),
            BridgeError::MalformedPayload { channel, reason } => {
                write!(f, "Malformed payload on {}: {}", channel, reason)
            }
            BridgeError::Delivery(msg) => write!(f, "Event delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Largest copy count accepted for one `print` message
pub const MAX_COPIES: u32 = 100;

impl UiCommand {
    /// Decode a raw message from the UI.
    ///
    /// Unknown channels and payloads that do not match the channel's shape
    /// are rejected; nothing is guessed.
    pub fn decode(channel: &str, payload: &Value) -> Result<UiCommand, BridgeError> {
        let declared = CommandChannel::from_name(channel)
            .ok_or_else(|| BridgeError::UnknownChannel(channel.to_string()))?;
        let malformed = |reason: &str| BridgeError::MalformedPayload {
            channel: channel.to_string(),
            reason: reason.to_string(),
        };

        match declared {
            CommandChannel::CheckForUpdates => match payload {
                Value::Null => Ok(UiCommand::CheckForUpdates),
                Value::Array(items) if items.is_empty() => Ok(UiCommand::CheckForUpdates),
                Value::Object(map) if map.is_empty() => Ok(UiCommand::CheckForUpdates),
                _ => Err(malformed("expected no payload")),
            },
            CommandChannel::Print => {
                let Value::Object(map) = payload else {
                    return Err(malformed("expected {printerName, copies}"));
                };
                let printer_name = printer_name(map.get("printerName"))
                    .ok_or_else(|| malformed("printerName must be a string"))?;
                let copies = copies(map.get("copies"))
                    .filter(|copies| *copies <= MAX_COPIES)
                    .ok_or_else(|| {
                        malformed(&format!("copies must be an integer from 0 to {}", MAX_COPIES))
                    })?;
                Ok(UiCommand::Print(PrintRequest::Named {
                    printer_name,
                    copies,
                }))
            }
            CommandChannel::PrintHtmlContent => {
                let (html, printer) = pair(payload, "html", "printerName")
                    .ok_or_else(|| malformed("expected (html, printerName)"))?;
                let html = html
                    .as_str()
                    .ok_or_else(|| malformed("html must be a string"))?
                    .to_string();
                let printer_name = printer_name(Some(printer))
                    .ok_or_else(|| malformed("printerName must be a string"))?;
                Ok(UiCommand::Print(PrintRequest::Html { html, printer_name }))
            }
            CommandChannel::PrintBytes => {
                let (bytes, printer) = pair(payload, "bytes", "printerName")
                    .ok_or_else(|| malformed("expected (bytes, printerName)"))?;
                let bytes = byte_buffer(bytes)
                    .ok_or_else(|| malformed("bytes must be a byte array or base64 string"))?;
                let printer_name = printer_name(Some(printer))
                    .ok_or_else(|| malformed("printerName must be a string"))?;
                Ok(UiCommand::Print(PrintRequest::Bytes {
                    bytes,
                    printer_name,
                }))
            }
        }
    }
}

/// Two-argument payload, either positional `[a, b]` or named `{a, b}`
fn pair<'a>(payload: &'a Value, first: &str, second: &str) -> Option<(&'a Value, &'a Value)> {
    match payload {
        Value::Array(items) if items.len() == 2 => Some((&items[0], &items[1])),
        Value::Object(map) => Some((map.get(first)?, map.get(second)?)),
        _ => None,
    }
}

fn printer_name(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_string)
}

/// Copy count; a missing count means one copy. Numeric strings are accepted.
fn copies(value: Option<&Value>) -> Option<u32> {
    match value {
        None | Some(Value::Null) => Some(1),
        Some(Value::Number(n)) => {
            if let Some(whole) = n.as_u64() {
                return u32::try_from(whole).ok();
            }
            let float = n.as_f64()?;
            if float >= 0.0 && float.fract() == 0.0 && float <= u32::MAX as f64 {
                Some(float as u32)
            } else {
                None
            }
        }
        Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
        Some(_) => None,
    }
}

/// Byte buffer as a number array, a base64 string, or a typed array
/// serialized as an index-keyed object (`{"0": 27, "1": 64}`)
fn byte_buffer(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(encoded) => BASE64_STANDARD.decode(encoded).ok(),
        Value::Array(items) => items.iter().map(byte).collect(),
        Value::Object(map) => {
            let mut bytes = vec![0u8; map.len()];
            for (key, item) in map {
                let index = key.parse::<usize>().ok()?;
                // "00" or "+1" would alias another index
                if index.to_string() != *key {
                    return None;
                }
                *bytes.get_mut(index)? = byte(item)?;
            }
            Some(bytes)
        }
        _ => None,
    }
}

fn byte(value: &Value) -> Option<u8> {
    value.as_u64().and_then(|n| u8::try_from(n).ok())
}
