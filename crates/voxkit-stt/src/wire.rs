//! Client-side wire messages for the transcription protocol.
//!
//! Inbound action messages are decoded by `voxkit_transcript::MessageDecoder`;
//! this module owns what the client sends: the configuration handshake and
//! the end-of-stream announcement.

use serde::Serialize;

/// Open message sent right after the socket opens.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfiguration {
    #[serde(rename = "type")]
    kind: ConfigurationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ConfigurationKind;

impl Serialize for ConfigurationKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("ClientConfiguration")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub voice_editing: VoiceEditing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceEditing {
    pub is_enabled: bool,
}

impl ClientConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_report_id(mut self, report_id: impl Into<String>) -> Self {
        self.report_id = Some(report_id.into());
        self
    }

    pub fn with_voice_editing(mut self, is_enabled: bool) -> Self {
        self.features = Some(Features {
            voice_editing: VoiceEditing { is_enabled },
        });
        self
    }
}

/// Close message announcing that no more audio will follow.
pub fn end_of_stream_message() -> String {
    r#"{"type":"EndOfStream"}"#.to_string()
}
