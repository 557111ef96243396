//! # Response Assembly
//!
//! Shapes pipeline output into the externally visible result contract.
//! Pure data shaping; nothing here can fail. Every request produces exactly
//! one of the two envelope variants: a success envelope from `assemble`, or
//! an error envelope from `assemble_error` when any upstream stage failed.

use crate::detection::classifier::Label;
use serde::Serialize;

/// The terminal entity of the pipeline: success or error envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetectionOutcome {
    Success {
        status: String,
        language: String,
        classification: Label,
        #[serde(rename = "confidenceScore")]
        confidence_score: f64,
        explanation: String,
    },
    Error {
        status: String,
        message: String,
    },
}

/// Package a classification into the success envelope, echoing the declared
/// language back to the caller.
pub fn assemble(label: Label, score: f64, language: &str, explanation: &str) -> DetectionOutcome {
    DetectionOutcome::Success {
        status: "success".to_string(),
        language: language.to_string(),
        classification: label,
        confidence_score: score,
        explanation: explanation.to_string(),
    }
}

/// Package a failure message into the error envelope.
pub fn assemble_error(message: impl Into<String>) -> DetectionOutcome {
    DetectionOutcome::Error {
        status: "error".to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_matches_wire_contract() {
        let outcome = assemble(Label::AiGenerated, 0.91, "Telugu", "robotic stability");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["language"], "Telugu");
        assert_eq!(json["classification"], "AI_GENERATED");
        assert_eq!(json["confidenceScore"], 0.91);
        assert_eq!(json["explanation"], "robotic stability");
    }

    #[test]
    fn error_envelope_matches_wire_contract() {
        let outcome = assemble_error("Audio decoding failed: bad frame");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Audio decoding failed: bad frame");
        assert!(json.get("classification").is_none());
    }

    #[test]
    fn human_label_serializes_in_success_envelope() {
        let outcome = assemble(Label::Human, 0.95, "English", "natural resonance");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["classification"], "HUMAN");
    }
}
