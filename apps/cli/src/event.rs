//! Parsing of `arxiv-research-assistant.search` event payloads.

use arxiv_assistant_shared::{AssistantError, RESEARCH_EVENT, ResearchRequest, Result};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum EventPayload {
    Envelope {
        #[serde(default)]
        name: Option<String>,
        data: ResearchRequest,
    },
    Bare {
        #[serde(default)]
        name: Option<String>,
        #[serde(flatten)]
        data: ResearchRequest,
    },
}

/// Parse an event given either as `{name?, data: {input, model?}}` or bare `{input, model?}`.
pub(crate) fn parse_event(raw: &str) -> Result<ResearchRequest> {
    let payload: EventPayload = serde_json::from_str(raw).map_err(|e| {
        AssistantError::validation(format!(
            "expected {{\"name\"?, \"data\": {{\"input\", \"model\"?}}}} or {{\"input\", \"model\"?}}: {e}"
        ))
    })?;

    let (name, request) = match payload {
        EventPayload::Envelope { name, data } | EventPayload::Bare { name, data } => (name, data),
    };

    if let Some(name) = name {
        if name != RESEARCH_EVENT {
            return Err(AssistantError::validation(format!(
                "unsupported event '{name}', expected '{RESEARCH_EVENT}'"
            )));
        }
    }

    if request.input.trim().is_empty() {
        return Err(AssistantError::validation("event input must not be empty"));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_name() {
        let request = parse_event(
            r#"{"name":"arxiv-research-assistant.search","data":{"input":"What is RLHF?","model":"gpt-4o"}}"#,
        )
        .unwrap();
        assert_eq!(request.input, "What is RLHF?");
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn envelope_without_name() {
        let request = parse_event(r#"{"data":{"input":"q"}}"#).unwrap();
        assert_eq!(request.input, "q");
        assert!(request.model.is_none());
    }

    #[test]
    fn bare_payload() {
        let request = parse_event(r#"{"input":"q","model":"deepseek-chat"}"#).unwrap();
        assert_eq!(request.model_id(), "deepseek-chat");
    }

    #[test]
    fn wrong_event_name_is_rejected() {
        let err = parse_event(r#"{"name":"other.event","data":{"input":"q"}}"#).unwrap_err();
        assert!(err.to_string().contains("other.event"));
    }

    #[test]
    fn wrong_event_name_on_bare_payload_is_rejected() {
        let err = parse_event(r#"{"name":"other.event","input":"q"}"#).unwrap_err();
        assert!(err.to_string().contains("other.event"));
    }

    #[test]
    fn bare_payload_with_matching_name() {
        let request =
            parse_event(r#"{"name":"arxiv-research-assistant.search","input":"q"}"#).unwrap();
        assert_eq!(request.input, "q");
    }

    #[test]
    fn missing_input_is_rejected() {
        assert!(parse_event(r#"{"model":"gpt-4o"}"#).is_err());
        assert!(parse_event(r#"{"input":"   "}"#).is_err());
        assert!(parse_event("not json").is_err());
    }
}
