use crate::config::SamplingDefaults;
use crate::error::{CoreResult, RelayError};
use crate::model::{CompletionRequest, UpstreamPayload};

/// Validate a client request and build the upstream body.
///
/// `upstream_model` is the model id after namespace resolution. Unset
/// `stream`, `temperature` and `top_p` take their defaults; penalties are
/// forwarded only when the caller set them.
pub fn normalize_request(
    req: CompletionRequest,
    upstream_model: &str,
    defaults: &SamplingDefaults,
) -> CoreResult<UpstreamPayload> {
    if upstream_model.trim().is_empty() {
        return Err(RelayError::Validation("model must not be empty".into()));
    }
    if req.messages.is_empty() {
        return Err(RelayError::Validation(
            "messages must contain at least one entry".into(),
        ));
    }

    Ok(UpstreamPayload {
        model: upstream_model.to_string(),
        messages: req.messages,
        stream: req.stream.unwrap_or(defaults.stream),
        temperature: req.temperature.unwrap_or(defaults.temperature),
        top_p: req.top_p.unwrap_or(defaults.top_p),
        frequency_penalty: req.frequency_penalty,
        presence_penalty: req.presence_penalty,
    })
}
