use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::twilio::twiml::VoiceResponse;
use crate::AppState;

/// Spoken when the chat completion fails. Also recorded as the assistant
/// turn so the transcript matches what the caller heard.
const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again.";

/// Spoken when Twilio delivered no transcript for a continuing call.
const REPROMPT: &str = "I didn't catch that. Could you please repeat?";

/// Spoken after the gather times out with no further input.
const FAREWELL: &str = "Thank you for calling. Have a great day!";

/// Form fields Twilio posts on each turn of an active call. Twilio sends
/// many more; we only bind what the conversation needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhook {
    pub call_sid: String,
    #[serde(default)]
    pub speech_result: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Handle GET|POST /voice-handler, one conversation turn.
///
/// First webhook for a CallSid greets the caller. Later webhooks carry the
/// transcript of the caller's utterance; the reply comes from the chat
/// completion over the full history. Either way the response is TwiML that
/// speaks the reply and gathers the next utterance.
pub async fn handle_voice(
    State(state): State<AppState>,
    Form(form): Form<VoiceWebhook>,
) -> Response {
    let call_sid = form.call_sid.as_str();

    let created = state.sessions.begin(call_sid, &state.system_prompt).await;

    let reply = if created {
        tracing::info!(call_sid, from = form.from.as_deref(), "New conversation");
        greeting_text(&state.config.agent)
    } else {
        match form.speech_result.as_deref().map(str::trim) {
            Some(speech) if !speech.is_empty() => {
                tracing::info!(call_sid, transcript = %speech, "Caller turn");

                let history = state.sessions.record_user(call_sid, speech).await;
                let reply = match state.together.chat(&history).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(call_sid, "Chat completion failed: {e}");
                        FALLBACK_REPLY.to_string()
                    }
                };
                state.sessions.record_assistant(call_sid, &reply).await;
                reply
            }
            _ => {
                tracing::debug!(call_sid, "No speech captured, reprompting");
                REPROMPT.to_string()
            }
        }
    };

    tracing::info!(call_sid, reply_len = reply.len(), "Responding");

    ([("Content-Type", "text/xml")], turn_twiml(&reply)).into_response()
}

/// TwiML for one turn: speak the reply inside a speech gather, with a
/// farewell that only plays if the caller stays silent through the timeout.
fn turn_twiml(reply: &str) -> String {
    VoiceResponse::new()
        .gather_speech(reply, "/voice-handler")
        .say(FAREWELL)
        .hangup()
        .build()
}

/// The first thing the caller hears: the configured greeting, or one from
/// the time-aware pool when none is configured.
fn greeting_text(agent: &AgentConfig) -> String {
    if agent.greeting.is_empty() {
        crate::greeting::select_greeting(&agent.name)
    } else {
        agent.greeting.clone()
    }
}

/// Recording lifecycle fields from Twilio's status callback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordingStatusWebhook {
    pub call_sid: String,
    #[serde(default)]
    pub recording_sid: Option<String>,
    #[serde(default)]
    pub recording_status: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub recording_duration: Option<String>,
}

#[derive(Serialize)]
struct AckResponse {
    status: &'static str,
}

/// Handle POST /recording-status, Twilio's recording status callback.
///
/// A `completed` recording means the call is over, so the conversation
/// session is dropped here. Unknown CallSids are acknowledged anyway.
pub async fn handle_recording_status(
    State(state): State<AppState>,
    Form(form): Form<RecordingStatusWebhook>,
) -> impl IntoResponse {
    tracing::info!(
        call_sid = %form.call_sid,
        recording_sid = form.recording_sid.as_deref(),
        status = form.recording_status.as_deref(),
        "Recording status update"
    );

    if form.recording_status.as_deref() == Some("completed") {
        tracing::info!(
            call_sid = %form.call_sid,
            url = form.recording_url.as_deref(),
            duration_secs = form.recording_duration.as_deref(),
            "Recording completed"
        );
        state.sessions.end(&form.call_sid).await;
    }

    Json(AckResponse { status: "received" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_twiml_gathers_then_says_farewell() {
        let twiml = turn_twiml("How can I help?");
        let gather = twiml.find("<Gather").unwrap();
        let reply = twiml.find("How can I help?").unwrap();
        let farewell = twiml.find(FAREWELL).unwrap();
        assert!(gather < reply && reply < farewell);
        assert!(twiml.contains("action=\"/voice-handler\""));
    }

    #[test]
    fn turn_twiml_escapes_llm_reply() {
        let twiml = turn_twiml("Widgets & Co <sells> gadgets");
        assert!(twiml.contains("Widgets &amp; Co &lt;sells&gt; gadgets"));
    }

    #[test]
    fn configured_greeting_wins() {
        let agent = AgentConfig {
            greeting: "Hello from the test suite.".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(greeting_text(&agent), "Hello from the test suite.");
    }

    #[test]
    fn empty_greeting_uses_pool() {
        let agent = AgentConfig {
            name: "Iris".to_string(),
            ..AgentConfig::default()
        };
        let greeting = greeting_text(&agent);
        assert!(greeting.contains("Iris"), "pool greeting should name the agent: {greeting}");
    }

    #[test]
    fn voice_webhook_parses_without_speech() {
        let form: VoiceWebhook = serde_json::from_value(serde_json::json!({
            "CallSid": "CA123",
            "From": "+15550001111",
            "CallStatus": "in-progress"
        }))
        .unwrap();
        assert_eq!(form.call_sid, "CA123");
        assert!(form.speech_result.is_none());
    }

    #[test]
    fn recording_webhook_parses_completed() {
        let form: RecordingStatusWebhook = serde_json::from_value(serde_json::json!({
            "CallSid": "CA123",
            "RecordingSid": "RE1",
            "RecordingStatus": "completed",
            "RecordingDuration": "42"
        }))
        .unwrap();
        assert_eq!(form.recording_status.as_deref(), Some("completed"));
        assert_eq!(form.recording_duration.as_deref(), Some("42"));
    }
}
