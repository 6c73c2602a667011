use serde::Deserialize;

use crate::config::TwilioConfig;

/// Twilio REST API client for initiating outbound calls.
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    external_url: String,
}

/// The slice of the Calls resource we care about.
#[derive(Deserialize)]
struct CallResource {
    sid: String,
}

impl TwilioClient {
    pub fn new(twilio_config: &TwilioConfig, external_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: twilio_config.account_sid.clone(),
            auth_token: twilio_config.auth_token.clone(),
            from_number: twilio_config.phone_number.clone(),
            external_url: external_url.trim_end_matches('/').to_string(),
        }
    }

    /// Initiate an outbound call. Twilio will call `to`, and when answered,
    /// POST to our /voice-handler webhook for the first conversation turn.
    /// The call is recorded and recording lifecycle events land on
    /// /recording-status.
    pub async fn call(&self, to: &str) -> Result<String, OutboundError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            self.account_sid
        );

        let voice_url = format!("{}/voice-handler", self.external_url);
        let recording_callback = format!("{}/recording-status", self.external_url);

        let params = [
            ("To", to),
            ("From", &self.from_number),
            ("Url", &voice_url),
            ("Record", "true"),
            ("RecordingStatusCallback", &recording_callback),
            ("RecordingStatusCallbackMethod", "POST"),
        ];

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| OutboundError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OutboundError::Api(format!("{status}: {body}")));
        }

        let call: CallResource = resp
            .json()
            .await
            .map_err(|e| OutboundError::Request(e.to_string()))?;

        tracing::info!(to, call_sid = %call.sid, "Outbound call initiated");
        Ok(call.sid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("Twilio API error: {0}")]
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_resource_parses_sid() {
        let raw = r#"{
            "sid": "CA5ef8732a3c49700934481addd5ce1659",
            "status": "queued",
            "direction": "outbound-api"
        }"#;
        let call: CallResource = serde_json::from_str(raw).unwrap();
        assert_eq!(call.sid, "CA5ef8732a3c49700934481addd5ce1659");
    }
}
