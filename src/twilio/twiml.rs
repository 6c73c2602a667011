/// Polly voice used for all spoken responses.
pub const VOICE: &str = "Polly.Joanna";

/// Builder for TwiML voice responses.
///
/// Produces the XML document Twilio executes verb by verb. Only the verbs
/// this service uses are implemented; everything rendered into the
/// document is escaped, since reply text comes from the LLM.
pub struct VoiceResponse {
    body: String,
}

impl Default for VoiceResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self { body: String::new() }
    }

    /// `<Say>`: Twilio speaks the text with the Polly voice.
    pub fn say(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            "    <Say voice=\"{}\">{}</Say>\n",
            VOICE,
            xml_escape(text)
        ));
        self
    }

    /// `<Hangup/>`, ending the call.
    pub fn hangup(mut self) -> Self {
        self.body.push_str("    <Hangup/>\n");
        self
    }

    /// `<Gather input="speech">` wrapping a spoken prompt.
    ///
    /// Twilio transcribes the caller's next utterance and POSTs the result
    /// to `action` as `SpeechResult`. Attributes match the enhanced
    /// phone-call model with automatic end-of-speech detection.
    pub fn gather_speech(mut self, prompt: &str, action: &str) -> Self {
        self.body.push_str(&format!(
            concat!(
                "    <Gather input=\"speech\" action=\"{}\" method=\"POST\" ",
                "enhanced=\"true\" speechModel=\"phone_call\" ",
                "speechTimeout=\"auto\" timeout=\"10\">\n",
                "        <Say voice=\"{}\">{}</Say>\n",
                "    </Gather>\n"
            ),
            xml_escape(action),
            VOICE,
            xml_escape(prompt)
        ));
        self
    }

    /// Render the complete TwiML document.
    pub fn build(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n{}</Response>",
            self.body
        )
    }
}

/// Escape text for XML content and attribute values.
fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_valid_document() {
        let twiml = VoiceResponse::new().build();
        assert!(twiml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(twiml.contains("<Response>"));
        assert!(twiml.ends_with("</Response>"));
    }

    #[test]
    fn say_renders_voice_and_text() {
        let twiml = VoiceResponse::new().say("Hello caller").build();
        assert!(twiml.contains("<Say voice=\"Polly.Joanna\">Hello caller</Say>"));
    }

    #[test]
    fn gather_wraps_prompt_with_speech_attributes() {
        let twiml = VoiceResponse::new()
            .gather_speech("How can I help?", "/voice-handler")
            .build();
        assert!(twiml.contains("input=\"speech\""));
        assert!(twiml.contains("action=\"/voice-handler\""));
        assert!(twiml.contains("speechModel=\"phone_call\""));
        assert!(twiml.contains("speechTimeout=\"auto\""));
        assert!(twiml.contains("timeout=\"10\""));
        assert!(twiml.contains("<Say voice=\"Polly.Joanna\">How can I help?</Say>"));
    }

    #[test]
    fn verbs_render_in_call_order() {
        let twiml = VoiceResponse::new()
            .gather_speech("prompt", "/voice-handler")
            .say("Goodbye")
            .hangup()
            .build();
        let gather = twiml.find("<Gather").unwrap();
        let goodbye = twiml.find("Goodbye").unwrap();
        let hangup = twiml.find("<Hangup/>").unwrap();
        assert!(gather < goodbye && goodbye < hangup);
    }

    #[test]
    fn reply_text_is_escaped() {
        let twiml = VoiceResponse::new()
            .say("Tom & Jerry <3 \"quotes\"")
            .build();
        assert!(twiml.contains("Tom &amp; Jerry &lt;3 &quot;quotes&quot;"));
        assert!(!twiml.contains("& Jerry"));
    }

    #[test]
    fn escape_handles_all_specials() {
        assert_eq!(xml_escape("a&b<c>d\"e'f"), "a&amp;b&lt;c&gt;d&quot;e&apos;f");
        assert_eq!(xml_escape("plain text"), "plain text");
    }
}
