//! Speech synthesis seam used for the automated greeting

/// Something to say
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// BCP 47 language tag
    pub lang: String,
    /// Speaking rate, 1.0 is normal
    pub rate: f32,
}

/// Text-to-speech output
pub trait SpeechSynthesizer: Send + Sync {
    /// Queue an utterance
    fn speak(&self, utterance: &Utterance);

    /// Cancel anything queued or playing
    fn cancel(&self);
}

/// Synthesizer for platforms without speech support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpeech;

impl SpeechSynthesizer for NoopSpeech {
    fn speak(&self, utterance: &Utterance) {
        tracing::debug!("Speech unavailable, skipping greeting: {}", utterance.text);
    }

    fn cancel(&self) {}
}
