//! External speech collaborators: text-to-speech and transcription.

pub mod transcribe;
pub mod tts;

pub use transcribe::{Availability, NoTranscriber, Transcriber, WhisperCli};
pub use tts::{EdgeTts, Synthesizer};
