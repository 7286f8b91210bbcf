//! HTTP API for the response agent UI
//!
//! - GET  /health - Health check
//! - POST /agent/{generate,review,rewrite,chat} - Text agents
//! - POST /files/extract?name= - Text extraction from an uploaded file
//! - POST /voice/sessions - Create a voice session
//! - DELETE /voice/sessions/:id - Dispose a voice session
//! - POST /voice/sessions/:id/record/{start,stop} - Microphone capture
//! - POST /voice/sessions/:id/{play,stop,waveform} - Playback and visualization
//! - POST /voice/respond - Spoken answer for a text

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, AudioRuntime};
