//! Senior Assistant - push-to-talk voice assistant
//!
//! A recorded voice command goes to a generative backend together with a
//! table of device actions. The backend either answers or asks for an
//! action; requested actions run locally and their results are fed back
//! until a final answer arrives, which is then spoken.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Shell (push-to-talk)                 │
//! │   Recorder  │  Status  │  Speaker (TTS / console)    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Command loop                       │
//! │   Conversation  │  Backend (Gemini)  │  Dispatch     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Actions                          │
//! │   Weather  │  Contacts  │  Dialer  │  Calendar       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod agent;
pub mod assistant;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod prompt;
pub mod shell;
pub mod voice;

pub use actions::{ActionError, ActionErrorKind, Actions, PermissionStatus};
pub use agent::{CommandLoop, LoopEvent};
pub use backend::{Backend, BackendRequest, BackendResponse, GeminiClient};
pub use config::Config;
pub use conversation::{Conversation, Utterance};
pub use db::{DbConn, DbPool};
pub use dispatch::{ActionRequest, ActionResult, DispatchTable};
pub use error::{Error, Result};
pub use shell::{Shell, ShellStatus};
