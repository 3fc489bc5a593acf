//! beso-chat — Chat assistant core.
//!
//! A username/password store over SQLite, a keyword-rule reply dispatcher
//! that falls back to an instant-answer web API, and the session state that
//! ties login, transcript and file import together.

pub mod answer;
pub mod dispatcher;
pub mod ocr;
pub mod session;
pub mod store;

pub use answer::{AnswerError, InstantAnswerClient, QuestionAnswering};
pub use dispatcher::ResponseDispatcher;
pub use ocr::{OcrError, TesseractOcr, TextRecognizer};
pub use session::{ChatError, ChatSession, ConversationTurn, Notice, Origin, Screen, Speaker};
pub use store::{CredentialStore, StoreError};
