pub mod auth;
pub mod client;
pub mod error;
pub mod generate;
pub mod handler;
pub mod labels;
pub mod timer;
pub mod upload;

pub use auth::{AccessToken, TokenSource, DEFAULT_TOKEN_VAR};
pub use client::{Classification, ClientConfig, SkinClassifier, DEFAULT_MODEL_ENDPOINT};
pub use error::Error;
pub use generate::{GenerateConfig, TextGenerator, DEFAULT_GENERATE_ENDPOINT};
pub use handler::{handle, HttpReply, LIVENESS_BANNER};
pub use timer::Timer;
pub use upload::{UploadedImage, MAX_UPLOAD_BYTES};
