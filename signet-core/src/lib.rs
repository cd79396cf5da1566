pub mod common;
pub mod domain;
pub mod storage;

pub use common::error::{Result, SignetError};
pub use domain::{AutoSignatureTerm, Document, Signer, Status, User, WebhookEvent};
