pub mod app;
pub mod client;
pub mod dto;
pub mod submission;

pub use app::reconcile::{ProviderEvent, ReconcileOutcome, ReconcileUseCase};
pub use app::signing::{DocumentUseCase, TermUseCase};
pub use client::{ProviderClient, ProviderConfig, ProviderResponse, SignatureTransport, TransportError};
pub use submission::{SubmissionError, SubmissionFailure, SubmissionOutcome, SubmissionService};
