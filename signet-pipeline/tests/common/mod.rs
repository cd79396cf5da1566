#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use signet_core::{AutoSignatureTerm, Document, Signer};
use signet_pipeline::client::{ProviderResponse, SignatureTransport, TransportError};

/// Scripted stand-in for the provider. Pops one queued result per POST and
/// counts outbound calls; an exhausted script fails as a network error so a
/// test making more calls than expected cannot silently pass.
pub struct FakeProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, TransportError>>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0) })
    }

    pub fn enqueue_ok(&self, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProviderResponse {
            status: 201,
            bytes: body.as_bytes().to_vec(),
            headers: Default::default(),
        }));
    }

    pub fn enqueue_err(&self, err: TransportError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignatureTransport for FakeProvider {
    async fn get(&self, _path: &str) -> Result<ProviderResponse, TransportError> {
        unimplemented!("the pipeline only posts")
    }

    async fn post(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }

    async fn put(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        unimplemented!("the pipeline only posts")
    }

    async fn patch(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        unimplemented!("the pipeline only posts")
    }

    async fn delete(&self, _path: &str) -> Result<ProviderResponse, TransportError> {
        unimplemented!("the pipeline only posts")
    }
}

pub fn term() -> AutoSignatureTerm {
    AutoSignatureTerm::new(
        Signer {
            documentation: "863.456.209-10".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            email: "a@b.c".to_string(),
            name: "Ana Souza".to_string(),
        },
        "adm@x.y".to_string(),
        "api@x.y".to_string(),
    )
}

pub fn document() -> Document {
    Document::new(
        "contract.pdf".to_string(),
        "/files/contract.pdf".to_string(),
        2048,
        "application/pdf".to_string(),
        Some("service agreement".to_string()),
    )
}
