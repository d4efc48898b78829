//! Decides which status code an oracle reports for a request.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::config::StatusSetting;
use crate::models::{StatusCode, StatusRequest};

pub trait StatusResolver: Send + Sync {
    fn resolve(&self, request: &StatusRequest) -> StatusCode;
}

/// Always reports the same code.
#[derive(Debug, Clone, Copy)]
pub struct FixedStatus(pub StatusCode);

impl StatusResolver for FixedStatus {
    fn resolve(&self, _request: &StatusRequest) -> StatusCode {
        self.0
    }
}

/// Draws a code uniformly from every status the contract knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomStatus;

impl StatusResolver for RandomStatus {
    fn resolve(&self, _request: &StatusRequest) -> StatusCode {
        StatusCode::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(StatusCode::Unknown)
    }
}

pub fn resolver_for(setting: StatusSetting) -> Arc<dyn StatusResolver> {
    match setting {
        StatusSetting::Fixed(code) => Arc::new(FixedStatus(code)),
        StatusSetting::Random => Arc::new(RandomStatus),
    }
}
