use std::sync::Arc;

use crate::config::Config;
use crate::loader::BankCache;
use crate::service::ExamService;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<BankCache>,
    pub service: Arc<ExamService>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<BankCache> {
    fn from_ref(state: &AppState) -> Self {
        state.bank.clone()
    }
}

impl FromRef<AppState> for Arc<ExamService> {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
