use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use tracing::{info, warn};

use super::oauth::{fetch_project_id, refresh_access_token};
use super::store::CredentialStoreHandle;
use super::Credential;
use crate::config::{RotationStrategy, UpstreamConfig};
use crate::error::{GatewayError, OauthError};

#[derive(Debug)]
pub enum RotatorMessage {
    GetToken(RpcReplyPort<Option<Credential>>),
    DisableToken(String),
    MarkQuotaExhausted(String),
    RestoreQuota(String),
    UpdateRotationConfig(RotationStrategy, u32),
}

#[derive(Clone)]
pub struct RotatorHandle {
    actor: ActorRef<RotatorMessage>,
}

impl RotatorHandle {
    /// Returns a live credential ready to call upstream, or `None` if none is available.
    pub async fn get_token(&self) -> Result<Option<Credential>, GatewayError> {
        ractor::call!(self.actor, RotatorMessage::GetToken)
            .map_err(|e| GatewayError::RactorError(format!("GetToken RPC failed: {e}")))
    }

    pub fn disable_token(&self, refresh_token: String) {
        let _ = ractor::cast!(self.actor, RotatorMessage::DisableToken(refresh_token));
    }

    pub fn mark_quota_exhausted(&self, refresh_token: String) {
        let _ = ractor::cast!(self.actor, RotatorMessage::MarkQuotaExhausted(refresh_token));
    }

    pub fn restore_quota(&self, refresh_token: String) {
        let _ = ractor::cast!(self.actor, RotatorMessage::RestoreQuota(refresh_token));
    }

    pub fn update_rotation_config(&self, strategy: RotationStrategy, request_count_per_token: u32) {
        let _ = ractor::cast!(
            self.actor,
            RotatorMessage::UpdateRotationConfig(strategy, request_count_per_token)
        );
    }
}

pub struct RotatorActor;

pub struct RotatorArgs {
    pub store: CredentialStoreHandle,
    pub http: reqwest::Client,
    pub upstream: UpstreamConfig,
}

pub struct RotatorState {
    store: CredentialStoreHandle,
    http: reqwest::Client,
    strategy: RotationStrategy,
    request_count_per_token: u32,
    upstream: UpstreamConfig,
    rows: Vec<Credential>,
    current_index: usize,
    request_count: HashMap<String, u32>,
}

#[ractor::async_trait]
impl Actor for RotatorActor {
    type Msg = RotatorMessage;
    type State = RotatorState;
    type Arguments = RotatorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let rows = args.store.list().await?;
        info!(count = rows.len(), "rotator loaded credentials from store");
        Ok(RotatorState {
            store: args.store,
            http: args.http,
            strategy: args.upstream.rotation_strategy,
            request_count_per_token: args.upstream.request_count_per_token,
            upstream: args.upstream,
            rows,
            current_index: 0,
            request_count: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RotatorMessage::GetToken(reply) => {
                let token = select_token(state).await;
                let _ = reply.send(token);
            }
            RotatorMessage::DisableToken(refresh_token) => {
                disable(state, &refresh_token).await;
            }
            RotatorMessage::MarkQuotaExhausted(refresh_token) => {
                if let Some(row) = find_mut(state, &refresh_token) {
                    row.has_quota = false;
                }
                if state.strategy == RotationStrategy::QuotaExhausted {
                    advance(state);
                }
                persist_row(state, &refresh_token).await;
            }
            RotatorMessage::RestoreQuota(refresh_token) => {
                if let Some(row) = find_mut(state, &refresh_token) {
                    row.has_quota = true;
                }
                persist_row(state, &refresh_token).await;
            }
            RotatorMessage::UpdateRotationConfig(strategy, request_count_per_token) => {
                state.strategy = strategy;
                state.request_count_per_token = request_count_per_token;
                state.request_count.clear();
                state.current_index = 0;
            }
        }
        Ok(())
    }
}

fn find_mut<'a>(state: &'a mut RotatorState, refresh_token: &str) -> Option<&'a mut Credential> {
    state.rows.iter_mut().find(|c| c.refresh_token == refresh_token)
}

async fn persist_row(state: &RotatorState, refresh_token: &str) {
    if let Some(row) = state.rows.iter().find(|c| c.refresh_token == refresh_token) {
        state.store.persist_one(row.clone());
    }
}

async fn disable(state: &mut RotatorState, refresh_token: &str) {
    if let Some(row) = find_mut(state, refresh_token) {
        row.enable = false;
        warn!(%refresh_token, "credential disabled");
    }
    persist_row(state, refresh_token).await;
}

fn advance(state: &mut RotatorState) {
    advance_index(&mut state.current_index, state.rows.len());
}

fn advance_index(current_index: &mut usize, len: usize) {
    if len != 0 {
        *current_index = (*current_index + 1) % len;
    }
}

/// Implements the circular-scan selection algorithm.
async fn select_token(state: &mut RotatorState) -> Option<Credential> {
    let n = state.rows.len();
    if n == 0 {
        return None;
    }

    let start = state.current_index % n;
    for offset in 0..n {
        let idx = (start + offset) % n;

        if !state.rows[idx].enable {
            continue;
        }
        if state.strategy == RotationStrategy::QuotaExhausted && !state.rows[idx].has_quota {
            continue;
        }

        let now = now_ms();
        if state.rows[idx].is_expired(now) {
            let refresh_token = state.rows[idx].refresh_token.clone();
            match refresh_access_token(&state.http, &state.upstream, &refresh_token).await {
                Ok(refreshed) => {
                    let row = &mut state.rows[idx];
                    row.access_token = Some(refreshed.access_token);
                    row.expires_in = refreshed.expires_in;
                    row.timestamp = refreshed.timestamp;
                }
                Err(OauthError::UpstreamStatus(status))
                    if status.as_u16() == 400 || status.as_u16() == 403 =>
                {
                    disable(state, &refresh_token).await;
                    continue;
                }
                Err(e) => {
                    warn!(%refresh_token, error = %e, "token refresh failed, skipping this attempt");
                    continue;
                }
            }
            persist_row(state, &refresh_token).await;
        }

        if state.rows[idx].project_id.is_none() {
            let refresh_token = state.rows[idx].refresh_token.clone();
            let access_token = state.rows[idx].access_token.clone();
            if let Some(access_token) = access_token {
                match fetch_project_id(&state.http, &state.upstream, &access_token).await {
                    Ok(project_id) => {
                        if let Some(row) = find_mut(state, &refresh_token) {
                            row.project_id = Some(project_id);
                        }
                        persist_row(state, &refresh_token).await;
                    }
                    Err(OauthError::UpstreamStatus(status))
                        if status.as_u16() == 401 || status.as_u16() == 403 =>
                    {
                        disable(state, &refresh_token).await;
                        continue;
                    }
                    Err(e) => {
                        warn!(%refresh_token, error = %e, "project discovery failed, skipping without disabling");
                        continue;
                    }
                }
            }
        }

        state.current_index = idx;
        match state.strategy {
            RotationStrategy::RoundRobin | RotationStrategy::QuotaExhausted => advance(state),
            RotationStrategy::RequestCount => {
                let refresh_token = state.rows[idx].refresh_token.clone();
                let count = state.request_count.entry(refresh_token).or_insert(0);
                *count += 1;
                if *count >= state.request_count_per_token {
                    let key = state.rows[idx].refresh_token.clone();
                    state.request_count.insert(key, 0);
                    advance(state);
                }
            }
        }

        return Some(state.rows[idx].clone());
    }

    if state.strategy == RotationStrategy::QuotaExhausted {
        for row in state.rows.iter_mut() {
            row.has_quota = true;
        }
        let snapshot = state.rows.clone();
        state.store.persist_all(snapshot);
        state.current_index = 0;
        return state.rows.first().cloned();
    }

    None
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub async fn spawn(
    store: CredentialStoreHandle,
    http: reqwest::Client,
    upstream: UpstreamConfig,
) -> RotatorHandle {
    let (actor, _jh) = Actor::spawn(
        Some("Rotator".to_string()),
        RotatorActor,
        RotatorArgs { store, http, upstream },
    )
    .await
    .expect("failed to spawn RotatorActor");
    RotatorHandle { actor }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_around() {
        let mut idx = 1;
        advance_index(&mut idx, 2);
        assert_eq!(idx, 0);
    }

    #[test]
    fn advance_on_empty_is_noop() {
        let mut idx = 0;
        advance_index(&mut idx, 0);
        assert_eq!(idx, 0);
    }
}
