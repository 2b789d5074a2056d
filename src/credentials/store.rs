use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use super::Credential;
use crate::error::GatewayError;

#[derive(Debug)]
pub enum CredentialStoreMessage {
    List(RpcReplyPort<Vec<Credential>>),
    Add(Credential, RpcReplyPort<()>),
    Update {
        refresh_token: String,
        patch: Box<dyn FnOnce(&mut Credential) + Send>,
        reply: RpcReplyPort<bool>,
    },
    Delete(String, RpcReplyPort<bool>),
    PersistOne(Credential),
    PersistAll(Vec<Credential>),
}

/// Cloneable handle for the single-writer credential-store actor.
#[derive(Clone)]
pub struct CredentialStoreHandle {
    actor: ActorRef<CredentialStoreMessage>,
}

impl CredentialStoreHandle {
    pub async fn list(&self) -> Result<Vec<Credential>, GatewayError> {
        ractor::call!(self.actor, CredentialStoreMessage::List)
            .map_err(|e| GatewayError::RactorError(format!("List RPC failed: {e}")))
    }

    pub async fn add(&self, cred: Credential) -> Result<(), GatewayError> {
        ractor::call!(self.actor, CredentialStoreMessage::Add, cred)
            .map_err(|e| GatewayError::RactorError(format!("Add RPC failed: {e}")))
    }

    /// Applies `patch` to the stored row matching `refresh_token`, if present.
    /// Returns `true` if a row was found and patched.
    pub async fn update(
        &self,
        refresh_token: String,
        patch: impl FnOnce(&mut Credential) + Send + 'static,
    ) -> Result<bool, GatewayError> {
        ractor::call!(
            self.actor,
            CredentialStoreMessage::Update,
            refresh_token,
            Box::new(patch)
        )
        .map_err(|e| GatewayError::RactorError(format!("Update RPC failed: {e}")))
    }

    pub async fn delete(&self, refresh_token: String) -> Result<bool, GatewayError> {
        ractor::call!(self.actor, CredentialStoreMessage::Delete, refresh_token)
            .map_err(|e| GatewayError::RactorError(format!("Delete RPC failed: {e}")))
    }

    pub fn persist_one(&self, cred: Credential) {
        let _ = ractor::cast!(self.actor, CredentialStoreMessage::PersistOne(cred));
    }

    pub fn persist_all(&self, creds: Vec<Credential>) {
        let _ = ractor::cast!(self.actor, CredentialStoreMessage::PersistAll(creds));
    }
}

pub struct CredentialStoreActor;

pub struct CredentialStoreState {
    path: PathBuf,
    rows: Vec<Credential>,
}

#[ractor::async_trait]
impl Actor for CredentialStoreActor {
    type Msg = CredentialStoreMessage;
    type State = CredentialStoreState;
    type Arguments = PathBuf;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        path: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let rows = load_from_disk(&path).await;
        info!(path = %path.display(), count = rows.len(), "credential store loaded");
        Ok(CredentialStoreState { path, rows })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CredentialStoreMessage::List(reply) => {
                let _ = reply.send(state.rows.clone());
            }
            CredentialStoreMessage::Add(cred, reply) => {
                state.rows.push(cred);
                write_to_disk(&state.path, &state.rows).await;
                let _ = reply.send(());
            }
            CredentialStoreMessage::Update {
                refresh_token,
                patch,
                reply,
            } => {
                let found = state
                    .rows
                    .iter_mut()
                    .find(|c| c.refresh_token == refresh_token);
                let patched = if let Some(cred) = found {
                    patch(cred);
                    true
                } else {
                    false
                };
                if patched {
                    write_to_disk(&state.path, &state.rows).await;
                }
                let _ = reply.send(patched);
            }
            CredentialStoreMessage::Delete(refresh_token, reply) => {
                let before = state.rows.len();
                state.rows.retain(|c| c.refresh_token != refresh_token);
                let deleted = state.rows.len() != before;
                if deleted {
                    write_to_disk(&state.path, &state.rows).await;
                }
                let _ = reply.send(deleted);
            }
            CredentialStoreMessage::PersistOne(cred) => {
                if let Some(existing) = state
                    .rows
                    .iter_mut()
                    .find(|c| c.refresh_token == cred.refresh_token)
                {
                    *existing = cred;
                } else {
                    state.rows.push(cred);
                }
                write_to_disk(&state.path, &state.rows).await;
            }
            CredentialStoreMessage::PersistAll(creds) => {
                state.rows = creds;
                write_to_disk(&state.path, &state.rows).await;
            }
        }
        Ok(())
    }
}

async fn load_from_disk(path: &PathBuf) -> Vec<Credential> {
    match fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "failed to parse credential store, starting empty");
            Vec::new()
        }),
        Err(_) => Vec::new(),
    }
}

/// Whole-file write: serialize with `sessionId` omitted, write to a sibling
/// `.tmp` file, then rename over the target for atomicity.
async fn write_to_disk(path: &PathBuf, rows: &[Credential]) {
    let Some(parent) = path.parent() else { return };
    if fs::create_dir_all(parent).await.is_err() {
        warn!(path = %path.display(), "failed to create credential store directory");
        return;
    }

    let body = match serde_json::to_vec_pretty(rows) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to serialize credential store");
            return;
        }
    };

    let tmp_path = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&tmp_path, &body).await {
        warn!(error = %e, path = %tmp_path.display(), "failed to write credential store tmp file");
        return;
    }
    if let Err(e) = fs::rename(&tmp_path, path).await {
        warn!(error = %e, path = %path.display(), "failed to rename credential store tmp file");
    }
}

pub async fn spawn(path: PathBuf) -> CredentialStoreHandle {
    let (actor, _jh) = Actor::spawn(Some("CredentialStore".to_string()), CredentialStoreActor, path)
        .await
        .expect("failed to spawn CredentialStoreActor");
    CredentialStoreHandle { actor }
}
