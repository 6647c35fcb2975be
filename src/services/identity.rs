//! Name/password login that registers unknown users on first sight.
//!
//! The user id is derived from the pair, so the password is never stored.

use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::AppError;
use crate::models::user::User;
use crate::remote::{RemoteMirror, Table};
use crate::store::{self, KeyValueStore, KvRead, StoreKey};
use crate::validation;

const USER_ID_LEN: usize = 22;

pub fn user_id_for(name: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
    id.truncate(USER_ID_LEN);
    id
}

pub fn find_user<R: KvRead + ?Sized>(store: &R, user_id: &str) -> Result<Option<User>, AppError> {
    match store.get(&StoreKey::user(user_id))? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AppError::Corrupt {
                key: StoreKey::user(user_id).to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Every registered user in registration order.
pub fn all_users(store: &dyn KeyValueStore) -> Result<Vec<User>, AppError> {
    let ids: Vec<String> = store::get_json(store, &StoreKey::user_index())?;
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = find_user(store, &id)? {
            users.push(user);
        }
    }
    Ok(users)
}

/// Returns the user for this pair and whether it was just registered.
pub fn login(
    store: &dyn KeyValueStore,
    mirror: &RemoteMirror,
    name: &str,
    password: &str,
) -> Result<(User, bool), AppError> {
    let (name, password) = validation::validate_credentials(name, password)?;
    let user_id = user_id_for(&name, &password);

    // The lookup and the index append share one transaction so concurrent
    // first logins neither duplicate nor drop index entries.
    let (user, is_new) = store::atomically(store, |tx| {
        if let Some(user) = find_user(&*tx, &user_id)? {
            return Ok((user, false));
        }
        let user = User {
            id: user_id.clone(),
            display_name: name.clone(),
        };
        let mut index: Vec<String> = store::get_json(&*tx, &StoreKey::user_index())?;
        index.push(user.id.clone());
        tx.put(&StoreKey::user(&user.id), store::to_json(&user)?)?;
        tx.put(&StoreKey::user_index(), store::to_json(&index)?)?;
        Ok((user, true))
    })?;
    if !is_new {
        info!(user_id = %user.id, "user logged in");
        return Ok((user, false));
    }
    info!(user_id = %user.id, "user registered");

    if let serde_json::Value::Object(record) = json!({
        "id": user.id,
        "username": user.display_name,
    }) {
        mirror.insert(Table::Users, record);
    }
    Ok((user, true))
}
