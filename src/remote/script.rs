//! HTTP adapter for a spreadsheet-style web app that answers
//! `GET ?action=<verb>&table=<name>[&id=..][&data=<json>]`.

use std::time::Duration;

use async_trait::async_trait;

use super::envelope::{decode, decode_envelope};
use super::{Record, RecordSet, RemoteError, RemoteRecordStore, Table};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ScriptRecordStore {
    client: reqwest::Client,
    url: String,
}

impl ScriptRecordStore {
    pub fn new(url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .client
            .get(&self.url)
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl RemoteRecordStore for ScriptRecordStore {
    async fn read(&self, table: Table) -> Result<RecordSet, RemoteError> {
        let body = self
            .call(&[("action", "read"), ("table", table.as_str())])
            .await?;
        Ok(decode(&body)?)
    }

    async fn insert(&self, table: Table, record: Record) -> Result<(), RemoteError> {
        let data = serde_json::Value::Object(record).to_string();
        let body = self
            .call(&[("action", "insert"), ("table", table.as_str()), ("data", data.as_str())])
            .await?;
        decode_envelope(&body)?;
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, partial: Record) -> Result<(), RemoteError> {
        let data = serde_json::Value::Object(partial).to_string();
        let body = self
            .call(&[
                ("action", "update"),
                ("table", table.as_str()),
                ("id", id),
                ("data", data.as_str()),
            ])
            .await?;
        decode_envelope(&body)?;
        Ok(())
    }
}
