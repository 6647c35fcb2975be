//! Visitor logging. Everything about the caller arrives in a
//! [`VisitContext`] built per request.

use chrono::{DateTime, FixedOffset};
use rand::Rng;
use serde_json::json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::remote::{RemoteMirror, Table};
use crate::validation;

const MOBILE_MARKERS: &[&str] = &[
    "Android",
    "webOS",
    "iPhone",
    "iPad",
    "iPod",
    "BlackBerry",
    "IEMobile",
    "Opera Mini",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitContext {
    pub ip: String,
    pub user_agent: String,
    pub uv: String,
}

impl VisitContext {
    /// Builds the context, issuing a fresh visitor code when the client has
    /// none.
    pub fn new(ip: Option<String>, user_agent: Option<String>, uv: Option<&str>) -> Self {
        Self {
            ip: ip.unwrap_or_else(|| "unknown".into()),
            user_agent: user_agent.unwrap_or_default(),
            uv: validation::validate_uv(uv).unwrap_or_else(generate_uv),
        }
    }

    pub fn device(&self) -> &'static str {
        let ua = self.user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS
            .iter()
            .any(|m| ua.contains(&m.to_ascii_lowercase()))
        {
            "mobile"
        } else {
            "desktop"
        }
    }
}

fn generate_uv() -> String {
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".chars().collect();
    (0..6).map(|_| chars[rng.gen_range(0..chars.len())]).collect()
}

pub fn record_visit(
    mirror: &RemoteMirror,
    ctx: &VisitContext,
    user_id: &str,
    now: DateTime<FixedOffset>,
) -> Option<JoinHandle<()>> {
    let record = json!({
        "id": Uuid::new_v4().to_string(),
        "userid": user_id,
        "ip": ctx.ip,
        "device": ctx.device(),
        "uv": ctx.uv,
        "date": now.format("%Y-%m-%d %H:%M:%S").to_string(),
    });
    match record {
        serde_json::Value::Object(record) => mirror.insert(Table::Visitors, record),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mirror::fake::FakeRecordStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_device_detection() {
        let phone = VisitContext::new(
            None,
            Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)".into()),
            None,
        );
        assert_eq!(phone.device(), "mobile");
        let desk = VisitContext::new(None, Some("Mozilla/5.0 (X11; Linux x86_64)".into()), None);
        assert_eq!(desk.device(), "desktop");
        assert_eq!(desk.ip, "unknown");
    }

    #[test]
    fn test_uv_kept_or_issued() {
        assert_eq!(VisitContext::new(None, None, Some("QWE123")).uv, "QWE123");
        let issued = VisitContext::new(None, None, Some("bad"));
        assert!(validation::validate_uv(Some(issued.uv.as_str())).is_some());
    }

    #[tokio::test]
    async fn test_visit_is_mirrored() {
        let fake = Arc::new(FakeRecordStore::default());
        let mirror = RemoteMirror::new(fake.clone());
        let ctx = VisitContext::new(Some("10.0.0.7".into()), None, Some("QWE123"));
        let now = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 1, 12, 0, 0)
            .unwrap();

        record_visit(&mirror, &ctx, "kim", now).unwrap().await.unwrap();
        let rows = fake.rows(Table::Visitors);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ip"], "10.0.0.7");
        assert_eq!(rows[0]["device"], "desktop");
        assert_eq!(rows[0]["date"], "2025-05-01 12:00:00");
    }
}
