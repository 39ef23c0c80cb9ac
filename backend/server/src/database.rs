//! # Login Log and Rules
//!
//! In-memory store behind the admin routes. Nothing here touches matchmaking.
//!
//! ## Login log
//!
//! - One record per `POST /api/login`, stamped with UTC time
//! - Records older than the retention window are dropped after every login
//! - Demo rows (`TestBruger...`) are purged by the first real login
//!
//! ## Rules
//!
//! Single text blob shown to users before they start. Starts as the built-in
//! house rules, replaced wholesale by `POST /api/admin/rules`.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

pub const DEMO_PREFIX: &str = "TestBruger";

pub const DEFAULT_RULES: &str = "1. Vis respekt – Behandl andre brugere høfligt og med venlighed.
2. Ingen krænkende indhold – Det er forbudt at dele, vise eller sende seksuelt eksplicit materiale, nøgenbilleder eller andet stødende indhold.
3. Sikkerhed først – Del ikke personlige oplysninger som adresse, CPR-nummer eller økonomiske oplysninger med andre brugere.
4. Kun voksne – Du skal være 18 år eller ældre for at bruge VideoChat.tv.
5. Overhold loven – Al brug af platformen skal ske i overensstemmelse med gældende lovgivning.";

/// Stored as the client sent it, except blank fields which were rejected or defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginEntry {
    pub username: Value,
    pub age: Value,
    pub city: Option<String>,
    pub relation_type: Option<String>,
    pub gender_pref: Option<String>,
    pub distance_km: Value,
}

impl LoginEntry {
    fn is_demo(&self) -> bool {
        self.username
            .as_str()
            .is_some_and(|name| name.starts_with(DEMO_PREFIX))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginRecord {
    pub entry: LoginEntry,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rules {
    pub text: String,
}

struct Inner {
    logins: Vec<LoginRecord>,
    rules: Rules,
    demo_cleared: bool,
}

pub struct Store {
    inner: Mutex<Inner>,
    retention: TimeDelta,
}

impl Store {
    pub fn new(retention_days: i64) -> Self {
        Self::with_logins(retention_days, Vec::new())
    }

    pub fn with_logins(retention_days: i64, logins: Vec<LoginRecord>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                logins,
                rules: Rules {
                    text: DEFAULT_RULES.to_string(),
                },
                demo_cleared: false,
            }),
            retention: TimeDelta::try_days(retention_days.max(0)).unwrap_or(TimeDelta::MAX),
        }
    }

    pub async fn record_login(&self, entry: LoginEntry) {
        let mut inner = self.inner.lock().await;

        if !inner.demo_cleared {
            let before = inner.logins.len();
            inner
                .logins
                .retain(|record| !record.entry.is_demo());
            inner.demo_cleared = true;

            info!("Purged {} demo logins", before - inner.logins.len());
        }

        inner.logins.push(LoginRecord {
            entry,
            created_at: Utc::now(),
        });
    }

    /// Returns how many records were dropped.
    pub async fn cleanup_old_logs(&self) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(self.retention) else {
            return 0;
        };
        let mut inner = self.inner.lock().await;

        let before = inner.logins.len();
        inner.logins.retain(|record| record.created_at >= cutoff);

        before - inner.logins.len()
    }

    pub async fn rules(&self) -> Rules {
        self.inner.lock().await.rules.clone()
    }

    pub async fn set_rules(&self, text: String) {
        self.inner.lock().await.rules = Rules { text };
    }

    /// Newest first.
    pub async fn logins(&self) -> Vec<LoginRecord> {
        let inner = self.inner.lock().await;
        inner.logins.iter().rev().cloned().collect()
    }
}
