use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    database::LoginEntry,
    error::AppError,
    state::AppState,
    utils::{is_blank, is_present},
};

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<Value>,
    age: Option<Value>,
    city: Option<String>,
    relation_type: Option<String>,
    gender_pref: Option<String>,
    distance_km: Option<Value>,
}

#[derive(Deserialize)]
pub struct RulesRequest {
    text: Option<String>,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn online_count_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "online": state.matchmaker.presence().current() }))
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !is_present(payload.username.as_ref()) || !is_present(payload.age.as_ref()) {
        return Err(AppError::MissingFields);
    }

    state
        .store
        .record_login(LoginEntry {
            username: payload.username.unwrap_or_default(),
            age: payload.age.unwrap_or_default(),
            city: payload.city,
            relation_type: payload.relation_type,
            gender_pref: payload.gender_pref,
            distance_km: payload
                .distance_km
                .filter(|distance| !is_blank(distance))
                .unwrap_or_else(|| json!(0)),
        })
        .await;
    state.store.cleanup_old_logs().await;

    Ok(Json(json!({ "ok": true })))
}

pub async fn get_rules_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.rules().await)
}

pub async fn set_rules_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RulesRequest>,
) -> impl IntoResponse {
    state
        .store
        .set_rules(payload.text.unwrap_or_default())
        .await;

    Json(json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_login_requires_username_and_age() {
        let state = AppState::new(Config::default());

        for body in [
            json!({ "age": 20 }),
            json!({ "username": "", "age": 20 }),
            json!({ "username": false, "age": 20 }),
            json!({ "username": "anna" }),
            json!({ "username": "anna", "age": 0 }),
        ] {
            let payload: LoginRequest = serde_json::from_value(body).unwrap();
            let result = login_handler(State(state.clone()), Json(payload)).await;
            assert!(matches!(result, Err(AppError::MissingFields)));
        }

        assert!(state.store.logins().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_records_entry() {
        let state = AppState::new(Config::default());
        let payload: LoginRequest = serde_json::from_value(json!({
            "username": "anna",
            "age": "24",
            "city": "Odense"
        }))
        .unwrap();

        assert!(login_handler(State(state.clone()), Json(payload)).await.is_ok());

        let logins = state.store.logins().await;
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].entry.username, json!("anna"));
        assert_eq!(logins[0].entry.distance_km, json!(0));
        assert!(!is_blank(&logins[0].entry.age));
    }

    #[tokio::test]
    async fn test_login_keeps_loose_values() {
        let state = AppState::new(Config::default());
        let payload: LoginRequest = serde_json::from_value(json!({
            "username": 42,
            "age": 20,
            "distance_km": "25"
        }))
        .unwrap();

        assert!(login_handler(State(state.clone()), Json(payload)).await.is_ok());

        let logins = state.store.logins().await;
        assert_eq!(logins[0].entry.username, json!(42));
        assert_eq!(logins[0].entry.distance_km, json!("25"));
    }
}
