//! Typed callers for the backend query surface.
//!
//! One function per backend method. Each owns the parsing of its response
//! body: the sentinel `"no_data"` means "the server did not answer this
//! query" and maps to `Ok(None)` — it is not an error and must leave
//! existing record state untouched. Ping is the exception: its body is
//! returned raw because the sentinel rules live with the merge logic.

use serde::Deserialize;
use serde_json::{Value, json};

use super::transport::{Route, RpcError, RpcTransport};
use crate::core::models::{ExtraInfo, Player, ServerAddr};

/// Body sent by the backend when a server skipped a query.
pub const NO_DATA: &str = "no_data";

#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("unexpected {method} payload: {source}")]
    Payload {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn addr_params(addr: &ServerAddr) -> Value {
    json!({ "ip": addr.host, "port": addr.port })
}

fn payload_err(method: &'static str) -> impl FnOnce(serde_json::Error) -> MethodError {
    move |source| MethodError::Payload { method, source }
}

/// Basic server info as reported by `request_server_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoPayload {
    pub password: bool,
    pub players: u32,
    pub max_players: u32,
    pub hostname: String,
    pub gamemode: String,
    pub language: String,
}

pub async fn server_info(
    transport: &dyn RpcTransport,
    addr: &ServerAddr,
) -> Result<Option<InfoPayload>, MethodError> {
    let body = transport
        .call(Route::Async, "request_server_info", addr_params(addr))
        .await?;
    parse_info(&body)
}

fn parse_info(body: &str) -> Result<Option<InfoPayload>, MethodError> {
    if body == NO_DATA {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(payload_err("request_server_info"))
}

/// Raw ping response body: a numeric string, possibly the unreachable
/// sentinel, or a non-numeric string on failure.
pub async fn server_ping(
    transport: &dyn RpcTransport,
    addr: &ServerAddr,
) -> Result<String, RpcError> {
    transport
        .call(Route::Async, "ping_server", addr_params(addr))
        .await
}

pub async fn server_rules(
    transport: &dyn RpcTransport,
    addr: &ServerAddr,
) -> Result<Option<Vec<(String, String)>>, MethodError> {
    let body = transport
        .call(Route::Async, "request_server_rules", addr_params(addr))
        .await?;
    parse_rules(&body)
}

fn parse_rules(body: &str) -> Result<Option<Vec<(String, String)>>, MethodError> {
    if body == NO_DATA {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(payload_err("request_server_rules"))
}

pub async fn server_players(
    transport: &dyn RpcTransport,
    addr: &ServerAddr,
) -> Result<Option<Vec<Player>>, MethodError> {
    let body = transport
        .call(Route::Async, "request_server_players", addr_params(addr))
        .await?;
    parse_players(&body)
}

fn parse_players(body: &str) -> Result<Option<Vec<Player>>, MethodError> {
    if body == NO_DATA {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body).map_err(payload_err("request_server_players"))?;

    // Crowded servers answer the player query with an error object instead
    // of a roster; treat that the same as no answer.
    if value.get("error").is_some() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(payload_err("request_server_players"))
}

#[derive(Debug, Clone, Deserialize)]
struct ExtraInfoPayload {
    light_banner_url: Option<String>,
    dark_banner_url: Option<String>,
    discord_link: Option<String>,
    logo_url: Option<String>,
}

impl From<ExtraInfoPayload> for ExtraInfo {
    fn from(payload: ExtraInfoPayload) -> Self {
        ExtraInfo {
            banner_light: payload.light_banner_url,
            banner_dark: payload.dark_banner_url,
            discord_invite: payload.discord_link,
            logo: payload.logo_url,
        }
    }
}

pub async fn server_extra_info(
    transport: &dyn RpcTransport,
    addr: &ServerAddr,
) -> Result<Option<ExtraInfo>, MethodError> {
    let body = transport
        .call(Route::Async, "request_server_omp_extra_info", addr_params(addr))
        .await?;
    parse_extra_info(&body)
}

fn parse_extra_info(body: &str) -> Result<Option<ExtraInfo>, MethodError> {
    if body == NO_DATA {
        return Ok(None);
    }
    serde_json::from_str::<ExtraInfoPayload>(body)
        .map(|payload| Some(payload.into()))
        .map_err(payload_err("request_server_omp_extra_info"))
}

/// Hand a connection off to the native injector. Goes through the sync
/// sub-endpoint; the raw body is returned for the launch flow to
/// interpret (it carries the elevation sentinel on failure).
pub async fn inject(
    transport: &dyn RpcTransport,
    name: &str,
    addr: &ServerAddr,
    exe: &str,
    dll: &str,
    password: &str,
) -> Result<String, RpcError> {
    transport
        .call(
            Route::Sync,
            "inject",
            json!({
                "name": name,
                "ip": addr.host,
                "port": addr.port,
                "exe": exe,
                "dll": dll,
                "password": password,
            }),
        )
        .await
}
