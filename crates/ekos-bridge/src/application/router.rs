//! Request routing for the single HTTP port.
//!
//! Ekos first calls `/api/authenticate` and only opens its WebSocket channels
//! once that returns a token.  Upgrade requests are routed by exact path; an
//! upgrade to any other path is a misconfiguration on the Ekos side, so the
//! socket is destroyed without a response instead of being declined.

use ekos_bridge_core::Channel;
use serde::Serialize;

/// Path Ekos calls before connecting its channels.
pub const AUTHENTICATE_PATH: &str = "/api/authenticate";

/// Token returned to every authenticate call.  Ekos only checks presence.
pub const AUTH_TOKEN: &str = "TOKEN";

/// What to do with one HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer 200 with an [`AuthenticateResponse`].
    Authenticate,
    /// Complete the WebSocket handshake and run a session on this channel.
    Channel(Channel),
    /// Plain request to an unknown path: answer 404.
    NotFound,
    /// Upgrade request to an unknown path: destroy the connection.
    Reject,
}

/// Strips the query string (and fragment) from a request target.
pub fn request_path(target: &str) -> &str {
    target
        .split_once(['?', '#'])
        .map_or(target, |(path, _)| path)
}

/// Routes a request by its target and whether it asks for a WebSocket upgrade.
pub fn route_request(target: &str, is_upgrade: bool) -> Route {
    let path = request_path(target);
    if is_upgrade {
        Channel::from_upgrade_path(path).map_or(Route::Reject, Route::Channel)
    } else if path == AUTHENTICATE_PATH {
        Route::Authenticate
    } else {
        Route::NotFound
    }
}

/// Body of the `/api/authenticate` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticateResponse {
    pub token: &'static str,
    pub success: bool,
}

impl AuthenticateResponse {
    pub fn granted() -> Self {
        Self {
            token: AUTH_TOKEN,
            success: true,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
