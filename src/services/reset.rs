//! Reset of a finished room through the page reload path (`?reset=1`).

use tracing::{info, warn};

use crate::{
    error::{ResetError, ServiceError},
    services::auth_gate,
    state::RoomSession,
};

/// Issues the reload request that makes the server reset the room.
#[derive(Debug, Clone, Default)]
pub struct RoomReloader {
    #[cfg(feature = "http-reset")]
    client: reqwest::Client,
}

impl RoomReloader {
    /// Reloader with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `url` and accept any successful status as a completed reset.
    #[cfg(feature = "http-reset")]
    pub async fn reload(&self, url: &str) -> Result<(), ResetError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|source| ResetError::Request {
                    url: url.to_string(),
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Always fails: the build has no HTTP client.
    #[cfg(not(feature = "http-reset"))]
    pub async fn reload(&self, _url: &str) -> Result<(), ResetError> {
        Err(ResetError::Unsupported)
    }
}

/// Apply the outcome of a reload.
///
/// The server treats the reload as a fresh page: the player is signed out locally and sees the
/// credential form again.
pub fn complete_reload(
    session: &mut RoomSession,
    outcome: Result<(), ResetError>,
) -> Result<(), ServiceError> {
    match outcome {
        Ok(()) => {
            info!(room = %session.room, "room reset; player must authenticate again");
            auth_gate::sign_out(session);
            session.notice = Some("Room reset. Enter your player code to play again.".into());
            Ok(())
        }
        Err(err) => {
            warn!(room = %session.room, error = %err, "room reset failed");
            session.notice = Some(format!("Reset failed: {err}"));
            Err(err.into())
        }
    }
}
