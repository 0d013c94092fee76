//! Player-code gate.

use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dto::{
        events::{AuthRequest, AuthResult, OutboundEvent},
        validation::{
            DEFAULT_PLAYER_NAME, normalize_display_name, normalize_player_code,
            validate_player_code,
        },
    },
    error::ServiceError,
    puzzles::ActiveForm,
    services::chat_relay,
    state::{RoomSession, state_machine::RoomEvent},
    view::Control,
};

/// Local half of the player-code gate.
///
/// Remembers the last request so an accepted player can be re-joined after a reconnect.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    accepted: bool,
    pending: Option<AuthRequest>,
    accepted_as: Option<AuthRequest>,
}

impl AuthGate {
    /// Whether the server accepted a player code.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Name used for outbound chat.
    pub fn display_name(&self) -> &str {
        self.accepted_as
            .as_ref()
            .or(self.pending.as_ref())
            .map(|request| request.name.as_str())
            .unwrap_or(DEFAULT_PLAYER_NAME)
    }

    /// Normalise and validate the credentials, then remember them as in flight.
    pub fn request(
        &mut self,
        room: &str,
        name: &str,
        raw_code: &str,
    ) -> Result<AuthRequest, ServiceError> {
        let player_code = normalize_player_code(raw_code);
        validate_player_code(&player_code).map_err(|err| {
            ServiceError::InvalidInput(
                err.message
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            )
        })?;

        let request = AuthRequest {
            room: room.to_string(),
            name: normalize_display_name(name),
            player_code,
        };
        request.validate()?;

        self.pending = Some(request.clone());
        Ok(request)
    }

    /// Record the server verdict. Returns `true` when the gate just opened.
    pub fn resolve(&mut self, result: &AuthResult) -> bool {
        if !result.ok {
            self.pending = None;
            return false;
        }
        if let Some(request) = self.pending.take() {
            self.accepted_as = Some(request);
        }
        let opened = !self.accepted;
        self.accepted = true;
        opened
    }

    /// Request to replay after the transport was re-established.
    pub fn reauth_request(&self) -> Option<AuthRequest> {
        self.accepted
            .then(|| self.accepted_as.clone())
            .flatten()
    }

    /// Close the gate; the credential form is shown again.
    pub fn sign_out(&mut self) {
        self.accepted = false;
        self.pending = None;
        self.accepted_as = None;
    }
}

/// Validate the credentials locally and build the `auth` event.
///
/// An empty code never reaches the server: it only sets the session notice.
pub fn request_auth(
    session: &mut RoomSession,
    name: &str,
    raw_code: &str,
) -> Result<OutboundEvent, ServiceError> {
    session.controls().ensure(Control::Auth)?;

    let room = session.room.clone();
    match session.gate.request(&room, name, raw_code) {
        Ok(request) => {
            session.notice = None;
            debug!(room = %request.room, name = %request.name, "sending auth request");
            Ok(OutboundEvent::Auth(request))
        }
        Err(err) => {
            if let ServiceError::InvalidInput(message) = &err {
                session.notice = Some(message.clone());
            }
            Err(err)
        }
    }
}

/// Apply an `auth_result`.
///
/// The message lands in the transcript whatever the verdict; a blank one is skipped.
/// A refusal while the gate is open can only answer the re-join sent after a reconnect, so it
/// signs the player out.
pub fn handle_auth_result(session: &mut RoomSession, result: AuthResult) {
    chat_relay::push_system(session, &result.msg);

    let was_accepted = session.gate.is_accepted();
    if session.gate.resolve(&result) {
        info!(room = %session.room, name = %session.gate.display_name(), "player code accepted");
        session.notice = None;
        // AuthAccepted is valid from every phase.
        let _ = session.machine.apply(RoomEvent::AuthAccepted);
    } else if !result.ok && was_accepted {
        warn!(room = %session.room, "re-join refused after reconnect; signing out");
        sign_out(session);
        session.notice = Some("Enter your player code to rejoin the room.".into());
    } else if !result.ok {
        info!(room = %session.room, "player code rejected");
    }
}

/// Forget the authentication and everything shown for the room.
///
/// Used after a reset that the server treats as a fresh page, or when a re-join is refused.
pub fn sign_out(session: &mut RoomSession) {
    session.gate.sign_out();
    let _ = session.machine.apply(RoomEvent::SignedOut);
    session.clock.stop();
    session.form = ActiveForm::empty();
    session.snapshot = None;
    session.summary = None;
    session.time_up = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(msg: &str) -> AuthResult {
        AuthResult {
            ok: true,
            msg: msg.into(),
        }
    }

    #[test]
    fn empty_code_sets_notice_and_emits_nothing() {
        let mut session = RoomSession::new("A1");
        let err = request_auth(&mut session, "Ada", "   ").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(session.notice(), Some("Enter your player code."));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn request_normalises_code_and_defaults_name() {
        let mut session = RoomSession::new("A1");
        let event = request_auth(&mut session, "  ", " 4f2a9c ").unwrap();
        assert_eq!(
            event,
            OutboundEvent::Auth(AuthRequest {
                room: "A1".into(),
                name: "Agent".into(),
                player_code: "4F2A9C".into(),
            })
        );
    }

    #[test]
    fn acceptance_opens_gate_once_and_logs_message() {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4f2a9c").unwrap();

        handle_auth_result(&mut session, accepted("Bienvenue"));
        assert!(session.is_authenticated());
        assert!(session.controls().start);
        assert!(!session.controls().auth);
        assert_eq!(session.gate.display_name(), "Ada");

        // Re-acceptance only adds the transcript line.
        let phase = session.phase();
        handle_auth_result(&mut session, accepted("Bienvenue"));
        assert_eq!(session.phase(), phase);
        assert_eq!(session.transcript().len(), 2);
        assert!(session.transcript().iter().all(|line| line.system));
    }

    #[test]
    fn rejection_keeps_gate_closed_and_allows_retry() {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "WRONG").unwrap();
        handle_auth_result(
            &mut session,
            AuthResult {
                ok: false,
                msg: "Code joueur invalide.".into(),
            },
        );
        assert!(!session.is_authenticated());
        assert_eq!(session.transcript()[0].text, "Code joueur invalide.");
        assert!(request_auth(&mut session, "Ada", "4F2A9C").is_ok());
    }

    #[test]
    fn reauth_request_exists_only_once_accepted() {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4f2a9c").unwrap();
        assert!(session.gate.reauth_request().is_none());

        handle_auth_result(&mut session, accepted(""));
        let request = session.gate.reauth_request().unwrap();
        assert_eq!(request.player_code, "4F2A9C");

        sign_out(&mut session);
        assert!(session.gate.reauth_request().is_none());
        assert!(session.controls().auth);
    }

    #[test]
    fn blank_verdict_message_is_not_transcribed() {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4f2a9c").unwrap();
        handle_auth_result(&mut session, accepted("  "));
        assert!(session.is_authenticated());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn refused_rejoin_closes_the_gate() {
        let mut session = RoomSession::new("A1");
        request_auth(&mut session, "Ada", "4f2a9c").unwrap();
        handle_auth_result(&mut session, accepted(""));
        assert!(session.controls().start);

        handle_auth_result(
            &mut session,
            AuthResult {
                ok: false,
                msg: "Code joueur invalide.".into(),
            },
        );
        let controls = session.controls();
        assert!(!session.is_authenticated());
        assert!(controls.auth);
        assert!(!controls.start && !controls.hint && !controls.submit && !controls.chat);
        assert!(session.gate.reauth_request().is_none());
        assert_eq!(session.notice(), Some("Enter your player code to rejoin the room."));
    }
}
