//! The wallpaper call on a bound `hyprpaper_core` session.

use std::cell::Cell;
use std::rc::Rc;

use paper_core::interfaces::wallpaper::{manager, wallpaper_object, FitMode};
use paper_core::protocol::messages::Argument;
use tracing::{debug, warn};

use super::session::{ProtocolSession, SessionError};
use super::transport::Event;

/// Sets `path` as the wallpaper of `monitor` (empty for all outputs).
///
/// Creates a wallpaper object, installs its listener, sends the parameters
/// and `apply`, then performs exactly one round trip.  The call succeeds
/// unless the service sent `failed` before the round trip completed.
///
/// # Errors
///
/// [`SessionError::ServiceFailed`] with the service's code, or a transport
/// error if the connection broke.
pub fn set_wallpaper(
    session: &mut ProtocolSession,
    monitor: &str,
    path: &str,
    fit: FitMode,
) -> Result<(), SessionError> {
    let failure: Rc<Cell<Option<u32>>> = Rc::new(Cell::new(None));
    let slot = Rc::clone(&failure);
    let listener = Box::new(move |event: Event| match event.opcode {
        wallpaper_object::EVENT_SUCCESS => debug!("wallpaper applied"),
        wallpaper_object::EVENT_FAILED => {
            let code = event.args.first().and_then(Argument::as_uint).unwrap_or_default();
            slot.set(Some(code));
        }
        other => debug!("ignoring wallpaper event {other}"),
    });

    let manager_id = session.manager();
    let object = session.create_object(manager_id, manager::GET_WALLPAPER_OBJECT, Vec::new(), listener)?;

    session.send(
        object,
        wallpaper_object::PATH,
        vec![Argument::Str(path.to_string())],
    )?;
    session.send(
        object,
        wallpaper_object::FIT_MODE,
        vec![Argument::Uint(fit.wire_value())],
    )?;
    session.send(
        object,
        wallpaper_object::MONITOR_NAME,
        vec![Argument::Str(monitor.to_string())],
    )?;
    session.send(object, wallpaper_object::APPLY, Vec::new())?;

    session.roundtrip()?;

    match failure.get() {
        Some(code) => {
            warn!("wallpaper service reported failure code {code}");
            Err(SessionError::ServiceFailed {
                protocol: session.protocol().name,
                code,
            })
        }
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::session::tests::{Call, ScriptedSocket};
    use paper_core::interfaces::wallpaper;
    use std::cell::RefCell;

    fn session_with(events: Vec<(u32, u16, Vec<Argument>)>) -> (ProtocolSession, Rc<RefCell<Vec<Call>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut socket = ScriptedSocket::healthy(Rc::clone(&log));
        socket.on_roundtrip = events;
        let session = ProtocolSession::establish(Box::new(socket), wallpaper::PROTOCOL).unwrap();
        (session, log)
    }

    #[test]
    fn test_set_wallpaper_sends_parameters_then_apply_then_one_roundtrip() {
        // Arrange: manager is object 1, the wallpaper object will be 2.
        let (mut session, log) = session_with(Vec::new());

        // Act
        set_wallpaper(&mut session, "DP-1", "/home/u/pic.png", FitMode::Tile).unwrap();

        // Assert
        let log = log.borrow();
        let after_bind: Vec<Call> = log.iter().skip(4).cloned().collect();
        assert_eq!(
            after_bind,
            vec![
                Call::Create(1, manager::GET_WALLPAPER_OBJECT, vec![]),
                Call::Listen(2),
                Call::Send(2, wallpaper_object::PATH, vec![Argument::Str("/home/u/pic.png".into())]),
                Call::Send(2, wallpaper_object::FIT_MODE, vec![Argument::Uint(3)]),
                Call::Send(2, wallpaper_object::MONITOR_NAME, vec![Argument::Str("DP-1".into())]),
                Call::Send(2, wallpaper_object::APPLY, vec![]),
                Call::Roundtrip,
            ]
        );
    }

    #[test]
    fn test_set_wallpaper_surfaces_failure_code() {
        let (mut session, _) =
            session_with(vec![(2, wallpaper_object::EVENT_FAILED, vec![Argument::Uint(3)])]);

        let result = set_wallpaper(&mut session, "", "/pic.png", FitMode::Cover);

        match result {
            Err(SessionError::ServiceFailed { code, .. }) => assert_eq!(code, 3),
            other => panic!("expected service failure, got {other:?}"),
        }
    }

    #[test]
    fn test_set_wallpaper_success_event_is_success() {
        let (mut session, _) = session_with(vec![(2, wallpaper_object::EVENT_SUCCESS, vec![])]);

        assert!(set_wallpaper(&mut session, "", "/pic.png", FitMode::Cover).is_ok());
    }

    #[test]
    fn test_set_wallpaper_without_any_event_is_success() {
        let (mut session, _) = session_with(Vec::new());

        assert!(set_wallpaper(&mut session, "HDMI-A-1", "/pic.png", FitMode::Contain).is_ok());
    }
}
