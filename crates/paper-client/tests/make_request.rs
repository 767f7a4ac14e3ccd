//! The plain `make_request` entry point, driven entirely by the process
//! environment.
//!
//! This binary mutates its own environment, so it holds a single test.

mod support;

use paper_client::infrastructure::environment::{
    CONFIG_HOME, DISPLAY_TOKEN, HOME, INSTANCE_SIGNATURE, RUNTIME_DIR,
};
use paper_client::make_request;

use support::{listen, wallpaper_handler, Session, SIGNATURE};

#[test]
fn test_make_request_uses_process_environment() {
    // Arrange: a live-looking session with no display token and no config file.
    let session = Session::new();
    let home = session.dir.path().join("home");
    std::env::set_var(RUNTIME_DIR, session.dir.path());
    std::env::set_var(INSTANCE_SIGNATURE, SIGNATURE);
    std::env::set_var(HOME, &home);
    std::env::set_var(CONFIG_HOME, session.dir.path().join("config"));
    std::env::remove_var(DISPLAY_TOKEN);

    // Act + Assert: bad input is reported as a message before any connection.
    assert_eq!(
        make_request("/hyprpaper wallpaper ,,"),
        Err("missing wallpaper path".to_string())
    );

    // Act + Assert: nothing listening yet.
    let err = make_request("/hyprpaper wallpaper DP-1,~/pic.png,").unwrap_err();
    assert!(err.contains("hyprpaper is likely not running"), "{err}");

    // Act + Assert: the well-known socket is served.
    let service = listen(&session.service_path(), "hyprpaper_core", wallpaper_handler(None));
    assert_eq!(make_request("/hyprpaper wallpaper DP-1,~/pic.png,tile"), Ok(()));
    assert!(!service.join().unwrap().is_empty());
}
