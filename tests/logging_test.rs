use tracing::Level;

use cf_receiver::logging;

#[test]
fn test_init_logging_installs_console_and_file_layers() {
    let guard = logging::init_logging();

    assert!(guard.is_some(), "log directory should be writable from the crate root");
    assert!(tracing::enabled!(target: "cf_receiver", Level::INFO));
    tracing::info!(target: "cf_receiver", "logging initialized");
}
