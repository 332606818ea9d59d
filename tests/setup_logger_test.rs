mod common;

use cloud_run_log_format::handler::StreamHandler;
use cloud_run_log_format::init::{global_registry, setup_logger, setup_logger_default};
use cloud_run_log_format::{CloudRunFormatter, Level};
use common::Buffer;

#[test]
fn logger_setup() {
    let handle = setup_logger("test_logger", Level::Debug);

    assert_eq!(handle.name(), "test_logger");
    assert_eq!(handle.level(), &Level::Debug);
    assert_eq!(global_registry().level("test_logger"), Some(Level::Debug));
    assert_eq!(global_registry().handler_count("test_logger"), 1);
}

#[test]
fn logger_removes_existing_handlers() {
    let original = Buffer::default();
    global_registry().add_handler(
        "test_logger_handlers",
        StreamHandler::with_writer(CloudRunFormatter::readable(), original),
    );
    assert_eq!(global_registry().handler_count("test_logger_handlers"), 1);

    setup_logger_default("test_logger_handlers");
    setup_logger_default("test_logger_handlers");
    assert_eq!(global_registry().handler_count("test_logger_handlers"), 1);
}

#[test]
fn second_setup_level_wins() {
    setup_logger("test_logger_levels", Level::Debug);
    setup_logger("test_logger_levels", Level::Error);

    assert_eq!(global_registry().handler_count("test_logger_levels"), 1);
    assert_eq!(global_registry().level("test_logger_levels"), Some(Level::Error));
}

#[test]
fn default_log_level() {
    let handle = setup_logger_default("test_logger_default");
    assert_eq!(handle.level(), &Level::Info);
    assert_eq!(global_registry().level("test_logger_default"), Some(Level::Info));
}
