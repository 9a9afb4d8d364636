//! Configuration loading and its effect on a running desk.

use crate::desk::helpers::{TestResult, build_desk, runtime};
use rstest::rstest;
use std::io;
use std::path::Path;
use switchboard::{
    agent::domain::AgentRole,
    config::{ConfigError, DeskConfig},
    desk::{DeskError, ErrorKind},
};
use tokio::runtime::Runtime;

/// A missing configuration file leaves the defaults in place.
#[test]
fn missing_file_keeps_defaults() -> TestResult {
    let config = DeskConfig::load_from_path(Path::new("does-not-exist/switchboard.toml"))?;

    assert_eq!(config.history_max_limit, 100);
    assert_eq!(config.reference_prefix, "CHAT");
    Ok(())
}

/// An invalid configuration is refused when the desk is built.
#[test]
fn desk_refuses_invalid_configuration() {
    let config = DeskConfig {
        subscriber_buffer: 0,
        ..DeskConfig::default()
    };

    let result = build_desk(config);

    let err = result.err().expect("invalid buffer");
    let desk_error = err.downcast_ref::<DeskError>().expect("desk error");
    assert!(matches!(
        desk_error,
        DeskError::Config(ConfigError::Invalid { field: "subscriber_buffer", .. })
    ));
    assert_eq!(desk_error.kind(), ErrorKind::Internal);
}

/// Loaded values flow into references, limits and closing text.
#[rstest]
fn loaded_values_shape_the_desk(runtime: io::Result<Runtime>) -> TestResult {
    let rt = runtime?;
    let config = DeskConfig::load_from_str(
        r#"
        reference_prefix = "HELP"
        max_message_chars = 20
        closing_message = "Bye for now."
        "#,
    )?;
    let desk = build_desk(config)?;
    rt.block_on(async {
        let agent = desk.staff("Priya Shah", AgentRole::Agent)?;
        let token = desk.guest().await?;

        let too_long = desk
            .desk
            .send_guest_message(token, "this message is far too long")
            .await;
        let outcome = desk.desk.send_guest_message(token, "short").await?;
        let closed = desk.desk.close(agent.id(), outcome.conversation.id()).await?;

        assert!(matches!(too_long, Err(err) if err.kind() == ErrorKind::Validation));
        assert!(outcome.conversation.reference_id().to_string().starts_with("HELP-"));
        assert_eq!(closed.closing_message.content(), "Bye for now.");
        Ok(())
    })
}
