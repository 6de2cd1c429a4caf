//! Integration tests for layered configuration loading.

use clap::Parser;
use figment::Jail;
use serial_test::serial;
use signal_relay::cli::Cli;
use signal_relay::config::Config;
use signal_relay::core::ChannelKind;
use signal_relay::registry::enabled_channels;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// A helper function to run a test with a temporary config file.
fn with_config_file<F>(toml_content: &str, test_fn: F)
where
    F: FnOnce(PathBuf),
{
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    let path = file.path().to_path_buf();
    test_fn(path);
}

fn cli_for(path: &PathBuf, extra: &[&str]) -> Cli {
    let mut args = vec!["signal-relay", "--config", path.to_str().unwrap()];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).unwrap()
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        [core]
        log_level = "debug"
        [server]
        host = "127.0.0.1"
        port = 8100
        [http]
        timeout_seconds = 4
        [metrics]
        enabled = true
        listen_address = "127.0.0.1:9200"
        [channels.email]
        address = "alerts@example.com"
        app_password = "abcd efgh ijkl mnop"
        recipient = "trader@example.com"
        smtp_host = "smtp.example.com"
        smtp_port = 2465
        [channels.whatsapp]
        account_sid = "AC123"
        auth_token = "token"
        from = "whatsapp:+14155238886"
        to = "whatsapp:+15550001111"
        api_base_url = "http://127.0.0.1:9999"
        [channels.discord]
        webhook_url = "https://discord.test/api/webhooks/1/token"
    "#;

    with_config_file(toml_content, |path| {
        let config = Config::load(&cli_for(&path, &[])).unwrap();

        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.server.listen_address().to_string(), "127.0.0.1:8100");
        assert_eq!(config.http.timeout_seconds, 4);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.listen_address.to_string(), "127.0.0.1:9200");
        assert_eq!(config.channels.email.smtp_host, "smtp.example.com");
        assert_eq!(config.channels.email.smtp_port, 2465);
        assert_eq!(config.channels.whatsapp.api_base_url, "http://127.0.0.1:9999");

        let kinds: Vec<ChannelKind> = enabled_channels(&config.channels)
            .iter()
            .map(|c| c.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ChannelKind::Email,
                ChannelKind::Messaging,
                ChannelKind::ChatWebhook
            ]
        );
    });
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    let cli = Cli::try_parse_from(["signal-relay", "--config", "/nonexistent/relay.toml"]).unwrap();
    let err = Config::load(&cli).unwrap_err();
    assert!(err
        .to_string()
        .contains("Config file not found at specified path"));
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    with_config_file("[server]\nport = \"not a port\"\n", |path| {
        assert!(Config::load(&cli_for(&path, &[])).is_err());
    });
}

#[test]
#[serial]
fn test_blank_secret_leaves_channel_disabled() {
    let toml_content = r#"
        [channels.discord]
        webhook_url = "   "
        [channels.whatsapp]
        account_sid = "AC123"
        auth_token = "token"
        from = "whatsapp:+14155238886"
    "#;

    with_config_file(toml_content, |path| {
        let config = Config::load(&cli_for(&path, &[])).unwrap();
        assert!(enabled_channels(&config.channels).is_empty());
    });
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    with_config_file("[server]\nport = 8100\n[metrics]\nenabled = false\n", |path| {
        let cli = cli_for(&path, &["--port", "8200", "--log-level", "warn", "--metrics"]);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.server.port, 8200);
        assert_eq!(config.core.log_level, "warn");
        assert!(config.metrics.enabled);
    });
}

#[test]
#[serial]
fn test_legacy_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "relay.toml",
            r#"
            [channels.discord]
            webhook_url = "https://discord.test/from-file"
            "#,
        )?;
        jail.set_env("DISCORD_WEBHOOK_URL", "https://discord.test/from-env");
        jail.set_env("EMAIL_RECIPIENT", "trader@example.com");

        let config = Config::load(&Cli::default()).expect("config should load");
        assert_eq!(
            config.channels.discord.webhook_url.as_deref(),
            Some("https://discord.test/from-env")
        );
        assert_eq!(
            config.channels.email.recipient.as_deref(),
            Some("trader@example.com")
        );
        Ok(())
    });
}
