//! CLI Command Tests
//!
//! Argument parsing, JSON output format, and the command handlers against a
//! mocked catalog server.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use zapcast::cli::{Cli, Command};
    use zapcast::models::ContentType;

    #[test]
    fn test_channels_command() {
        let cli = Cli::parse_from(["zapcast", "channels", "-f", "news", "-l", "5"]);
        assert!(cli.is_cli_mode());
        match cli.command {
            Some(Command::Channels(cmd)) => {
                assert_eq!(cmd.filter.as_deref(), Some("news"));
                assert_eq!(cmd.limit, Some(5));
            }
            _ => panic!("Expected Channels command"),
        }
    }

    #[test]
    fn test_browse_series_season() {
        let cli = Cli::parse_from([
            "zapcast", "browse", "--type", "shows", "--series", "s1", "--season", "se2", "-p", "2",
        ]);
        match cli.command {
            Some(Command::Browse(cmd)) => {
                assert_eq!(cmd.content, ContentType::Series);
                assert_eq!(cmd.series.as_deref(), Some("s1"));
                assert_eq!(cmd.season.as_deref(), Some("se2"));
                assert_eq!(cmd.page, 2);
            }
            _ => panic!("Expected Browse command"),
        }
    }

    #[test]
    fn test_continue_default_limit() {
        let cli = Cli::parse_from(["zapcast", "continue"]);
        match cli.command {
            Some(Command::Continue(cmd)) => assert_eq!(cmd.limit, 20),
            _ => panic!("Expected Continue command"),
        }
    }

    #[test]
    fn test_resolve_requires_reference() {
        assert!(Cli::try_parse_from(["zapcast", "resolve"]).is_err());
        assert!(Cli::try_parse_from(["zapcast", "forget"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "zapcast",
            "resolve",
            "f1",
            "--json",
            "--quiet",
            "--server",
            "http://box:8080",
            "--no-save",
        ]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(cli.no_save);
        assert_eq!(cli.server.as_deref(), Some("http://box:8080"));
    }

    #[test]
    fn test_command_aliases() {
        let cli = Cli::parse_from(["zapcast", "ch"]);
        assert!(matches!(cli.command, Some(Command::Channels(_))));

        let cli = Cli::parse_from(["zapcast", "b", "-t", "tv"]);
        assert!(matches!(cli.command, Some(Command::Browse(_))));

        let cli = Cli::parse_from(["zapcast", "r", "f1"]);
        assert!(matches!(cli.command, Some(Command::Resolve(_))));

        let cli = Cli::parse_from(["zapcast", "cw"]);
        assert!(matches!(cli.command, Some(Command::Continue(_))));
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use zapcast::cli::{CastResponse, ExitCode, JsonOutput, ResolveResponse, StatusOk};

    #[test]
    fn test_json_output_success() {
        let output = JsonOutput::success(ResolveResponse {
            reference: "f1".into(),
            command: "ffrt http://cdn/f1".into(),
            proxied: "http://box/proxy/abc".into(),
        });
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("exit_code").is_none());
        assert_eq!(json["data"]["command"], "ffrt http://cdn/f1");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_json_output_error() {
        let output = JsonOutput::<()>::error_msg("No stream", ExitCode::NoStream);
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["exit_code"], 5);
        assert_eq!(json["error"], "No stream");
    }

    #[test]
    fn test_status_ok_format() {
        let json = serde_json::to_string(&StatusOk::default()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_cast_response_omits_missing_start() {
        let response = CastResponse {
            status: "casting",
            device: "TV".into(),
            stream_url: "http://box/proxy/abc".into(),
            start: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("start").is_none());
        assert_eq!(json["device"], "TV");
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use mockito::{Matcher, Server};
    use zapcast::cli::{
        BrowseCmd, CastCmd, ChannelsCmd, ContinueCmd, ExitCode, ForgetCmd, Output, ResolveCmd,
    };
    use zapcast::commands::{self, CommandContext};
    use zapcast::config::Config;
    use zapcast::models::{ContentType, SnapshotMetadata};

    fn quiet() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn context(server: &str) -> CommandContext {
        CommandContext::new(Config::default(), Some(server), None, true)
    }

    #[tokio::test]
    async fn test_channels_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/channels")
            .with_status(200)
            .with_body(r#"[{"id": "1", "title": "News", "kind": "channel", "number": 1}]"#)
            .create_async()
            .await;

        let code = commands::channels_cmd(
            ChannelsCmd {
                filter: Some("NEWS".into()),
                limit: None,
            },
            &context(&server.url()),
            &quiet(),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_channels_server_down_is_network_error() {
        let code = commands::channels_cmd(
            ChannelsCmd {
                filter: None,
                limit: None,
            },
            &context("http://127.0.0.1:1"),
            &quiet(),
        )
        .await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_browse_page_zero_is_invalid() {
        let cmd = BrowseCmd {
            content: ContentType::Movie,
            page: 0,
            search: None,
            category: None,
            series: None,
            season: None,
        };
        let code = commands::browse_cmd(cmd, &context("http://127.0.0.1:1"), &quiet()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_browse_series_episodes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/catalog")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "series".into()),
                Matcher::UrlEncoded("movie_id".into(), "s1".into()),
                Matcher::UrlEncoded("season_id".into(), "se1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": [{"id": "e1", "title": "Pilot", "kind": "episode"}]}"#)
            .create_async()
            .await;

        let cmd = BrowseCmd {
            content: ContentType::Series,
            page: 1,
            search: None,
            category: None,
            series: Some("s1".into()),
            season: Some("se1".into()),
        };
        let code = commands::browse_cmd(cmd, &context(&server.url()), &quiet()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_resolve_without_command_is_no_stream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/stream")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"cmd": null}"#)
            .create_async()
            .await;

        let code = commands::resolve_cmd(
            ResolveCmd {
                reference: "f1".into(),
            },
            &context(&server.url()),
            &quiet(),
        )
        .await;
        assert_eq!(code, ExitCode::NoStream);
    }

    #[tokio::test]
    async fn test_cast_without_device() {
        let code = commands::cast_cmd(
            CastCmd {
                reference: "f1".into(),
                start: None,
            },
            &context("http://127.0.0.1:1"),
            &quiet(),
        )
        .await;
        assert_eq!(code, ExitCode::DeviceNotFound);
    }

    #[test]
    fn test_continue_and_forget() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            progress_path: Some(dir.path().join("progress.json")),
            ..Config::default()
        };
        let snapshot = SnapshotMetadata {
            media_id: "m1".into(),
            title: "Alien".into(),
            thumbnail: None,
            is_series: false,
            content_type: ContentType::Movie,
            command: None,
            episode_id: None,
            episode_title: None,
        };
        {
            let mut store = commands::open_progress_store(&config, false).unwrap();
            store.record(&snapshot, 1200.0, 7000.0).unwrap();
            store.checkpoint("m1", 1200.0).unwrap();
        }

        let ctx = CommandContext::new(config.clone(), Some("http://127.0.0.1:1"), None, false);
        assert_eq!(
            commands::continue_cmd(ContinueCmd { limit: 20 }, &ctx, &quiet()),
            ExitCode::Success
        );
        assert_eq!(
            commands::forget_cmd(
                ForgetCmd {
                    media_id: "m1".into()
                },
                &ctx,
                &quiet()
            ),
            ExitCode::Success
        );

        let store = commands::open_progress_store(&config, false).unwrap();
        assert!(store.continue_watching().unwrap().is_empty());
        assert_eq!(store.resume_position("m1"), None);
    }
}
