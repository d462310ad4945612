use super::*;
use crate::api::test_server::{self, CannedResponse};
use crate::core::cache::MemorySessionCache;
use crate::core::constants::EMPTY_REPLY_TEXT;
use crate::core::message::Role;
use serde_json::json;
use std::io::Cursor;
use tempfile::TempDir;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn envelope(data: serde_json::Value) -> CannedResponse {
        CannedResponse::json(200, json!({"success": true, "message": "success", "data": data}))
    }

    pub(super) fn agent_json(id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "description": "Answers questions",
            "prompt": "You are helpful.",
            "mcp_tools": [],
            "openai_config": {},
            "created_at": "2025-01-01T00:00:00",
            "updated_at": null
        })
    }

    pub(super) fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).expect("utf8 output")
    }

    pub(super) fn memory_store() -> SessionStore {
        SessionStore::new(MemorySessionCache::new())
    }
}

use test_helpers::{agent_json, envelope, memory_store, output, parse_args};

#[test]
fn say_collects_trailing_words_and_target() {
    let args = parse_args(&["agentdesk", "say", "-a", "3", "hello", "there", "-v"]);
    match args.command {
        Commands::Say {
            target,
            no_stream,
            prompt,
        } => {
            assert_eq!(target.agent, Some(3));
            assert_eq!(target.session, None);
            assert!(!no_stream);
            assert_eq!(prompt, ["hello", "there", "-v"]);
        }
        other => panic!("expected say, got {other:?}"),
    }
}

#[test]
fn chat_target_rejects_session_and_agent_together() {
    let result = Args::try_parse_from(["agentdesk", "chat", "--session", "abc", "--agent", "1"]);
    assert!(result.is_err());

    let args = parse_args(&["agentdesk", "chat", "--session", "abc", "--no-stream"]);
    assert_eq!(
        args.command,
        Commands::Chat {
            target: ChatTarget {
                session: Some("abc".to_string()),
                agent: None,
            },
            no_stream: true,
        }
    );
}

#[test]
fn global_flags_parse_after_the_subcommand() {
    let args = parse_args(&[
        "agentdesk",
        "agents",
        "list",
        "--base-url",
        "http://backend:9000/api",
        "--log",
        "agentdesk.log",
    ]);
    assert_eq!(args.base_url.as_deref(), Some("http://backend:9000/api"));
    assert_eq!(args.log, Some(PathBuf::from("agentdesk.log")));
    assert_eq!(
        args.command,
        Commands::Agents {
            command: AgentCommands::List
        }
    );
}

#[test]
fn config_subcommands_parse() {
    let cases: [(&[&str], Option<ConfigCommands>); 3] = [
        (&["agentdesk", "config"], None),
        (
            &["agentdesk", "config", "set", "stream", "off"],
            Some(ConfigCommands::Set {
                key: "stream".to_string(),
                value: vec!["off".to_string()],
            }),
        ),
        (
            &["agentdesk", "config", "unset", "base-url"],
            Some(ConfigCommands::Unset {
                key: "base-url".to_string(),
            }),
        ),
    ];

    for (argv, expected) in cases {
        assert_eq!(
            parse_args(argv).command,
            Commands::Config { command: expected },
            "argv={argv:?}"
        );
    }
}

#[test]
fn agent_update_collects_repeated_tools() {
    let args = parse_args(&[
        "agentdesk", "agents", "update", "2", "--tool", "time_now", "--tool", "web_search",
    ]);
    match args.command {
        Commands::Agents {
            command:
                AgentCommands::Update {
                    id,
                    tools,
                    clear_tools,
                    name,
                    ..
                },
        } => {
            assert_eq!(id, 2);
            assert_eq!(
                tools,
                Some(vec!["time_now".to_string(), "web_search".to_string()])
            );
            assert!(!clear_tools);
            assert_eq!(name, None);
        }
        other => panic!("expected agents update, got {other:?}"),
    }
}

#[test]
fn server_update_takes_explicit_active_flag() {
    let args = parse_args(&["agentdesk", "servers", "update", "4", "--active", "false"]);
    assert_eq!(
        args.command,
        Commands::Servers {
            command: ServerCommands::Update {
                id: 4,
                name: None,
                url: None,
                description: None,
                active: Some(false),
            }
        }
    );
}

#[tokio::test]
async fn agents_list_prints_each_agent() {
    let (base_url, _recorded) = test_server::spawn(vec![(
        "GET /api/agents",
        envelope(json!([agent_json(1, "Helper"), agent_json(2, "Planner")])),
    )])
    .await;
    let client = BackendClient::new(&base_url);

    let mut out = Vec::new();
    agents::run(AgentCommands::List, &client, &mut out)
        .await
        .expect("list should succeed");

    let text = output(out);
    assert!(text.contains("  • 1: Helper (Answers questions)"), "{text}");
    assert!(text.contains("  • 2: Planner"), "{text}");
}

#[tokio::test]
async fn agents_create_rejects_non_object_provider_config() {
    let client = BackendClient::new("http://127.0.0.1:9/api");
    let command = AgentCommands::Create {
        name: "Bot".to_string(),
        prompt: "Be brief.".to_string(),
        description: String::new(),
        tools: Vec::new(),
        openai_config: Some("[1, 2]".to_string()),
    };

    let mut out = Vec::new();
    let err = agents::run(command, &client, &mut out)
        .await
        .expect_err("array config should be rejected");
    assert!(err.to_string().contains("JSON object"));
    assert!(out.is_empty());
}

#[tokio::test]
async fn empty_agent_update_sends_nothing() {
    let (base_url, recorded) = test_server::spawn(Vec::new()).await;
    let client = BackendClient::new(&base_url);
    let command = AgentCommands::Update {
        id: 1,
        name: None,
        prompt: None,
        description: None,
        tools: None,
        clear_tools: false,
        openai_config: None,
    };

    let mut out = Vec::new();
    agents::run(command, &client, &mut out)
        .await
        .expect("empty update is not an error");
    assert!(output(out).contains("Nothing to update"));
    assert!(recorded.lock().await.is_empty());
}

#[tokio::test]
async fn server_tools_are_listed_with_scoped_ids() {
    let (base_url, recorded) = test_server::spawn(vec![(
        "GET /api/mcp/servers/time%20server/tools",
        envelope(json!([
            {"name": "get_time", "description": "Current time", "inputSchema": {}},
            {"name": "get_zone"}
        ])),
    )])
    .await;
    let client = BackendClient::new(&base_url);

    let mut out = Vec::new();
    servers::run(
        ServerCommands::Tools {
            name: "time server".to_string(),
        },
        &client,
        &mut out,
    )
    .await
    .expect("tools should load");

    let text = output(out);
    assert!(text.contains("  • time server_get_time: Current time"), "{text}");
    assert!(text.contains("  • time server_get_zone\n"), "{text}");
    assert_eq!(recorded.lock().await.len(), 1);
}

#[tokio::test]
async fn sessions_new_show_rename_delete() {
    let (base_url, _recorded) = test_server::spawn(vec![(
        "GET /api/agents/7",
        envelope(agent_json(7, "Helper")),
    )])
    .await;
    let client = BackendClient::new(&base_url);
    let mut store = memory_store();

    let mut out = Vec::new();
    sessions::run(
        SessionCommands::New {
            agent_id: 7,
            title: Some("Trip".to_string()),
        },
        &client,
        &mut store,
        &mut out,
    )
    .await
    .expect("session should start");
    let id = store.sessions()[0].id.clone();
    assert_eq!(store.current_session_id(), Some(id.as_str()));

    let prefix = id[..id.len() - 2].to_string();
    sessions::run(
        SessionCommands::Rename {
            session: prefix.clone(),
            title: vec!["Trip".to_string(), "plans".to_string()],
        },
        &client,
        &mut store,
        &mut out,
    )
    .await
    .expect("rename should succeed");
    assert_eq!(store.sessions()[0].title, "Trip plans");

    let mut shown = Vec::new();
    sessions::run(
        SessionCommands::Show {
            session: prefix.clone(),
        },
        &client,
        &mut store,
        &mut shown,
    )
    .await
    .expect("show should succeed");
    assert_eq!(output(shown), "# Trip plans (Helper)\n");

    sessions::run(
        SessionCommands::Delete { session: prefix },
        &client,
        &mut store,
        &mut out,
    )
    .await
    .expect("delete should succeed");
    assert!(store.sessions().is_empty());
    assert_eq!(store.current_session_id(), None);
}

#[test]
fn session_prefix_must_be_unambiguous() {
    let mut store = memory_store();
    let agent = crate::core::reducer::tests::test_agent();
    let first = store.create_session(&agent, None).id;
    let second = store.create_session(&agent, None).id;

    assert_eq!(sessions::resolve_session_id(&store, &first), Ok(first.clone()));
    assert_eq!(sessions::resolve_session_id(&store, &second), Ok(second));
    assert!(sessions::resolve_session_id(&store, "").is_err());
    assert!(sessions::resolve_session_id(&store, "no-such-session").is_err());
}

#[tokio::test]
async fn say_streams_reply_into_a_new_session() {
    let (base_url, recorded) = test_server::spawn(vec![
        ("GET /api/agents", envelope(json!([agent_json(1, "Helper")]))),
        (
            "POST /api/chat/stream",
            CannedResponse::event_stream([
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
            ]),
        ),
    ])
    .await;
    let client = BackendClient::new(&base_url);
    let mut store = memory_store();
    let mut view = TerminalView::new(Vec::new());
    let target = ChatTarget {
        session: None,
        agent: Some(1),
    };

    chat::say(&client, &mut store, &mut view, &target, "hi", ReplyMode::Streamed)
        .await
        .expect("say should succeed");

    assert_eq!(output(view.into_inner()), "Assistant: Hello\n");
    let session = store.current_session().expect("current session");
    assert_eq!(session.agent_name, "Helper");
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[1].content, "Hello");
    assert!(!store.is_loading());

    let requests = recorded.lock().await;
    let chat_request = requests
        .iter()
        .find(|request| request.path == "/api/chat/stream")
        .expect("chat request recorded");
    assert_eq!(
        chat_request.json(),
        json!({"agent_id": 1, "messages": [{"role": "user", "content": "hi"}]})
    );
}

#[tokio::test]
async fn say_reports_backend_failure() {
    let (base_url, _recorded) = test_server::spawn(vec![
        ("GET /api/agents", envelope(json!([agent_json(1, "Helper")]))),
        (
            "POST /api/chat/send",
            CannedResponse::json(
                500,
                json!({"success": false, "message": "model offline", "data": null}),
            ),
        ),
    ])
    .await;
    let client = BackendClient::new(&base_url);
    let mut store = memory_store();
    let mut view = TerminalView::new(Vec::new());
    let target = ChatTarget {
        session: None,
        agent: Some(1),
    };

    let err = chat::say(&client, &mut store, &mut view, &target, "hi", ReplyMode::Buffered)
        .await
        .expect_err("failure should surface");
    assert!(err.is::<AlreadyReported>(), "{err}");
    assert_eq!(view.notices().len(), 1);
    assert!(view.notices()[0].contains("model offline"));
    assert_eq!(store.error(), Some(view.notices()[0].as_str()));
}

#[tokio::test]
async fn say_without_sessions_or_agent_is_an_error() {
    let client = BackendClient::new("http://127.0.0.1:9/api");
    let mut store = memory_store();
    let mut view = TerminalView::new(Vec::new());

    let err = chat::say(
        &client,
        &mut store,
        &mut view,
        &ChatTarget::default(),
        "hi",
        ReplyMode::Streamed,
    )
    .await
    .expect_err("nothing to talk to");
    assert!(err.to_string().contains("--agent"));
}

#[tokio::test]
async fn chat_repl_handles_commands_and_messages() {
    let (base_url, _recorded) = test_server::spawn(vec![(
        "POST /api/chat/stream",
        CannedResponse::event_stream(["data: [DONE]\n\n"]),
    )])
    .await;
    let client = BackendClient::new(&base_url);
    let mut store = memory_store();
    let agent = crate::core::reducer::tests::test_agent();
    let session_id = store.create_session(&agent, Some("Old")).id;
    let mut view = TerminalView::new(Vec::new());
    let input = Cursor::new("/title New name\n\nhello\n/quit\nignored\n");

    chat::chat(
        &client,
        &mut store,
        &mut view,
        &ChatTarget::default(),
        input,
        ReplyMode::Streamed,
    )
    .await
    .expect("chat should end cleanly");

    let session = store.session(&session_id).expect("session kept");
    assert_eq!(session.title, "New name");
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].content, EMPTY_REPLY_TEXT);

    let text = output(view.into_inner());
    assert!(text.starts_with("# Old ("), "{text}");
    assert!(text.contains("✅ Renamed to New name"), "{text}");
    assert!(text.contains(&format!("Assistant: {EMPTY_REPLY_TEXT}")), "{text}");
}

#[test]
fn config_set_show_unset_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let context = Context::new(Config::default(), config_path.clone(), None);

    let mut out = Vec::new();
    run_config(
        ConfigCommands::Set {
            key: "stream".to_string(),
            value: vec!["off".to_string()],
        },
        &context,
        &mut out,
    )
    .expect("set should succeed");
    let saved = Config::load_from_path(&config_path).expect("config should load");
    assert_eq!(saved.stream, Some(false));

    run_config(
        ConfigCommands::Unset {
            key: "stream".to_string(),
        },
        &context,
        &mut out,
    )
    .expect("unset should succeed");
    let saved = Config::load_from_path(&config_path).expect("config should load");
    assert_eq!(saved.stream, None);

    let mut shown = Vec::new();
    run_config(ConfigCommands::Show, &context, &mut shown).expect("show should succeed");
    let text = output(shown);
    assert!(text.contains("Current configuration:"), "{text}");
    assert!(
        text.contains("Keys: base-url, cache-path, log-level, stream"),
        "{text}"
    );
}

#[test]
fn reply_mode_honours_flag_and_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("config.toml");

    let streaming = Context::new(Config::default(), path.clone(), Some("http://x/api"));
    assert_eq!(streaming.reply_mode(false), ReplyMode::Streamed);
    assert_eq!(streaming.reply_mode(true), ReplyMode::Buffered);
    assert_eq!(streaming.client.base_url(), "http://x/api");

    let config = Config {
        stream: Some(false),
        ..Default::default()
    };
    let buffered = Context::new(config, path, None);
    assert_eq!(buffered.reply_mode(false), ReplyMode::Buffered);
}

#[test]
fn open_store_persists_to_configured_cache_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache_file = temp_dir.path().join("nested").join("sessions.json");
    let config = Config {
        cache_path: Some(cache_file.clone()),
        ..Default::default()
    };
    let context = Context::new(config, temp_dir.path().join("config.toml"), None);
    let agent: crate::api::Agent =
        serde_json::from_value(agent_json(4, "Helper")).expect("agent json");

    let session_id = {
        let mut store = context.open_store().expect("store should open");
        store.create_session(&agent, Some("Kept")).id
    };
    assert!(cache_file.exists());

    let reopened = context.open_store().expect("store should reopen");
    assert_eq!(reopened.sessions().len(), 1);
    assert_eq!(reopened.sessions()[0].id, session_id);
    assert_eq!(reopened.sessions()[0].title, "Kept");
}
