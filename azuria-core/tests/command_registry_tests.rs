// tests/command_registry_tests.rs
use std::path::Path;
use std::sync::Arc;

use azuria_core::test_utils::{
    sample_identity, test_settings, write_unit, InMemoryRemoteApi, ManualPushChannel, RecordingGateway,
};
use azuria_core::{AzuriaClient, Command, CommandFactories, Error, Manifest};

fn noop_command(manifest: &Manifest) -> Result<Command, Error> {
    Ok(Command::builder(manifest.command_data()?)
        .ephemeral(manifest.ephemeral)
        .modal(manifest.modal)
        .handler_fn(|_, _| async { Ok::<(), Error>(()) }))
}

fn factories(ids: &[&str]) -> CommandFactories {
    let mut table = CommandFactories::new();
    for id in ids {
        table.insert(*id, |m: &Manifest, _: &AzuriaClient| noop_command(m));
    }
    table
}

fn client(dir: &Path, gateway: Arc<RecordingGateway>, table: CommandFactories) -> AzuriaClient {
    AzuriaClient::builder(test_settings(dir))
        .gateway(gateway)
        .remote(Arc::new(InMemoryRemoteApi::new()))
        .push(Arc::new(ManualPushChannel::new()))
        .commands(table)
        .build()
        .unwrap()
}

#[tokio::test]
async fn loads_categories_in_order_and_skips_registration_before_login() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/general/ping.json", r#"{"name": "ping", "description": "Pong"}"#)?;
    write_unit(dir.path(), "commands/admin/ban.json", r#"{"name": "ban", "description": "Ban"}"#)?;
    write_unit(dir.path(), "commands/general/README.md", "not a unit")?;

    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway.clone(), factories(&["ping", "ban"]));

    assert_eq!(client.commands().load(&client).await?, 2);
    assert_eq!(client.commands().names().await, vec!["ban", "ping"]);

    let categories = client.commands().categories().await;
    assert_eq!(categories.keys().cloned().collect::<Vec<_>>(), vec!["admin", "general"]);
    assert_eq!(categories["general"], vec!["ping"]);
    assert_eq!(client.commands().get("ping").await.unwrap().category(), "general");

    assert_eq!(client.commands().wait_registrations().await, 0);
    assert!(gateway.created_commands().is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_file_aborts_the_load_and_names_the_file() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/general/a.json", r#"{"name": "a"}"#)?;
    write_unit(dir.path(), "commands/general/b.json", r#"{"name": "b"}"#)?;
    write_unit(dir.path(), "commands/general/c.json", r#"{"name": "c"}"#)?;

    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway.clone(), factories(&["a", "c"]));
    client.set_identity(sample_identity());

    match client.commands().load(&client).await {
        Err(Error::InvalidCommandFile(file)) => assert_eq!(file, "b.json"),
        other => panic!("expected InvalidCommandFile, got {other:?}"),
    }

    assert!(client.commands().get("a").await.is_some());
    assert!(client.commands().get("c").await.is_none());

    client.commands().wait_registrations().await;
    let registered: Vec<String> = gateway.created_commands().into_iter().map(|(_, d)| d.name).collect();
    assert_eq!(registered, vec!["a"]);
    Ok(())
}

#[tokio::test]
async fn registers_each_command_under_the_application_id() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/general/ping.json", r#"{"name": "ping", "description": "Pong"}"#)?;
    write_unit(
        dir.path(),
        "commands/general/echo.json",
        r#"{"name": "echo", "description": "Echo", "options": [
            {"type": 3, "name": "text", "description": "What to echo", "required": true}
        ]}"#,
    )?;

    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway.clone(), factories(&["ping", "echo"]));
    client.set_identity(sample_identity());

    client.commands().load(&client).await?;
    assert_eq!(client.commands().wait_registrations().await, 2);

    let mut created = gateway.created_commands();
    created.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|(app, _)| app == &sample_identity().application_id));
    assert_eq!(created[0].1.name, "echo");
    assert_eq!(created[0].1.options.len(), 1);
    Ok(())
}

#[tokio::test]
async fn registration_failures_do_not_fail_the_load() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/general/ping.json", r#"{"name": "ping"}"#)?;

    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    gateway.fail_commands();
    let client = client(dir.path(), gateway.clone(), factories(&["ping"]));
    client.set_identity(sample_identity());

    assert_eq!(client.commands().load(&client).await?, 1);
    assert_eq!(client.commands().wait_registrations().await, 1);
    assert_eq!(gateway.created_commands().len(), 1);
    assert!(client.commands().get("ping").await.is_some());
    Ok(())
}

#[tokio::test]
async fn later_command_with_same_name_wins() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/a/echo.json", r#"{"name": "echo", "description": "first"}"#)?;
    write_unit(
        dir.path(),
        "commands/b/echo_again.json",
        r#"{"factory": "echo", "name": "echo", "description": "second", "ephemeral": true}"#,
    )?;

    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway, factories(&["echo"]));

    client.commands().load(&client).await?;
    assert_eq!(client.commands().len().await, 1);

    let echo = client.commands().get("echo").await.unwrap();
    assert_eq!(echo.data.description, "second");
    assert_eq!(echo.category(), "b");
    assert!(echo.ephemeral);
    Ok(())
}

#[tokio::test]
async fn malformed_manifest_and_missing_root_are_errors() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway, factories(&["ping"]));

    assert!(matches!(client.commands().load(&client).await, Err(Error::Io(_))));

    write_unit(dir.path(), "commands/general/ping.json", "{ nope")?;
    assert!(matches!(
        client.commands().load(&client).await,
        Err(Error::Manifest { .. })
    ));
    assert!(client.commands().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn loaded_ping_command_is_executable() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    write_unit(dir.path(), "commands/general/ping.json", r#"{"name": "ping", "description": "Pong"}"#)?;

    let table = CommandFactories::new().register("ping", |m: &Manifest, _: &AzuriaClient| {
        Ok(Command::builder(m.command_data()?).handler_fn(|client: AzuriaClient, interaction| async move {
            client.gateway().reply(&interaction, "Pong!").await
        }))
    });
    let gateway = Arc::new(RecordingGateway::new(sample_identity()));
    let client = client(dir.path(), gateway.clone(), table);
    client.commands().load(&client).await?;

    let ping = client.commands().get("ping").await.unwrap();
    assert_eq!(ping.data.name, "ping");

    let interaction = azuria_core::models::CommandInteraction {
        id: "1".into(),
        token: "t".into(),
        application_id: sample_identity().application_id,
        guild_id: Some("2".into()),
        channel_id: None,
        user_id: None,
        command_name: "ping".into(),
        options: serde_json::Value::Null,
    };
    ping.execute(&client, &interaction).await?;
    assert_eq!(gateway.replies(), vec![("1".to_string(), "Pong!".to_string())]);
    Ok(())
}
