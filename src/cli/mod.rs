//! CLI mode for ariactl: one function per subcommand, each returning an exit code.

mod args;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use args::{Cli, Command, Target};

use crate::batch::{
    BatchExecutor, EXIT_FAILURE, EXIT_SUCCESS, EXIT_TRANSPORT, Operation, Selection, resolve,
    write_report,
};
use crate::callbacks::{CallbackLoader, CallbackRegistry, HookFileLoader};
use crate::events::EventKind;
use crate::format::{TABLE_HEADER, format_row};
use crate::listener::Listener;
use crate::rpc::{Aria2Client, resolve_method};
use crate::{AppConfig, Aria2Api, Error, Gid};

/// Writes `ariactl: <command>: <error>` and returns the matching exit code.
fn fail<W: Write>(err: &mut W, command: &str, error: &Error) -> i32 {
    let _ = writeln!(err, "ariactl: {command}: {error}");
    if error.is_transport() {
        EXIT_TRANSPORT
    } else {
        EXIT_FAILURE
    }
}

/// Loads the configuration file and applies command-line overrides.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be parsed.
pub fn load_config(cli: &Cli) -> crate::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let mut connection = config.connection;
    if let Some(host) = &cli.host {
        connection = connection.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        connection = connection.with_port(port);
    }
    if let Some(secret) = &cli.secret {
        connection = connection.with_secret(secret.clone());
    }
    config.connection = connection;
    Ok(config)
}

/// Runs a parsed command line against the configured daemon.
pub async fn run(cli: Cli) -> i32 {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return fail(&mut stderr, "config", &e),
    };
    let client = match Aria2Client::new(&config.connection) {
        Ok(client) => Arc::new(client),
        Err(e) => return fail(&mut stderr, "client", &e),
    };

    match cli.command.unwrap_or(Command::Show) {
        Command::Pause { target, force } => {
            subcommand_batch(&*client, Operation::Pause { force }, &target, &mut stderr).await
        }
        Command::Resume { target } => {
            subcommand_batch(&*client, Operation::Resume, &target, &mut stderr).await
        }
        Command::Remove { target, force } => {
            subcommand_batch(&*client, Operation::Remove { force }, &target, &mut stderr).await
        }
        Command::Listen {
            callbacks_module,
            event_types,
        } => {
            let token = CancellationToken::new();
            let on_signal = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Received SIGINT");
                }
                on_signal.cancel();
            });
            subcommand_listen(client, &callbacks_module, &event_types, token, &mut stderr).await
        }
        Command::Show => subcommand_show(&*client, &mut stdout, &mut stderr).await,
        Command::Call {
            method,
            params,
            json_params,
        } => {
            subcommand_call(
                &client,
                &method,
                &params,
                json_params.as_deref(),
                &mut stdout,
                &mut stderr,
            )
            .await
        }
        Command::Purge => match client.purge().await {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => fail(&mut stderr, "purge", &e),
        },
        Command::Add { uris } | Command::AddMagnets { uris } => {
            subcommand_add(&client, Source::Uris(uris), &mut stdout, &mut stderr).await
        }
        Command::AddTorrents { files } => {
            subcommand_add(&client, Source::Torrents(files), &mut stdout, &mut stderr).await
        }
        Command::AddMetalinks { files } => {
            subcommand_add(&client, Source::Metalinks(files), &mut stdout, &mut stderr).await
        }
    }
}

/// Pauses, resumes, or removes the targeted downloads.
///
/// Per-item failures go to `err` in processing order.
pub async fn subcommand_batch<A, W>(
    api: &A,
    operation: Operation,
    target: &Target,
    err: &mut W,
) -> i32
where
    A: Aria2Api + ?Sized,
    W: Write + Send,
{
    let command = operation.name();
    let selection = match Selection::from_args(&target.gids, target.all) {
        Ok(selection) => selection,
        Err(e) => return fail(err, command, &e),
    };
    let gids = match resolve(api, &selection, operation).await {
        Ok(gids) => gids,
        Err(e) => return fail(err, command, &e),
    };

    let report = BatchExecutor::new(api).execute(&gids, operation).await;
    write_report(&report, err).unwrap_or(EXIT_FAILURE)
}

/// Prints the download table.
pub async fn subcommand_show<A, O, E>(api: &A, out: &mut O, err: &mut E) -> i32
where
    A: Aria2Api + ?Sized,
    O: Write + Send,
    E: Write + Send,
{
    let downloads = match api.get_downloads().await {
        Ok(downloads) => downloads,
        Err(e) => return fail(err, "show", &e),
    };

    let mut write = || -> std::io::Result<()> {
        writeln!(out, "{TABLE_HEADER}")?;
        for download in &downloads {
            writeln!(out, "{}", format_row(download))?;
        }
        Ok(())
    };
    match write() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => fail(err, "show", &e.into()),
    }
}

/// Parses the user-facing event type names; none means every type.
fn parse_event_types(names: &[String]) -> crate::Result<Vec<EventKind>> {
    if names.is_empty() {
        return Ok(EventKind::ALL.to_vec());
    }
    names.iter().map(|name| EventKind::from_str(name)).collect()
}

/// Listens for notifications until `token` is cancelled or the daemon goes
/// away, running the hooks file's commands for each requested event type.
pub async fn subcommand_listen<W: Write + Send>(
    api: Arc<dyn Aria2Api>,
    callbacks_module: &Path,
    event_types: &[String],
    token: CancellationToken,
    err: &mut W,
) -> i32 {
    let kinds = match parse_event_types(event_types) {
        Ok(kinds) => kinds,
        Err(e) => return fail(err, "listen", &e),
    };
    let handlers = match HookFileLoader::new(callbacks_module).load() {
        Ok(handlers) => handlers,
        Err(e) => return fail(err, "listen", &e),
    };

    let registry = CallbackRegistry::new(handlers, &kinds);
    if registry.is_empty() {
        log::warn!(
            "{} defines no handler for the requested events",
            callbacks_module.display()
        );
    }

    match Listener::with_token(api, registry, token).run().await {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => fail(err, "listen", &e),
    }
}

/// Builds the parameter list for `call` from plain strings or a JSON array.
fn call_params(params: &[String], json_params: Option<&str>) -> crate::Result<Vec<Value>> {
    let Some(json) = json_params else {
        return Ok(params.iter().cloned().map(Value::String).collect());
    };
    match serde_json::from_str(json)? {
        Value::Array(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Calls a remote method and prints its JSON result.
pub async fn subcommand_call<O, E>(
    client: &Aria2Client,
    method: &str,
    params: &[String],
    json_params: Option<&str>,
    out: &mut O,
    err: &mut E,
) -> i32
where
    O: Write + Send,
    E: Write + Send,
{
    if method.eq_ignore_ascii_case("listmethods") {
        let _ = writeln!(out, "{}", crate::rpc::KNOWN_METHODS.join("\n"));
        return EXIT_SUCCESS;
    }

    let Some(method) = resolve_method(method) else {
        let _ = write!(
            err,
            "ariactl: call: Unknown method {method}.\n  Run 'ariactl call listmethods' to list the available methods.\n"
        );
        return EXIT_FAILURE;
    };
    let params = match call_params(params, json_params) {
        Ok(params) => params,
        Err(e) => return fail(err, "call", &e),
    };

    match client.call(method, params).await {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            let _ = writeln!(out, "{rendered}");
            EXIT_SUCCESS
        }
        // Daemon errors are printed as the daemon worded them.
        Err(Error::Rpc { message, .. }) => {
            let _ = writeln!(err, "{message}");
            EXIT_FAILURE
        }
        Err(e) => fail(err, "call", &e),
    }
}

/// What an `add*` command reads downloads from.
pub enum Source {
    Uris(Vec<String>),
    Torrents(Vec<PathBuf>),
    Metalinks(Vec<PathBuf>),
}

/// Adds each source as its own download, printing the created GIDs.
///
/// A failing source does not stop the others.
pub async fn subcommand_add<O, E>(client: &Aria2Client, source: Source, out: &mut O, err: &mut E) -> i32
where
    O: Write + Send,
    E: Write + Send,
{
    let mut code = EXIT_SUCCESS;
    let mut report = |result: crate::Result<Vec<Gid>>, code: &mut i32| match result {
        Ok(gids) => {
            for gid in gids {
                let _ = writeln!(out, "Created download {gid}");
            }
        }
        Err(e) => *code = (*code).max(fail(err, "add", &e)),
    };

    match source {
        Source::Uris(uris) => {
            for uri in uris {
                // Tab-separated URIs are mirrors of one download.
                let mirrors: Vec<String> = uri.split('\t').map(str::to_string).collect();
                let result = client.add_uris(&mirrors).await.map(|gid| vec![gid]);
                report(result, &mut code);
            }
        }
        Source::Torrents(files) => {
            for file in files {
                let result = client.add_torrent(&file).await.map(|gid| vec![gid]);
                report(result, &mut code);
            }
        }
        Source::Metalinks(files) => {
            for file in files {
                report(client.add_metalink(&file).await, &mut code);
            }
        }
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::download::DownloadStatus::{Active, Paused};
    use crate::mock::MockDaemon;
    use std::time::Duration;
    use tempfile::TempDir;

    fn target(gids: &[&str], all: bool) -> Target {
        Target {
            gids: gids.iter().map(ToString::to_string).collect(),
            all,
        }
    }

    fn offline_client() -> Aria2Client {
        Aria2Client::new(&ConnectionConfig::default().with_port(1)).unwrap()
    }

    #[tokio::test]
    async fn batch_resume_reports_only_failures() {
        let daemon = MockDaemon::new()
            .with("0000000000000001", Paused)
            .with("0000000000000002", Active);
        let mut err = Vec::new();

        let code = subcommand_batch(
            &daemon,
            Operation::Resume,
            &target(&["0000000000000001", "0000000000000002"], false),
            &mut err,
        )
        .await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "GID#0000000000000002 cannot be unpaused now\n"
        );
        assert_eq!(daemon.status("0000000000000001"), Some(Active));
    }

    #[tokio::test]
    async fn batch_pause_all_skips_paused() {
        let daemon = MockDaemon::new()
            .with("0000000000000001", Paused)
            .with("0000000000000002", Active);
        let mut err = Vec::new();

        let code = subcommand_batch(
            &daemon,
            Operation::Pause { force: false },
            &target(&[], true),
            &mut err,
        )
        .await;

        assert_eq!(code, EXIT_SUCCESS);
        assert!(err.is_empty());
        assert_eq!(daemon.status("0000000000000002"), Some(Paused));
    }

    #[tokio::test]
    async fn batch_malformed_gid_runs_nothing() {
        let daemon = MockDaemon::new().with("0000000000000001", Active);
        let mut err = Vec::new();

        let code = subcommand_batch(
            &daemon,
            Operation::Remove { force: false },
            &target(&["0000000000000001", "nope"], false),
            &mut err,
        )
        .await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "ariactl: remove: Invalid GID nope\n"
        );
        assert!(daemon.calls().is_empty());
    }

    #[tokio::test]
    async fn show_prints_header_and_rows() {
        let daemon = MockDaemon::new()
            .with("0000000000000001", Active)
            .with("0000000000000002", Paused);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = subcommand_show(&daemon, &mut out, &mut err).await;

        assert_eq!(code, EXIT_SUCCESS);
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TABLE_HEADER);
        assert!(lines[1].starts_with("0000000000000001 active"));
        assert!(lines[2].starts_with("0000000000000002 paused"));
    }

    #[tokio::test]
    async fn call_unknown_method() {
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = subcommand_call(&offline_client(), "frobnicate", &[], None, &mut out, &mut err).await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "ariactl: call: Unknown method frobnicate.\n  Run 'ariactl call listmethods' to list the available methods.\n"
        );
    }

    #[tokio::test]
    async fn call_unreachable_daemon_is_transport_failure() {
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = subcommand_call(&offline_client(), "getversion", &[], None, &mut out, &mut err).await;

        assert_eq!(code, EXIT_TRANSPORT);
        assert!(out.is_empty());
    }

    #[test]
    fn call_params_from_strings_or_json() {
        let params = call_params(&["a".into(), "1".into()], None).unwrap();
        assert_eq!(params, vec![Value::from("a"), Value::from("1")]);

        let params = call_params(&[], Some(r#"["0000000000000001", {"max-download-limit": "1M"}]"#)).unwrap();
        assert_eq!(params.len(), 2);
        assert!(params[1].is_object());

        assert!(call_params(&[], Some("[")).is_err());
    }

    #[test]
    fn event_types_default_to_all() {
        assert_eq!(parse_event_types(&[]).unwrap(), EventKind::ALL.to_vec());
        assert_eq!(
            parse_event_types(&["start".into(), "btcomplete".into()]).unwrap(),
            vec![EventKind::Started, EventKind::BitTorrentComplete]
        );
        assert!(parse_event_types(&["finish".into()]).is_err());
    }

    #[tokio::test]
    async fn listen_with_missing_hooks_file_fails() {
        let dir = TempDir::new().unwrap();
        let daemon: Arc<dyn Aria2Api> = Arc::new(MockDaemon::new());
        let mut err = Vec::new();

        let code = subcommand_listen(
            daemon,
            &dir.path().join("missing.toml"),
            &[],
            CancellationToken::new(),
            &mut err,
        )
        .await;

        assert_eq!(code, EXIT_FAILURE);
        assert!(String::from_utf8(err).unwrap().starts_with("ariactl: listen: "));
    }

    #[tokio::test]
    async fn listen_stops_when_cancelled() {
        let dir = TempDir::new().unwrap();
        let hooks = dir.path().join("hooks.toml");
        std::fs::write(&hooks, "on_download_start = [\"true\"]\n").unwrap();
        let daemon: Arc<dyn Aria2Api> = Arc::new(MockDaemon::new());
        let token = CancellationToken::new();
        token.cancel();
        let mut err = Vec::new();

        let code = subcommand_listen(daemon, &hooks, &["start".into()], token, &mut err).await;

        assert_eq!(code, EXIT_SUCCESS);
        assert!(err.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn listen_runs_hooks_for_resumed_downloads_until_cancelled() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("started.log");
        let hooks = dir.path().join("hooks.toml");
        std::fs::write(
            &hooks,
            format!(
                "on_download_start = [\"sh\", \"-c\", \"echo started {{gid}} >> '{}'\"]\n",
                out.display()
            ),
        )
        .unwrap();
        let daemon = Arc::new(
            MockDaemon::new()
                .with("0000000000000001", Paused)
                .with("0000000000000002", Paused),
        );
        let token = CancellationToken::new();

        let listen = tokio::spawn({
            let api: Arc<dyn Aria2Api> = daemon.clone();
            let token = token.clone();
            async move {
                let mut err = Vec::new();
                let code = subcommand_listen(api, &hooks, &["start".into()], token, &mut err).await;
                (code, err)
            }
        });

        let gids = Gid::parse_all(&["0000000000000001", "0000000000000002"]).unwrap();
        let report = BatchExecutor::new(daemon.as_ref())
            .execute(&gids, Operation::Resume)
            .await;
        assert!(report.all_succeeded());

        tokio::time::timeout(Duration::from_secs(10), async {
            while std::fs::read_to_string(&out).map_or(0, |s| s.lines().count()) < 2 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("hooks did not run for both downloads");

        std::thread::spawn(move || token.cancel()).join().unwrap();
        let (code, err) = listen.await.unwrap();

        assert_eq!(code, EXIT_SUCCESS);
        assert!(err.is_empty(), "{}", String::from_utf8_lossy(&err));
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "started 0000000000000001\nstarted 0000000000000002\n"
        );
    }

    #[test]
    fn flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connection]\nport = 6801\nsecret = \"abc\"\n").unwrap();

        let cli = Cli {
            host: Some("192.168.1.2".into()),
            port: None,
            secret: Some("xyz".into()),
            config: Some(path),
            verbose: false,
            command: None,
        };
        let config = load_config(&cli).unwrap();

        assert_eq!(config.connection.host, "192.168.1.2");
        assert_eq!(config.connection.port, 6801);
        assert_eq!(config.connection.secret, "xyz");
    }
}
