//! Effect runtime
//!
//! Carries out the [`Effect`]s the app returns and sends each result back as
//! an [`AppEvent`] on one channel. Fetches run as independent tokio tasks;
//! at most one player task exists at a time.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::CatalogClient;
use crate::app::{AppEvent, Effect};
use crate::session::ResolutionError;

use super::cast::CattCaster;
use super::player::{self, IpcDecoder, MountRequest, MpvPlayer};

/// How long to wait for mpv's IPC socket to appear
const IPC_CONNECT_ATTEMPTS: u32 = 50;
const IPC_CONNECT_INTERVAL: Duration = Duration::from_millis(100);
/// How long mpv may linger after its socket closes (and vice versa)
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// The running player process
struct PlayerHandle {
    session: Uuid,
    commands: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// Executes effects against the catalog server, mpv and catt
pub struct Runtime {
    client: CatalogClient,
    player: MpvPlayer,
    caster: CattCaster,
    events: mpsc::UnboundedSender<AppEvent>,
    current: Option<PlayerHandle>,
}

impl Runtime {
    pub fn new(
        client: CatalogClient,
        player: MpvPlayer,
        caster: CattCaster,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            client,
            player,
            caster,
            events,
            current: None,
        }
    }

    pub fn dispatch_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.dispatch(effect);
        }
    }

    pub fn dispatch(&mut self, effect: Effect) {
        match effect {
            Effect::FetchPage { generation, params } => {
                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let page = params.page;
                    let result = client
                        .fetch(&params)
                        .await
                        .map_err(|e| e.into_fetch_error(page));
                    let _ = events.send(AppEvent::PageLoaded {
                        generation,
                        page,
                        result,
                    });
                });
            }
            Effect::FetchChannels {
                generation,
                refresh,
            } => {
                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = client.channels().await.map_err(|e| e.into_fetch_error(1));
                    let _ = events.send(AppEvent::ChannelsLoaded {
                        generation,
                        refresh,
                        result,
                    });
                });
            }
            Effect::FetchFiles { activation, params } => {
                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = client
                        .fetch(&params)
                        .await
                        .map(|page| page.items)
                        .map_err(ResolutionError::from);
                    let _ = events.send(AppEvent::FilesLoaded { activation, result });
                });
            }
            Effect::ResolveCommand {
                activation,
                reference,
            } => {
                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = client
                        .resolve(&reference)
                        .await
                        .map_err(ResolutionError::from);
                    let _ = events.send(AppEvent::CommandResolved { activation, result });
                });
            }
            Effect::Probe { session, url } => {
                let client = self.client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let outcome = client.probe(&url).await;
                    tracing::debug!(%url, ?outcome, "probe finished");
                    let _ = events.send(AppEvent::ProbeFinished { session, outcome });
                });
            }
            Effect::Mount {
                session,
                url,
                start_at,
                live,
                title,
            } => {
                self.stop_player();
                let request = MountRequest {
                    url,
                    start_at,
                    live,
                    title,
                };
                let (tx, rx) = mpsc::unbounded_channel();
                let task = tokio::spawn(run_player(
                    self.player.clone(),
                    request,
                    session,
                    self.events.clone(),
                    rx,
                ));
                self.current = Some(PlayerHandle {
                    session,
                    commands: tx,
                    task,
                });
            }
            Effect::Unmount => self.stop_player(),
            Effect::Player(command) => match &self.current {
                Some(handle) => {
                    let _ = handle.commands.send(player::encode_command(&command));
                }
                None => tracing::debug!(?command, "no player for command"),
            },
            Effect::Cast { target, payload } => {
                let caster = self.caster.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let message = match caster.send(&target, &payload).await {
                        Ok(()) => format!("Casting to {}", target),
                        Err(e) => {
                            tracing::warn!(error = %e, %target, "cast failed");
                            e.to_string()
                        }
                    };
                    let _ = events.send(AppEvent::Notice(message));
                });
            }
        }
    }

    /// Kill the running player, if any
    pub fn stop_player(&mut self) {
        if let Some(handle) = self.current.take() {
            tracing::debug!(session = %handle.session, "stopping player");
            handle.task.abort();
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop_player();
    }
}

/// Own one mpv process for its lifetime: forward commands in, decode events
/// out. Aborting the task drops the child, which kills it.
#[cfg(unix)]
async fn run_player(
    player: MpvPlayer,
    request: MountRequest,
    session: Uuid,
    events: mpsc::UnboundedSender<AppEvent>,
    mut commands: mpsc::UnboundedReceiver<String>,
) {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    let socket = player::socket_path(&session);
    let _ = std::fs::remove_file(&socket);

    let mut child = match player.spawn(&request, &socket) {
        Ok(child) => child,
        Err(e) => {
            let _ = events.send(AppEvent::MountFailed {
                session,
                message: e.to_string(),
            });
            return;
        }
    };

    let mut stream = None;
    for _ in 0..IPC_CONNECT_ATTEMPTS {
        match UnixStream::connect(&socket).await {
            Ok(s) => {
                stream = Some(s);
                break;
            }
            Err(_) => tokio::time::sleep(IPC_CONNECT_INTERVAL).await,
        }
    }
    let Some(stream) = stream else {
        let _ = events.send(AppEvent::MountFailed {
            session,
            message: player::PlayerError::IpcUnavailable(socket.display().to_string()).to_string(),
        });
        return;
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut decoder = IpcDecoder::new();

    for line in player::observe_commands() {
        if writer.write_all(format!("{line}\n").as_bytes()).await.is_err() {
            break;
        }
    }

    let mut exited = None;
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(event) = decoder.decode(&line) {
                        let _ = events.send(AppEvent::Player { session, event });
                    }
                }
                Ok(None) | Err(_) => break,
            },
            Some(command) = commands.recv() => {
                if let Err(e) = writer.write_all(format!("{command}\n").as_bytes()).await {
                    tracing::warn!(error = %e, "player command not delivered");
                }
            }
            status = child.wait() => {
                exited = Some(status);
                break;
            }
        }
    }

    // Trailing events and the exit status together decide how it ended
    let status = match exited {
        Some(status) => {
            while let Ok(Ok(Some(line))) = tokio::time::timeout(EXIT_GRACE, lines.next_line()).await {
                if let Some(event) = decoder.decode(&line) {
                    let _ = events.send(AppEvent::Player { session, event });
                }
            }
            status
        }
        None => match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!("player closed its socket but kept running");
                let _ = child.kill().await;
                child.wait().await
            }
        },
    };

    let success = matches!(&status, Ok(s) if s.success());
    tracing::info!(?status, finished = decoder.is_finished(), "player exited");
    if let Some(event) = player::exit_event(decoder.is_finished(), success) {
        let _ = events.send(AppEvent::Player { session, event });
    }
    let _ = std::fs::remove_file(&socket);
}

#[cfg(not(unix))]
async fn run_player(
    _player: MpvPlayer,
    _request: MountRequest,
    session: Uuid,
    events: mpsc::UnboundedSender<AppEvent>,
    _commands: mpsc::UnboundedReceiver<String>,
) {
    let _ = events.send(AppEvent::MountFailed {
        session,
        message: "mpv IPC requires a unix socket".to_string(),
    });
}
