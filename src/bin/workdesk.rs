use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use workdesk::common::config::ClientConfig;
use workdesk::common::log;
use workdesk::gateway::{InMemoryBackend, RecordingChrome};
use workdesk::model::{HotkeyModifier, WorkspaceId, WorkspaceSnapshot};
use workdesk::surface::{MainSurface, TraySurface};

#[derive(Parser, Debug)]
#[command(name = "workdesk", about = "Workspace switcher client")]
struct Cli {
    /// Defaults to the platform config directory.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive a main panel and a tray against an in-process backend.
    Demo {
        #[arg(long, default_value_t = 3)]
        workspaces: usize,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct Line {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    List,
    Switch { id: u64 },
    Hotkey { index: u32 },
    Create,
    Delete { id: u64 },
    Restore,
    /// Open the tray popup and print what it shows.
    Tray,
    TraySwitch { id: u64 },
    Settings {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        modifier: Option<HotkeyModifier>,
        #[arg(long)]
        autostart: Option<bool>,
    },
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path),
        None => ClientConfig::load_default(),
    }
    .context("loading client config")?;
    log::init(&config.log_filter);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
        Command::Demo { workspaces } => demo(config, workspaces).await,
    }
}

async fn demo(config: ClientConfig, workspaces: usize) -> anyhow::Result<()> {
    let backend = Arc::new(InMemoryBackend::with_workspaces(workspaces));
    backend.set_max_workspaces(config.max_workspaces);
    let chrome = Arc::new(RecordingChrome::new());
    let main = MainSurface::new(backend.clone(), chrome.clone(), &config);
    let tray = TraySurface::new(backend.clone(), chrome, config.tray.switch_options());

    main.mount().await;
    render("main", &main.snapshot(), main.status().message());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let action = match Line::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed.action,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match action {
            Action::List => {
                _ = main.refresh().await;
            }
            Action::Switch { id } => println!("{:?}", main.switch(WorkspaceId::new(id)).await),
            Action::Hotkey { index } => {
                backend.press_hotkey(index);
                // Let the dispatcher pick the press up before rendering.
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Action::Create => {
                _ = main.create().await;
            }
            Action::Delete { id } => {
                _ = main.delete(WorkspaceId::new(id)).await;
            }
            Action::Restore => {
                _ = main.restore().await;
            }
            Action::Tray => {
                tray.open().await;
                render("tray", &tray.snapshot(), tray.status().message());
                continue;
            }
            Action::TraySwitch { id } => {
                println!("{:?}", tray.switch(WorkspaceId::new(id)).await);
                render("tray", &tray.snapshot(), tray.status().message());
                continue;
            }
            Action::Settings { enabled, modifier, autostart } => {
                let mut settings = main.settings();
                let draft = match settings.open().await {
                    Ok(draft) => draft,
                    Err(_) => continue,
                };
                let unchanged = enabled.is_none() && modifier.is_none() && autostart.is_none();
                draft.hotkeys.enabled = enabled.unwrap_or(draft.hotkeys.enabled);
                draft.hotkeys.modifier = modifier.unwrap_or(draft.hotkeys.modifier);
                draft.autostart = autostart.unwrap_or(draft.autostart);
                println!(
                    "hotkeys {} ({}+N), autostart {}",
                    if draft.hotkeys.enabled { "on" } else { "off" },
                    draft.hotkeys.modifier.label(),
                    draft.autostart
                );
                if unchanged {
                    settings.cancel();
                } else {
                    _ = settings.save().await;
                }
            }
            Action::Quit => break,
        }
        render("main", &main.snapshot(), main.status().message());
    }

    main.teardown().await;
    Ok(())
}

fn render(surface: &str, snapshot: &WorkspaceSnapshot, status: Option<String>) {
    println!("[{surface}]");
    for (position, ws) in snapshot.iter().enumerate() {
        let marker = if ws.is_active { '*' } else { ' ' };
        println!(
            " {marker} {}. {} (id {}, {} files)",
            position + 1,
            ws.name,
            ws.id,
            ws.file_count
        );
    }
    if snapshot.is_empty() {
        println!("   no workspaces");
    }
    if let Some(message) = status {
        println!(" ! {message}");
    }
}
