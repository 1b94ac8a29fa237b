// SPDX-License-Identifier: MIT
// chronicled: line-oriented demo driver for the co-writing engine.
//
// Rendering is out of scope for the engine, so this binary is deliberately
// thin: typed lines are appended at the cursor, colon-commands drive the
// generation features, and engine events are printed as they arrive.

use anyhow::Result;
use chronicled::{Editor, EditorEvent, EngineConfig};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "chronicled",
    about = "Chronicle co-writing engine: interactive demo driver",
    version
)]
struct Args {
    /// Path to a TOML config file (all fields optional)
    #[arg(long, env = "CHRONICLE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CHRONICLE_LOG", default_value = "warn")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log))
        .compact()
        .init();

    let config = EngineConfig::load(args.config.as_deref())?;
    let editor = Editor::from_config(config)?;
    info!("editor ready");

    // Print engine events as they arrive.
    let mut events = editor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EditorEvent::GhostShown { text, .. } => {
                    eprintln!("~ ghost: {text}");
                    eprintln!("~ (:accept to take it)");
                }
                EditorEvent::StreamFailed => eprintln!("~ continuation failed"),
                EditorEvent::ReviewButtons { show: true } => {
                    eprintln!("~ continuation done (:reject to undo)");
                }
                _ => {}
            }
        }
    });

    eprintln!("type to write; :continue, :accept, :reject, :stats, :export <path>, :autocomplete on|off, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":continue" => {
                if !editor.continue_writing().await {
                    eprintln!("~ busy: a generation is already running");
                }
            }
            ":accept" => {
                if !editor.accept_suggestion().await? {
                    eprintln!("~ nothing to accept");
                }
            }
            ":reject" => {
                if !editor.reject_last_insertion().await {
                    eprintln!("~ nothing to reject");
                }
            }
            ":stats" => {
                let stats = editor.stats().await;
                eprintln!(
                    "~ {} words, {} lines, {} paragraphs",
                    stats.words, stats.lines, stats.paragraphs
                );
            }
            ":autocomplete on" => editor.set_autocomplete(true).await,
            ":autocomplete off" => editor.set_autocomplete(false).await,
            cmd if cmd.starts_with(":export ") => {
                let path = cmd.trim_start_matches(":export ").trim();
                std::fs::write(path, editor.get_text().await)?;
                eprintln!("~ exported to {path}");
            }
            "" => {
                editor.insert_text_at_cursor("\n").await?;
            }
            text => {
                editor.insert_text_at_cursor(&format!("{text}\n")).await?;
            }
        }
    }

    editor.shutdown().await;
    println!("{}", editor.get_text().await);
    Ok(())
}
