//! Nested-ring viewer for comment threads.
//!
//! Lays out a JSON comment dump as rings of replies and either opens the
//! interactive viewer or prints the computed layout with `--dump`.

mod app;
mod theme;

use std::path::PathBuf;

use clap::Parser;
use comment_rings::graph::{load_comments, ThreadLayout};
use comment_rings::LayoutSettings;
use eframe::egui;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON array of comments, flat or with nested `replies`
    comments: PathBuf,

    /// Layout settings file (defaults to the per-user config)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print the computed layout as JSON instead of opening a window
    #[arg(long)]
    dump: bool,

    /// Index of the last revealed comment, -1 for none (defaults to all)
    #[arg(long, allow_hyphen_values = true)]
    progress: Option<isize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = LayoutSettings::load(args.settings.as_deref());

    if args.dump {
        let comments = load_comments(&args.comments)?;
        let mut layout = ThreadLayout::new(settings);
        layout.construct_layout(comments);
        let last = layout.geometry().circles.len() as isize - 1;
        layout.set_progress(args.progress.unwrap_or(last));
        println!("{}", serde_json::to_string_pretty(&layout.snapshot())?);
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Comment Rings"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Comment Rings",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::RingsApp::new(
                cc,
                settings,
                args.comments,
                args.progress,
            )))
        }),
    )?;
    Ok(())
}
