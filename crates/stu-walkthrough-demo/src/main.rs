#![forbid(unsafe_code)]

//! Stu walkthrough demo binary entry point.
//!
//! Mounts the product walkthrough over an in-memory router, replays the
//! scripted actions, then prints the final view and the tracked analytics
//! to stdout. Logs go to stderr.

use std::io::{self, Write};
use std::process;

use stu_walkthrough::analytics::{
    Analytics, JsonlAnalytics, MemorySessionStorage, RecordingAnalytics, SessionAnalytics,
    TracingAnalytics,
};
use stu_walkthrough::catalog::stu_walkthrough;
use stu_walkthrough::config::WalkthroughConfig;
use stu_walkthrough::router::{MemoryRouter, Query, Route};
use stu_walkthrough::view::WalkthroughView;
use stu_walkthrough::walkthrough::Walkthrough;
use stu_walkthrough_demo::cli;
use stu_walkthrough_demo::script;
use stu_walkthrough_demo::tee::Tee;
use tracing_subscriber::EnvFilter;

const WALKTHROUGH_PATH: &str = "/walkthrough";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let opts = cli::Opts::parse();
    let config = WalkthroughConfig::from_env();

    let registry = match stu_walkthrough() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Invalid walkthrough: {e}");
            process::exit(1);
        }
    };

    let mut query = Query::new();
    if let Some(step) = &opts.step {
        query.set(config.step_param.as_str(), step.as_str());
    }
    if let Some(source) = &opts.source {
        query.set(config.source_param.as_str(), source.as_str());
    }
    let href = Route::new(WALKTHROUGH_PATH, query).href();
    tracing::info!(target: "stu.demo", href = %href, actions = opts.script.len(), "starting");

    let recording = RecordingAnalytics::new();
    let sink = Tee(recording.clone(), TracingAnalytics);
    let analytics: Box<dyn Analytics> = if opts.session {
        Box::new(SessionAnalytics::new(MemorySessionStorage::new(), sink))
    } else {
        Box::new(sink)
    };

    let mut walkthrough = Walkthrough::mount(registry, MemoryRouter::new(&href), analytics, config);
    script::run(&mut walkthrough, &opts.script);
    let view = walkthrough.view();
    let (router, _) = walkthrough.unmount();

    if let Err(e) = print_report(&view, &router, &recording, opts.jsonl) {
        eprintln!("Failed to write output: {e}");
        process::exit(1);
    }
}

fn print_report(
    view: &WalkthroughView,
    router: &MemoryRouter,
    recording: &RecordingAnalytics,
    jsonl: bool,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    serde_json::to_writer_pretty(&mut out, view)?;
    writeln!(out)?;
    writeln!(out, "url: {}", router.current())?;
    for pushed in router.pushed() {
        writeln!(out, "navigated: {pushed}")?;
    }

    if jsonl {
        let lines = JsonlAnalytics::new(&mut out);
        for event in recording.events() {
            lines.track(event.event, event.properties);
        }
        lines.into_inner();
    } else {
        serde_json::to_writer_pretty(&mut out, &recording.events())?;
        writeln!(out)?;
    }
    out.flush()
}
