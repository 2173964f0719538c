use std::io;
use std::process;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::Args;
use crate::player::RodioOutput;
use crate::resolver::{AssetCache, YtDlp};
use crate::session::Session;

mod repl;
mod settings;

pub fn run(args: Args) -> anyhow::Result<()> {
    let (settings, problem) = settings::load_settings(args.config.as_deref(), args.cache_dir);
    init_logging(&settings.logging.level);
    if let Some(problem) = problem {
        tracing::warn!("{problem}");
    }

    if args.print_config {
        let text = toml::to_string_pretty(&settings).context("failed to render settings")?;
        print!("{text}");
        return Ok(());
    }

    let cache = AssetCache::open(&settings.cache).with_context(|| {
        format!(
            "failed to create cache directory {}",
            settings.cache.dir.display()
        )
    })?;
    report_leftovers(&cache);
    let resolver = Arc::new(YtDlp::new(&settings.resolver, cache));
    let (session, events) = Session::start(
        resolver,
        RodioOutput::factory(settings.audio.volume),
        &settings,
    )?;
    let session = Arc::new(session);

    {
        let session = session.clone();
        ctrlc::set_handler(move || {
            session.shutdown();
            println!("\nGoodbye!");
            process::exit(130);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let printer = thread::Builder::new()
        .name("ytq-printer".to_string())
        .spawn(move || {
            for ev in events {
                println!("{ev}");
            }
        })
        .context("failed to spawn printer thread")?;

    println!("ytq: YouTube audio queue player");
    println!("Cache directory: {}", settings.cache.dir.display());
    println!("Type 'help' for commands.");

    let result = repl::run(&session, &mut io::stdin().lock(), &mut io::stdout());

    session.shutdown();
    let _ = printer.join();
    println!("Goodbye!");
    result.context("terminal i/o failed")
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn report_leftovers(cache: &AssetCache) {
    let files = cache.files();
    if files.is_empty() {
        return;
    }
    tracing::info!(
        count = files.len(),
        dir = %cache.dir().display(),
        "cache holds assets from an earlier run"
    );
    for f in &files {
        tracing::debug!(path = %f.display(), "cached asset");
    }
}
