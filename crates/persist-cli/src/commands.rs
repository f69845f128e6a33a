use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use colored::Colorize;
use persist_fs::{PersistEntry, RemoteFileSystem};
use persist_import::{ExternalRegistry, ObjectCatalog, TreeImporter};
use persist_remote::{FsRegistry, RemoteConfig, RemotePath};
use persist_retry::{IoDirection, IoRecorder, RetryExecutor, RetryPolicy, Timeline};
use persist_store::{Persist, RemotePersist};
use persist_types::Key;

use crate::cli::*;

struct Context {
    registry: Arc<FsRegistry>,
    executor: Arc<RetryExecutor>,
    timeline: Arc<Timeline>,
    format: OutputFormat,
    verbose: bool,
}

impl Context {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config = RemoteConfig::load(cli.config.as_deref(), cli.default_fs.as_deref())
            .context("loading remote configuration")?;
        tracing::debug!(config = %config, "remote configuration loaded");
        let mut policy = RetryPolicy::default();
        if let Some(secs) = cli.retry_deadline {
            policy = policy.with_max_elapsed(Duration::from_secs(secs));
        }
        let timeline = Arc::new(Timeline::default());
        let executor = RetryExecutor::new(policy, Arc::clone(&timeline) as Arc<dyn IoRecorder>);
        Ok(Self {
            registry: Arc::new(FsRegistry::new(Arc::new(config))),
            executor: Arc::new(executor),
            timeline,
            format: cli.format.clone(),
            verbose: cli.verbose,
        })
    }

    fn fs(&self) -> RemoteFileSystem {
        RemoteFileSystem::new(Arc::clone(&self.registry))
    }

    fn external(&self) -> RemotePersist {
        RemotePersist::external(Arc::clone(&self.registry), Arc::clone(&self.executor))
    }

    fn json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        Command::Import(args) => cmd_import(&ctx, args),
        Command::Ls(args) => cmd_ls(&ctx, args),
        Command::Stat(args) => cmd_stat(&ctx, args),
        Command::Cat(args) => cmd_cat(&ctx, args),
        Command::Put(args) => cmd_put(&ctx, args),
        Command::Mkdir(args) => {
            ctx.fs().mkdirs(&args.path)?;
            println!("{} Created {}", "✓".green(), args.path.bold());
            Ok(())
        }
        Command::Mv(args) => cmd_mv(&ctx, args),
        Command::Rm(args) => cmd_rm(&ctx, args),
        Command::Home => cmd_home(&ctx),
    }?;
    print_io_summary(&ctx);
    Ok(())
}

fn cmd_import(ctx: &Context, args: ImportArgs) -> anyhow::Result<()> {
    let catalog = Arc::new(ObjectCatalog::new());
    let importer = TreeImporter::new(
        Arc::clone(&ctx.registry),
        Arc::clone(&catalog) as Arc<dyn ExternalRegistry>,
    );

    if args.single {
        let key = importer.import_uri(&args.path)?;
        if ctx.json() {
            println!("{}", serde_json::json!({ "key": key.to_string() }));
        } else {
            println!("{} Registered {}", "✓".green(), key.to_string().cyan());
        }
        return Ok(());
    }

    let manifest = importer.import(&args.path)?;
    if ctx.json() {
        let keys: Vec<String> = manifest.keys.iter().map(Key::to_string).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "keys": keys,
                "failures": manifest.failures,
            }))?
        );
        return Ok(());
    }

    for key in &manifest.keys {
        let length = catalog.get(key).map(|o| o.length()).unwrap_or(0);
        println!("  {} {} ({} bytes)", "imported:".green(), key, length);
    }
    for failure in &manifest.failures {
        println!("  {} {}", "failed:".red(), failure);
    }
    let mark = if manifest.is_clean() { "✓".green().bold() } else { "!".yellow().bold() };
    println!(
        "{} {} file(s) registered, {} failure(s)",
        mark,
        manifest.keys.len(),
        manifest.failures.len()
    );
    Ok(())
}

fn format_timestamp(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

fn cmd_ls(ctx: &Context, args: PathArgs) -> anyhow::Result<()> {
    let entries = ctx.fs().list(&args.path)?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("{} is empty.", args.path.bold());
    }
    for PersistEntry { name, size, timestamp_millis } in &entries {
        println!(
            "{:>12}  {}  {}",
            size,
            format_timestamp(*timestamp_millis).dimmed(),
            name
        );
    }
    Ok(())
}

fn cmd_stat(ctx: &Context, args: PathArgs) -> anyhow::Result<()> {
    let fs = ctx.fs();
    let exists = fs.exists(&args.path)?;
    let length = if exists { Some(fs.length(&args.path)?) } else { None };
    if ctx.json() {
        println!(
            "{}",
            serde_json::json!({ "path": args.path, "exists": exists, "length": length })
        );
    } else if let Some(length) = length {
        println!("{}  {} bytes", args.path.bold(), length);
    } else {
        println!("{}  {}", args.path.bold(), "not found".red());
    }
    Ok(())
}

fn cmd_cat(ctx: &Context, args: CatArgs) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    match args.chunk {
        None => {
            let mut stream = ctx.fs().open(&args.path)?;
            io::copy(&mut stream, &mut stdout)?;
        }
        Some(index) => {
            let catalog = Arc::new(ObjectCatalog::new());
            let importer = TreeImporter::new(
                Arc::clone(&ctx.registry),
                Arc::clone(&catalog) as Arc<dyn ExternalRegistry>,
            );
            let key = importer.import_uri(&args.path)?;
            let object = catalog
                .get(&key)
                .context("registered object missing from catalog")?;
            let value = object.chunk(index).with_context(|| {
                format!("{} has {} chunk(s); no chunk {index}", args.path, object.chunk_count())
            })?;
            let data = ctx.external().load(&value)?;
            stdout.write_all(&data)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_put(ctx: &Context, args: PutArgs) -> anyhow::Result<()> {
    let data = std::fs::read(&args.local)
        .with_context(|| format!("reading {}", args.local.display()))?;
    if args.retry {
        ctx.external()
            .store_bytes(&RemotePath::new(&args.remote), &data)?;
    } else {
        let mut stream = ctx.fs().create(&args.remote, !args.no_clobber)?;
        stream.write_all(&data)?;
        stream.flush()?;
    }
    println!(
        "{} Wrote {} bytes to {}",
        "✓".green(),
        data.len(),
        args.remote.bold()
    );
    Ok(())
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> anyhow::Result<()> {
    if ctx.fs().rename(&args.from, &args.to)? {
        println!("{} Moved {} → {}", "✓".green(), args.from.bold(), args.to.bold());
        Ok(())
    } else {
        anyhow::bail!("could not move {} to {}", args.from, args.to)
    }
}

fn cmd_rm(ctx: &Context, args: PathArgs) -> anyhow::Result<()> {
    if ctx.fs().delete(&args.path)? {
        println!("{} Deleted {}", "✓".green(), args.path.bold());
    } else {
        println!("{} not found.", args.path.bold());
    }
    Ok(())
}

fn cmd_home(ctx: &Context) -> anyhow::Result<()> {
    let home = ctx.fs().home_directory()?;
    if ctx.json() {
        println!("{}", serde_json::json!({ "home": home }));
    } else {
        println!("{home}");
    }
    Ok(())
}

fn print_io_summary(ctx: &Context) {
    if !ctx.verbose || ctx.json() || ctx.timeline.is_empty() {
        return;
    }
    let (reads, read_bytes) = ctx.timeline.totals(IoDirection::Read);
    let (writes, write_bytes) = ctx.timeline.totals(IoDirection::Write);
    eprintln!(
        "{} {} read(s) / {} bytes, {} write(s) / {} bytes",
        "io:".dimmed(),
        reads,
        read_bytes,
        writes,
        write_bytes
    );
}
