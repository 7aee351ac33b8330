//! void-assets - command line front end for the asset pipeline
//!
//! ```text
//! void-assets [--root DIR] scan
//! void-assets [--root DIR] import [--force]
//! void-assets [--root DIR] watch [--interval-ms N] [--iterations N]
//! void-assets [--root DIR] info
//! ```
//!
//! The project root defaults to the current directory. `void_assets.toml` in
//! the root and `VOID_ASSETS_*` environment variables adjust the layout.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use void_asset::{AssetImporterManager, AssetRegistry, AssetResult, AssetScanner, AssetType, PipelineConfig};
use void_asset_server::{builtin_manager, HotReloadManager};

const USAGE: &str = "usage: void-assets [--root DIR] <scan | import [--force] | watch [--interval-ms N] [--iterations N] | info>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Scan,
    Import { force: bool },
    Watch { interval_ms: u64, iterations: Option<u64> },
    Info,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    root: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut root = None;
    let mut command = None;
    let mut force = false;
    let mut interval_ms = 250;
    let mut iterations = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => root = Some(PathBuf::from(args.next().ok_or("--root needs a directory")?)),
            "--force" => force = true,
            "--interval-ms" => interval_ms = parse_number(args.next(), "--interval-ms")?,
            "--iterations" => iterations = Some(parse_number(args.next(), "--iterations")?),
            cmd @ ("scan" | "import" | "watch" | "info") if command.is_none() => command = Some(cmd.to_string()),
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }

    let command = match command.as_deref() {
        Some("scan") => Command::Scan,
        Some("import") => Command::Import { force },
        Some("watch") => Command::Watch { interval_ms, iterations },
        Some("info") => Command::Info,
        _ => return Err("missing command".to_string()),
    };
    Ok(Args { root, command })
}

fn parse_number(value: Option<String>, flag: &str) -> Result<u64, String> {
    let value = value.ok_or_else(|| format!("{} needs a number", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} needs a number, got '{}'", flag, value))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> AssetResult<i32> {
    let mut config = PipelineConfig::discover(args.root.unwrap_or_else(|| PathBuf::from(".")));
    config.apply_env_overrides();
    config.validate()?;

    let mut registry = AssetRegistry::init(config);
    registry.load();
    let importers = builtin_manager();

    match args.command {
        Command::Scan => {
            let (registered, removed, modified) = scan(&mut registry);
            println!(
                "{} new, {} modified, {} deleted ({} assets registered)",
                registered,
                modified,
                removed,
                registry.asset_count()
            );
            registry.save()?;
            Ok(0)
        }
        Command::Import { force } => {
            scan(&mut registry);
            let mut progress = |current: usize, total: usize, path: &str| {
                println!("[{}/{}] {}", current, total, path);
            };
            let report = if force {
                let ids = registry.get_all_asset_ids();
                importers.import_batch(&mut registry, ids, Some(&mut progress))
            } else {
                importers.import_all_with_dependents(&mut registry, Some(&mut progress))
            };
            for (id, error) in &report.failed {
                let path = registry.get_metadata(*id).map(|m| m.source_path.as_str()).unwrap_or("?");
                println!("FAILED {}: {}", path, error);
            }
            println!("{} imported, {} failed", report.succeeded.len(), report.failed.len());
            registry.save()?;
            Ok(if report.failed.is_empty() { 0 } else { 1 })
        }
        Command::Watch { interval_ms, iterations } => {
            watch(registry, importers, Duration::from_millis(interval_ms), iterations)?;
            Ok(0)
        }
        Command::Info => {
            info(&registry, &importers);
            Ok(0)
        }
    }
}

/// Scan and apply New/Deleted; returns (registered, removed, modified)
fn scan(registry: &mut AssetRegistry) -> (usize, usize, usize) {
    let mut scanner = AssetScanner::new();
    scanner.scan_source_directory(registry);
    let (registered, removed) = scanner.apply_changes(registry);
    (registered, removed, scanner.modified_assets().len())
}

fn watch(
    mut registry: AssetRegistry,
    importers: AssetImporterManager,
    interval: Duration,
    iterations: Option<u64>,
) -> AssetResult<()> {
    scan(&mut registry);
    importers.import_all_with_dependents(&mut registry, None);
    registry.save()?;

    let source_root = registry.config().source_root();
    let mut hot_reload = HotReloadManager::new(registry.config().hot_reload.clone());
    for meta in registry.iter() {
        hot_reload.watch_asset(meta.id, registry.config().source_file(&meta.source_path));
    }

    #[cfg(feature = "file-watcher")]
    {
        if let Err(e) = hot_reload.enable_file_watcher(&source_root) {
            log::warn!("Falling back to polling only: {}", e);
        }
    }

    let registry = Rc::new(RefCell::new(registry));
    let importers = Rc::new(importers);
    {
        let registry = registry.clone();
        let importers = importers.clone();
        hot_reload.set_reload_handler(move |id| {
            let mut registry = registry.borrow_mut();
            if !importers.import_asset(&mut registry, id).success {
                return false;
            }
            for dependent in registry.transitive_dependents(id) {
                importers.import_asset(&mut registry, dependent);
            }
            if let Err(e) = registry.save() {
                log::warn!("Failed to save registry: {}", e);
            }
            true
        });
    }
    hot_reload.set_after_reload_callback(|event| {
        let status = if event.success { "reloaded" } else { "FAILED" };
        println!("{} {}", status, event.path.display());
    });

    log::info!(
        "Watching {} assets under {:?}",
        hot_reload.watched_count(),
        source_root
    );

    let mut tick = 0u64;
    while iterations.map_or(true, |n| tick < n) {
        hot_reload.poll();
        pick_up_new_and_deleted(&mut registry.borrow_mut(), &importers, &mut hot_reload);
        tick += 1;
        std::thread::sleep(interval);
    }
    Ok(())
}

/// Files added or removed while watching
fn pick_up_new_and_deleted(
    registry: &mut AssetRegistry,
    importers: &AssetImporterManager,
    hot_reload: &mut HotReloadManager,
) {
    let mut scanner = AssetScanner::new();
    scanner.scan_source_directory(registry);
    if scanner.new_assets().is_empty() && scanner.deleted_assets().is_empty() {
        return;
    }

    for id in scanner.deleted_assets() {
        hot_reload.unwatch(*id);
    }
    scanner.apply_changes(registry);

    for asset in scanner.new_assets() {
        if let Some(id) = registry.get_id_by_path(&asset.path) {
            importers.import_asset(registry, id);
            hot_reload.watch_asset(id, registry.config().source_file(&asset.path));
        }
    }
    if let Err(e) = registry.save() {
        log::warn!("Failed to save registry: {}", e);
    }
}

fn info(registry: &AssetRegistry, importers: &AssetImporterManager) {
    let config = registry.config();
    println!("project root:  {}", config.project_root.display());
    println!("source root:   {}", config.source_root().display());
    println!("imported root: {}", config.imported_root().display());
    println!("registry:      {}", config.registry_path().display());
    println!();
    println!("{} assets", registry.asset_count());
    for asset_type in AssetType::ALL {
        let count = registry.assets_of_type(asset_type).len();
        if count > 0 {
            println!("  {:<13} {}", asset_type.as_str(), count);
        }
    }
    println!("{} need reimport", registry.get_assets_needing_reimport().len());
    println!("importers for: {}", importers.supported_extensions().join(", "));
}
