use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Instant,
};

use autowire_core::{UserConfig, find_project_root, load_user_config};
use autowire_plugin::{
    AutowirePlugin, DirectoryWatcher, PLUGIN_NAME, SvelteConfigLoader, WatchCallback,
    WatchEvent, WatchRegistry,
};

use crate::GlobalArgs;
use crate::reporter;

const DEFAULT_CONFIG_FILE: &str = "autowire.config.json";

#[derive(Debug, Clone, Args)]
pub struct TransformArgs {
    /// Files to transform (defaults to every included file under the root)
    pub files: Vec<PathBuf>,

    /// Overwrite files in place instead of printing a summary
    #[arg(long, conflicts_with = "check")]
    pub write: bool,

    /// Exit with a non-zero status when any file is missing imports
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TypesArgs {
    /// Declaration file to write; printed to stdout when omitted
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// One file that received imports.
pub struct Rewrite {
    pub path: PathBuf,
    pub code: String,
}

pub fn load_plugin(global: &GlobalArgs) -> Result<AutowirePlugin> {
    let root = match &global.root {
        Some(root) => root.clone(),
        None => find_project_root().context("Failed to locate the project root")?,
    };
    let config_path = root.join(&global.config);
    let user_config = if config_path.is_file() {
        load_user_config(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?
    } else if global.config.as_os_str() == DEFAULT_CONFIG_FILE {
        warn!("No {} in {}, using defaults", DEFAULT_CONFIG_FILE, root.display());
        UserConfig::default()
    } else {
        bail!("Configuration file {} does not exist", config_path.display());
    };
    debug!("User config: {:?}", user_config);

    let mut plugin = AutowirePlugin::new(user_config, &root).context("Invalid configuration")?;
    plugin.config_resolved(&[PLUGIN_NAME], &SvelteConfigLoader)?;
    Ok(plugin)
}

/// Returns whether any file is (or was) missing imports.
pub fn run_transform(
    out: &mut impl Write,
    plugin: &AutowirePlugin,
    args: &TransformArgs,
) -> Result<bool> {
    let start = Instant::now();
    let root = plugin.config().root.clone();
    let files: Vec<PathBuf> = if args.files.is_empty() {
        plugin.candidate_files()
    } else {
        args.files.iter().map(|f| if f.is_absolute() { f.clone() } else { root.join(f) }).collect()
    };

    let num_threads = rayon::current_num_threads();
    info!("Transforming {} files (using {} threads)", files.len(), num_threads);

    let rewrites = transform_files(plugin, &files);

    if args.write {
        for rewrite in &rewrites {
            fs::write(&rewrite.path, &rewrite.code)
                .with_context(|| format!("Failed to write {}", rewrite.path.display()))?;
        }
    }

    reporter::print_rewrites(out, &root, &rewrites, args.write)?;
    writeln!(
        out,
        "\n{} Finished in {}ms on {} files (using {} threads).",
        "●".bright_blue(),
        start.elapsed().as_millis().to_string().cyan(),
        files.len().to_string().cyan(),
        num_threads.to_string().cyan()
    )?;
    Ok(!rewrites.is_empty())
}

/// Transforms `files` in parallel; unreadable files are skipped with a warning.
pub fn transform_files(plugin: &AutowirePlugin, files: &[PathBuf]) -> Vec<Rewrite> {
    let mut rewrites: Vec<Rewrite> = files
        .par_iter()
        .filter_map(|path| {
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    return None;
                }
            };
            plugin.transform(&source, path).map(|code| Rewrite { path: path.clone(), code })
        })
        .collect();
    rewrites.sort_by(|a, b| a.path.cmp(&b.path));
    rewrites
}

pub fn run_mapping(out: &mut impl Write, plugin: &AutowirePlugin) -> Result<()> {
    let snapshot = plugin.snapshot();
    reporter::print_mapping(out, &plugin.config().root, &snapshot)?;
    Ok(())
}

pub fn run_types(out: &mut impl Write, plugin: &AutowirePlugin, args: &TypesArgs) -> Result<()> {
    let root = &plugin.config().root;
    match &args.out {
        Some(file) => {
            let file = if file.is_absolute() { file.clone() } else { root.join(file) };
            let declarations = plugin.declarations(&file);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file, declarations)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            writeln!(out, "{} Wrote {}", "✓".green(), reporter::display_path(root, &file))?;
        }
        None => {
            let declarations = plugin.declarations(&root.join("autowire.d.ts"));
            write!(out, "{}", declarations)?;
        }
    }
    Ok(())
}

/// Forwards watcher events to the plugin and echoes them to the terminal.
struct ReportingRegistry {
    inner: DirectoryWatcher,
    root: PathBuf,
}

impl WatchRegistry for ReportingRegistry {
    fn add(&mut self, paths: &[PathBuf], callback: WatchCallback) -> autowire_core::Result<()> {
        let root = self.root.clone();
        let reporting: WatchCallback = Arc::new(move |event: WatchEvent| {
            reporter::print_watch_event(&root, &event);
            callback(event);
        });
        self.inner.add(paths, reporting)
    }
}

pub fn run_watch(out: &mut impl Write, plugin: AutowirePlugin) -> Result<()> {
    let root = plugin.config().root.clone();
    let watch_paths = plugin.snapshot().watch_paths.clone();
    if watch_paths.is_empty() {
        bail!("No component directories are configured, nothing to watch");
    }

    let mut registry = ReportingRegistry { inner: DirectoryWatcher::new(), root: root.clone() };
    plugin.configure_server(&mut registry)?;

    for path in &watch_paths {
        writeln!(out, "{} Watching {}", "●".bright_blue(), display_dir(&root, path))?;
    }
    out.flush()?;

    // Events are delivered on the watcher's own thread.
    loop {
        thread::park();
    }
}

fn display_dir(root: &Path, path: &Path) -> String {
    let shown = reporter::display_path(root, path);
    if shown.is_empty() { ".".to_string() } else { shown }
}
