use indexmap::IndexMap;
use log::{debug, info, trace};
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::constants::DEFAULT_INCLUDE;
use crate::error::{AutowireError, Result};
use crate::naming::{is_binding_name, to_pascal_case};
use crate::types::{ComponentSource, Config, ImportSpec, NamingStrategy};

/// Configuration as written by the user, e.g. in `autowire.config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserConfig {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub components: Option<Vec<ComponentEntry>>,
    pub module: Option<IndexMap<String, OneOrMany>>,
    pub mapping: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentEntry {
    Directory(String),
    Detailed(ComponentOptions),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComponentOptions {
    pub directory: String,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub naming_strategy: Option<NamingStrategy>,
    pub flat: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Turns a loose [`UserConfig`] into a fully specified [`Config`].
///
/// Component directories are resolved against `root` and must stay inside it.
pub fn normalize_config(user: UserConfig, root: &Path) -> Result<Config> {
    let root = if root.is_absolute() { root.clean() } else { root_relative_to_cwd(root)? };
    debug!("Normalizing configuration for root {}", root.display());

    let mut components = Vec::new();
    for entry in user.components.unwrap_or_default() {
        let options = match entry {
            ComponentEntry::Directory(directory) => {
                ComponentOptions { directory, ..Default::default() }
            }
            ComponentEntry::Detailed(options) => options,
        };
        components.push(normalize_component(options, &root)?);
    }

    let mut module = IndexMap::new();
    for (module_path, specs) in user.module.unwrap_or_default() {
        let specs = specs
            .into_vec()
            .iter()
            .map(|raw| ImportSpec::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        trace!("Module '{}' binds {:?}", module_path, specs);
        module.insert(module_path, specs);
    }

    let mapping = user.mapping.unwrap_or_default();
    if let Some(bad) = mapping.keys().find(|key| !is_binding_name(key)) {
        return Err(AutowireError::config(format!("mapping key '{}' is not an identifier", bad)));
    }

    let config = Config {
        include: user
            .include
            .unwrap_or_else(|| DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect()),
        exclude: user.exclude.unwrap_or_default(),
        components,
        module,
        mapping,
        root,
    };
    info!(
        "Configured {} component directories, {} modules, {} literal mappings",
        config.components.len(),
        config.module.len(),
        config.mapping.len()
    );
    Ok(config)
}

fn normalize_component(options: ComponentOptions, root: &Path) -> Result<ComponentSource> {
    let naming_strategy = match (options.naming_strategy, options.flat) {
        (Some(NamingStrategy::Namespaced), Some(true)) => {
            return Err(AutowireError::config(format!(
                "component directory '{}' sets both flat and namingStrategy \"namespaced\"",
                options.directory
            )));
        }
        (Some(strategy), _) => strategy,
        (None, Some(true)) => NamingStrategy::Flat,
        (None, _) => NamingStrategy::Namespaced,
    };

    let directory = absolutize(Path::new(&options.directory), root);
    if !directory.starts_with(root) {
        return Err(AutowireError::config(format!(
            "component directory {} is outside the project root {}",
            directory.display(),
            root.display()
        )));
    }

    let namespace = options.namespace.unwrap_or_default();
    let prefix = options.prefix.unwrap_or_default();
    for (label, value) in [("namespace", &namespace), ("prefix", &prefix)] {
        let pascal = to_pascal_case(value);
        if !value.is_empty() && (pascal.is_empty() || pascal.starts_with(|c: char| c.is_ascii_digit()))
        {
            return Err(AutowireError::config(format!(
                "{} '{}' of component directory {} cannot start an identifier",
                label,
                value,
                directory.display()
            )));
        }
    }

    debug!("Component directory {} uses {:?} naming", directory.display(), naming_strategy);
    Ok(ComponentSource { directory, naming_strategy, namespace, prefix })
}

fn root_relative_to_cwd(root: &Path) -> Result<PathBuf> {
    Ok(absolutize(root, &env::current_dir()?))
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf().clean() } else { base.join(path).clean() }
}

/// Reads a JSON [`UserConfig`] from disk.
pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    debug!("Loading user config from {}", path.display());
    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Walks up from the current directory to the nearest directory holding a
/// `package.json` (or, failing that, a `.git` directory).
pub fn find_project_root() -> Result<PathBuf> {
    debug!("Searching for project root");
    let start = env::current_dir()?;
    trace!("Starting search from: {:?}", start);

    for marker in ["package.json", ".git"] {
        let mut current_dir = start.as_path();
        loop {
            let candidate = current_dir.join(marker);
            trace!("Checking for {} at: {:?}", marker, candidate);
            if candidate.exists() {
                debug!("Found project root at: {:?}", current_dir);
                return Ok(current_dir.to_path_buf());
            }
            match current_dir.parent() {
                Some(parent) => current_dir = parent,
                None => break,
            }
        }
    }

    Err(AutowireError::config("could not find package.json or .git in any parent folder"))
}
