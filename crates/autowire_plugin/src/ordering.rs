use autowire_core::{AutowireError, Result};
use log::debug;

/// Name under which this plugin registers with the host.
pub const PLUGIN_NAME: &str = "sveltekit-autowire";

/// The framework plugin that compiles components; it must run after us.
pub const SVELTE_PLUGIN_NAME: &str = "vite-plugin-svelte";

/// Fails when the host's plugin list places the Svelte compiler before this
/// plugin. Lists missing either plugin are accepted, so a host without the
/// Svelte compiler registered passes unchecked.
pub fn enforce_plugin_ordering<S: AsRef<str>>(plugins: &[S]) -> Result<()> {
    let position = |name: &str| plugins.iter().position(|p| p.as_ref() == name);
    let svelte = position(SVELTE_PLUGIN_NAME);
    let autowire = position(PLUGIN_NAME);
    debug!("Plugin positions: {}={:?}, {}={:?}", SVELTE_PLUGIN_NAME, svelte, PLUGIN_NAME, autowire);

    match (svelte, autowire) {
        (Some(svelte), Some(autowire)) if svelte < autowire => Err(AutowireError::Ordering {
            plugin: PLUGIN_NAME.to_string(),
            before: SVELTE_PLUGIN_NAME.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_order() {
        assert!(enforce_plugin_ordering(&["vite:pre", PLUGIN_NAME, SVELTE_PLUGIN_NAME]).is_ok());
    }

    #[test]
    fn test_svelte_first_is_ordering_error() {
        let err = enforce_plugin_ordering(&[SVELTE_PLUGIN_NAME, PLUGIN_NAME]).unwrap_err();
        assert!(matches!(err, AutowireError::Ordering { .. }));
        assert!(err.to_string().contains("must come before"));
    }

    #[test]
    fn test_missing_plugins_are_accepted() {
        assert!(enforce_plugin_ordering(&[PLUGIN_NAME]).is_ok());
        assert!(enforce_plugin_ordering(&[SVELTE_PLUGIN_NAME]).is_ok());
        assert!(enforce_plugin_ordering::<&str>(&[]).is_ok());
    }

    #[test]
    fn test_list_without_svelte_plugin_is_accepted() {
        let plugins = ["vite:css", PLUGIN_NAME, "vite:build", "vite:svelte-inspector"];
        assert!(enforce_plugin_ordering(&plugins).is_ok());
    }
}
