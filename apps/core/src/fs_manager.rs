use std::path::PathBuf;
use tracing::warn;

/// Name of the optional catalog override in the data directory.
const CATALOG_OVERRIDE_FILENAME: &str = "catalog.json";

pub struct PortablePathManager;

impl PortablePathManager {
    /// Root directory of the application (next to the executable).
    pub fn root_dir() -> PathBuf {
        #[cfg(debug_assertions)]
        {
            // In development the executable lives in target/debug at the workspace root;
            // point at apps/core instead.
            if let Ok(mut path) = std::env::current_exe() {
                path.pop(); // exe name
                path.pop(); // debug
                path.pop(); // target

                let core_path = path.join("apps").join("core");
                if core_path.exists() {
                    return core_path;
                }
            }
        }

        match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                warn!(
                    "Failed to get current exe path: {}. Falling back to current_dir.",
                    e
                );
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }

    /// Main data directory (./data).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// `data/catalog.json` when it exists.
    pub fn catalog_override() -> Option<PathBuf> {
        let path = Self::data_dir().join(CATALOG_OVERRIDE_FILENAME);
        path.is_file().then_some(path)
    }
}
