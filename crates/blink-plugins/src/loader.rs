use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::LoadError;

/// The contract `spec.md` §6 leaves "external to this design": given a
/// directory, produce a sequence of registry-compatible items. This crate
/// ships the one concrete implementation in scope — config-driven static
/// registration, no dynamic `.so` loading.
pub trait PluginLoader<T> {
    fn load(&self, dir: &Path) -> Vec<Result<T, LoadError>>;
}

/// Parses every `*.toml` file in `dir` into a `T`. Per-file failures are
/// returned individually rather than aborting the whole scan, so the
/// caller (`Registry::load_directory`-style best-effort load) can log and
/// skip just the bad ones.
pub struct TomlPluginLoader;

impl<T: DeserializeOwned> PluginLoader<T> for TomlPluginLoader {
    fn load(&self, dir: &Path) -> Vec<Result<T, LoadError>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                return vec![Err(LoadError::Io {
                    path: dir.display().to_string(),
                    source,
                })]
            }
        };

        entries
            .flatten()
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("toml"))
            .map(|entry| {
                let path = entry.path();
                fs::read_to_string(&path)
                    .map_err(|source| LoadError::Io {
                        path: path.display().to_string(),
                        source,
                    })
                    .and_then(|contents| {
                        toml::from_str(&contents).map_err(|source| LoadError::Parse {
                            path: path.display().to_string(),
                            source,
                        })
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherSpec;

    #[test]
    fn loads_every_toml_file_and_reports_each_failure_individually() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("good.toml"),
            "name = \"m\"\ndescription = \"\"\nenabled = true\n[rule]\nkind = \"field_equals\"\nfield = \"service\"\nvalue = \"guardduty\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("bad.toml"), "not valid toml at all =").unwrap();

        let results: Vec<Result<MatcherSpec, LoadError>> = TomlPluginLoader.load(dir.path());
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }
}
