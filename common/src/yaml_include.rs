use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use yaml_rust2::{Yaml, YamlEmitter, YamlLoader};

#[derive(Debug, Error)]
pub enum YamlIncludeError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: yaml_rust2::ScanError,
    },

    #[error("failed to emit merged yaml: {0}")]
    Emit(#[from] yaml_rust2::EmitError),

    #[error("{0:?} contains no yaml documents")]
    Empty(PathBuf),
}

/// Loads a yaml file, resolving `!include <relative path>` lines.
///
/// Included documents are merged first, in order; the including file's own
/// content overrides them key by key.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, YamlIncludeError> {
    let res = process_includes_recursive(path)?;
    tracing::debug!(path = ?path, "Processed yaml includes");
    Ok(res)
}

/// Same as [`load_yaml_with_includes`], emitted back to a yaml string so it can
/// be handed to a serde deserializer.
pub fn load_yaml_string_with_includes(path: &Path) -> Result<String, YamlIncludeError> {
    let yaml = load_yaml_with_includes(path)?;
    let mut out = String::new();
    {
        let mut emitter = YamlEmitter::new(&mut out);
        emitter.dump(&yaml)?;
    }
    Ok(out)
}

fn process_includes_recursive(path: &Path) -> Result<Yaml, YamlIncludeError> {
    let contents = fs::read_to_string(path).map_err(|source| YamlIncludeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let mut merged_includes: Option<Yaml> = None;
    for line in includes {
        let include_path = line.trim().trim_start_matches("!include").trim();
        let included = process_includes_recursive(&base_path.join(include_path))?;
        merged_includes = Some(match merged_includes {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let rest_yamls =
        YamlLoader::load_from_str(&rest.join("\n")).map_err(|source| YamlIncludeError::Scan {
            path: path.to_path_buf(),
            source,
        })?;

    let merged_rest = rest_yamls
        .into_iter()
        .reduce(|acc: Yaml, doc: Yaml| merge_yaml(&acc, &doc));

    match (merged_includes, merged_rest) {
        (Some(inc), Some(rest)) => Ok(merge_yaml(&inc, &rest)),
        (Some(inc), None) => Ok(inc),
        (None, Some(rest)) => Ok(rest),
        (None, None) => Err(YamlIncludeError::Empty(path.to_path_buf())),
    }
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                match base_hash.get(key) {
                    Some(base_value) => {
                        result.insert(key.clone(), merge_yaml(base_value, value));
                    }
                    None => {
                        result.insert(key.clone(), value.clone());
                    }
                }
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}
