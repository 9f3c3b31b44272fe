use std::fs;
use std::path::{Path, PathBuf};

use reqsplit_domain::{
    AliasTable, ConstraintOp, ConstraintPolicy, NameNormalizer, FREEZE_SKIP,
};
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::debug;

use crate::errors::SplitError;

pub const CONFIG_FILE_NAME: &str = "reqsplit.toml";
const PYPROJECT_FILE_NAME: &str = "pyproject.toml";

pub const DEFAULT_PRODUCTION_FILE: &str = "requirements.txt";
pub const DEFAULT_DEVELOPMENT_FILE: &str = "requirements-dev.txt";

const KNOWN_KEYS: &[&str] = &[
    "python",
    "output-dir",
    "production-file",
    "development-file",
    "exclude",
    "skip",
    "builtin-aliases",
    "aliases",
    "constraints",
];

/// Project configuration from `reqsplit.toml` or `[tool.reqsplit]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub python: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub production_file: String,
    pub development_file: String,
    /// Directory names pruned in addition to the built-in exclusions.
    pub exclude: Vec<String>,
    /// Distributions left out of the snapshot unless `--all` is given.
    pub skip: Vec<String>,
    pub aliases: AliasTable,
    pub constraints: ConstraintPolicy,
    /// File the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: None,
            output_dir: None,
            production_file: DEFAULT_PRODUCTION_FILE.to_string(),
            development_file: DEFAULT_DEVELOPMENT_FILE.to_string(),
            exclude: Vec::new(),
            skip: FREEZE_SKIP.iter().map(ToString::to_string).collect(),
            aliases: AliasTable::builtin(),
            constraints: ConstraintPolicy::default(),
            source: None,
        }
    }
}

impl Config {
    /// Loads `explicit` when given, otherwise looks in `root` for
    /// `reqsplit.toml` and then `pyproject.toml`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, SplitError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SplitError::Config {
                    path: path.to_path_buf(),
                    reason: "config file not found".to_string(),
                });
            }
            let is_pyproject = path.file_name().is_some_and(|name| name == PYPROJECT_FILE_NAME);
            return Self::read(path, is_pyproject).map(Option::unwrap_or_default);
        }

        let standalone = root.join(CONFIG_FILE_NAME);
        if standalone.is_file() {
            return Self::read(&standalone, false).map(Option::unwrap_or_default);
        }
        let pyproject = root.join(PYPROJECT_FILE_NAME);
        if pyproject.is_file() {
            return Self::read(&pyproject, true).map(Option::unwrap_or_default);
        }
        debug!(root = %root.display(), "no reqsplit configuration found");
        Ok(Self::default())
    }

    fn read(path: &Path, pyproject: bool) -> Result<Option<Self>, SplitError> {
        let text = fs::read_to_string(path).map_err(|err| SplitError::Config {
            path: path.to_path_buf(),
            reason: format!("unable to read file: {err}"),
        })?;
        Self::from_toml_str(&text, path, pyproject)
    }

    /// Parses configuration text. For `pyproject.toml` only the
    /// `[tool.reqsplit]` table is read, and `None` means it is absent.
    pub fn from_toml_str(text: &str, path: &Path, pyproject: bool) -> Result<Option<Self>, SplitError> {
        let invalid = |reason: String| SplitError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let doc: DocumentMut = text
            .parse()
            .map_err(|err: toml_edit::TomlError| invalid(err.to_string()))?;
        let table: &dyn TableLike = if pyproject {
            match doc
                .get("tool")
                .and_then(Item::as_table_like)
                .and_then(|tool| tool.get("reqsplit"))
            {
                Some(item) => item
                    .as_table_like()
                    .ok_or_else(|| invalid("`tool.reqsplit` must be a table".to_string()))?,
                None => return Ok(None),
            }
        } else {
            doc.as_table()
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config = Self::from_table(table, base).map_err(invalid)?;
        config.source = Some(path.to_path_buf());
        debug!(path = %path.display(), "loaded reqsplit configuration");
        Ok(Some(config))
    }

    fn from_table(table: &dyn TableLike, base: &Path) -> Result<Self, String> {
        if let Some((key, _)) = table.iter().find(|(key, _)| !KNOWN_KEYS.contains(key)) {
            return Err(format!("unknown key `{key}`"));
        }
        let mut config = Self::default();

        if let Some(python) = string_value(table, "python")? {
            config.python = Some(if python.contains(['/', '\\']) {
                base.join(&python).display().to_string()
            } else {
                python
            });
        }
        if let Some(dir) = string_value(table, "output-dir")? {
            config.output_dir = Some(base.join(dir));
        }
        if let Some(name) = string_value(table, "production-file")? {
            config.production_file = file_name_value("production-file", name)?;
        }
        if let Some(name) = string_value(table, "development-file")? {
            config.development_file = file_name_value("development-file", name)?;
        }
        if config.production_file == config.development_file {
            return Err("`production-file` and `development-file` must differ".to_string());
        }
        if let Some(exclude) = string_array(table, "exclude")? {
            config.exclude = exclude;
        }
        if let Some(skip) = string_array(table, "skip")? {
            config.skip = skip;
        }

        let builtin = match table.get("builtin-aliases") {
            Some(item) => item
                .as_bool()
                .ok_or_else(|| "`builtin-aliases` must be a boolean".to_string())?,
            None => true,
        };
        if !builtin {
            config.aliases = AliasTable::empty();
        }
        if let Some(item) = table.get("aliases") {
            let aliases = item
                .as_table_like()
                .ok_or_else(|| "`aliases` must be a table".to_string())?;
            for (key, value) in aliases.iter() {
                let target = value
                    .as_str()
                    .ok_or_else(|| format!("alias `{key}` must map to a string"))?;
                config
                    .aliases
                    .insert(key, target)
                    .map_err(|err| err.to_string())?;
            }
        }

        if let Some(item) = table.get("constraints") {
            let constraints = item
                .as_table_like()
                .ok_or_else(|| "`constraints` must be a table".to_string())?;
            for (key, value) in constraints.iter() {
                let raw = value
                    .as_str()
                    .ok_or_else(|| format!("constraint `{key}` must be a string"))?;
                let op: ConstraintOp = raw.parse()?;
                match key {
                    "production" => config.constraints.production = op,
                    "development" => config.constraints.development = op,
                    other => return Err(format!("unknown constraint bucket `{other}`")),
                }
            }
        }

        Ok(config)
    }

    #[must_use]
    pub fn normalizer(&self) -> NameNormalizer {
        NameNormalizer::new(self.aliases.clone())
    }
}

fn string_value(table: &dyn TableLike, key: &str) -> Result<Option<String>, String> {
    match table.get(key) {
        None => Ok(None),
        Some(item) => item
            .as_str()
            .map(|value| Some(value.trim().to_string()))
            .ok_or_else(|| format!("`{key}` must be a string")),
    }
}

fn string_array(table: &dyn TableLike, key: &str) -> Result<Option<Vec<String>>, String> {
    let Some(item) = table.get(key) else {
        return Ok(None);
    };
    let array = item
        .as_array()
        .ok_or_else(|| format!("`{key}` must be an array of strings"))?;
    array
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(ToString::to_string)
                .ok_or_else(|| format!("`{key}` must be an array of strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn file_name_value(key: &str, name: String) -> Result<String, String> {
    if name.is_empty() {
        return Err(format!("`{key}` must not be empty"));
    }
    Ok(name)
}
