//! `chaos.config.json` loading.
//!
//! ```json
//! {
//!   "error_level": 1,
//!   "destructives": { "email": ["", "@", "a@b"] },
//!   "targets": [
//!     {
//!       "name": "sum",
//!       "program": "./bin/sum",
//!       "inputs": [4, { "type": "number", "example": 4 }],
//!       "output": 8,
//!       "destructives": { "number": [3, 0, 9] }
//!     }
//!   ]
//! }
//! ```
//!
//! YAML is accepted for `.yaml`/`.yml` files with the same shape.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use chaos_core::{CatalogOverlay, TypeDescriptor, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChaosConfig {
    /// Default error level for every target.
    #[serde(default)]
    pub error_level: u8,
    /// Destructive values shared by every target.
    #[serde(default)]
    pub destructives: BTreeMap<String, serde_json::Value>,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    /// Program to run; relative paths resolve against the config directory.
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub output: Option<InputSpec>,
    /// Overrides the top-level error level.
    #[serde(default)]
    pub error_level: Option<u8>,
    #[serde(default)]
    pub destructives: BTreeMap<String, serde_json::Value>,
    /// Spawn calls concurrently instead of one at a time.
    #[serde(default)]
    pub concurrent: bool,
}

/// An input or output declaration: a bare example, or an example with an
/// explicit type descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputSpec {
    Typed(TypedInput),
    Bare(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedInput {
    #[serde(rename = "type")]
    pub descriptor: TypeDescriptor,
    pub example: serde_json::Value,
}

impl InputSpec {
    pub fn example(&self) -> Value {
        match self {
            InputSpec::Typed(typed) => Value::from(typed.example.clone()),
            InputSpec::Bare(example) => Value::from(example.clone()),
        }
    }

    /// Declared descriptor; `None` means infer from the example.
    pub fn descriptor(&self) -> Option<TypeDescriptor> {
        match self {
            InputSpec::Typed(typed) => Some(typed.descriptor.clone()),
            InputSpec::Bare(_) => None,
        }
    }
}

/// Destructive overlay for one target plus the per-target categories that
/// were skipped because they are not sequences.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDestructives {
    pub overlay: CatalogOverlay,
    pub skipped: Vec<String>,
}

enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

impl ChaosConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = match Format::from_path(path) {
            Format::Json => Self::from_json_str(&text),
            Format::Yaml => Self::from_yaml_str(&text),
        }
        .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("Failed to parse JSON config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("config must list at least one target");
        }
        let mut seen = BTreeSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                bail!("target names must not be empty");
            }
            if target.program.trim().is_empty() {
                bail!("target '{}' has an empty program", target.name);
            }
            if !seen.insert(target.name.as_str()) {
                bail!("duplicate target name '{}'", target.name);
            }
        }
        Ok(())
    }

    /// Targets selected by `--only`; every target when `only` is empty.
    pub fn select(&self, only: &[String]) -> Result<Vec<&TargetConfig>> {
        if only.is_empty() {
            return Ok(self.targets.iter().collect());
        }
        for name in only {
            if !self.targets.iter().any(|t| &t.name == name) {
                bail!("no target named '{}' in config", name);
            }
        }
        Ok(self
            .targets
            .iter()
            .filter(|t| only.contains(&t.name))
            .collect())
    }

    pub fn error_level_for(&self, target: &TargetConfig) -> u8 {
        target.error_level.unwrap_or(self.error_level)
    }

    /// Merge per-target destructives with the shared ones. Per-target
    /// values come first, followed by the shared entry of the same name.
    /// Shared entries are passed through unchecked so the engine reports
    /// them.
    pub fn destructives_for(&self, target: &TargetConfig) -> ResolvedDestructives {
        let mut resolved = ResolvedDestructives::default();
        let names: BTreeSet<&String> = self
            .destructives
            .keys()
            .chain(target.destructives.keys())
            .collect();

        for name in names {
            let own = match target.destructives.get(name) {
                Some(serde_json::Value::Array(values)) => Some(values),
                Some(other) => {
                    warn!(
                        target_name = %target.name,
                        category = %name,
                        value = %other,
                        "destructive values must be a sequence, skipping"
                    );
                    resolved.skipped.push(name.clone());
                    None
                }
                None => None,
            };
            let merged = match (own, self.destructives.get(name)) {
                (Some(own), Some(serde_json::Value::Array(shared))) => {
                    serde_json::Value::Array(own.iter().chain(shared).cloned().collect())
                }
                (Some(own), None) => serde_json::Value::Array(own.clone()),
                (_, Some(shared)) => shared.clone(),
                (None, None) => continue,
            };
            resolved.overlay.insert(name.clone(), Value::from(merged));
        }
        resolved
    }
}

/// Resolve a target program. Names containing a path separator are taken
/// relative to `base_dir`; bare names are left for `PATH` lookup.
pub fn resolve_program(base_dir: &Path, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_absolute() || !program.contains(['/', std::path::MAIN_SEPARATOR]) {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Directory that relative programs resolve against.
pub fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ChaosConfig {
        ChaosConfig::from_json_str(
            &json!({
                "error_level": 1,
                "destructives": { "number": [7], "email": ["@"] },
                "targets": [
                    {
                        "name": "sum",
                        "program": "./bin/sum",
                        "inputs": [4, { "type": "number", "example": 4 }],
                        "output": 8,
                        "destructives": { "number": [3, 0, 9], "broken": 12 }
                    },
                    {
                        "name": "echo",
                        "program": "cat",
                        "args": ["-"],
                        "inputs": [{ "a": 1 }],
                        "error_level": 0,
                        "concurrent": true
                    }
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_inputs_bare_and_typed() {
        let config = sample();
        let sum = &config.targets[0];
        assert!(sum.inputs[0].descriptor().is_none());
        assert_eq!(sum.inputs[0].example(), Value::from(4));
        assert_eq!(
            sum.inputs[1].descriptor(),
            Some(TypeDescriptor::Primitive("number".into()))
        );
        assert_eq!(sum.output.as_ref().unwrap().example(), Value::from(8));

        // An object without both keys is a bare example.
        let echo = &config.targets[1];
        assert!(echo.inputs[0].descriptor().is_none());
        assert!(echo.concurrent);
    }

    #[test]
    fn test_structured_type_declaration() {
        let config = ChaosConfig::from_json_str(
            r#"{"targets": [{"name": "point", "program": "cat",
                 "inputs": [{"type": {"x": "number", "tag": "string | null"},
                             "example": {"x": 1, "tag": "a"}}]}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.targets[0].inputs[0].descriptor(),
            Some(TypeDescriptor::Struct(vec![
                ("x".into(), TypeDescriptor::Primitive("number".into())),
                (
                    "tag".into(),
                    TypeDescriptor::Union(vec!["string".into(), "null".into()])
                ),
            ]))
        );
    }

    #[test]
    fn test_error_level_override() {
        let config = sample();
        assert_eq!(config.error_level_for(&config.targets[0]), 1);
        assert_eq!(config.error_level_for(&config.targets[1]), 0);
    }

    #[test]
    fn test_destructives_per_target_first() {
        let config = sample();
        let resolved = config.destructives_for(&config.targets[0]);
        assert_eq!(
            resolved.overlay.sequence("number"),
            Some(&[Value::from(3), Value::from(0), Value::from(9), Value::from(7)][..])
        );
        assert_eq!(resolved.overlay.sequence("email"), Some(&[Value::from("@")][..]));
        assert_eq!(resolved.skipped, vec!["broken".to_string()]);
        assert!(resolved.overlay.sequence("broken").is_none());

        let resolved = config.destructives_for(&config.targets[1]);
        assert_eq!(resolved.overlay.sequence("number"), Some(&[Value::from(7)][..]));
        assert!(resolved.skipped.is_empty());
    }

    #[test]
    fn test_yaml_config() {
        let config = ChaosConfig::from_yaml_str(
            r#"
targets:
  - name: upper
    program: tr
    args: [a-z, A-Z]
    inputs:
      - hello
      - type: "string | number"
        example: 3
"#,
        )
        .unwrap();
        assert_eq!(config.error_level, 0);
        let upper = &config.targets[0];
        assert_eq!(upper.args, vec!["a-z", "A-Z"]);
        assert_eq!(upper.inputs[0].example(), Value::from("hello"));
        assert_eq!(
            upper.inputs[1].descriptor(),
            Some(TypeDescriptor::Union(vec!["string".into(), "number".into()]))
        );
    }

    #[test]
    fn test_rejects_invalid_configs() {
        assert!(ChaosConfig::from_json_str(r#"{"targets": []}"#).is_err());
        assert!(ChaosConfig::from_json_str(
            r#"{"targets": [{"name": "a", "program": "x", "inputs": [1]},
                            {"name": "a", "program": "y", "inputs": [1]}]}"#
        )
        .is_err());
        assert!(ChaosConfig::from_json_str(r#"{"targets": [], "unknown": 1}"#).is_err());
    }

    #[test]
    fn test_select_only() {
        let config = sample();
        assert_eq!(config.select(&[]).unwrap().len(), 2);
        let selected = config.select(&["echo".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "echo");
        assert!(config.select(&["missing".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_program() {
        let base = Path::new("/work/project");
        assert_eq!(
            resolve_program(base, "./bin/sum"),
            PathBuf::from("/work/project/./bin/sum")
        );
        assert_eq!(resolve_program(base, "cat"), PathBuf::from("cat"));
        assert_eq!(resolve_program(base, "/bin/cat"), PathBuf::from("/bin/cat"));
        assert_eq!(config_dir(Path::new("chaos.config.json")), PathBuf::from("."));
        assert_eq!(config_dir(Path::new("cfg/chaos.yaml")), PathBuf::from("cfg"));
    }
}
