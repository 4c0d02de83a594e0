//! `${VAR}` substitution over the raw YAML tree.
//!
//! Runs before the tree is deserialized, so any string field (API keys, the
//! CDP endpoint, the log directory) can reference the environment. Only
//! uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` is the escape
//! for a literal `${VAR}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Matches `${VAR}` with an optional leading `$` marking the escape form.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute against the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute against an explicit map. Unset and empty variables are errors.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                let key = k.as_str().unwrap_or("?");
                let child = if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Mapping(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let replaced = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        if caps[0].starts_with("$$") {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Names referenced anywhere in the tree, sorted and deduplicated.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if !caps[0].starts_with("$$") {
                    out.push(caps[1].to_string());
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Mapping(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn substitutes_nested_key() {
        let v = yaml("providers:\n  huggingFace:\n    token: ${HF_TOKEN}\n");
        let out = resolve_env_vars_with(&v, &env(&[("HF_TOKEN", "hf_abc")])).unwrap();
        assert_eq!(out["providers"]["huggingFace"]["token"].as_str(), Some("hf_abc"));
    }

    #[test]
    fn substitutes_inside_larger_string() {
        let v = yaml("browser:\n  cdpEndpoint: http://${CDP_HOST}:9222\n");
        let out = resolve_env_vars_with(&v, &env(&[("CDP_HOST", "10.0.0.5")])).unwrap();
        assert_eq!(out["browser"]["cdpEndpoint"].as_str(), Some("http://10.0.0.5:9222"));
    }

    #[test]
    fn missing_var_reports_path() {
        let v = yaml("tts:\n  apiKey: ${ELEVEN_KEY}\n");
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "ELEVEN_KEY");
        assert_eq!(err.config_path, "tts.apiKey");
    }

    #[test]
    fn empty_var_counts_as_missing() {
        let v = yaml("key: ${EMPTY}\n");
        assert!(resolve_env_vars_with(&v, &env(&[("EMPTY", "")])).is_err());
    }

    #[test]
    fn escaped_reference_is_kept_literally() {
        let v = yaml("player:\n  args: [\"$${NOT_A_VAR}\"]\n");
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out["player"]["args"][0].as_str(), Some("${NOT_A_VAR}"));
    }

    #[test]
    fn non_string_values_pass_through() {
        let v = yaml("scan:\n  timeoutMs: 5000\nenrichment:\n  enrichPdfs: false\n");
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn collects_referenced_vars_without_escapes() {
        let v = yaml("a: ${FOO}\nb:\n  c: ${BAR} ${FOO}\nd: $${SKIP}\n");
        assert_eq!(collect_referenced_vars(&v), vec!["BAR", "FOO"]);
    }
}
