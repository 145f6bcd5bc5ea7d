//! Implementation of the `tmacro eval` command.

use std::collections::{BTreeMap, HashMap};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::{miette, IntoDiagnostic};
use owo_colors::{OwoColorize, Stream};
use serde::{Deserialize, Serialize};
use tmacro::{
    Character, DynamicMacro, EnvBuilder, EnvDefaults, MacroEngine, MemoryVariableStore, RawEnv,
    Variables,
};

use crate::commands::input::TemplateInput;

/// Arguments for the eval command.
#[derive(Debug, clap::Args)]
pub struct EvalArgs {
    #[command(flatten)]
    pub input: TemplateInput,

    /// JSON file with names, a character card, variables and text macros
    #[arg(long, env = "TMACRO_ENV")]
    pub env: Option<PathBuf>,

    /// User display name
    #[arg(long)]
    pub user: Option<String>,

    /// Character display name
    #[arg(long = "char")]
    pub char_name: Option<String>,

    /// Group member names
    #[arg(long)]
    pub group: Option<String>,

    /// Local variables in name=value format (repeatable)
    #[arg(long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Global variables in name=value format (repeatable)
    #[arg(long = "global", value_parser = parse_key_val)]
    pub globals: Vec<(String, String)>,

    /// Nesting depth past which macros are left as written
    #[arg(long, default_value_t = 64)]
    pub max_depth: usize,

    /// Keep scoped block content exactly as written
    #[arg(long)]
    pub keep_whitespace: bool,

    /// Exit with a non-zero code if any warning was raised
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Contents of an `--env` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnvFile {
    pub user: Option<String>,
    pub char: Option<String>,
    pub group: Option<String>,
    pub character: Option<Character>,
    pub variables: BTreeMap<String, String>,
    pub globals: BTreeMap<String, String>,
    /// Text macros available for this evaluation only.
    pub macros: BTreeMap<String, String>,
    pub original: Option<String>,
}

impl EnvFile {
    fn load(path: &Path) -> miette::Result<Self> {
        let content = read_to_string(path)
            .map_err(|e| miette!("Cannot read environment file {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| miette!("Invalid environment file {}: {}", path.display(), e))
    }
}

/// JSON output for eval results.
#[derive(Debug, Serialize)]
pub struct EvalResult {
    pub output: String,
    pub diagnostics: Vec<String>,
    pub variables: BTreeMap<String, String>,
    pub globals: BTreeMap<String, String>,
}

/// Parse a key=value parameter string.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid variable format '{s}': expected name=value"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Run the eval command.
pub fn run_eval(args: EvalArgs) -> miette::Result<i32> {
    let (_, content) = args.input.read()?;
    let env_file = match &args.env {
        Some(path) => EnvFile::load(path)?,
        None => EnvFile::default(),
    };

    let local = Arc::new(MemoryVariableStore::with_values(
        env_file.variables.into_iter().chain(args.vars),
    ));
    let global = Arc::new(MemoryVariableStore::with_values(
        env_file.globals.into_iter().chain(args.globals),
    ));
    let has_character = env_file.character.is_some();
    let defaults = EnvDefaults::builder()
        .maybe_user(env_file.user)
        .maybe_char(env_file.char)
        .maybe_group(env_file.group)
        .maybe_character(env_file.character)
        .variables(Variables::new(local.clone(), global.clone()))
        .build();
    let dynamic_macros: HashMap<String, DynamicMacro> = env_file
        .macros
        .into_iter()
        .map(|(name, text)| (name, DynamicMacro::from(text)))
        .collect();
    let raw = RawEnv::builder()
        .content(content.clone())
        .maybe_name1_override(args.user)
        .maybe_name2_override(args.char_name)
        .maybe_group_override(args.group)
        .replace_character_card(has_character)
        .dynamic_macros(dynamic_macros)
        .maybe_original(env_file.original)
        .build();
    let env = EnvBuilder::new(defaults).build(raw);

    let mut engine = MacroEngine::builder()
        .max_depth(args.max_depth)
        .trim_scoped_content(!args.keep_whitespace)
        .build();
    engine.install_builtins();

    let evaluation = engine.evaluate_with_diagnostics(&content, &env);
    let diagnostics: Vec<String> = evaluation
        .diagnostics
        .iter()
        .map(ToString::to_string)
        .collect();

    if args.json {
        let result = EvalResult {
            output: evaluation.output,
            diagnostics: diagnostics.clone(),
            variables: local.snapshot(),
            globals: global.snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        println!("{}", evaluation.output);
        for message in &diagnostics {
            eprintln!(
                "{} {}",
                "warning:".if_supports_color(Stream::Stderr, |t| t.yellow()),
                message
            );
        }
    }

    if args.strict && !diagnostics.is_empty() {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    #[test]
    fn key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn env_file_fields_are_optional() {
        let file: EnvFile = serde_json::from_str(
            r#"{"char": "Alice", "character": {"description": "A knight."}, "macros": {"weather": "rain"}}"#,
        )
        .unwrap();
        assert_eq!(file.char.as_deref(), Some("Alice"));
        assert_eq!(file.user, None);
        assert_eq!(file.character.unwrap().description, "A knight.");
        assert_eq!(file.macros.get("weather").map(String::as_str), Some("rain"));
    }

    #[test]
    fn env_file_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.json");
        write(&path, r#"{"variables": {"hp": "10"}}"#).unwrap();
        let file = EnvFile::load(&path).unwrap();
        assert_eq!(file.variables.get("hp").map(String::as_str), Some("10"));
    }
}
