//! Argument specification wrapper.
//!
//! The caller owns the grammar: an [`ArgSpec`] wraps a `clap::Command` and
//! layers the merger's own needs on top of it. It guarantees the `--config`
//! and `--strict` options exist (tolerating specs that already declare
//! them), indexes every declared dotted key including one level of
//! subcommands, and exposes the shared parse primitive used by every pass
//! of the pipeline.
//!
//! Provenance comes straight from clap's per-argument `ValueSource` instead
//! of a sentinel-default re-parse: a value whose source is the command line
//! was explicitly supplied, a value whose source is the argument's default
//! was not.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::ffi::{OsStr, OsString};

/// Resolved values split by provenance tier.
#[derive(Debug, Default)]
pub(crate) struct Layers {
    /// Values that fell back to the spec's built-in defaults.
    pub(crate) defaults: BTreeMap<String, Value>,
    /// Values explicitly supplied on the command line.
    pub(crate) cli: BTreeMap<String, Value>,
}

/// A caller-supplied `clap::Command` plus the indexes the merge pipeline
/// needs. The wrapped command is never handed back mutated; every parse
/// works on a clone.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    command: Command,
    declared: HashSet<String>,
    multi_value: HashSet<String>,
}

impl ArgSpec {
    /// Wrap a command, ensuring the merger's `--config` and `--strict`
    /// options exist on it.
    pub fn new(command: Command) -> Self {
        let command = ensure_merger_args(command);
        let mut declared = HashSet::new();
        let mut multi_value = HashSet::new();
        index_args(&command, &mut declared, &mut multi_value);
        Self {
            command,
            declared,
            multi_value,
        }
    }

    /// Every flag name the spec knows about, across the top level and all
    /// subcommands. Used to filter keys from the defaults file.
    pub fn declared_keys(&self) -> &HashSet<String> {
        &self.declared
    }

    /// The shared parse primitive.
    ///
    /// Strict parses reject unrecognized tokens. Lenient parses mirror a
    /// known-args parse: each unrecognized token is dropped and the
    /// remainder re-parsed, so declared arguments after an unknown token
    /// still resolve, and an invalid value for a declared argument is
    /// still a fatal parse error.
    pub(crate) fn parse(
        &self,
        args: &[OsString],
        strict: bool,
    ) -> Result<ArgMatches, clap::Error> {
        if strict {
            return self.try_parse(args.iter().cloned());
        }
        let mut tokens: Vec<OsString> = args.to_vec();
        loop {
            match self.try_parse(tokens.iter().cloned()) {
                Ok(matches) => return Ok(matches),
                Err(err) => {
                    let Some(position) = unrecognized_token(&err).and_then(|offending| {
                        tokens.iter().position(|t| token_matches(t, &offending))
                    }) else {
                        return Err(err);
                    };
                    tokens.remove(position);
                }
            }
        }
    }

    fn try_parse(
        &self,
        args: impl IntoIterator<Item = OsString>,
    ) -> Result<ArgMatches, clap::Error> {
        self.command
            .clone()
            .no_binary_name(true)
            .try_get_matches_from(args)
    }

    /// Split the resolved values of a parse into provenance layers.
    ///
    /// A resolved subcommand contributes its own arguments plus a `command`
    /// entry (the subcommand name) in the command-line layer.
    pub(crate) fn extract_layers(&self, matches: &ArgMatches) -> Layers {
        let mut layers = Layers::default();
        self.collect_layers(matches, &mut layers);
        layers
    }

    fn collect_layers(&self, matches: &ArgMatches, layers: &mut Layers) {
        for id in matches.ids() {
            let key = id.as_str();
            // Skips group ids, which carry no values of their own.
            let Ok(Some(raw)) = matches.try_get_raw(key) else {
                continue;
            };
            let value = coerce_raw(raw.collect(), self.multi_value.contains(key));
            match matches.value_source(key) {
                Some(ValueSource::DefaultValue) => layers.defaults.insert(key.to_string(), value),
                _ => layers.cli.insert(key.to_string(), value),
            };
        }
        if let Some((name, sub_matches)) = matches.subcommand() {
            layers
                .cli
                .insert("command".to_string(), Value::String(name.to_string()));
            self.collect_layers(sub_matches, layers);
        }
    }
}

/// The raw first value of an argument, if one was resolved.
pub(crate) fn raw_string(matches: &ArgMatches, key: &str) -> Option<String> {
    let raw = matches.try_get_raw(key).ok().flatten()?;
    raw.into_iter()
        .next()
        .map(|v| v.to_string_lossy().into_owned())
}

/// Whether a boolean flag resolved to true.
pub(crate) fn flag_is_true(matches: &ArgMatches, key: &str) -> bool {
    raw_string(matches, key).is_some_and(|v| v == "true")
}

/// The token named by an unrecognized-argument or unknown-subcommand
/// error. Any other error kind returns `None` and stays fatal in the
/// lenient loop.
fn unrecognized_token(err: &clap::Error) -> Option<String> {
    let context = match err.kind() {
        ErrorKind::UnknownArgument => ContextKind::InvalidArg,
        ErrorKind::InvalidSubcommand => ContextKind::InvalidSubcommand,
        _ => return None,
    };
    match err.get(context) {
        Some(ContextValue::String(token)) => Some(token.clone()),
        _ => None,
    }
}

/// Whether a raw token is the one clap reported, allowing for an attached
/// `=value`.
fn token_matches(token: &OsString, offending: &str) -> bool {
    token.to_str().is_some_and(|t| {
        t == offending
            || t.strip_prefix(offending)
                .is_some_and(|rest| rest.starts_with('='))
    })
}

/// Add `--config` and `--strict` unless the spec already declares them.
fn ensure_merger_args(mut command: Command) -> Command {
    let has_config = command
        .get_arguments()
        .any(|a| a.get_id() == "config" || a.get_long() == Some("config"));
    if !has_config {
        command = command.arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("If set, defaults are overridden by values from the given YAML file"),
        );
    }

    let has_strict = command
        .get_arguments()
        .any(|a| a.get_id() == "strict" || a.get_long() == Some("strict"));
    if !has_strict {
        command = command.arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Reject any argument the spec does not declare"),
        );
    }

    command
}

fn index_args(command: &Command, declared: &mut HashSet<String>, multi_value: &mut HashSet<String>) {
    for arg in command.get_arguments() {
        let key = arg.get_id().to_string();
        let many = matches!(arg.get_action(), ArgAction::Append)
            || arg.get_num_args().is_some_and(|n| n.max_values() > 1);
        if many {
            multi_value.insert(key.clone());
        }
        declared.insert(key);
    }
    for sub in command.get_subcommands() {
        index_args(sub, declared, multi_value);
    }
}

/// Coerce raw token strings into the YAML-style scalar they spell.
///
/// Declared multi-value arguments always become lists, even with a single
/// occurrence; everything else becomes a list only when repeated.
fn coerce_raw(raw: Vec<&OsStr>, multi_value: bool) -> Value {
    if multi_value || raw.len() > 1 {
        Value::Array(raw.into_iter().map(coerce_scalar).collect())
    } else {
        raw.into_iter().next().map_or(Value::Null, coerce_scalar)
    }
}

fn coerce_scalar(raw: &OsStr) -> Value {
    let Some(text) = raw.to_str() else {
        return Value::String(raw.to_string_lossy().into_owned());
    };
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = text.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(text.to_string())
}
