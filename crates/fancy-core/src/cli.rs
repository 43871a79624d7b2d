use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fancy-todo",
    version,
    about = "Fancy Todo: markdown tasks, weekly calendar, and a dashboard in the terminal",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file")]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        if tokens.is_empty() {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "auto".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        }

        if tokens.len() == 1 && tokens[0].parse::<u64>().is_ok() {
            debug!(token = %tokens[0], "single numeric token interpreted as task info query");
            return Ok(Self {
                command: "info".to_string(),
                command_args: vec![tokens[0].clone()],
            });
        }

        let known = crate::commands::known_command_names();
        let first = tokens[0].as_str();
        let Some(command) = crate::commands::expand_command_abbrev(first, &known) else {
            return Err(anyhow!(
                "unknown or ambiguous command: {first} (see 'fancy-todo help')"
            ));
        };
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: tokens[1..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;

    use super::{Invocation, preprocess_args};
    use crate::config::Config;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn bare_config() -> Config {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("rc");
        fs::write(&rc, "").expect("write rc");
        Config::load(Some(&rc)).expect("load config")
    }

    #[test]
    fn positional_rc_tokens_become_overrides() {
        let raw = os_args(&["fancy-todo", "rc.color=off", "list", "rc.user.name:Sam"]);
        let pre = preprocess_args(&raw).expect("preprocess");

        assert_eq!(pre.cleaned_args, os_args(&["fancy-todo", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.user.name".to_string(), "Sam".to_string()),
            ]
        );
    }

    #[test]
    fn empty_invocation_falls_back_to_the_default_command() {
        let cfg = bare_config();
        let inv = Invocation::parse(&cfg, vec![]).expect("parse");
        assert_eq!(inv.command, "auto");
        assert!(inv.command_args.is_empty());
    }

    #[test]
    fn a_single_number_is_an_info_query() {
        let cfg = bare_config();
        let inv = Invocation::parse(&cfg, os_args(&["3"])).expect("parse");
        assert_eq!(inv.command, "info");
        assert_eq!(inv.command_args, vec!["3".to_string()]);
    }

    #[test]
    fn commands_resolve_by_unique_prefix() {
        let cfg = bare_config();
        let inv = Invocation::parse(&cfg, os_args(&["dash"])).expect("parse");
        assert_eq!(inv.command, "dashboard");

        let inv = Invocation::parse(&cfg, os_args(&["cal", "tomorrow"])).expect("parse");
        assert_eq!(inv.command, "calendar");
        assert_eq!(inv.command_args, vec!["tomorrow".to_string()]);
    }

    #[test]
    fn unknown_and_ambiguous_commands_are_errors() {
        let cfg = bare_config();
        assert!(Invocation::parse(&cfg, os_args(&["frobnicate"])).is_err());
        // "ca" could start "calendar", "categories", or "category".
        assert!(Invocation::parse(&cfg, os_args(&["ca"])).is_err());
    }
}
