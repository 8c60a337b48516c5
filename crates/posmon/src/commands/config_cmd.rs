//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use serde::Serialize;

use posmon_config::{Config, KeySource};

use crate::cli::{ColorMode, ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_secs(field: &str, value: &str) -> Result<u64, CliError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(CliError::Validation {
            field: field.into(),
            reason: "must be a whole number of seconds, at least 1".into(),
        }),
    }
}

fn check_choice<T: clap::ValueEnum>(field: &str, value: &str) -> Result<String, CliError> {
    if T::from_str(value, true).is_ok() {
        return Ok(value.to_ascii_lowercase());
    }
    let names: Vec<String> = T::value_variants()
        .iter()
        .filter_map(|v| v.to_possible_value().map(|p| p.get_name().to_owned()))
        .collect();
    Err(CliError::Validation {
        field: field.into(),
        reason: format!("must be one of: {}", names.join(", ")),
    })
}

/// Apply `config set <key> <value>` to an in-memory config.
fn apply_setting(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "url" => {
            posmon_config::parse_service_url(&value)?;
            cfg.service.url = value;
        }
        "api_key_env" | "api-key-env" => cfg.service.api_key_env = value,
        "timeout" => cfg.service.timeout = parse_secs("timeout", &value)?,
        "export_timeout" | "export-timeout" => {
            cfg.service.export_timeout = parse_secs("export_timeout", &value)?;
        }
        "interval" => cfg.poll.interval_secs = parse_secs("interval", &value)?,
        "mask" => cfg.export.mask = value,
        "export_path" | "export-path" => {
            cfg.export.path = (!value.trim().is_empty()).then(|| PathBuf::from(value));
        }
        "output" => cfg.defaults.output = check_choice::<OutputFormat>("output", &value)?,
        "color" => cfg.defaults.color = check_choice::<ColorMode>("color", &value)?,
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: url, api_key_env, timeout, \
                     export_timeout, interval, mask, export_path, output, color"
                ),
            });
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigView<'a> {
    path: String,
    api_key_source: String,
    #[serde(flatten)]
    config: &'a Config,
}

fn detail(view: &ConfigView<'_>) -> String {
    let c = view.config;
    let export_path = posmon_config::default_export_path(c);
    [
        format!("Config file:     {}", view.path),
        format!("Agent URL:       {}", c.service.url),
        format!("API key:         {}", view.api_key_source),
        format!("API key env:     {}", c.service.api_key_env),
        format!("Timeout:         {}s", c.service.timeout),
        format!("Export timeout:  {}s", c.service.export_timeout),
        format!("Poll interval:   {}s", c.poll.interval_secs),
        format!("Export mask:     {}", c.export.mask),
        format!("Export path:     {}", export_path.display()),
        format!("Output:          {}", c.defaults.output),
        format!("Color:           {}", c.defaults.color),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("posmon configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load_config_or_default();

            let url: String = Input::new()
                .with_prompt("Agent URL")
                .default(cfg.service.url.clone())
                .validate_with(|v: &String| {
                    posmon_config::parse_service_url(v)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;
            cfg.service.url = url;

            let key = rpassword::prompt_password("API key (leave empty to skip): ")
                .map_err(prompt_err)?;

            if !key.trim().is_empty() {
                let store_choices = &[
                    "Store in system keyring (recommended)",
                    "Save to config file (plaintext)",
                ];
                let store_selection = Select::new()
                    .with_prompt("Where to store the API key?")
                    .items(store_choices)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;

                if store_selection == 0 {
                    posmon_config::store_api_key(&key)?;
                    cfg.service.api_key = None;
                    eprintln!("   API key stored in system keyring");
                } else {
                    cfg.service.api_key = Some(key.trim().to_owned());
                }
            }

            let path = posmon_config::save_config(&cfg)?;
            eprintln!("\nConfiguration written to {}", path.display());
            eprintln!("\n  Test it: posmon status");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let (_, source) =
                posmon_config::resolve_api_key(global.api_key.as_deref(), &cfg.service);
            // Never echo a plaintext key back.
            let mut shown = cfg.clone();
            shown.service.api_key = shown.service.api_key.map(|_| "********".into());

            let view = ConfigView {
                path: config::config_path().display().to_string(),
                api_key_source: source.to_string(),
                config: &shown,
            };
            let format = config::output_format(&cfg, global);
            let out = output::render_single(format, &view, detail, |v| {
                format!("{} {}", v.config.service.url, v.api_key_source)
            });
            output::print_output(&out, global.quiet);

            if source == KeySource::ConfigFile && !global.quiet {
                eprintln!("Hint: move the key to the keyring with `posmon config set-key`");
            }
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            apply_setting(&mut cfg, &key, value)?;
            let path = posmon_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Set {key} in {}", path.display());
            }
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey => {
            let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
            posmon_config::store_api_key(&key)?;

            let mut cfg = config::load_config_or_default();
            if cfg.service.api_key.take().is_some() {
                posmon_config::save_config(&cfg)?;
                eprintln!("Removed the plaintext key from the config file");
            }
            if !global.quiet {
                eprintln!("API key stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_known_keys() {
        let mut cfg = Config::default();
        apply_setting(&mut cfg, "url", "http://10.0.0.5:8765".into()).unwrap();
        apply_setting(&mut cfg, "interval", "10".into()).unwrap();
        apply_setting(&mut cfg, "output", "JSON".into()).unwrap();
        apply_setting(&mut cfg, "export-path", "/tmp/out.zip".into()).unwrap();

        assert_eq!(cfg.service.url, "http://10.0.0.5:8765");
        assert_eq!(cfg.poll.interval_secs, 10);
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.export.path, Some(PathBuf::from("/tmp/out.zip")));
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        assert!(apply_setting(&mut cfg, "timeout", "0".into()).is_err());
        assert!(apply_setting(&mut cfg, "url", "ftp://host".into()).is_err());
        assert!(apply_setting(&mut cfg, "color", "sometimes".into()).is_err());
        assert!(matches!(
            apply_setting(&mut cfg, "nope", "x".into()),
            Err(CliError::Validation { .. })
        ));
        assert_eq!(cfg, Config::default());
    }
}
