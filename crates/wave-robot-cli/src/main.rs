use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use wave_robot_config::Config;
use wave_robot_engine::{Blip, BlipContent, OperationQueue};

const USAGE: &str = "Usage: wave-robot-cli <blip.json> <command> <target> [args...]

Commands:
  replace <target> <text>...          replace every match, cycling through the texts
  insert <target> <text>...           insert before every match
  insert-after <target> <text>...     insert after every match
  delete <target>                     delete every match
  annotate <target> <key> [value]...  annotate every match
  clear-annotation <target> <key>     remove an annotation from every match
  values <target>                     print every match without editing";

/// One batch edit requested on the command line; every variant searches for `target`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Replace { target: String, texts: Vec<String> },
    Insert { target: String, texts: Vec<String> },
    InsertAfter { target: String, texts: Vec<String> },
    Delete { target: String },
    Annotate { target: String, key: String, values: Vec<String> },
    ClearAnnotation { target: String, key: String },
    Values { target: String },
}

impl Command {
    /// Parse `<command> <target> [args...]`
    fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            bail!("missing command");
        };
        let Some((target, rest)) = rest.split_first() else {
            bail!("{name} needs a search target");
        };
        let target = target.clone();

        let command = match name.as_str() {
            "replace" => Command::Replace {
                target,
                texts: rest.to_vec(),
            },
            "insert" => Command::Insert {
                target,
                texts: rest.to_vec(),
            },
            "insert-after" => Command::InsertAfter {
                target,
                texts: rest.to_vec(),
            },
            "annotate" => {
                let Some((key, values)) = rest.split_first() else {
                    bail!("annotate needs an annotation key");
                };
                Command::Annotate {
                    target,
                    key: key.clone(),
                    values: values.to_vec(),
                }
            }
            "clear-annotation" => match rest {
                [key] => Command::ClearAnnotation {
                    target,
                    key: key.clone(),
                },
                _ => bail!("clear-annotation needs exactly one annotation key"),
            },
            "delete" | "values" if !rest.is_empty() => {
                bail!("{name} takes nothing after the target")
            }
            "delete" => Command::Delete { target },
            "values" => Command::Values { target },
            other => bail!("unknown command {other:?}"),
        };
        Ok(command)
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Replace { .. } => "replace",
            Command::Insert { .. } => "insert",
            Command::InsertAfter { .. } => "insert-after",
            Command::Delete { .. } => "delete",
            Command::Annotate { .. } => "annotate",
            Command::ClearAnnotation { .. } => "clear-annotation",
            Command::Values { .. } => "values",
        }
    }
}

/// Apply `command` to `blip`; `values` returns the matched content instead of editing
fn run(blip: &mut Blip, queue: &mut OperationQueue, command: &Command) -> Result<Option<Vec<BlipContent>>> {
    match command {
        Command::Replace { target, texts } => {
            blip.all(queue, target).replace(texts.iter().map(String::as_str))?;
        }
        Command::Insert { target, texts } => {
            blip.all(queue, target).insert(texts.iter().map(String::as_str))?;
        }
        Command::InsertAfter { target, texts } => {
            blip.all(queue, target)
                .insert_after(texts.iter().map(String::as_str))?;
        }
        Command::Delete { target } => {
            blip.all(queue, target).delete()?;
        }
        Command::Annotate { target, key, values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            blip.all(queue, target).annotate(key, &values)?;
        }
        Command::ClearAnnotation { target, key } => {
            blip.all(queue, target).clear_annotation(key)?;
        }
        Command::Values { target } => {
            return Ok(Some(blip.all(queue, target).values()?));
        }
    }
    Ok(None)
}

fn load_blip(path: &Path) -> Result<Blip> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blip snapshot {}", path.display()))?;
    let blip =
        Blip::from_json(&json).with_context(|| format!("Invalid blip snapshot {}", path.display()))?;
    Ok(blip)
}

fn render_report(blip: &Blip, queue: &OperationQueue, values: Option<&[BlipContent]>) -> Result<Value> {
    let mut report = json!({
        "blip": blip.snapshot(),
        "operations": queue.pending(),
    });
    if let Some(values) = values {
        let rendered = values
            .iter()
            .map(|value| match value {
                BlipContent::Plaintext(text) => Ok(Value::String(text.clone())),
                BlipContent::Element(element) => serde_json::to_value(element),
            })
            .collect::<serde_json::Result<Vec<_>>>()?;
        report["values"] = Value::Array(rendered);
    }
    Ok(report)
}

/// `RUST_LOG` wins, then the configured level, then info
fn init_logging(config_level: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        match config_level {
            Some(level) => builder.parse_filters(level),
            None => builder.filter_level(log::LevelFilter::Info),
        };
    }
    builder.init();
}

fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    init_logging(config.as_ref().and_then(|c| c.log_level.as_deref()));
    log::debug!("Config path: {}", Config::config_path().display());

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("{USAGE}");
        process::exit(1);
    }
    let command = match Command::parse(&args[2..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    let blip_path = match &config {
        Some(config) => config.resolve_blip_path(Path::new(&args[1])),
        None => PathBuf::from(&args[1]),
    };
    let mut blip = load_blip(&blip_path)?;

    let mut queue = match config.as_ref().and_then(|c| c.proxy_for.as_deref()) {
        Some(proxy_for) => OperationQueue::proxying_for(proxy_for),
        None => OperationQueue::new(),
    };
    let values = run(&mut blip, &mut queue, &command)
        .with_context(|| format!("Failed to {} in {}", command.name(), blip_path.display()))?;
    log::info!("Queued {} operation(s) for blip {}", queue.len(), blip.blip_id());

    let report = render_report(&blip, &queue, values.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
