use clap::Parser;
use rules_actions::ActionContext;
use rules_config::Element;
use rules_core::EngineConfig;
use rules_engine::RuleServer;
use rules_objects::{InMemoryObjectRegistry, ObjectType, Value};
use rustyline::error::ReadlineError;
use rustyline::{Completer, Config, Editor, Helper, Highlighter, Hinter, Validator};
use std::sync::Arc;

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct ReplHelper {
    #[rustyline(Completer)]
    completer: CommandCompleter,
}

#[derive(Clone)]
struct CommandCompleter;

impl rustyline::completion::Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        const COMMANDS: &[&str] = &["status", "reload", "set", "export", "quit", "exit"];
        let prefix = &line[..pos];
        if prefix.contains(' ') {
            return Ok((0, vec![]));
        }
        let matches = COMMANDS.iter().filter(|c| c.starts_with(prefix)).map(|c| c.to_string()).collect();
        Ok((0, matches))
    }
}

/// `id:type=value`, e.g. `L1:bool=off` or `X:u8=0`. Seeds the in-memory
/// registry at startup — stands in for whatever the real bus transport
/// would otherwise populate.
#[derive(Clone, Debug)]
struct ObjectSeed {
    id: String,
    object_type: ObjectType,
    initial: Value,
}

impl std::str::FromStr for ObjectSeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s.split_once(':').ok_or_else(|| format!("expected 'id:type=value', got '{s}'"))?;
        let (type_str, value_str) = rest.split_once('=').ok_or_else(|| format!("expected 'id:type=value', got '{s}'"))?;
        let object_type = match type_str {
            "bool" => ObjectType::Bool,
            "u8" => ObjectType::U8,
            "text" => ObjectType::Text,
            other => return Err(format!("unknown object type '{other}'")),
        };
        let initial = object_type.parse_value(value_str).map_err(|e| e.to_string())?;
        Ok(ObjectSeed { id: id.to_string(), object_type, initial })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rule evaluation & action execution engine", long_about = None)]
struct Args {
    /// Path to the TOML engine config file.
    #[arg(short, long, default_value = "rules.toml")]
    config: String,

    /// Path to the XML rule document (overrides the config file).
    #[arg(long)]
    rules: Option<String>,

    /// Seed an object in the in-memory registry, repeatable: `id:type=value`.
    #[arg(long = "object", value_name = "ID:TYPE=VALUE")]
    objects: Vec<ObjectSeed>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Import the rule document, print the rule count, and exit without
    /// starting the REPL (used for CLI smoke testing).
    #[arg(long)]
    check: bool,
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = EngineConfig::load_or_default(&args.config);
    let rules_path = args.rules.clone().unwrap_or_else(|| config.rules.document_path.to_string_lossy().to_string());

    let mut registry = InMemoryObjectRegistry::new();
    for seed in &args.objects {
        registry.register(seed.id.clone(), seed.initial.clone());
        tracing::debug!(id = %seed.id, object_type = ?seed.object_type, "seeded object");
    }

    let server = Arc::new(RuleServer::new());
    load_rules(&server, &rules_path, &registry).await?;

    if args.check {
        println!("loaded {} rule(s) from {rules_path}", server.len().await);
        return Ok(());
    }

    run_repl(server, registry, rules_path).await
}

async fn load_rules(server: &RuleServer, path: &str, registry: &InMemoryObjectRegistry) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|_| { tracing::warn!(path, "rule document not found, starting empty"); "<rules/>".to_string() });
    let doc = Element::parse(&content)?;
    let action_ctx = ActionContext::new(registry);
    server.import(&doc, registry, &action_ctx).await?;
    tracing::info!(count = server.len().await, path, "rules loaded");
    Ok(())
}

async fn run_repl(server: Arc<RuleServer>, registry: InMemoryObjectRegistry, rules_path: String) -> anyhow::Result<()> {
    let editor_config = Config::builder().auto_add_history(true).build();
    let mut editor: Editor<ReplHelper, rustyline::history::DefaultHistory> = Editor::with_config(editor_config)?;
    editor.set_helper(Some(ReplHelper { completer: CommandCompleter }));

    println!("rules_cli — type 'status', 'reload', 'set <id> <value>', 'export', or 'quit'");
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let mut parts = line.splitn(3, ' ');
                match parts.next().unwrap_or("") {
                    "quit" | "exit" => break,
                    "status" => println!("{} rule(s) loaded from {rules_path}", server.len().await),
                    "reload" => match load_rules(&server, &rules_path, &registry).await {
                        Ok(()) => println!("reloaded"),
                        Err(err) => println!("reload failed: {err}"),
                    },
                    "export" => {
                        let doc = server.export().await;
                        println!("{}", doc.to_xml_string());
                    }
                    "set" => {
                        let (id, value) = match (parts.next(), parts.next()) {
                            (Some(id), Some(value)) => (id, value),
                            _ => {
                                println!("usage: set <id> <value>");
                                continue;
                            }
                        };
                        match registry.object(id) {
                            Some(object) => match object.object_type().parse_value(value) {
                                Ok(value) => {
                                    if let Err(err) = registry.simulate_bus_write(id, value, Default::default()).await {
                                        println!("write failed: {err}");
                                    }
                                }
                                Err(err) => println!("bad value: {err}"),
                            },
                            None => println!("unknown object '{id}'"),
                        }
                    }
                    other => println!("unknown command '{other}'"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!(%err, "readline error");
                break;
            }
        }
    }
    Ok(())
}
