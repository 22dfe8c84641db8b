use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use leadboard_core::session::SessionError;
use leadboard_core::storage::json_file::JsonFileBackend;
use leadboard_core::{BoardConfig, BoardContainer, BoardSession, LeadDraft, LeadPatch, Persistence};

use crate::config;

#[derive(Debug, Parser)]
#[command(
    name = "leadboard",
    disable_help_subcommand = true,
    about = "Single-user sales pipeline board",
    long_about = "Keep sales leads in pipeline columns and apply drag-and-drop results from a board widget."
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (defaults to the platform config dir)"
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Board store file, overrides the config"
    )]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the board, or the widget payload with --json
    Show {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Add a lead to the first column (or --group)
    Add(AddArgs),
    /// Change fields of a lead
    Edit(EditArgs),
    /// Apply a widget drag result: a JSON array of {header, items}
    Drag {
        #[arg(value_name = "FILE", help = "Payload file, or - for stdin")]
        input: PathBuf,
    },
    /// Delete one lead
    Delete { id: String },
    /// Remove every lead in the trash column
    EmptyTrash,
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    contact: String,
    #[arg(long, default_value = "")]
    price: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    website: String,
    #[arg(long, default_value = "")]
    notes: String,
    #[arg(long, value_name = "KEY", help = "Column key to add the lead to")]
    group: Option<String>,
}

#[derive(Debug, Args)]
struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    tag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Could not read {path}: {source}")]
    Input { path: String, source: io::Error },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

fn read_payload(input: &Path) -> Result<Vec<BoardContainer>, CliError> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| CliError::Input {
                path: "stdin".to_string(),
                source,
            })?;
        buf
    } else {
        fs::read_to_string(input).map_err(|source| CliError::Input {
            path: input.display().to_string(),
            source,
        })?
    };
    Ok(serde_json::from_str(&content)?)
}

fn report_persistence<W: Write>(out: &mut W, persistence: &Persistence) -> Result<(), CliError> {
    if let Persistence::Pending { reason } = persistence {
        writeln!(out, "warning: change not saved yet ({})", reason)?;
    }
    Ok(())
}

fn open_session(config: BoardConfig, store: Option<&Path>) -> Result<BoardSession, CliError> {
    let store_path = config::resolve_store_path(&config, store);
    let backend = JsonFileBackend::new(store_path);
    Ok(BoardSession::open(config, Box::new(backend))?)
}

pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let board_config = config::load_config(&config_path);
    let store = cli.store.as_deref();

    match cli.command {
        Command::Config => {
            writeln!(out, "# {}", config_path.display())?;
            writeln!(out, "{}", serde_json::to_string_pretty(&board_config)?)?;
        }
        Command::Show { json } => {
            let mut session = open_session(board_config, store)?;
            let board = session.render()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&board)?)?;
            } else {
                for group in &session.store().groups {
                    let header = session.config().header_for(&group.key);
                    writeln!(out, "{} ({})", header, group.leads.len())?;
                    for lead in &group.leads {
                        let marker = if lead.fabricated { " [incomplete]" } else { "" };
                        writeln!(
                            out,
                            "  {}  {}  {} | {}{}",
                            lead.id,
                            lead.name,
                            lead.contact,
                            if lead.price.is_empty() { "-" } else { lead.price.as_str() },
                            marker
                        )?;
                    }
                }
            }
        }
        Command::Add(args) => {
            let mut session = open_session(board_config, store)?;
            let draft = LeadDraft {
                name: args.name,
                contact: args.contact,
                price: args.price,
                email: args.email,
                phone: args.phone,
                website: args.website,
                notes: args.notes,
            };
            let (id, persistence) = match args.group {
                Some(group) => session.add_lead_to(&group, draft)?,
                None => session.add_lead(draft)?,
            };
            writeln!(out, "{}", id)?;
            report_persistence(out, &persistence)?;
        }
        Command::Edit(args) => {
            let mut session = open_session(board_config, store)?;
            let patch = LeadPatch {
                name: args.name,
                contact: args.contact,
                price: args.price,
                email: args.email,
                phone: args.phone,
                website: args.website,
                notes: args.notes,
                tag: args.tag,
            };
            let persistence = session.edit_lead(&args.id, &patch)?;
            report_persistence(out, &persistence)?;
        }
        Command::Drag { input } => {
            let payload = read_payload(&input)?;
            let mut session = open_session(board_config, store)?;
            // Label lookups resolve against the latest render.
            session.render()?;
            let outcome = session.apply_drag(&payload)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&outcome)?)?;
            report_persistence(out, &outcome.persistence)?;
        }
        Command::Delete { id } => {
            let mut session = open_session(board_config, store)?;
            let (lead, persistence) = session.delete_lead(&id)?;
            writeln!(out, "deleted {} ({})", lead.id, lead.name)?;
            report_persistence(out, &persistence)?;
        }
        Command::EmptyTrash => {
            let mut session = open_session(board_config, store)?;
            let (removed, persistence) = session.empty_trash()?;
            writeln!(out, "removed {} lead(s) from trash", removed)?;
            report_persistence(out, &persistence)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadboard_core::reconcile::ReconcileError;
    use tempfile::TempDir;

    struct Env {
        dir: TempDir,
    }

    impl Env {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn run(&self, args: &[&str]) -> Result<String, CliError> {
            let config = self.dir.path().join("config.json");
            let store = self.dir.path().join("board.json");
            let mut argv = vec![
                "leadboard".to_string(),
                "--config".to_string(),
                config.display().to_string(),
                "--store".to_string(),
                store.display().to_string(),
            ];
            argv.extend(args.iter().map(|a| a.to_string()));
            let cli = Cli::try_parse_from(argv).unwrap();
            let mut out = Vec::new();
            run(cli, &mut out)?;
            Ok(String::from_utf8(out).unwrap())
        }

        fn write(&self, name: &str, content: &str) -> String {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path.display().to_string()
        }
    }

    #[test]
    fn test_add_and_show() {
        let env = Env::new();
        let id = env
            .run(&["add", "--name", "Bakkerij Jansen", "--contact", "Peter", "--price", "€ 500"])
            .unwrap();
        let id = id.trim();
        assert_eq!(id.len(), 8);

        let shown = env.run(&["show"]).unwrap();
        assert!(shown.starts_with("Te benaderen 🔵 (1)\n"));
        assert!(shown.contains(&format!("  {}  Bakkerij Jansen  Peter | € 500", id)));

        let payload: Vec<BoardContainer> =
            serde_json::from_str(&env.run(&["show", "--json"]).unwrap()).unwrap();
        assert_eq!(payload.len(), 5);
        assert!(payload[0].items[0].ends_with(&format!("||{}", id)));
    }

    #[test]
    fn test_drag_moves_lead() {
        let env = Env::new();
        let id = env.run(&["add", "--name", "Acme"]).unwrap().trim().to_string();

        let mut payload: Vec<BoardContainer> =
            serde_json::from_str(&env.run(&["show", "--json"]).unwrap()).unwrap();
        let card = payload[0].items.remove(0);
        payload[2].items.push(card);
        let file = env.write("drag.json", &serde_json::to_string(&payload).unwrap());

        let report = env.run(&["drag", &file]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["changed"], true);
        assert_eq!(value["persistence"]["status"], "saved");
        assert_eq!(value["changes"][0]["toGroup"], "Geland");

        let shown = env.run(&["show"]).unwrap();
        assert!(shown.contains("Geland 🟢 (1)"));
        assert!(shown.contains(&id));
    }

    #[test]
    fn test_drag_with_missing_column_is_rejected() {
        let env = Env::new();
        env.run(&["add", "--name", "Acme"]).unwrap();
        let before = fs::read_to_string(env.dir.path().join("board.json")).unwrap();

        let mut payload: Vec<BoardContainer> =
            serde_json::from_str(&env.run(&["show", "--json"]).unwrap()).unwrap();
        payload.pop();
        let file = env.write("drag.json", &serde_json::to_string(&payload).unwrap());

        let err = env.run(&["drag", &file]).unwrap_err();
        assert!(matches!(
            err,
            CliError::Session(SessionError::Reconcile(ReconcileError::GroupCountMismatch { .. }))
        ));
        let after = fs::read_to_string(env.dir.path().join("board.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_edit_delete_and_trash() {
        let env = Env::new();
        let a = env.run(&["add", "--name", "Acme"]).unwrap().trim().to_string();
        env.run(&["add", "--name", "Old", "--group", "Prullenbak 🗑️"]).unwrap();

        env.run(&["edit", &a, "--notes", "warm lead"]).unwrap();
        let board = fs::read_to_string(env.dir.path().join("board.json")).unwrap();
        assert!(board.contains("warm lead"));

        let out = env.run(&["empty-trash"]).unwrap();
        assert_eq!(out, "removed 1 lead(s) from trash\n");

        let out = env.run(&["delete", &a]).unwrap();
        assert_eq!(out, "deleted ".to_string() + &a + " (Acme)\n");
        assert!(matches!(
            env.run(&["delete", &a]),
            Err(CliError::Session(SessionError::LeadNotFound(_)))
        ));
    }

    #[test]
    fn test_bad_payload_and_missing_file() {
        let env = Env::new();
        let file = env.write("drag.json", "{ \"header\": 1 }");
        assert!(matches!(env.run(&["drag", &file]), Err(CliError::Json(_))));

        let missing = env.dir.path().join("nope.json").display().to_string();
        assert!(matches!(
            env.run(&["drag", &missing]),
            Err(CliError::Input { .. })
        ));
    }

    #[test]
    fn test_config_prints_defaults() {
        let env = Env::new();
        let out = env.run(&["config"]).unwrap();
        assert!(out.contains("\"delimiter\": \"||\""));
        assert!(out.contains("\"unresolvedPolicy\": \"drop\""));
        assert!(!env.dir.path().join("board.json").exists());
    }

    #[test]
    fn test_token_drag_replayed_is_unchanged() {
        let env = Env::new();
        env.write("config.json", r#"{ "codec": "token" }"#);
        let a = env.run(&["add", "--name", "Acme"]).unwrap().trim().to_string();
        let b = env.run(&["add", "--name", "Beta"]).unwrap().trim().to_string();

        let mut payload: Vec<BoardContainer> =
            serde_json::from_str(&env.run(&["show", "--json"]).unwrap()).unwrap();
        assert!(!payload[0].items[0].contains(&a));
        payload[0].items.swap(0, 1);
        let file = env.write("drag.json", &serde_json::to_string(&payload).unwrap());

        let first: serde_json::Value =
            serde_json::from_str(&env.run(&["drag", &file]).unwrap()).unwrap();
        assert_eq!(first["changed"], true);
        let second: serde_json::Value =
            serde_json::from_str(&env.run(&["drag", &file]).unwrap()).unwrap();
        assert_eq!(second["changed"], false);
        assert_eq!(second["degraded"], false);

        let shown = env.run(&["show"]).unwrap();
        let pos_a = shown.find(&a).unwrap();
        let pos_b = shown.find(&b).unwrap();
        assert!(pos_b < pos_a);
    }
}
