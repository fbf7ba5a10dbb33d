use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::EntityKind;

#[derive(Parser)]
#[command(
    name = "labstat",
    about = "Lab allocation tracking: conflicts, delete guards, faculty availability",
    version
)]
pub struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every record of one kind in display order
    List {
        /// Lab, faculty, book, batch, time-slot or allocation
        kind: EntityKind,
    },

    /// Show one record; allocations come with their references resolved
    Get {
        kind: EntityKind,
        id: Ulid,
    },

    /// Faculty free/busy report per time slot
    Availability {
        /// Restrict the report to one time slot
        #[arg(long)]
        slot: Option<Ulid>,
    },

    /// List records that reference an entity
    Dependents {
        /// Lab, faculty, book, batch, time-slot or allocation
        kind: EntityKind,
        id: Ulid,
    },

    /// Delete an entity if nothing references it
    Delete {
        kind: EntityKind,
        id: Ulid,
    },

    /// Rewrite the log down to the current state
    Compact,
}

/// Run one command against an open engine, producing its JSON output.
pub async fn execute(engine: &Engine, command: Command) -> Result<Value, EngineError> {
    match command {
        Command::List { kind } => Ok(list(engine, kind)),
        Command::Get { kind, id } => get(engine, kind, id),
        Command::Availability { slot: None } => Ok(json!(engine.faculty_availability())),
        Command::Availability { slot: Some(id) } => Ok(json!(engine.slot_availability(id)?)),
        Command::Dependents { kind, id } => Ok(json!(engine.check_dependents(kind, id)?)),
        Command::Delete { kind, id } => {
            engine.delete(kind, id).await?;
            Ok(json!({ "success": true, "deleted": { "type": kind, "id": id } }))
        }
        Command::Compact => {
            engine.compact_wal().await?;
            Ok(json!({ "success": true, "entries": engine.wal_entries().await }))
        }
    }
}

fn list(engine: &Engine, kind: EntityKind) -> Value {
    match kind {
        EntityKind::Lab => json!(engine.list_labs()),
        EntityKind::Faculty => json!(engine.list_faculties()),
        EntityKind::Book => json!(engine.list_books()),
        EntityKind::Batch => json!(engine.list_batches()),
        EntityKind::TimeSlot => json!(engine.list_time_slots()),
        EntityKind::Allocation => json!(engine.allocation_views()),
    }
}

fn get(engine: &Engine, kind: EntityKind, id: Ulid) -> Result<Value, EngineError> {
    Ok(match kind {
        EntityKind::Lab => json!(engine.get_lab(id)?),
        EntityKind::Faculty => json!(engine.get_faculty(id)?),
        EntityKind::Book => json!(engine.get_book(id)?),
        EntityKind::Batch => json!(engine.get_batch(id)?),
        EntityKind::TimeSlot => json!(engine.get_time_slot(id)?),
        EntityKind::Allocation => json!(engine.allocation_view(id)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let id = Ulid::new();
        let id_str = id.to_string();
        let cli = Cli::parse_from(["labstat", "dependents", "time-slot", id_str.as_str()]);
        match cli.command {
            Command::Dependents { kind, id: parsed } => {
                assert_eq!(kind, EntityKind::TimeSlot);
                assert_eq!(parsed, id);
            }
            _ => panic!("expected dependents"),
        }

        let cli = Cli::parse_from(["labstat", "availability", "--pretty"]);
        assert!(cli.pretty);
        assert!(matches!(cli.command, Command::Availability { slot: None }));
    }

    #[test]
    fn parses_read_commands() {
        let cli = Cli::parse_from(["labstat", "list", "batch"]);
        assert!(matches!(cli.command, Command::List { kind: EntityKind::Batch }));

        let id = Ulid::new();
        let id_str = id.to_string();
        let cli = Cli::parse_from(["labstat", "get", "allocation", id_str.as_str()]);
        assert!(matches!(
            cli.command,
            Command::Get { kind: EntityKind::Allocation, id: parsed } if parsed == id
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let id = Ulid::new().to_string();
        assert!(Cli::try_parse_from(["labstat", "delete", "room", id.as_str()]).is_err());
        assert!(Cli::try_parse_from(["labstat", "delete", "lab", "not-a-ulid"]).is_err());
    }
}
