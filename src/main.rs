//! Purpose: `muster` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (pretty JSON or JSONL).
//! Invariants: Errors are emitted as a JSON envelope on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All roster mutations go through `api::LocalRoster` (validation + leveling).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::{Shell, generate};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

mod data_paths;
mod serve;

use data_paths::default_data_path;
use muster::api::{
    Criteria, Error, ErrorKind, FileStore, LocalRoster, NewPlayer, PageSpec, Player, PlayerOrder,
    PlayerPatch, Profession, Race, to_exit_code,
};
use serve::ServeConfig;

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let data_path = cli.data.unwrap_or_else(default_data_path);

    match cli.command {
        Command::Serve {
            bind,
            allow_non_loopback,
            max_body_bytes,
            cors_origin,
        } => run_serve(ServeConfig {
            bind,
            data_path,
            allow_non_loopback,
            max_body_bytes,
            cors_origins: cors_origin,
        }),
        Command::Add {
            name,
            title,
            race,
            profession,
            birthday,
            banned,
            experience,
        } => {
            let player = open_roster(data_path).create_player(NewPlayer {
                name,
                title,
                race,
                profession,
                birthday: parse_instant_ms(&birthday)?,
                banned,
                experience,
            })?;
            print_pretty(&player)
        }
        Command::Get { id } => {
            let player = open_roster(data_path).player_by_id(id)?;
            print_pretty(&player)
        }
        Command::Set {
            id,
            name,
            title,
            race,
            profession,
            birthday,
            banned,
            experience,
        } => {
            let patch = PlayerPatch {
                name,
                title,
                race,
                profession,
                birthday: birthday.as_deref().map(parse_instant_ms).transpose()?,
                banned,
                experience,
            };
            let player = open_roster(data_path).update_player(id, patch)?;
            print_pretty(&player)
        }
        Command::Rm { id } => {
            open_roster(data_path).delete_player(id)?;
            println!("{}", json!({ "ok": true }));
            Ok(())
        }
        Command::List {
            filter,
            page_number,
            page_size,
        } => {
            let criteria = filter.into_criteria()?;
            let page = PageSpec {
                number: page_number,
                size: page_size,
            };
            let players = open_roster(data_path).list_players(&criteria, &page)?;
            for player in &players {
                print_line(player)?;
            }
            Ok(())
        }
        Command::Count { filter } => {
            let criteria = filter.into_criteria()?;
            let count = open_roster(data_path).count_players(&criteria)?;
            println!("{count}");
            Ok(())
        }
        Command::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "muster",
    version,
    about = "Game-character roster with filterable CRUD over HTTP",
    after_help = r#"EXAMPLES
  $ muster --data roster.json add --name Aragorn --title 'Heir of Isildur' \
      --race human --profession warrior --birthday 2931-03-01T00:00:00Z --experience 500
  $ muster --data roster.json list --order level --page-size 10
  $ muster --data roster.json serve --bind 127.0.0.1:7171
"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Roster data file (default: ~/.muster/roster.json)",
        value_hint = ValueHint::FilePath
    )]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server over the data file")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:7171", help = "Address to listen on")]
        bind: SocketAddr,
        #[arg(long, help = "Allow binding a non-loopback address")]
        allow_non_loopback: bool,
        #[arg(
            long,
            default_value_t = 1024 * 1024,
            help = "Maximum request body size in bytes"
        )]
        max_body_bytes: u64,
        #[arg(long = "cors-origin", help = "Origin allowed for CORS (repeatable)")]
        cors_origin: Vec<String>,
    },
    #[command(about = "Create a player")]
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = Race::from_str)]
        race: Race,
        #[arg(long, value_parser = Profession::from_str)]
        profession: Profession,
        #[arg(long, help = "Epoch milliseconds or an RFC 3339 timestamp")]
        birthday: String,
        #[arg(long, help = "Mark the player banned")]
        banned: bool,
        #[arg(long)]
        experience: i32,
    },
    #[command(about = "Fetch one player by id")]
    Get { id: i64 },
    #[command(about = "Partially update a player; absent flags leave fields unchanged")]
    Set {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = Race::from_str)]
        race: Option<Race>,
        #[arg(long, value_parser = Profession::from_str)]
        profession: Option<Profession>,
        #[arg(long, help = "Epoch milliseconds or an RFC 3339 timestamp")]
        birthday: Option<String>,
        #[arg(long, help = "true or false")]
        banned: Option<bool>,
        #[arg(long)]
        experience: Option<i32>,
    },
    #[command(about = "Delete a player by id")]
    Rm { id: i64 },
    #[command(about = "List players matching the filters, one JSON object per line")]
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, help = "Zero-based page number (default 0)")]
        page_number: Option<u32>,
        #[arg(long, help = "Page size (default 3)")]
        page_size: Option<u32>,
    },
    #[command(about = "Count players matching the filters, before pagination")]
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },
    #[command(about = "Emit a shell completion script")]
    Completions { shell: Shell },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, help = "Name substring")]
    name: Option<String>,
    #[arg(long, help = "Title substring")]
    title: Option<String>,
    #[arg(long, value_parser = Race::from_str)]
    race: Option<Race>,
    #[arg(long, value_parser = Profession::from_str)]
    profession: Option<Profession>,
    #[arg(long, help = "Born strictly after (millis or RFC 3339)")]
    after: Option<String>,
    #[arg(long, help = "Born strictly before (millis or RFC 3339)")]
    before: Option<String>,
    #[arg(long, help = "true or false")]
    banned: Option<bool>,
    #[arg(long)]
    min_experience: Option<i32>,
    #[arg(long)]
    max_experience: Option<i32>,
    #[arg(long)]
    min_level: Option<i32>,
    #[arg(long)]
    max_level: Option<i32>,
    #[arg(
        long,
        value_parser = PlayerOrder::from_str,
        help = "Ascending sort key: id|name|experience|birthday|level"
    )]
    order: Option<PlayerOrder>,
}

impl FilterArgs {
    fn into_criteria(self) -> Result<Criteria, Error> {
        Ok(Criteria {
            name: self.name,
            title: self.title,
            race: self.race,
            profession: self.profession,
            born_after: self.after.as_deref().map(parse_instant_ms).transpose()?,
            born_before: self.before.as_deref().map(parse_instant_ms).transpose()?,
            banned: self.banned,
            min_experience: self.min_experience,
            max_experience: self.max_experience,
            min_level: self.min_level,
            max_level: self.max_level,
            order: self.order,
        })
    }
}

fn run_serve(config: ServeConfig) -> Result<(), Error> {
    let runtime = tokio::runtime::Runtime::new().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to start async runtime")
            .with_source(err)
    })?;
    runtime.block_on(serve::serve(config))
}

fn open_roster(data_path: PathBuf) -> LocalRoster<FileStore> {
    LocalRoster::new(FileStore::new(data_path))
}

fn parse_instant_ms(text: &str) -> Result<i64, Error> {
    if let Ok(millis) = text.parse::<i64>() {
        return Ok(millis);
    }
    let parsed = OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("expected epoch milliseconds or RFC 3339, got `{text}`"))
            .with_source(err)
    })?;
    Ok((parsed.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn print_pretty(player: &Player) -> Result<(), Error> {
    println!("{}", encode_json(player, true)?);
    Ok(())
}

fn print_line(player: &Player) -> Result<(), Error> {
    println!("{}", encode_json(player, false)?);
    Ok(())
}

fn encode_json(player: &Player, pretty: bool) -> Result<String, Error> {
    let result = if pretty {
        serde_json::to_string_pretty(player)
    } else {
        serde_json::to_string(player)
    };
    result.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode player json")
            .with_source(err)
    })
}

fn emit_error(err: &Error) {
    let mut body = serde_json::Map::new();
    body.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    body.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        body.insert("field".to_string(), json!(field));
    }
    if let Some(id) = err.id() {
        body.insert("id".to_string(), json!(id));
    }
    eprintln!("{}", json!({ "error": body }));
}

#[cfg(test)]
mod tests {
    use super::parse_instant_ms;

    #[test]
    fn instants_parse_from_millis_or_rfc3339() {
        assert_eq!(parse_instant_ms("946684800001").expect("millis"), 946_684_800_001);
        assert_eq!(
            parse_instant_ms("2000-01-01T00:00:00.001Z").expect("rfc3339"),
            946_684_800_001
        );
        assert!(parse_instant_ms("next tuesday").is_err());
    }
}
