use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use services::{AppServices, Clock, ReviewedItem};
use tracing_subscriber::EnvFilter;
use vocab_core::due::due_items;
use vocab_core::model::{Confidence, FlashcardRating, ItemId, ReviewItem, StudyMode};
use vocab_core::stats::StudyStatistics;

mod backend;
mod config;
mod drill;

use backend::StorageTarget;

const LOG_ENV: &str = "VOCAB_LOG";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command}: missing <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage: vocab [--db <url>] [--config <file>] [--verbose] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add <term> <definition> [--id <id>]");
    eprintln!("  edit <id> <term> <definition>");
    eprintln!("  list");
    eprintln!("  remove <id>");
    eprintln!("  due [--limit <n>]");
    eprintln!("  review <id> <wrong|hard|good|easy>");
    eprintln!("  quiz <id> <correct|incorrect> [--confidence high|low]");
    eprintln!("  stats [--json]");
    eprintln!("  drill [--limit <n>] [--mode flashcards|quiz]");
    eprintln!();
    eprintln!("Storage urls:");
    eprintln!("  sqlite://<path>   (default sqlite://vocab.sqlite3)");
    eprintln!("  json://<path>");
    eprintln!("  memory");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_CONFIG, VOCAB_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Add {
        term: String,
        definition: String,
        id: Option<String>,
    },
    Edit {
        id: String,
        term: String,
        definition: String,
    },
    List,
    Remove {
        id: String,
    },
    Due {
        limit: Option<usize>,
    },
    Review {
        id: String,
        rating: FlashcardRating,
    },
    Quiz {
        id: String,
        correct: bool,
        confidence: Confidence,
    },
    Stats {
        json: bool,
    },
    Drill {
        limit: Option<usize>,
        mode: StudyMode,
    },
    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct GlobalArgs {
    db_url: Option<String>,
    config: Option<PathBuf>,
    verbose: bool,
}

#[derive(Debug)]
struct Args {
    global: GlobalArgs,
    command: Command,
}

/// Flags and positionals of a single subcommand.
#[derive(Debug, Default)]
struct CommandArgs {
    positional: std::collections::VecDeque<String>,
    id: Option<String>,
    limit: Option<usize>,
    mode: Option<StudyMode>,
    confidence: Option<Confidence>,
    json: bool,
}

impl CommandArgs {
    fn collect(args: Vec<String>, allowed: &[&str]) -> Result<Self, ArgsError> {
        let mut out = Self::default();
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            if arg.starts_with("--") && !allowed.contains(&arg.as_str()) {
                return Err(ArgsError::UnknownArg(arg));
            }
            match arg.as_str() {
                "--id" => out.id = Some(require_value(&mut iter, "--id")?),
                "--limit" => {
                    let value = require_value(&mut iter, "--limit")?;
                    let parsed = value.parse::<usize>().ok().filter(|n| *n > 0);
                    out.limit = Some(parsed.ok_or(ArgsError::InvalidValue {
                        flag: "--limit",
                        raw: value,
                    })?);
                }
                "--mode" => {
                    let value = require_value(&mut iter, "--mode")?;
                    out.mode = Some(match value.parse::<StudyMode>() {
                        Ok(mode @ (StudyMode::Flashcards | StudyMode::Quiz)) => mode,
                        _ => {
                            return Err(ArgsError::InvalidValue {
                                flag: "--mode",
                                raw: value,
                            });
                        }
                    });
                }
                "--confidence" => {
                    let value = require_value(&mut iter, "--confidence")?;
                    out.confidence = Some(match value.to_ascii_lowercase().as_str() {
                        "high" => Confidence::High,
                        "low" => Confidence::Low,
                        _ => {
                            return Err(ArgsError::InvalidValue {
                                flag: "--confidence",
                                raw: value,
                            });
                        }
                    });
                }
                "--json" => out.json = true,
                _ => out.positional.push_back(arg),
            }
        }
        Ok(out)
    }

    fn take(&mut self, command: &'static str, name: &'static str) -> Result<String, ArgsError> {
        self.positional
            .pop_front()
            .ok_or(ArgsError::MissingArgument { command, name })
    }

    fn finish(mut self) -> Result<(), ArgsError> {
        match self.positional.pop_front() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(()),
        }
    }
}

fn parse_correct(raw: &str) -> Result<bool, ArgsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "correct" | "right" | "yes" | "y" => Ok(true),
        "incorrect" | "wrong" | "no" | "n" => Ok(false),
        _ => Err(ArgsError::InvalidValue {
            flag: "<correct|incorrect>",
            raw: raw.to_owned(),
        }),
    }
}

impl Command {
    fn parse(name: &str, args: Vec<String>) -> Result<Self, ArgsError> {
        let command = match name {
            "add" => {
                let mut a = CommandArgs::collect(args, &["--id"])?;
                let term = a.take("add", "term")?;
                let definition = a.take("add", "definition")?;
                let id = a.id.take();
                a.finish()?;
                Command::Add {
                    term,
                    definition,
                    id,
                }
            }
            "edit" => {
                let mut a = CommandArgs::collect(args, &[])?;
                let id = a.take("edit", "id")?;
                let term = a.take("edit", "term")?;
                let definition = a.take("edit", "definition")?;
                a.finish()?;
                Command::Edit {
                    id,
                    term,
                    definition,
                }
            }
            "list" => {
                CommandArgs::collect(args, &[])?.finish()?;
                Command::List
            }
            "remove" => {
                let mut a = CommandArgs::collect(args, &[])?;
                let id = a.take("remove", "id")?;
                a.finish()?;
                Command::Remove { id }
            }
            "due" => {
                let a = CommandArgs::collect(args, &["--limit"])?;
                let limit = a.limit;
                a.finish()?;
                Command::Due { limit }
            }
            "review" => {
                let mut a = CommandArgs::collect(args, &[])?;
                let id = a.take("review", "id")?;
                let raw = a.take("review", "rating")?;
                a.finish()?;
                let rating = raw.parse::<FlashcardRating>().map_err(|_| {
                    ArgsError::InvalidValue {
                        flag: "<rating>",
                        raw,
                    }
                })?;
                Command::Review { id, rating }
            }
            "quiz" => {
                let mut a = CommandArgs::collect(args, &["--confidence"])?;
                let id = a.take("quiz", "id")?;
                let correct = parse_correct(&a.take("quiz", "correct|incorrect")?)?;
                let confidence = a.confidence.take().unwrap_or_default();
                a.finish()?;
                Command::Quiz {
                    id,
                    correct,
                    confidence,
                }
            }
            "stats" => {
                let a = CommandArgs::collect(args, &["--json"])?;
                let json = a.json;
                a.finish()?;
                Command::Stats { json }
            }
            "drill" => {
                let mut a = CommandArgs::collect(args, &["--limit", "--mode"])?;
                let limit = a.limit;
                let mode = a.mode.take().unwrap_or(StudyMode::Flashcards);
                a.finish()?;
                Command::Drill { limit, mode }
            }
            "help" => Command::Help,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        Ok(command)
    }
}

impl Args {
    /// Global flags may appear anywhere; the first other token names the
    /// subcommand and everything else belongs to it.
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut global = GlobalArgs::default();
        let mut rest = Vec::new();
        let mut help = false;

        let mut iter = argv.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    global.db_url = Some(value);
                }
                "--config" => {
                    global.config = Some(PathBuf::from(require_value(&mut iter, "--config")?));
                }
                "--verbose" | "-v" => global.verbose = true,
                "--help" | "-h" => help = true,
                _ => rest.push(arg),
            }
        }

        if help || rest.is_empty() {
            return Ok(Self {
                global,
                command: Command::Help,
            });
        }
        let name = rest.remove(0);
        let command = Command::parse(&name, rest)?;
        Ok(Self { global, command })
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_due(next_review: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if next_review <= now {
        return "due now".to_owned();
    }
    let days = (next_review - now).num_days();
    match days {
        0 => format!("due {}", next_review.format("%H:%M UTC")),
        1 => "due in 1 day".to_owned(),
        n => format!("due in {n} days"),
    }
}

fn print_item(item: &ReviewItem, now: DateTime<Utc>) {
    let state = if item.is_new() {
        "new".to_owned()
    } else {
        format!(
            "ef {:.2}, reps {}, {}",
            item.ease_factor(),
            item.repetitions(),
            format_due(item.next_review(), now)
        )
    };
    println!("{}  {} : {}  ({state})", item.id(), item.term(), item.definition());
}

fn print_reviewed(reviewed: &ReviewedItem) {
    let after = &reviewed.after;
    println!(
        "{}: quality {} -> next review in {} day(s) on {} (ef {:.2}{})",
        after.term(),
        reviewed.quality.value(),
        after.interval_days(),
        after.next_review().format("%Y-%m-%d"),
        after.ease_factor(),
        if reviewed.is_lapse() { ", lapse" } else { "" }
    );
}

fn print_stats(stats: &StudyStatistics) {
    println!(
        "Items:        {} ({} new, {} mastered)",
        stats.total_items, stats.new_items, stats.mastered_items
    );
    println!(
        "Due now:      {} (about {} min)",
        stats.items_to_review,
        stats.estimated_minutes()
    );
    println!(
        "Reviews:      {} ({} correct, {:.0}%)",
        stats.total_reviews,
        stats.correct_reviews,
        stats.accuracy() * 100.0
    );
    println!("Avg quality:  {:.2}", stats.average_quality);
    println!("Streak:       {} day(s)", stats.study_streak);
}

async fn execute(services: &AppServices, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Add {
            term,
            definition,
            id,
        } => {
            let vocabulary = services.vocabulary();
            let item = match id {
                Some(raw) => {
                    vocabulary
                        .add_term_with_id(ItemId::new(raw)?, &term, &definition)
                        .await?
                }
                None => vocabulary.add_term(&term, &definition).await?,
            };
            println!("added {}  {}", item.id(), item.term());
        }
        Command::Edit {
            id,
            term,
            definition,
        } => {
            let item = services
                .vocabulary()
                .update_term(&ItemId::new(id)?, &term, &definition)
                .await?;
            println!("updated {}  {} : {}", item.id(), item.term(), item.definition());
        }
        Command::List => {
            let now = services.review().now();
            let items = services.vocabulary().list_items().await?;
            if items.is_empty() {
                println!("No terms yet. Add one with `vocab add <term> <definition>`.");
            }
            for item in &items {
                print_item(item, now);
            }
        }
        Command::Remove { id } => {
            let id = ItemId::new(id)?;
            services.vocabulary().remove_term(&id).await?;
            println!("removed {id}");
        }
        Command::Due { limit } => {
            let now = services.review().now();
            let items = services.vocabulary().list_items().await?;
            let due = due_items(&items, limit.unwrap_or(usize::MAX), now);
            if due.is_empty() {
                println!("Nothing is due.");
            }
            for item in due {
                print_item(item, now);
            }
        }
        Command::Review { id, rating } => {
            let result = services
                .session_loop()
                .record_flashcard(&ItemId::new(id)?, rating)
                .await?;
            print_reviewed(&result.reviewed);
        }
        Command::Quiz {
            id,
            correct,
            confidence,
        } => {
            let result = services
                .session_loop()
                .record_quiz(&ItemId::new(id)?, correct, confidence)
                .await?;
            print_reviewed(&result.reviewed);
        }
        Command::Stats { json } => {
            let stats = services.statistics().dashboard().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Command::Drill { limit, mode } => drill::run(services, mode, limit).await?,
        Command::Help => print_usage(),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }

    init_logging(args.global.verbose);

    let config = config::load(
        args.global.config.as_deref(),
        args.global.db_url.as_deref(),
        |key| std::env::var(key).ok(),
    )?;

    // Storage is opened in the binary glue so services stay backend-agnostic.
    let storage = StorageTarget::parse(&config.storage.url)?.open().await?;
    let services = AppServices::new(&storage, Clock::default_clock(), config.service_settings())?;

    execute(&services, args.command).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Args, ArgsError> {
        Args::parse(line.split_whitespace().map(str::to_owned))
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse("").unwrap().command, Command::Help);
        assert_eq!(parse("list --help").unwrap().command, Command::Help);
    }

    #[test]
    fn global_flags_are_accepted_anywhere() {
        let args = parse("--db memory review perro good -v --config my.toml").unwrap();
        assert_eq!(
            args.global,
            GlobalArgs {
                db_url: Some("memory".into()),
                config: Some(PathBuf::from("my.toml")),
                verbose: true,
            }
        );
        assert_eq!(
            args.command,
            Command::Review {
                id: "perro".into(),
                rating: FlashcardRating::Good,
            }
        );
    }

    #[test]
    fn subcommand_flags_are_parsed() {
        assert_eq!(
            parse("add sol sun --id w-sol").unwrap().command,
            Command::Add {
                term: "sol".into(),
                definition: "sun".into(),
                id: Some("w-sol".into()),
            }
        );
        assert_eq!(
            parse("quiz w1 incorrect --confidence high").unwrap().command,
            Command::Quiz {
                id: "w1".into(),
                correct: false,
                confidence: Confidence::High,
            }
        );
        assert_eq!(
            parse("quiz w1 yes").unwrap().command,
            Command::Quiz {
                id: "w1".into(),
                correct: true,
                confidence: Confidence::Low,
            }
        );
        assert_eq!(
            parse("drill --mode quiz --limit 5").unwrap().command,
            Command::Drill {
                limit: Some(5),
                mode: StudyMode::Quiz,
            }
        );
        assert_eq!(
            parse("stats --json").unwrap().command,
            Command::Stats { json: true }
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            parse("learn"),
            Err(ArgsError::UnknownCommand(cmd)) if cmd == "learn"
        ));
        assert!(matches!(
            parse("add onlyterm"),
            Err(ArgsError::MissingArgument { name: "definition", .. })
        ));
        assert!(matches!(
            parse("list --json"),
            Err(ArgsError::UnknownArg(arg)) if arg == "--json"
        ));
        assert!(matches!(
            parse("remove a b"),
            Err(ArgsError::UnknownArg(arg)) if arg == "b"
        ));
        assert!(matches!(
            parse("due --limit 0"),
            Err(ArgsError::InvalidValue { flag: "--limit", .. })
        ));
        assert!(matches!(
            parse("drill --mode spelling"),
            Err(ArgsError::InvalidValue { flag: "--mode", .. })
        ));
        assert!(matches!(
            parse("review w1 meh"),
            Err(ArgsError::InvalidValue { flag: "<rating>", .. })
        ));
        assert!(matches!(
            parse("list --db"),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn due_label_counts_whole_days() {
        let now = vocab_core::time::fixed_now();
        assert_eq!(format_due(now, now), "due now");
        assert_eq!(format_due(now + chrono::Duration::days(1), now), "due in 1 day");
        assert_eq!(format_due(now + chrono::Duration::days(6), now), "due in 6 days");
    }
}
