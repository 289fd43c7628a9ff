use std::fmt;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{CurrentUser, Quiz, QuizId, SessionSettings, UserId};
use services::{AppServices, AttemptHistoryService, Clock, SessionView, StaticIdentity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidQuestionSecs { raw: String },
    InvalidUserId { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuestionSecs { raw } => {
                write!(f, "invalid --question-secs value (1..=3600): {raw}")
            }
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw:?}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    quiz_id: QuizId,
    settings: SessionSettings,
    user: CurrentUser,
    limit: u32,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play    [options]");
    eprintln!("  cargo run -p app -- history [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       (default: sqlite:quiz.sqlite3)");
    eprintln!("  --quiz-id <id>          (default: 1)");
    eprintln!("  --question-secs <n>     seconds per question (default: 30)");
    eprintln!("  --user-id <id>          (default: guest)");
    eprintln!("  --user-email <email>");
    eprintln!("  --limit <n>             history rows (default: 50)");
    eprintln!();
    eprintln!("While playing: type an option number to select it, press Enter");
    eprintln!("on an empty line to confirm, or q to give up.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_ID, QUIZ_QUESTION_SECS, QUIZ_USER_ID, QUIZ_USER_EMAIL,");
    eprintln!("  RUST_LOG, QUIZ_LOG_JSON");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| value.parse::<QuizId>().ok())
            .unwrap_or_else(|| QuizId::new(1));
        let mut settings = std::env::var("QUIZ_QUESTION_SECS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .and_then(|secs| SessionSettings::new(secs).ok())
            .unwrap_or_default();
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new("guest"));
        let mut user_email =
            std::env::var("QUIZ_USER_EMAIL").unwrap_or_else(|_| "guest@localhost".into());
        let mut limit = AttemptHistoryService::DEFAULT_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    quiz_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                }
                "--question-secs" => {
                    let value = require_value(args, "--question-secs")?;
                    settings = value
                        .parse::<u32>()
                        .ok()
                        .and_then(|secs| SessionSettings::new(secs).ok())
                        .ok_or_else(|| ArgsError::InvalidQuestionSecs { raw: value.clone() })?;
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--user-email" => {
                    user_email = require_value(args, "--user-email")?;
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            quiz_id,
            settings,
            user: CurrentUser::new(user_id, user_email),
            limit,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).ok().map_or(default, |v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("QUIZ_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

//
// ─── PLAY ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Select(usize),
    Confirm,
    Quit,
    Unknown,
}

fn parse_input(line: &str, options: usize) -> Input {
    match line.trim() {
        "" => Input::Confirm,
        "q" | "quit" => Input::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => Input::Select(n - 1),
            _ => Input::Unknown,
        },
    }
}

fn print_question(quiz: &Quiz, question: usize) {
    let Some(q) = quiz.question(question) else {
        return;
    };
    println!();
    println!(
        "Question {}/{}: {}",
        question + 1,
        quiz.question_count(),
        q.text()
    );
    for (i, option) in q.options().iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
}

fn print_prompt(selected: Option<usize>, remaining: u32) {
    let selected = selected.map_or_else(|| "-".to_string(), |s| (s + 1).to_string());
    print!("\r[{remaining:>3}s] selected: {selected}  > ");
    let _ = std::io::stdout().flush();
}

async fn play(services: &AppServices, quiz_id: QuizId) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = services.storage().quizzes.get_quiz(quiz_id).await?;
    let handle = services.quiz_sessions().start_session(quiz_id).await?;

    println!("{}", quiz.title());
    if let Some(description) = quiz.description() {
        println!("{description}");
    }
    println!(
        "{} questions, {}s each.",
        quiz.question_count(),
        services.quiz_sessions().settings().question_secs()
    );

    let mut views = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut shown: Option<usize> = None;

    loop {
        let view = views.borrow_and_update().clone();
        let SessionView::AwaitingAnswer {
            question, selected, ..
        } = view
        else {
            break;
        };
        if shown != Some(question) {
            print_question(&quiz, question);
            shown = Some(question);
        }
        print_prompt(selected, handle.remaining_secs());

        let options = quiz.question(question).map_or(0, |q| q.option_count());
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {}
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line, options) {
                    Input::Select(option) => {
                        if let Err(err) = handle.select_answer(option).await {
                            println!("{err}");
                        }
                    }
                    Input::Confirm => {
                        if let Err(err) = handle.advance().await {
                            println!("{err}");
                        }
                    }
                    Input::Quit => break,
                    Input::Unknown => println!("type 1-{options}, Enter to confirm, q to quit"),
                }
            }
        }
    }

    let report = handle.close().await?;
    println!();
    let Some(result) = report.result else {
        println!("Quiz abandoned; nothing was saved.");
        return Ok(());
    };

    println!(
        "Score: {}/{} ({}%)",
        result.correct_answers(),
        result.total_questions(),
        result.score()
    );
    for (i, answer) in result.answers().iter().enumerate() {
        let Some(q) = quiz.question(i) else {
            continue;
        };
        let mark = if q.is_correct(*answer) { "ok" } else { "x" };
        let chosen = answer
            .and_then(|a| q.options().get(a))
            .map_or("(no answer)", String::as_str);
        println!("  {:>2}. [{mark:>2}] {chosen}", i + 1);
    }
    match report.attempt_id {
        Some(id) => println!("Saved as attempt #{id}."),
        None => println!("The attempt could not be saved."),
    }
    Ok(())
}

async fn history(
    services: &AppServices,
    user: &CurrentUser,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let items = services.history().list_for_user(&user.id, limit).await?;
    if items.is_empty() {
        println!("No attempts yet for {}.", user.id);
        return Ok(());
    }
    for item in items {
        println!(
            "#{:<5} {}  {:<30} {:>3}%  ({}/{}, {} unanswered)",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.quiz_title,
            item.score,
            item.correct,
            item.total,
            item.unanswered
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    prepare_sqlite_file(&parsed.db_url)?;
    let identity = Arc::new(StaticIdentity::signed_in(parsed.user.clone()));
    let services =
        AppServices::new_sqlite(&parsed.db_url, Clock::system(), identity, parsed.settings)
            .await?;
    tracing::info!(db = %parsed.db_url, user_id = %parsed.user.id, "storage ready");

    match cmd {
        Command::Play => play(&services, parsed.quiz_id).await,
        Command::History => history(&services, &parsed.user, parsed.limit).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
