use std::fmt;

use quiz_core::QuizSettings;
use quiz_core::model::QuizId;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidSettings(quiz_core::SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid quiz id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSettings(err) => write!(f, "{err}"),
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

fn parse_number(raw: String, flag: &'static str) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn env_number(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz take <quiz-id>        [--name <name>] [--class <class>] [--resume]");
    eprintln!("                             [--seconds <n>] [--grace-ms <ms>] [--db <sqlite_url>]");
    eprintln!("  quiz add <file.json>       [--db <sqlite_url>]");
    eprintln!("  quiz list                  [--limit <n>] [--db <sqlite_url>]");
    eprintln!("  quiz leaderboard <quiz-id> [--limit <n>] [--db <sqlite_url>]");
    eprintln!("  quiz reset                 [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --seconds {}", QuizSettings::DEFAULT_SECONDS_PER_QUESTION);
    eprintln!("  --grace-ms {}", QuizSettings::DEFAULT_GRACE_PERIOD_MS);
    eprintln!("  --limit 20");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_SECONDS_PER_QUESTION, QUIZ_GRACE_MS, RUST_LOG, LOG_FORMAT");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Take,
    Add,
    List,
    Leaderboard,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "add" => Some(Self::Add),
            "list" => Some(Self::List),
            "leaderboard" => Some(Self::Leaderboard),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn positional(self) -> Option<&'static str> {
        match self {
            Self::Take | Self::Leaderboard => Some("quiz id"),
            Self::Add => Some("quiz file"),
            Self::List | Self::Reset => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Args {
    pub command: Command,
    pub target: Option<String>,
    pub db_url: String,
    pub settings: QuizSettings,
    pub name: Option<String>,
    pub class_name: Option<String>,
    pub limit: u32,
    pub resume: bool,
}

impl Args {
    /// Parse `argv` without the program name.
    ///
    /// Returns `Ok(None)` when help was requested.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let command = match args.next() {
            None => return Err(ArgsError::MissingArgument { what: "subcommand" }),
            Some(first) if matches!(first.as_str(), "--help" | "-h" | "help") => return Ok(None),
            Some(first) => {
                Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?
            }
        };

        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut seconds = env_number("QUIZ_SECONDS_PER_QUESTION")
            .unwrap_or(QuizSettings::DEFAULT_SECONDS_PER_QUESTION);
        let mut grace_ms =
            env_number("QUIZ_GRACE_MS").unwrap_or(QuizSettings::DEFAULT_GRACE_PERIOD_MS);
        let mut name = None;
        let mut class_name = None;
        let mut limit = 20;
        let mut resume = false;
        let mut target = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--seconds" => {
                    seconds = parse_number(require_value(&mut args, "--seconds")?, "--seconds")?;
                }
                "--grace-ms" => {
                    grace_ms = parse_number(require_value(&mut args, "--grace-ms")?, "--grace-ms")?;
                }
                "--limit" => {
                    limit = parse_number(require_value(&mut args, "--limit")?, "--limit")?;
                }
                "--name" => name = Some(require_value(&mut args, "--name")?),
                "--class" => class_name = Some(require_value(&mut args, "--class")?),
                "--resume" => resume = true,
                "--help" | "-h" => return Ok(None),
                _ if !arg.starts_with("--")
                    && target.is_none()
                    && command.positional().is_some() =>
                {
                    target = Some(arg);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if let Some(what) = command.positional() {
            if target.is_none() {
                return Err(ArgsError::MissingArgument { what });
            }
        }

        let settings = QuizSettings::new(
            seconds,
            grace_ms,
            QuizSettings::DEFAULT_TICK_INTERVAL_MS,
        )
        .map_err(ArgsError::InvalidSettings)?;

        Ok(Some(Self {
            command,
            target,
            db_url,
            settings,
            name,
            class_name,
            limit,
            resume,
        }))
    }

    pub fn quiz_id(&self) -> Result<QuizId, ArgsError> {
        let raw = self.target.clone().unwrap_or_default();
        raw.parse().map_err(|_| ArgsError::InvalidQuizId { raw })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
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

pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn take_reads_flags() {
        let args = Args::parse(argv(&[
            "take", "3", "--name", "Ada", "--class", "5C", "--seconds", "20", "--resume",
            "--db", "sqlite::memory:",
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(args.command, Command::Take);
        assert_eq!(args.quiz_id().unwrap(), QuizId::new(3));
        assert_eq!(args.name.as_deref(), Some("Ada"));
        assert_eq!(args.class_name.as_deref(), Some("5C"));
        assert_eq!(args.settings.seconds_per_question(), 20);
        assert!(args.resume);
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn take_requires_quiz_id() {
        let err = Args::parse(argv(&["take"])).unwrap_err();
        assert!(matches!(err, ArgsError::MissingArgument { what: "quiz id" }));
    }

    #[test]
    fn list_rejects_positional() {
        let err = Args::parse(argv(&["list", "extra"])).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(_)));
    }

    #[test]
    fn zero_seconds_is_rejected() {
        let err = Args::parse(argv(&["reset", "--seconds", "0"])).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidSettings(_)));
    }

    #[test]
    fn help_short_circuits() {
        assert!(Args::parse(argv(&["--help"])).unwrap().is_none());
        assert!(Args::parse(argv(&["list", "-h"])).unwrap().is_none());
    }

    #[test]
    fn relative_sqlite_path_is_made_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.db"));
    }
}
