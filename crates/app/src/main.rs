use tokio::sync::mpsc;

use quiz_core::model::Participant;
use services::{AppServices, Clock, SessionDriver};

mod cli;
mod logging;
mod terminal;

use cli::{Args, ArgsError, Command, prepare_sqlite_file, print_usage};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), parsed.settings)
        .await?;

    match parsed.command {
        Command::Take => take(&app, &parsed).await,
        Command::Add => {
            let path = parsed.target.clone().unwrap_or_default();
            let raw = std::fs::read_to_string(&path)?;
            let id = app.quizzes().import_json(&raw).await?;
            println!("added quiz {id} from {path}");
            Ok(())
        }
        Command::List => {
            let quizzes = app.quizzes().list_quizzes(parsed.limit).await?;
            if quizzes.is_empty() {
                println!("no quizzes yet; add one with `quiz add <file.json>`");
            }
            for quiz in quizzes {
                println!(
                    "{:>4}  {}  ({} questions)",
                    quiz.id().value(),
                    quiz.title(),
                    quiz.questions().len()
                );
            }
            Ok(())
        }
        Command::Leaderboard => {
            let quiz_id = parsed.quiz_id()?;
            let Some(summary) = app.results().summary(quiz_id).await? else {
                println!("no results for quiz {quiz_id}");
                return Ok(());
            };
            terminal::print_stats("all", &summary.overall);
            for (class, stats) in &summary.by_class {
                terminal::print_stats(class, stats);
            }
            println!();

            let board = app.results().leaderboard(quiz_id, parsed.limit).await?;
            for entry in board {
                let who = entry.participant.as_deref().unwrap_or("anonymous");
                let class = entry
                    .class_name
                    .as_deref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default();
                println!(
                    "{:>3}. {who}{class}  {}%  {}/{}  {}s  {}",
                    entry.rank,
                    entry.percentage,
                    entry.correct,
                    entry.total,
                    entry.time_spent_secs,
                    entry.rating.label()
                );
            }
            Ok(())
        }
        Command::Reset => {
            let removed = app.session_loop().reset().await?;
            println!("cleared {removed} saved session value(s)");
            Ok(())
        }
    }
}

async fn take(app: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let quiz_id = args.quiz_id()?;
    let participant = match &args.name {
        Some(name) => Some(Participant::new(name.clone(), args.class_name.clone())?),
        None if args.class_name.is_some() => {
            return Err(ArgsError::MissingValue { flag: "--name" }.into());
        }
        None => None,
    };

    let loop_svc = app.session_loop();
    let session = if args.resume {
        loop_svc.resume_session(quiz_id, participant).await?
    } else {
        loop_svc.start_session(quiz_id, participant).await?
    };
    tracing::debug!(
        quiz_id = %quiz_id,
        resume = args.resume,
        index = session.current_index(),
        "taking quiz"
    );
    let questions = session.questions().to_vec();

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (evt_tx, evt_rx) = mpsc::channel(64);
    terminal::spawn_stdin_reader(cmd_tx);
    let renderer = tokio::spawn(terminal::render_events(questions, evt_rx));

    let driver = SessionDriver::new((*loop_svc).clone(), session, evt_tx);
    let outcome = driver.run(cmd_rx).await;
    // driver dropped its sender; let the renderer drain
    renderer.await?;

    let session = outcome.session;
    let (Some(score), Some(review)) = (session.score(), session.review()) else {
        println!("quiz left unfinished; run with --resume to continue");
        return Ok(());
    };
    terminal::print_summary(&score, &review);

    if let Some(submission) = outcome.submission {
        match submission.await? {
            Some(id) => println!("\nresult saved (#{id})"),
            None => {
                tracing::warn!(quiz_id = %quiz_id, "finished session has no stored result");
                println!("\nresult could not be saved");
            }
        }
    }
    // a fresh attempt should not inherit this one's timers
    loop_svc.reset().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init() {
        eprintln!("logging disabled: {err}");
    }
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
