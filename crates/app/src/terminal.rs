//! Line-oriented terminal front end for a running session.

use std::io::BufRead;

use quiz_core::model::{Question, QuestionReview, QuizScore, Verdict};
use services::{LeaderboardStats, SessionCommand, SessionEvent};
use tokio::sync::mpsc;

/// Map one input line to a command.
///
/// Anything that is not a navigation keyword is passed on as a choice; the
/// session decides whether it names an option or its 1-based position.
pub fn parse_line(line: &str) -> Option<SessionCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let command = match trimmed.to_ascii_lowercase().as_str() {
        "n" | "next" => SessionCommand::Next,
        "p" | "prev" | "previous" => SessionCommand::Previous,
        "s" | "submit" => SessionCommand::Submit,
        "q" | "quit" => SessionCommand::Quit,
        _ => SessionCommand::Choose(trimmed.to_owned()),
    };
    Some(command)
}

/// Forward stdin lines as commands from a dedicated thread.
///
/// Interactive stdin blocks, so it stays off the runtime. The thread ends when
/// stdin closes or the driver stops listening.
pub fn spawn_stdin_reader(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let Some(command) = parse_line(&line) else {
                continue;
            };
            if commands.blocking_send(command).is_err() {
                break;
            }
        }
    });
}

/// Print driver events until the driver drops its sender.
pub async fn render_events(questions: Vec<Question>, mut events: mpsc::Receiver<SessionEvent>) {
    let mut last_shown: Option<u64> = None;
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::QuestionShown {
                index,
                total,
                remaining_secs,
            } => {
                last_shown = Some(remaining_secs);
                if let Some(question) = questions.get(index) {
                    print_question(question, index, total, remaining_secs);
                }
            }
            SessionEvent::Tick { remaining_secs, .. } => {
                if should_announce(remaining_secs, last_shown) {
                    println!("  [{remaining_secs}s left]");
                }
                last_shown = Some(remaining_secs);
            }
            SessionEvent::AnswerRecorded { answer, .. } => println!("  selected: {answer}"),
            SessionEvent::AnswerRejected { .. } => {
                println!("  time is up for this question, the answer was not changed");
            }
            SessionEvent::NeedsAnswer { .. } => println!("  please choose an answer first"),
            SessionEvent::NotAllowed { .. } => println!("  not available here"),
            SessionEvent::TimeUp { last, .. } => {
                if last {
                    println!("  time's up! submitting...");
                } else {
                    println!("  time's up! moving on...");
                }
            }
            SessionEvent::Completed { .. } => {}
        }
    }
}

fn should_announce(remaining: u64, previous: Option<u64>) -> bool {
    if previous == Some(remaining) || remaining == 0 {
        return false;
    }
    remaining <= 5 || remaining % 10 == 0
}

fn print_question(question: &Question, index: usize, total: usize, remaining_secs: u64) {
    println!();
    println!("Question {} of {total}  ({remaining_secs}s)", index + 1);
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
    println!("[option or its number] choose  [n]ext  [p]rev  [s]ubmit  [q]uit");
}

pub fn print_stats(label: &str, stats: &LeaderboardStats) {
    println!(
        "{label:>8}: {} student(s), {} question(s)  high {}%  avg {:.1}%  low {}%",
        stats.total_students,
        stats.total_questions,
        stats.highest_percentage,
        stats.average_percentage,
        stats.lowest_percentage
    );
}

pub fn print_summary(score: &QuizScore, review: &[QuestionReview]) {
    println!();
    println!("Quiz complete: {}", score.rating().label());
    println!(
        "  {}%  ({} correct, {} incorrect, {} skipped of {})",
        score.percentage(),
        score.correct(),
        score.incorrect(),
        score.skipped(),
        score.total()
    );
    println!();
    for item in review {
        let mark = match item.verdict {
            Verdict::Correct => "ok",
            Verdict::Incorrect => "x ",
            Verdict::Skipped => "- ",
        };
        println!("  {mark} {}. {}", item.index + 1, item.text);
        match (&item.chosen, item.verdict) {
            (Some(chosen), Verdict::Incorrect) => {
                println!("       yours: {chosen}  correct: {}", item.correct_answer);
            }
            (None, _) => println!("       correct: {}", item.correct_answer),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_left_for_the_session_to_resolve() {
        assert_eq!(
            parse_line(" 2 "),
            Some(SessionCommand::Choose("2".to_owned()))
        );
    }

    #[test]
    fn keywords_map_to_navigation() {
        assert_eq!(parse_line("N"), Some(SessionCommand::Next));
        assert_eq!(parse_line("prev"), Some(SessionCommand::Previous));
        assert_eq!(parse_line("submit"), Some(SessionCommand::Submit));
        assert_eq!(parse_line("q"), Some(SessionCommand::Quit));
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn free_text_is_an_answer() {
        assert_eq!(
            parse_line("Buenos Aires"),
            Some(SessionCommand::Choose("Buenos Aires".to_owned()))
        );
    }

    #[test]
    fn countdown_announcements_are_sparse() {
        assert!(should_announce(40, Some(41)));
        assert!(!should_announce(41, Some(42)));
        assert!(!should_announce(40, Some(40)));
        assert!(should_announce(3, Some(4)));
        assert!(!should_announce(0, Some(1)));
    }
}
