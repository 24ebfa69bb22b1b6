//! Line-driven front end for a timed session.

use tokio::sync::mpsc;

use services::sessions::{MonitorError, SessionKind};
use services::{
    ScreenMonitor, SessionDriver, SessionError, SessionHandle, SessionReport, SessionSnapshot,
    TimedSession,
};
use skilltwin_core::model::{
    CompletionReason, IntegrityKind, QuestionId, SessionStatus, option_index, option_label,
};

/// Remaining-time reminders, in seconds.
const REMINDERS: [u32; 3] = [60, 30, 10];

/// A terminal cannot lock the screen, so monitoring is only announced.
pub struct TerminalMonitor;

impl ScreenMonitor for TerminalMonitor {
    fn acquire(&self) -> Result<(), MonitorError> {
        println!("Exam monitoring is on. Type `away` if you leave the exam.");
        Ok(())
    }

    fn release(&self) {
        tracing::debug!("exam monitoring released");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Start,
    Choose(usize),
    Next,
    Back,
    Submit,
    Away,
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let input = match line.to_ascii_lowercase().as_str() {
        "start" | "retry" => Input::Start,
        "next" => Input::Next,
        "back" => Input::Back,
        "submit" => Input::Submit,
        "away" => Input::Away,
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => match other.parse::<usize>() {
            Ok(number) => Input::Choose(number.checked_sub(1)?),
            Err(_) => Input::Choose(option_index(other)?),
        },
    };
    Some(input)
}

fn print_help(kind: SessionKind) {
    println!("Commands:");
    println!("  A..D or 1..4   choose an option");
    match kind {
        SessionKind::Exam => {
            println!("  next / back    move between questions");
            println!("  submit         hand in the exam");
        }
        SessionKind::Adaptive => {
            println!("  next           send the chosen answer");
            println!("  submit         finish the test now");
        }
    }
    println!("  retry          ask for the test again if it failed to start");
    println!("  away           report leaving the exam window");
    println!("  status         show time and progress");
    println!("  quit           leave without submitting");
}

/// Run `session` until it completes or the student quits.
///
/// # Errors
///
/// Returns an error if the session cannot be started or the driver task
/// fails.
pub async fn run_session(
    driver: SessionDriver,
    session: TimedSession,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let kind = session.kind();
    let (handle, mut task) = driver.spawn(session);
    let printer = tokio::spawn(print_updates(handle.clone()));

    print_help(kind);
    handle.start().await?;

    let mut lines = spawn_line_reader();
    let mut stdin_open = true;
    let report = loop {
        tokio::select! {
            report = &mut task => break report?,
            line = lines.recv(), if stdin_open => match line {
                Some(line) => {
                    if let Err(err) = apply(&handle, kind, &line).await {
                        if !matches!(err, SessionError::DriverStopped) {
                            println!("{err}");
                        }
                    }
                }
                None => {
                    stdin_open = false;
                    quit(&handle).await;
                }
            },
            _ = tokio::signal::ctrl_c() => quit(&handle).await,
        }
    };

    printer.abort();
    Ok(report)
}

async fn quit(handle: &SessionHandle) {
    if let Err(err) = handle.exit().await {
        tracing::debug!(%err, "session already over");
    }
}

/// Stdin is read on a plain thread so a pending read never holds up shutdown.
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn apply(handle: &SessionHandle, kind: SessionKind, line: &str) -> Result<(), SessionError> {
    let Some(input) = parse_input(line) else {
        if !line.trim().is_empty() {
            println!("Unrecognised input. Type `help` for commands.");
        }
        return Ok(());
    };

    match input {
        Input::Start => handle.start().await?,
        Input::Choose(option) => {
            let Some(question) = handle.snapshot().question else {
                println!("No question is shown yet.");
                return Ok(());
            };
            handle.select_answer(question.id().clone(), option).await?;
            if let Some(label) = option_label(option) {
                println!("Selected {label}.");
            }
        }
        Input::Next => handle.advance().await?,
        Input::Back => handle.retreat().await?,
        Input::Submit => handle.submit().await?,
        Input::Away => handle.record_integrity_event(IntegrityKind::TabSwitch).await?,
        Input::Status => print_status(&handle.snapshot()),
        Input::Help => print_help(kind),
        Input::Quit => handle.exit().await?,
    }
    Ok(())
}

fn print_status(snapshot: &SessionSnapshot) {
    println!(
        "{}: {} | {}s left | answered {}/{}",
        snapshot.subject,
        snapshot.status,
        snapshot.remaining_secs,
        snapshot.progress.answered,
        snapshot.total
    );
    if let Some(ability) = snapshot.ability_estimate {
        println!("Ability estimate: {:.0}%", ability * 100.0);
    }
    if snapshot.flagged {
        println!("This attempt is flagged for review.");
    }
}

#[derive(Default)]
struct Printed {
    question: Option<(QuestionId, usize)>,
    loading: bool,
    warnings: usize,
    error: Option<String>,
    remaining: Option<u32>,
}

async fn print_updates(mut handle: SessionHandle) {
    let mut printed = Printed::default();
    render(&handle.snapshot(), &mut printed);
    while let Ok(snapshot) = handle.changed().await {
        render(&snapshot, &mut printed);
    }
}

fn render(snapshot: &SessionSnapshot, printed: &mut Printed) {
    if snapshot.status != SessionStatus::InProgress {
        if snapshot.loading && !printed.loading {
            println!("Preparing your {} test...", snapshot.subject);
        }
        printed.loading = snapshot.loading;
        print_error(snapshot, printed);
        return;
    }

    if snapshot.loading && !printed.loading {
        println!("Checking your answer...");
    }
    printed.loading = snapshot.loading;

    let shown = snapshot
        .question
        .as_ref()
        .map(|question| (question.id().clone(), snapshot.index));
    if shown != printed.question {
        if let Some(verdict) = &snapshot.last_verdict {
            match verdict.correct {
                Some(true) => println!("Correct!"),
                Some(false) => println!("Incorrect."),
                None => {}
            }
            if let Some(explanation) = &verdict.explanation {
                println!("{explanation}");
            }
        }
        if let Some(question) = &snapshot.question {
            println!();
            println!(
                "Question {}/{} ({}s left)",
                snapshot.index + 1,
                snapshot.total,
                snapshot.remaining_secs
            );
            println!("{}", question.text());
            for (index, option) in question.options().iter().enumerate() {
                let label = option_label(index).unwrap_or('?');
                let marker = if snapshot.selected == Some(index) { '*' } else { ' ' };
                println!(" {marker}{label}) {option}");
            }
        }
        printed.question = shown;
    }

    if snapshot.warnings > printed.warnings {
        if let Some(warning) = &snapshot.latest_warning {
            println!("Warning: {warning}");
        }
    }
    printed.warnings = snapshot.warnings;

    if printed.remaining != Some(snapshot.remaining_secs)
        && REMINDERS.contains(&snapshot.remaining_secs)
    {
        println!("{}s left.", snapshot.remaining_secs);
    }
    printed.remaining = Some(snapshot.remaining_secs);

    print_error(snapshot, printed);
}

fn print_error(snapshot: &SessionSnapshot, printed: &mut Printed) {
    if snapshot.last_error != printed.error {
        if let Some(error) = &snapshot.last_error {
            println!("The service did not respond properly: {error}. Try again.");
        }
        printed.error = snapshot.last_error.clone();
    }
}

pub fn print_report(report: &SessionReport) {
    match report.status {
        SessionStatus::Abandoned => println!("Session exited. Nothing was submitted."),
        _ => {
            let Some(outcome) = &report.outcome else {
                println!("Session ended without a result.");
                return;
            };
            let reason = match outcome.reason {
                CompletionReason::Submitted => "submitted",
                CompletionReason::TimeExpired => "time is up",
                CompletionReason::ServiceCompleted => "test complete",
            };
            println!();
            println!("Finished ({reason}). Score: {}%", outcome.score);
            println!(
                "Answered {}/{} in {}s",
                outcome.answered, outcome.total_questions, outcome.time_spent_secs
            );
            if let Some(difficulty) = outcome.difficulty {
                println!("Final difficulty: {}", difficulty.as_str());
            }
            if outcome.tab_switches > 0 {
                println!("Tab switches: {}", outcome.tab_switches);
            }
            if outcome.flagged {
                println!("This attempt was flagged for review.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use services::ExamConfig;
    use skilltwin_core::model::Question;
    use skilltwin_core::time::fixed_clock;

    use super::*;

    #[test]
    fn options_accept_letters_and_numbers() {
        assert_eq!(parse_input("b"), Some(Input::Choose(1)));
        assert_eq!(parse_input(" C "), Some(Input::Choose(2)));
        assert_eq!(parse_input("1"), Some(Input::Choose(0)));
        assert_eq!(parse_input("0"), None);
    }

    #[test]
    fn words_are_commands() {
        assert_eq!(parse_input("next"), Some(Input::Next));
        assert_eq!(parse_input("Submit"), Some(Input::Submit));
        assert_eq!(parse_input("exit"), Some(Input::Quit));
        assert_eq!(parse_input("retry"), Some(Input::Start));
        assert_eq!(parse_input(" START "), Some(Input::Start));
        assert_eq!(parse_input("bogus"), None);
        assert_eq!(parse_input(""), None);
    }

    #[test]
    fn repeated_question_is_shown_again() {
        let question = Question::new(
            "5",
            "Which lens converges light?",
            vec!["Convex".into(), "Concave".into()],
        )
        .unwrap();
        let mut session = TimedSession::exam(
            ExamConfig::new("Physics", vec![question]),
            fixed_clock(),
        )
        .unwrap();
        session.start().unwrap();
        let mut snapshot = session.snapshot();
        let mut printed = Printed::default();

        render(&snapshot, &mut printed);
        assert_eq!(printed.question, Some((QuestionId::new("5"), 0)));

        snapshot.index = 1;
        snapshot.total = 2;
        render(&snapshot, &mut printed);
        assert_eq!(printed.question, Some((QuestionId::new("5"), 1)));
    }

    #[test]
    fn terminal_monitor_always_grants() {
        let monitor: Arc<dyn ScreenMonitor> = Arc::new(TerminalMonitor);
        assert!(monitor.acquire().is_ok());
    }
}
