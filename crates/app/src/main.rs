use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use services::sessions::DEMO_SUBJECT;
use services::{
    AdaptiveConfig, ApiError, AppConfig, AppServices, Clock, ExamConfig, InsightError,
    QuestionSet, Registration, TimedSession,
};
use skilltwin_core::model::{
    Dashboard, LearningPlan, PaperAnalysis, Prediction, StudentId, TestRecord, Theme,
};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::{TerminalMonitor, print_report, run_session};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidTheme { raw: String },
    Missing(&'static str),
    NoStudent,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTheme { raw } => write!(f, "invalid --theme value: {raw}"),
            ArgsError::Missing(what) => write!(f, "missing {what}"),
            ArgsError::NoStudent => write!(f, "no student selected; log in or pass --student"),
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

fn require_secs(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or(ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  skilltwin health");
    eprintln!("  skilltwin login --email <email> --password <password>");
    eprintln!(
        "  skilltwin register --email <email> --password <password> --name <name> [--class-level <level>] [--school <name>]"
    );
    eprintln!("  skilltwin logout");
    eprintln!("  skilltwin dashboard [--student <id>]");
    eprintln!("  skilltwin predict   [--student <id>]");
    eprintln!("  skilltwin history   [--student <id>]");
    eprintln!("  skilltwin recommend [--student <id>]");
    eprintln!("  skilltwin analyze   (--file <paper.pdf> | --text <paper text>)");
    eprintln!(
        "  skilltwin adaptive  [--subject <name>] [--duration <secs>] [--per-question <secs>] [--monitor]"
    );
    eprintln!("  skilltwin exam      [--questions <set.json>] [--duration <secs>] [--no-monitor]");
    eprintln!("  skilltwin theme     [--theme <light|dark>]   # toggles when omitted");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --api <url>       backend base URL");
    eprintln!("  --db <sqlite_url> local profile store");
    eprintln!("  --student <id>    act for this student");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SKILLTWIN_API_URL, SKILLTWIN_API_TIMEOUT_SECS, SKILLTWIN_DB_URL,");
    eprintln!("  SKILLTWIN_STUDENT_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Health,
    Login,
    Register,
    Logout,
    Dashboard,
    Predict,
    History,
    Recommend,
    Analyze,
    Adaptive,
    Exam,
    Theme,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "health" => Some(Self::Health),
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "logout" => Some(Self::Logout),
            "dashboard" => Some(Self::Dashboard),
            "predict" => Some(Self::Predict),
            "history" => Some(Self::History),
            "recommend" => Some(Self::Recommend),
            "analyze" => Some(Self::Analyze),
            "adaptive" => Some(Self::Adaptive),
            "exam" => Some(Self::Exam),
            "theme" => Some(Self::Theme),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    api_url: Option<String>,
    db_url: Option<String>,
    student: Option<StudentId>,
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    class_level: Option<String>,
    school: Option<String>,
    subject: Option<String>,
    duration: Option<u32>,
    per_question: Option<u32>,
    file: Option<PathBuf>,
    text: Option<String>,
    questions: Option<PathBuf>,
    monitored: Option<bool>,
    theme: Option<Theme>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => parsed.api_url = Some(require_value(args, "--api")?),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--student" => {
                    let value = require_value(args, "--student")?;
                    parsed.student = Some(StudentId::new(value.trim()));
                }
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--class-level" => parsed.class_level = Some(require_value(args, "--class-level")?),
                "--school" => parsed.school = Some(require_value(args, "--school")?),
                "--subject" => parsed.subject = Some(require_value(args, "--subject")?),
                "--duration" => parsed.duration = Some(require_secs(args, "--duration")?),
                "--per-question" => {
                    parsed.per_question = Some(require_secs(args, "--per-question")?);
                }
                "--file" => parsed.file = Some(require_value(args, "--file")?.into()),
                "--text" => parsed.text = Some(require_value(args, "--text")?),
                "--questions" => parsed.questions = Some(require_value(args, "--questions")?.into()),
                "--monitor" => parsed.monitored = Some(true),
                "--no-monitor" => parsed.monitored = Some(false),
                "--theme" => {
                    let value = require_value(args, "--theme")?;
                    let theme = value
                        .parse::<Theme>()
                        .map_err(|()| ArgsError::InvalidTheme { raw: value.clone() })?;
                    parsed.theme = Some(theme);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// Environment first, then flags.
    fn config(&self) -> AppConfig {
        let mut config = AppConfig::from_env();
        config.db_url = normalize_sqlite_url(config.db_url);
        if let Some(url) = &self.api_url {
            config.api.api_base_url = Some(url.clone());
        }
        if let Some(db_url) = &self.db_url {
            config.db_url = db_url.clone();
        }
        if let Some(student) = &self.student {
            config.student_id = Some(student.clone());
        }
        config
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown command: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown command")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = parsed.config();
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config, Clock::system()).await?;
    let student = config
        .student_id
        .clone()
        .or_else(|| services.context().student_id());

    match cmd {
        Command::Health => {
            let health = services.insights().health().await?;
            println!("Service: {}", health.status);
            if let Some(version) = &health.version {
                println!("Version: {version}");
            }
            if let Some(database) = &health.database {
                println!("Database: {database}");
            }
        }
        Command::Login => {
            let email = parsed.email.ok_or(ArgsError::Missing("--email"))?;
            let password = parsed.password.ok_or(ArgsError::Missing("--password"))?;
            match services.auth().login(&email, &password).await {
                Ok(identity) => println!("Signed in as {}.", identity.profile.name),
                Err(err) if err.needs_sign_in() => {
                    return Err("invalid email or password".into());
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Register => {
            let registration = Registration {
                email: parsed.email.ok_or(ArgsError::Missing("--email"))?,
                password: parsed.password.ok_or(ArgsError::Missing("--password"))?,
                name: parsed.name.ok_or(ArgsError::Missing("--name"))?,
                class_level: parsed.class_level,
                school: parsed.school,
            };
            let registered = services.auth().register(registration).await?;
            if registered.token.is_some() {
                println!("Registered and signed in as {}.", registered.profile.name);
            } else {
                println!(
                    "Registered {}. Run `skilltwin login` to sign in.",
                    registered.profile.email
                );
            }
        }
        Command::Logout => {
            services.auth().logout().await?;
            println!("Signed out.");
        }
        Command::Dashboard => {
            let dashboard = services
                .insights()
                .dashboard(student.as_ref())
                .await
                .map_err(explain_insight)?;
            print_dashboard(&dashboard);
        }
        Command::Predict => {
            let prediction = services
                .insights()
                .prediction(student.as_ref())
                .await
                .map_err(explain_insight)?;
            print_prediction(&prediction);
        }
        Command::History => {
            let tests = services
                .insights()
                .test_history(student.as_ref())
                .await
                .map_err(explain_insight)?;
            print_history(&tests);
        }
        Command::Recommend => {
            let plan = services
                .insights()
                .recommendations(student.as_ref())
                .await
                .map_err(explain_insight)?;
            print_plan(&plan);
        }
        Command::Analyze => {
            let papers = services.papers();
            let analysis = match (&parsed.file, &parsed.text) {
                (Some(file), None) => papers.analyze_file(file).await?,
                (None, Some(text)) => papers.analyze_text(text).await?,
                _ => return Err(ArgsError::Missing("exactly one of --file or --text").into()),
            };
            print_analysis(&analysis);
        }
        Command::Adaptive => {
            let student = student.ok_or(ArgsError::NoStudent)?;
            let subject = parsed.subject.unwrap_or_else(|| DEMO_SUBJECT.to_string());
            let mut adaptive = AdaptiveConfig::new(student, subject)
                .with_monitoring(parsed.monitored.unwrap_or(false));
            if let Some(secs) = parsed.duration {
                adaptive = adaptive.with_duration(secs);
            }
            if let Some(secs) = parsed.per_question {
                adaptive = adaptive.per_question(secs);
            }
            let session = TimedSession::adaptive(adaptive, services.clock());
            let driver = services.session_driver(Arc::new(TerminalMonitor));
            print_report(&run_session(driver, session).await?);
        }
        Command::Exam => {
            let set = match &parsed.questions {
                Some(path) => QuestionSet::from_json(&tokio::fs::read_to_string(path).await?)?,
                None => QuestionSet::demo()?,
            };
            let mut exam = ExamConfig::from_set(set);
            if let Some(secs) = parsed.duration {
                exam = exam.with_duration(secs);
            }
            if let Some(monitored) = parsed.monitored {
                exam = exam.with_monitoring(monitored);
            }
            let session = TimedSession::exam(exam, services.clock())?;
            let driver = services.session_driver(Arc::new(TerminalMonitor));
            print_report(&run_session(driver, session).await?);
        }
        Command::Theme => {
            let context = services.context();
            let theme = parsed
                .theme
                .unwrap_or_else(|| context.snapshot().theme.toggled());
            context.set_theme(theme).await?;
            println!("Theme: {}", theme.as_str());
        }
    }

    Ok(())
}

fn explain_insight(err: InsightError) -> Box<dyn std::error::Error> {
    match err {
        InsightError::Api(ApiError::Unauthorized) => {
            "not signed in or the session has expired; run `skilltwin login`".into()
        }
        InsightError::NoStudent => ArgsError::NoStudent.into(),
        other => other.into(),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    if let Some(student) = &dashboard.student {
        println!("{} ({})", student.name, student.email);
    }
    let stats = &dashboard.stats;
    println!("Overall mastery: {:.1}%", stats.overall_mastery);
    println!(
        "Questions attempted: {} (accuracy {:.1}%)",
        stats.questions_attempted, stats.accuracy_rate
    );
    println!(
        "Study time: {:.1}h, streak {} days",
        stats.total_study_time, stats.streak_days
    );
    if !dashboard.upcoming_exams.is_empty() {
        println!("Upcoming exams:");
        for exam in &dashboard.upcoming_exams {
            println!(
                "  {} - {} on {} ({} days, {:.0}% ready)",
                exam.subject, exam.topic, exam.date, exam.days_left, exam.preparedness
            );
        }
    }
    if !dashboard.weak_topics.is_empty() {
        println!("Weak topics:");
        for topic in &dashboard.weak_topics {
            println!(
                "  {} / {}: mastery {:.0}%",
                topic.subject, topic.topic, topic.mastery
            );
        }
    }
}

fn print_prediction(prediction: &Prediction) {
    let score = &prediction.prediction;
    print!("Predicted score: {:.1}", score.predicted_score);
    if let Some((low, high)) = score.confidence_interval {
        print!(" (range {low:.1} to {high:.1})");
    }
    println!();
    println!("Risk: {}", prediction.risk_level);
    for topic in &prediction.weak_topics {
        println!("  weak: {} ({:.0}%)", topic.topic, topic.mastery);
    }
    for line in prediction
        .recommendations
        .iter()
        .chain(&prediction.improvement_tips)
    {
        println!("  - {line}");
    }
}

fn print_history(tests: &[TestRecord]) {
    if tests.is_empty() {
        println!("No tests taken yet.");
        return;
    }
    for test in tests {
        let kind = test.test_type.as_deref().unwrap_or("test");
        let started = test.started_at.as_deref().unwrap_or("-");
        match test.total_score {
            Some(score) if test.is_completed() => {
                println!("{started}  {} ({kind}): {score:.0}%", test.subject);
            }
            _ => println!("{started}  {} ({kind}): not finished", test.subject),
        }
    }
}

fn print_plan(plan: &LearningPlan) {
    if let Some(goal) = &plan.daily_goal {
        println!("Today's goal: {goal}");
    }
    if let Some(progress) = &plan.progress_today {
        println!("Progress: {progress}");
    }
    if let Some(weekly) = &plan.weekly_progress {
        println!("This week: {weekly}");
    }
    for item in plan.by_priority() {
        let length = item
            .duration
            .as_deref()
            .or(item.estimated_time.as_deref())
            .map(|length| format!(", {length}"))
            .unwrap_or_default();
        println!("  [{}] {} ({}{length})", item.priority, item.title, item.kind);
    }
}

fn print_analysis(analysis: &PaperAnalysis) {
    if let Some(subject) = &analysis.metadata.subject {
        println!("Subject: {subject}");
    }
    if let Some((topic, weight)) = analysis.dominant_topic() {
        println!("Dominant topic: {topic} ({weight:.0}%)");
    }
    for (topic, weight) in &analysis.topic_distribution {
        println!("  {topic}: {weight:.0}%");
    }
    if let Some(prediction) = &analysis.score_prediction {
        println!("Expected score: {:.0}", prediction.expected_score);
    }
    for insight in &analysis.key_insights {
        println!("* {insight}");
    }
    for recommendation in analysis.high_priority() {
        println!("Focus: {}", recommendation.topic);
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
