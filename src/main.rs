// focus-insights - learns when you actually get things done
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{bail, Context, Result};
use focus_insights_lib::{
    core::{EventRecorder, Task},
    db::{
        EnergyLevel, EventType, Priority, SuggestionFrequency, SuggestionQuery, SuggestionStatus,
        TaskEventInput, TimeBlock, UserPreferences,
    },
    intelligence::Analyzer,
    logging, Config, Database, InsightError,
};
use chrono::Utc;
use std::env;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Grab whatever the user typed
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let config = Config::load().context("failed to load config")?;

    // Logging is nice to have. Don't refuse to run without it.
    let log_guard = match logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled ({})", e);
            None
        }
    };

    let command = &args[1];

    let result = match command.as_str() {
        "record" => handle_record(&config, &args[2..]).await,
        "analyze" => handle_analyze(&config, &args[2..]).await,
        "insights" => handle_insights(&config, &args[2..]).await,
        "suggest" => handle_suggest(&config, &args[2..]).await,
        "suggestions" => handle_suggestions(&config, &args[2..]).await,
        "respond" => handle_respond(&config, &args[2..]).await,
        "prefs" => handle_prefs(&config, &args[2..]).await,
        "status" => handle_status(&config).await,
        "version" | "-v" | "--version" => {
            println!("focus-insights v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(command = %command, error = %e, "command failed");

        // Library errors know how to explain themselves
        if let Some(insight_error) = e.downcast_ref::<InsightError>() {
            eprintln!("Error: {}", insight_error.user_message());
            drop(log_guard);
            std::process::exit(1);
        }
    }

    result
}

fn parse_flag<T: std::str::FromStr>(name: &str, value: Option<&String>) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = value.with_context(|| format!("{} needs a value", name))?;
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("bad value for {}: {}", name, e))
}

async fn handle_record(config: &Config, args: &[String]) -> Result<()> {
    let db = Arc::new(get_database(config).await?);
    let recorder = EventRecorder::new(db);

    // Bulk import: a JSON array of events
    if args.first().map(String::as_str) == Some("--file") {
        let path = args.get(1).context("--file needs a path")?;
        let raw = std::fs::read_to_string(path).with_context(|| format!("could not read {}", path))?;
        let events: Vec<TaskEventInput> =
            serde_json::from_str(&raw).with_context(|| format!("{} is not a list of events", path))?;

        let total = events.len();
        let ids = recorder.record_batch(events).await?;
        println!("Recorded {} of {} event(s)", ids.len(), total);
        return Ok(());
    }

    let (user_id, event_type) = match args {
        [user, kind, ..] => (user.clone(), parse_flag::<EventType>("event type", Some(kind))?),
        _ => bail!("usage: focus-insights record <user> <event-type> [options]"),
    };

    let mut input = TaskEventInput::new(user_id, event_type);

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        match flag {
            "--task" => input.task_id = Some(parse_flag::<String>(flag, value)?),
            "--block" => input.time_block = Some(parse_flag::<TimeBlock>(flag, value)?),
            "--project" => input.project_id = Some(parse_flag::<String>(flag, value)?),
            "--priority" => input.priority = Some(parse_flag::<Priority>(flag, value)?),
            "--energy" => input.energy_level = Some(parse_flag::<EnergyLevel>(flag, value)?),
            "--estimated" => input.metadata.estimated_minutes = Some(parse_flag(flag, value)?),
            "--actual" => input.metadata.actual_minutes = Some(parse_flag(flag, value)?),
            "--rollovers" => input.metadata.rollover_count = Some(parse_flag(flag, value)?),
            other => bail!("unknown option: {}", other),
        }
        i += 2;
    }

    let id = recorder.record(input).await?;
    println!("Recorded event #{}", id);

    Ok(())
}

async fn handle_analyze(config: &Config, args: &[String]) -> Result<()> {
    let db = Arc::new(get_database(config).await?);
    let analyzer = Analyzer::new(db, config);
    let now = Utc::now();

    match args.first().map(String::as_str) {
        None | Some("--all") => {
            println!("\nAnalyzing every user...\n");
            let results = analyzer.analyze_all(now).await?;

            println!("{}", "=".repeat(60));
            if results.is_empty() {
                println!("No events recorded yet.");
            }
            for (user_id, outcome) in &results {
                println!(
                    "  {:<24} {:>5} events  {:>2} saved  {:>2} below threshold",
                    user_id, outcome.events_analyzed, outcome.saved, outcome.rejected
                );
            }
            println!("{}", "=".repeat(60));
        }
        Some(user_id) => {
            let report = analyzer.run_analysis(user_id, now).await?;

            println!("{}", "=".repeat(60));
            println!("Analysis Report: {}", user_id);
            println!("{}", "=".repeat(60));
            println!("\nCompletions analyzed: {}", report.outcome.events_analyzed);
            println!("Insights saved:       {}", report.outcome.saved);
            println!("Below threshold:      {}", report.outcome.rejected);
            if report.outcome.failed > 0 {
                println!("Failed to save:       {}", report.outcome.failed);
            }

            print_insights(&report.insights);
            println!("\n{}", "=".repeat(60));
        }
    }

    Ok(())
}

async fn handle_insights(config: &Config, args: &[String]) -> Result<()> {
    let user_id = args.first().context("usage: focus-insights insights <user>")?;

    let db = Arc::new(get_database(config).await?);
    let analyzer = Analyzer::new(Arc::clone(&db), config);
    let insights = analyzer.get_insights(user_id).await?;

    if insights.is_empty() {
        println!("No insights for '{}' yet.", user_id);
        println!("Record more completed tasks, then run: focus-insights analyze {}", user_id);
    } else {
        println!("{}", "=".repeat(60));
        println!("Insights for {}", user_id);
        println!("{}", "=".repeat(60));
        print_insights(&insights);
        println!("\n{}", "=".repeat(60));
    }

    print_raw_counts(&db, user_id, config.analysis.window_days).await?;

    Ok(())
}

/// Plain completion tallies behind the insights
async fn print_raw_counts(db: &Database, user_id: &str, window_days: i64) -> Result<()> {
    let since = Utc::now() - chrono::Duration::days(window_days);

    let blocks = db.count_by_time_block(user_id, since).await?;
    if blocks.is_empty() {
        return Ok(());
    }

    println!("\nCompletions, last {} days:", window_days);
    for (block, count) in &blocks {
        println!("  {:<10} {}", block.to_string(), count);
    }

    let hours = db.count_by_hour(user_id, since).await?;
    if let Some((hour, count)) = hours.iter().enumerate().max_by_key(|(h, n)| (**n, std::cmp::Reverse(*h))) {
        println!("  Busiest hour: {:02}:00 ({} tasks)", hour, count);
    }

    let projects = db.count_by_project_and_time_block(user_id, since).await?;
    for (project, block, count) in &projects {
        println!("  {} / {}: {}", project, block, count);
    }

    Ok(())
}

async fn handle_suggest(config: &Config, args: &[String]) -> Result<()> {
    let (user_id, tasks_path) = match args {
        [user, path, ..] => (user, path),
        _ => bail!("usage: focus-insights suggest <user> <tasks.json>"),
    };

    let tasks = load_tasks(Path::new(tasks_path))?;

    let db = Arc::new(get_database(config).await?);
    let analyzer = Analyzer::new(db, config);
    let stored = analyzer.generate_suggestions(user_id, &tasks).await?;

    if stored.is_empty() {
        println!("No new suggestions.");
    } else {
        println!("{}", "=".repeat(60));
        println!("New Suggestions");
        println!("{}", "=".repeat(60));
        for suggestion in &stored {
            print_suggestion(suggestion);
        }
        println!("\n{}", "=".repeat(60));
    }

    Ok(())
}

async fn handle_suggestions(config: &Config, args: &[String]) -> Result<()> {
    let user_id = args.first().context("usage: focus-insights suggestions <user> [status] [--all]")?;

    let mut query = SuggestionQuery::default();
    for arg in &args[1..] {
        match arg.as_str() {
            "--all" => query.include_expired = true,
            status => query.status = Some(parse_flag::<SuggestionStatus>("status", Some(&status.to_string()))?),
        }
    }

    let db = Arc::new(get_database(config).await?);
    let analyzer = Analyzer::new(db, config);
    let suggestions = analyzer.get_suggestions_at(user_id, query, Utc::now()).await?;

    if suggestions.is_empty() {
        println!("No suggestions found.");
        return Ok(());
    }

    let now = Utc::now();
    println!("{}", "=".repeat(60));
    for suggestion in &suggestions {
        print_suggestion(suggestion);
        let state = if suggestion.is_expired(now) {
            "expired".to_string()
        } else {
            suggestion.status.to_string()
        };
        println!("     Status: {}", state);
    }
    println!("\n{}", "=".repeat(60));

    Ok(())
}

async fn handle_respond(config: &Config, args: &[String]) -> Result<()> {
    let (id, accepted) = match args {
        [id, answer, ..] => {
            let id: i64 = parse_flag("suggestion id", Some(id))?;
            let accepted = match answer.as_str() {
                "accept" | "yes" => true,
                "dismiss" | "no" => false,
                other => bail!("answer must be accept or dismiss, got '{}'", other),
            };
            (id, accepted)
        }
        _ => bail!("usage: focus-insights respond <id> accept|dismiss"),
    };

    let db = Arc::new(get_database(config).await?);
    let analyzer = Analyzer::new(db, config);
    analyzer.respond_to_suggestion(id, accepted).await?;

    println!("Suggestion #{} {}", id, if accepted { "accepted" } else { "dismissed" });
    Ok(())
}

async fn handle_prefs(config: &Config, args: &[String]) -> Result<()> {
    let user_id = args.first().context("usage: focus-insights prefs <user> [enabled|disabled] [frequency]")?;
    focus_insights_lib::core::validate_user_id(user_id)?;

    let db = get_database(config).await?;
    let mut prefs: UserPreferences = db.get_preferences(user_id).await?;

    let mut changed = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "enabled" | "on" => prefs.smart_suggestions_enabled = true,
            "disabled" | "off" => prefs.smart_suggestions_enabled = false,
            frequency => {
                prefs.suggestion_frequency =
                    parse_flag::<SuggestionFrequency>("frequency", Some(&frequency.to_string()))?
            }
        }
        changed = true;
    }

    if changed {
        db.set_preferences(user_id, prefs).await?;
    }

    println!("Preferences for {}:", user_id);
    println!(
        "  Smart suggestions: {}",
        if prefs.smart_suggestions_enabled { "enabled" } else { "disabled" }
    );
    println!("  Frequency:         {}", prefs.suggestion_frequency);

    Ok(())
}

async fn handle_status(config: &Config) -> Result<()> {
    let db = get_database(config).await?;
    let stats = db.stats().await?;

    println!("\nfocus-insights Status");
    println!("{}", "=".repeat(60));

    println!("\nDatabase:");
    println!("  Path:        {}", db.path().display());
    println!("  Users:       {}", stats.total_users);
    println!("  Events:      {}", stats.total_events);
    println!("  Insights:    {}", stats.total_insights);
    println!("  Suggestions: {}", stats.total_suggestions);

    println!("\nConfig:");
    println!("  File:        {}", Config::config_path().display());
    println!("  Log:         {}", logging::log_file_path().display());
    println!(
        "  Window:      {} days, threshold {:.2}",
        config.analysis.window_days, config.analysis.confidence_threshold
    );

    println!("{}", "=".repeat(60));

    Ok(())
}

fn print_insights(insights: &[focus_insights_lib::db::UserInsight]) {
    if insights.is_empty() {
        return;
    }

    println!("\nActive Insights:");
    for (i, insight) in insights.iter().enumerate() {
        println!(
            "\n  {}. {} [{}] (confidence: {:.0}%, {} samples)",
            i + 1,
            insight.insight_type,
            insight.category,
            insight.confidence * 100.0,
            insight.sample_size
        );
        println!("     {}", insight.pattern.describe());
    }
}

fn print_suggestion(suggestion: &focus_insights_lib::db::Suggestion) {
    println!(
        "\n  #{} {} (confidence: {:.0}%)",
        suggestion.id,
        suggestion.title,
        suggestion.confidence * 100.0
    );
    println!("     {}", suggestion.description);
    println!("     Why: {}", suggestion.reasoning);
}

fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a list of tasks", path.display()))
}

async fn get_database(config: &Config) -> Result<Database> {
    let path = config.database_path();
    Database::new(&path)
        .await
        .with_context(|| format!("could not open database at {}", path.display()))
}

fn print_usage() {
    println!(
        r#"focus-insights v{} - Learns when you actually get things done

USAGE:
    focus-insights <COMMAND> [OPTIONS]

COMMANDS:
    record <user> <event> [options]      Record a task event
    record --file <events.json>          Import a list of events
    analyze [user|--all]                 Learn patterns (all users by default)
    insights <user>                      Show active insights
    suggest <user> <tasks.json>          Generate suggestions for a task list
    suggestions <user> [status] [--all]  List suggestions (--all keeps expired)
    respond <id> accept|dismiss          Answer a suggestion
    prefs <user> [enabled|disabled] [minimal|balanced|proactive]
                                         Show or change suggestion settings
    status                               Show database stats
    version                              Show version
    help                                 Show this help

RECORD OPTIONS:
    --task <id>  --block <morning|afternoon|evening|anytime>  --project <id>
    --priority <urgent|high|medium|low>  --energy <level>
    --estimated <minutes>  --actual <minutes>  --rollovers <n>

EXAMPLES:
    focus-insights record alice completed --task t1 --block morning
    focus-insights analyze alice
    focus-insights suggest alice today.json
    focus-insights respond 12 accept

CONFIG:
    ~/.config/focus-insights/config.toml
"#,
        env!("CARGO_PKG_VERSION")
    );
}
