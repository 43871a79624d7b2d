use std::io::{self, Read};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{self, WeekStart};
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::{Task, TimeSlot, ViewMode};
use crate::view;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "toggle",
        "list",
        "search",
        "info",
        "categories",
        "category",
        "use",
        "view",
        "calendar",
        "dashboard",
        "export",
        "auto",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "add" => cmd_add(store, &inv.command_args, now),
        "toggle" => cmd_toggle(store, &inv.command_args),
        "list" | "search" => cmd_list(store, renderer, &inv.command_args, now),
        "info" => cmd_info(store, renderer, &inv.command_args, now),
        "categories" => cmd_categories(store, renderer),
        "category" => cmd_category(store, renderer, &inv.command_args),
        "use" => cmd_use(store, &inv.command_args),
        "view" => cmd_view(store, &inv.command_args),
        "calendar" => cmd_calendar(store, cfg, renderer, &inv.command_args, now),
        "dashboard" => cmd_dashboard(store, cfg, renderer, now),
        "export" => cmd_export(store),
        "auto" => cmd_auto(store, cfg, renderer, now),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_add(store: &mut TaskStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");

    let (text, mods) = parse_text_and_mods(args, now)?;
    let text = if text == "-" { read_stdin_text()? } else { text };

    let slot = build_slot(&mods, now);
    let created = store
        .create_task(&text, mods.category.as_deref(), slot, now)
        .map(|task| task.id.clone());

    match created {
        Some(id) => {
            debug!(id = %id, "task appended");
            println!("Created task {}.", store.tasks().len());
        }
        None => println!("No task created."),
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_toggle(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command toggle");

    let reference = args
        .first()
        .ok_or_else(|| anyhow!("toggle: task reference is required"))?;

    match resolve_task_ref(store.tasks(), reference) {
        Some(index) => {
            let id = store.tasks()[index].id.clone();
            store.toggle_completion(&id);
            println!("Toggled task {}.", index + 1);
        }
        None => println!("No task matched '{reference}'."),
    }
    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_list(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    if !args.is_empty() {
        store.set_search_query(&args.join(" "));
    }

    let filtered =
        view::filtered_tasks(store.tasks(), store.active_category(), store.search_query());
    let entries = number_tasks(store.tasks(), &filtered);
    renderer.print_task_list(&entries, &category_heading(store), now)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_info(
    store: &TaskStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command info");

    let reference = args
        .first()
        .ok_or_else(|| anyhow!("info: task reference is required"))?;

    match resolve_task_ref(store.tasks(), reference) {
        Some(index) => renderer.print_task_info(Some(index + 1), &store.tasks()[index], now),
        None => {
            println!("No task matched '{reference}'.");
            Ok(())
        }
    }
}

#[instrument(skip(store, renderer))]
fn cmd_categories(store: &TaskStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command categories");
    renderer.print_categories(store.categories(), store.tasks())
}

#[instrument(skip(store, renderer, args))]
fn cmd_category(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let Some((subcommand, rest)) = args.split_first() else {
        return cmd_categories(store, renderer);
    };
    if subcommand != "add" {
        return Err(anyhow!(
            "category: unknown subcommand: {subcommand} (expected 'add')"
        ));
    }

    info!("command category add");
    let mut icon = None;
    let mut name_parts = Vec::new();
    for arg in rest {
        if let Some(value) = arg.strip_prefix("icon:") {
            icon = Some(value.to_string());
            continue;
        }
        name_parts.push(arg.clone());
    }
    if name_parts.is_empty() {
        return Err(anyhow!("category add: name is required"));
    }
    let name = name_parts.join(" ");

    match store.create_category(&name, icon.as_deref()) {
        Some(category) => println!("Created category {}.", category.id),
        None => println!("No category created."),
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_use(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command use");

    let id = args
        .first()
        .ok_or_else(|| anyhow!("use: category id is required"))?;
    if !store.categories().iter().any(|category| category.id == *id) {
        warn!(category = %id, "no category with that id; setting anyway");
    }
    store.set_active_category(id);
    println!("Active category set: {id}");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_view(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command view");

    let Some(token) = args.first() else {
        println!("{}", store.view_mode().as_str());
        return Ok(());
    };

    let mode = ViewMode::parse(token).ok_or_else(|| {
        anyhow!("invalid view mode: {token} (expected tasks, calendar, or dashboard)")
    })?;
    store.set_view_mode(mode);
    println!("View set: {}", mode.as_str());
    Ok(())
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_calendar(
    store: &TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command calendar");

    let anchor = if args.is_empty() {
        datetime::app_date(now)
    } else {
        datetime::parse_date_expr(&args.join(" "), now)?
    };
    let origin = datetime::week_start(anchor, week_origin_config(cfg));
    renderer.print_week_grid(store.tasks(), origin, now)
}

#[instrument(skip(store, cfg, renderer, now))]
fn cmd_dashboard(
    store: &TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let user_name = cfg.get("user.name").unwrap_or_else(|| "User".to_string());
    let show_24h = cfg.get_bool("schedule.24h").unwrap_or(true);
    renderer.print_dashboard(store.tasks(), &user_name, show_24h, now)
}

#[instrument(skip(store))]
fn cmd_export(store: &TaskStore) -> anyhow::Result<()> {
    info!("command export");

    let out = serde_json::to_string_pretty(store.tasks())?;
    println!("{out}");
    Ok(())
}

// The default for a bare invocation: the app chrome header, then
// whatever the persisted view mode last was.
#[instrument(skip(store, cfg, renderer, now))]
fn cmd_auto(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    renderer.print_header(now)?;
    println!();

    match store.view_mode() {
        ViewMode::Tasks => cmd_list(store, renderer, &[], now),
        ViewMode::Calendar => cmd_calendar(store, cfg, renderer, &[], now),
        ViewMode::Dashboard => cmd_dashboard(store, cfg, renderer, now),
    }
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: add, toggle, list, search, info, categories, category add, use, view, calendar, dashboard, export, auto, help, version"
    );
    Ok(())
}

/// An exact task id wins; otherwise the reference is tried as a 1-based
/// position in the full task list.
fn resolve_task_ref(tasks: &[Task], reference: &str) -> Option<usize> {
    if let Some(index) = tasks.iter().position(|task| task.id == reference) {
        return Some(index);
    }

    let position: usize = reference.parse().ok()?;
    (1..=tasks.len()).contains(&position).then(|| position - 1)
}

fn number_tasks<'a>(all: &'a [Task], subset: &[&'a Task]) -> Vec<(usize, &'a Task)> {
    subset
        .iter()
        .map(|task| {
            let position = all
                .iter()
                .position(|candidate| candidate.id == task.id)
                .map(|index| index + 1)
                .unwrap_or(0);
            (position, *task)
        })
        .collect()
}

fn category_heading(store: &TaskStore) -> String {
    let active = store.active_category();
    store
        .categories()
        .iter()
        .find(|category| category.id == active)
        .map(|category| format!("{} {}", category.icon, category.name))
        .unwrap_or_else(|| active.to_string())
}

#[derive(Debug, Default)]
struct AddMods {
    category: Option<String>,
    date: Option<NaiveDate>,
    start: Option<u32>,
    end: Option<u32>,
}

fn parse_text_and_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<(String, AddMods)> {
    let mut text_parts = Vec::new();
    let mut mods = AddMods::default();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && apply_one_mod(&mut mods, arg, now)? {
            continue;
        }

        text_parts.push(arg.clone());
    }

    if text_parts.is_empty() {
        return Err(anyhow!("add: task text is required"));
    }

    Ok((text_parts.join(" "), mods))
}

fn apply_one_mod(mods: &mut AddMods, tok: &str, now: DateTime<Utc>) -> anyhow::Result<bool> {
    let Some((key, value)) = tok.split_once(':').or_else(|| tok.split_once('=')) else {
        return Ok(false);
    };

    match key.to_ascii_lowercase().as_str() {
        "category" => mods.category = Some(value.to_string()),
        "date" => mods.date = Some(datetime::parse_date_expr(value, now)?),
        "start" => mods.start = Some(parse_clock_hour(value)?),
        "end" => mods.end = Some(parse_clock_hour(value)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_clock_hour(value: &str) -> anyhow::Result<u32> {
    let (hour, _minute) = datetime::parse_clock_time(value)
        .ok_or_else(|| anyhow!("invalid clock time: {value}"))?;
    Ok(hour)
}

// A partial schedule modifier set still yields a full slot; anything
// omitted falls back to the same defaults an unscheduled add would get.
fn build_slot(mods: &AddMods, now: DateTime<Utc>) -> Option<TimeSlot> {
    if mods.date.is_none() && mods.start.is_none() && mods.end.is_none() {
        return None;
    }

    let date = mods.date.unwrap_or_else(|| datetime::app_date(now));
    let start = mods.start.unwrap_or_else(|| datetime::app_hour(now));
    let end = mods.end.unwrap_or((start + 1) % 24);
    Some(TimeSlot {
        date,
        start_time: datetime::slot_hour_string(start),
        end_time: datetime::slot_hour_string(end),
    })
}

fn week_origin_config(cfg: &Config) -> WeekStart {
    let raw = cfg.get("week.start").unwrap_or_else(|| "sunday".to_string());
    match WeekStart::parse(&raw) {
        Some(origin) => origin,
        None => {
            warn!(value = %raw, "invalid week.start value; defaulting to sunday");
            WeekStart::Sunday
        }
    }
}

fn read_stdin_text() -> anyhow::Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed reading task text from stdin")?;
    Ok(buffer.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        build_slot, expand_command_abbrev, known_command_names, parse_text_and_mods,
        resolve_task_ref,
    };
    use crate::task::Task;

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            text: "x".to_string(),
            completed: false,
            category: "today".to_string(),
            created_at: Utc::now(),
            scheduled_time: None,
        }
    }

    #[test]
    fn abbreviations_expand_to_unique_prefixes() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("dash", &known), Some("dashboard"));
        assert_eq!(expand_command_abbrev("t", &known), Some("toggle"));
        assert_eq!(expand_command_abbrev("export", &known), Some("export"));
        // Exact names win even when they prefix a longer command.
        assert_eq!(expand_command_abbrev("category", &known), Some("category"));
        assert_eq!(expand_command_abbrev("ca", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }

    #[test]
    fn task_refs_prefer_ids_over_positions() {
        let tasks = vec![task("b"), task("a"), task("9")];

        assert_eq!(resolve_task_ref(&tasks, "a"), Some(1));
        assert_eq!(resolve_task_ref(&tasks, "9"), Some(2));
        assert_eq!(resolve_task_ref(&tasks, "2"), Some(1));
        assert_eq!(resolve_task_ref(&tasks, "4"), None);
        assert_eq!(resolve_task_ref(&tasks, "0"), None);
        assert_eq!(resolve_task_ref(&tasks, "nope"), None);
    }

    #[test]
    fn mods_peel_off_while_text_joins() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let args: Vec<String> = [
            "category:work",
            "Call",
            "the",
            "bank:",
            "date:tomorrow",
            "start:2pm",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let (text, mods) = parse_text_and_mods(&args, now).expect("parse");
        assert_eq!(text, "Call the bank:");
        assert_eq!(mods.category.as_deref(), Some("work"));
        assert_eq!(
            mods.date,
            chrono::NaiveDate::from_ymd_opt(2026, 2, 18)
        );
        assert_eq!(mods.start, Some(14));
        assert_eq!(mods.end, None);
    }

    #[test]
    fn double_dash_turns_mod_lookalikes_into_text() {
        let now = Utc::now();
        let args: Vec<String> = ["--", "date:tomorrow"].iter().map(ToString::to_string).collect();

        let (text, mods) = parse_text_and_mods(&args, now).expect("parse");
        assert_eq!(text, "date:tomorrow");
        assert!(mods.date.is_none());
    }

    #[test]
    fn missing_text_is_an_error() {
        let now = Utc::now();
        let args: Vec<String> = vec!["date:tomorrow".to_string()];
        assert!(parse_text_and_mods(&args, now).is_err());
    }

    #[test]
    fn partial_schedule_mods_fill_in_defaults() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");

        let empty = super::AddMods::default();
        assert!(build_slot(&empty, now).is_none());

        let mut with_start = super::AddMods::default();
        with_start.start = Some(23);
        let slot = build_slot(&with_start, now).expect("slot");
        assert_eq!(slot.start_time, "23:00");
        assert_eq!(slot.end_time, "00:00");
        assert_eq!(slot.date, chrono::NaiveDate::from_ymd_opt(2026, 2, 17).expect("date"));
    }

    #[test]
    fn bad_mod_values_are_errors() {
        let now = Utc::now();
        let args: Vec<String> = ["task", "date:whenever"].iter().map(ToString::to_string).collect();
        assert!(parse_text_and_mods(&args, now).is_err());

        let args: Vec<String> = ["task", "start:25:99"].iter().map(ToString::to_string).collect();
        assert!(parse_text_and_mods(&args, now).is_err());
    }
}
