use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "fancy-todo-time.toml";
const TIMEZONE_ENV_VAR: &str = "FANCY_TODO_TZ";
const TIMEZONE_CONFIG_ENV_VAR: &str = "FANCY_TODO_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

pub fn app_timezone() -> &'static Tz {
    static APP_TZ: OnceLock<Tz> = OnceLock::new();
    APP_TZ.get_or_init(resolve_app_timezone)
}

#[must_use]
pub fn app_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(app_timezone()).date_naive()
}

#[must_use]
pub fn app_hour(dt: DateTime<Utc>) -> u32 {
    use chrono::Timelike;
    dt.with_timezone(app_timezone()).hour()
}

fn resolve_app_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed reading timezone config file");
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed parsing timezone config file");
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured app timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
            None
        }
    }
}

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();
    let today = app_date(now);

    match lower.as_str() {
        "now" | "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(target_weekday) = parse_weekday_name(&lower) {
        return Ok(next_weekday_date(today, target_weekday));
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)d$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    if let Some(caps) = rel_re.captures(token) {
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .map_err(|e| anyhow!("invalid relative number: {e}"))?;
        let duration = Duration::days(num);
        return Ok(if sign == "-" {
            today - duration
        } else {
            today + duration
        });
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(app_date(dt.with_timezone(&Utc)));
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: now/today/tomorrow/yesterday, weekday names (e.g. monday), \
         +Nd/-Nd, YYYY-MM-DD, RFC3339"
    })
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from.checked_add_signed(Duration::days(delta)).unwrap_or(from)
}

pub fn parse_clock_time(token: &str) -> Option<(u32, u32)> {
    let clock_re =
        Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$").ok()?;
    let captures = clock_re.captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    Some((hour, minute))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Some(Self::Sunday),
            "monday" | "mon" => Some(Self::Monday),
            _ => None,
        }
    }
}

#[must_use]
pub fn week_start(date: NaiveDate, origin: WeekStart) -> NaiveDate {
    let back = match origin {
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        WeekStart::Monday => date.weekday().num_days_from_monday(),
    };
    date.checked_sub_signed(Duration::days(i64::from(back)))
        .unwrap_or(date)
}

#[must_use]
pub fn slot_hour_string(hour: u32) -> String {
    format!("{hour:02}:00")
}

#[must_use]
pub fn hour_label(hour: u32) -> String {
    let twelve = match hour % 12 {
        0 => 12,
        other => other,
    };
    let suffix = if hour >= 12 { "pm" } else { "am" };
    format!("{twelve} {suffix}")
}

#[must_use]
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - then;

    if diff < Duration::days(1) {
        if diff.num_hours() < 1 {
            let minutes = diff.num_minutes();
            if minutes < 1 {
                return "Just now".to_string();
            }
            return format!("{minutes}m ago");
        }
        return format!("{}h ago", diff.num_hours());
    }

    if diff < Duration::days(7) {
        return format!("{}d ago", diff.num_days());
    }

    then.with_timezone(app_timezone())
        .format("%b %-d")
        .to_string()
}

#[must_use]
pub fn format_header_date(now: DateTime<Utc>) -> String {
    now.with_timezone(app_timezone())
        .format("%A, %B %-d, %Y")
        .to_string()
}

#[must_use]
pub fn header_greeting(hour: u32) -> &'static str {
    if (5..12).contains(&hour) {
        "Good Morning"
    } else if (12..17).contains(&hour) {
        "Good Afternoon"
    } else if (17..22).contains(&hour) {
        "Good Evening"
    } else {
        "Good Night"
    }
}

#[must_use]
pub fn dashboard_greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{
        WeekStart, format_relative, header_greeting, hour_label, parse_clock_time,
        parse_date_expr, slot_hour_string, week_start,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_keywords_and_iso_dates() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        assert_eq!(parse_date_expr("today", now).expect("today"), date(2026, 2, 17));
        assert_eq!(
            parse_date_expr("tomorrow", now).expect("tomorrow"),
            date(2026, 2, 18)
        );
        assert_eq!(
            parse_date_expr("2026-03-01", now).expect("iso"),
            date(2026, 3, 1)
        );
        assert_eq!(parse_date_expr("+3d", now).expect("rel"), date(2026, 2, 20));
        assert!(parse_date_expr("not-a-date", now).is_err());
    }

    #[test]
    fn parses_weekday_to_next_occurrence() {
        // 2026-02-17 is a Tuesday; the next Wednesday is the 18th, the
        // next Tuesday a full week out.
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        assert_eq!(
            parse_date_expr("wednesday", now).expect("weekday"),
            date(2026, 2, 18)
        );
        assert_eq!(
            parse_date_expr("tuesday", now).expect("weekday"),
            date(2026, 2, 24)
        );
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(parse_clock_time("14:00"), Some((14, 0)));
        assert_eq!(parse_clock_time("3:23pm"), Some((15, 23)));
        assert_eq!(parse_clock_time("12:05am"), Some((0, 5)));
        assert_eq!(parse_clock_time("12:00 pm"), Some((12, 0)));
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("9:75"), None);
        assert_eq!(parse_clock_time("noon"), None);
    }

    #[test]
    fn week_start_honors_origin() {
        // 2026-08-19 is a Wednesday.
        let wed = date(2026, 8, 19);
        assert_eq!(week_start(wed, WeekStart::Sunday), date(2026, 8, 16));
        assert_eq!(week_start(wed, WeekStart::Monday), date(2026, 8, 17));

        let sun = date(2026, 8, 16);
        assert_eq!(week_start(sun, WeekStart::Sunday), sun);
    }

    #[test]
    fn hour_labels_wrap_noon_and_midnight() {
        assert_eq!(hour_label(0), "12 am");
        assert_eq!(hour_label(9), "9 am");
        assert_eq!(hour_label(12), "12 pm");
        assert_eq!(hour_label(23), "11 pm");
        assert_eq!(slot_hour_string(9), "09:00");
    }

    #[test]
    fn relative_times_step_through_units() {
        let now = Utc
            .with_ymd_and_hms(2026, 8, 23, 12, 0, 0)
            .single()
            .expect("valid now");
        let minute = chrono::Duration::minutes(1);

        assert_eq!(format_relative(now, now), "Just now");
        assert_eq!(format_relative(now - minute * 5, now), "5m ago");
        assert_eq!(format_relative(now - minute * 60 * 3, now), "3h ago");
        assert_eq!(format_relative(now - chrono::Duration::days(2), now), "2d ago");
        assert_eq!(format_relative(now - chrono::Duration::days(10), now), "Aug 13");
    }

    #[test]
    fn greeting_buckets_by_hour() {
        assert_eq!(header_greeting(6), "Good Morning");
        assert_eq!(header_greeting(13), "Good Afternoon");
        assert_eq!(header_greeting(19), "Good Evening");
        assert_eq!(header_greeting(23), "Good Night");
        assert_eq!(header_greeting(2), "Good Night");
    }
}
