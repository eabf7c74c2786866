//! Annotation query command.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use calanno_core::{Annotation, AnnotationQuery, TimeRange};
use calanno_datasource::google::GoogleApi;
use calanno_datasource::{CalendarDatasource, InstanceSettings};

use crate::cli::QueryArgs;
use crate::error::{CliError, CliResult};

/// Fetches annotation records for a calendar and time range.
pub async fn run(settings: &InstanceSettings, args: &QueryArgs) -> CliResult<()> {
    let from = parse_time_spec(&args.from)?;
    let to = parse_time_spec(&args.to)?;
    if to < from {
        return Err(CliError::InvalidTimeSpec(format!(
            "--to ({}) is before --from ({})",
            args.to, args.from
        )));
    }

    let mut annotation = match args.calendar_id.as_deref() {
        Some(id) => Annotation::for_calendar(id),
        None => Annotation::default(),
    };
    if let Some(name) = &args.name {
        annotation = annotation.with_name(name);
    }

    debug!("querying annotations from {} to {}", from, to);
    let api = Arc::new(GoogleApi::from_settings(settings));
    let datasource = CalendarDatasource::new(settings, api);

    let query = AnnotationQuery {
        annotation,
        range: TimeRange::new(from, to),
    };
    let records = datasource.annotation_query(&query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No annotation records in the requested range.");
        return Ok(());
    }

    for record in &records {
        let when = DateTime::from_timestamp_millis(record.time)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| format!("{}ms", record.time));
        let tag = record.tags.first().map(String::as_str).unwrap_or("-");
        println!(
            "{:25}  {:5}  {}",
            when,
            tag,
            record.title.as_deref().unwrap_or("(untitled)")
        );
    }
    println!();
    println!("{} records", records.len());
    Ok(())
}

/// Parses a time bound from the CLI.
///
/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates (midnight UTC,
/// the same convention all-day events use), the literal `now`, and
/// relative specs like `now-24h` or `now+30m`.
pub fn parse_time_spec(spec: &str) -> CliResult<DateTime<Utc>> {
    parse_time_spec_at(spec, Utc::now())
}

fn parse_time_spec_at(spec: &str, now: DateTime<Utc>) -> CliResult<DateTime<Utc>> {
    let spec = spec.trim();
    if spec == "now" {
        return Ok(now);
    }
    if let Some(rest) = spec.strip_prefix("now") {
        return parse_offset(rest)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(|| CliError::InvalidTimeSpec(spec.to_string()));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(spec) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(spec, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(CliError::InvalidTimeSpec(spec.to_string()))
}

/// Parses a signed relative offset such as `-24h` or `+30m`.
///
/// Returns `None` for malformed input and for magnitudes `Duration`
/// cannot represent.
fn parse_offset(rest: &str) -> Option<Duration> {
    let (sign, body) = match rest.as_bytes().first()? {
        b'+' => (1i64, &rest[1..]),
        b'-' => (-1i64, &rest[1..]),
        _ => return None,
    };
    let unit = body.chars().last()?;
    let value: i64 = body[..body.len() - unit.len_utf8()].parse().ok()?;
    let value = value.checked_mul(sign)?;
    match unit {
        's' => Duration::try_seconds(value),
        'm' => Duration::try_minutes(value),
        'h' => Duration::try_hours(value),
        'd' => Duration::try_days(value),
        'w' => Duration::try_weeks(value),
        _ => None,
    }
}
