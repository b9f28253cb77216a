//! Best-effort parser for fitness plans written as plain text.
//!
//! Plans are separated by rule lines (`=====` or `-----`). Inside a plan the
//! first line is the title, `Key: value` lines set metadata, `Day N: focus`
//! opens a schedule day and bullet lines under a day are exercises:
//!
//! ```text
//! Plan 1: Strength Starter
//! Focus: Strength
//! Level: Beginner
//! Equipment: Dumbbells, Bench
//! Day 1: Upper Body
//! - Bench Press: 3 x 10
//! - Rows - 3 sets of 12 reps
//! - Plank (30 seconds)
//! ==========
//! ```
//!
//! Anything unrecognised is ignored. A section without a title or without a
//! single day yields no plan.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{Exercise, FitnessPlanInput, PlanStatus, ScheduleDay};

const DEFAULT_CATEGORY: &str = "General Fitness";
const DEFAULT_LEVEL: &str = "Beginner";
const DEFAULT_DURATION: &str = "4 weeks";

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:={3,}|-{3,})\s*$").expect("separator regex"));
static TITLE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:plan\s*\d+\s*[:.)\-]\s*|\d+\s*[.)]\s+)").expect("title prefix regex")
});
static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^day\s*(\d+)\s*[:\-]?\s*(.*)$").expect("day regex"));
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(focus|level|duration|equipment|prerequisites|goals?)\s*:\s*(.*)$")
        .expect("field regex")
});
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+(.+)$").expect("bullet regex"));
static SETS_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*sets?\s*(?:of|x)\s*(\d+(?:\s*-\s*\d+)?)(?:\s*reps?)?")
        .expect("sets-of regex")
});
static SETS_X_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*[x×]\s*(\d+(?:\s*-\s*\d+)?)").expect("sets-x regex"));
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*(\d+\s*(?:seconds?|secs?|minutes?|mins?))\s*\)").expect("duration regex")
});

/// Parses every well-formed plan in `text`, in document order.
pub fn parse_plans(text: &str) -> Vec<FitnessPlanInput> {
    split_sections(text)
        .iter()
        .enumerate()
        .filter_map(|(index, section)| {
            let plan = parse_section(section);
            if plan.is_none() {
                debug!(section = index + 1, "Dropping section without a title or schedule");
            }
            plan
        })
        .collect()
}

fn split_sections(text: &str) -> Vec<Vec<&str>> {
    let mut sections = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if SEPARATOR_RE.is_match(line) {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }

    sections
}

pub fn parse_section(lines: &[&str]) -> Option<FitnessPlanInput> {
    let mut lines = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());

    let title = TITLE_PREFIX_RE
        .replace(lines.next()?, "")
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }

    let mut category: Option<String> = None;
    let mut level: Option<String> = None;
    let mut duration: Option<String> = None;
    let mut equipment = Vec::new();
    let mut prerequisites = Vec::new();
    let mut goals = Vec::new();
    let mut schedule: Vec<ScheduleDay> = Vec::new();

    for line in lines {
        if let Some(caps) = DAY_RE.captures(line) {
            schedule.push(ScheduleDay {
                day: format!("Day {}", &caps[1]),
                focus: caps[2].trim().to_string(),
                exercises: Vec::new(),
            });
            continue;
        }

        if let Some(caps) = FIELD_RE.captures(line) {
            let value = caps[2].trim();
            match caps[1].to_ascii_lowercase().as_str() {
                "focus" => {
                    if !value.is_empty() {
                        category = Some(map_category(value));
                        goals.push(value.to_string());
                    }
                }
                "level" => level = Some(normalize_level(value)),
                "duration" => duration = Some(value.to_string()),
                "equipment" => equipment.extend(split_list(value)),
                "prerequisites" => prerequisites.extend(split_list(value)),
                _ => goals.extend(split_list(value)),
            }
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            match schedule.last_mut() {
                Some(day) => day.exercises.push(parse_exercise(&caps[1])),
                None => debug!(line, "Exercise line before any day, ignoring"),
            }
        }
    }

    if schedule.is_empty() {
        return None;
    }

    let level = level
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    Some(FitnessPlanInput {
        description: format!("Imported plan: {}", title),
        title,
        category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        difficulty: difficulty_for(&level),
        level,
        duration: duration
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        weekly_workouts: schedule.len().clamp(1, 7) as i64,
        prerequisites,
        equipment,
        goals,
        schedule,
        status: PlanStatus::Draft,
    })
}

/// `Name: 3 x 12`, `Name - 3 sets of 10 reps`, `Name (30 seconds)` or just `Name`.
pub fn parse_exercise(text: &str) -> Exercise {
    let text = text.trim();
    let mut exercise = Exercise::default();
    let mut name_end = text.len();

    if let Some(caps) = SETS_OF_RE.captures(text).or_else(|| SETS_X_RE.captures(text)) {
        exercise.sets = caps[1].parse().ok();
        exercise.reps = Some(caps[2].split_whitespace().collect());
        name_end = name_end.min(caps.get(0).map_or(text.len(), |m| m.start()));
    }

    if let Some(caps) = DURATION_RE.captures(text) {
        exercise.duration = Some(caps[1].to_string());
        name_end = name_end.min(caps.get(0).map_or(text.len(), |m| m.start()));
    }

    let name = text[..name_end]
        .trim_end_matches(|c: char| c == ':' || c == '-' || c == '–' || c.is_whitespace());
    exercise.name = if name.is_empty() { text } else { name }.to_string();

    exercise
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn map_category(focus: &str) -> String {
    let lower = focus.to_lowercase();
    let known = [
        (&["hiit", "interval"][..], "HIIT"),
        (&["strength", "powerlifting"][..], "Strength Training"),
        (&["muscle", "hypertrophy", "bodybuilding"][..], "Muscle Building"),
        (&["weight loss", "fat loss", "fat burn"][..], "Weight Loss"),
        (&["cardio", "endurance", "running"][..], "Cardio"),
        (&["yoga"][..], "Yoga"),
        (&["flexibility", "mobility", "stretch"][..], "Flexibility"),
    ];

    known
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, category)| category.to_string())
        .unwrap_or_else(|| focus.to_string())
}

fn normalize_level(value: &str) -> String {
    let lower = value.to_lowercase();
    for level in ["Beginner", "Intermediate", "Advanced"] {
        if lower.contains(&level.to_lowercase()) {
            return level.to_string();
        }
    }
    value.to_string()
}

fn difficulty_for(level: &str) -> i64 {
    match level {
        "Intermediate" => 3,
        "Advanced" => 4,
        _ => 2,
    }
}
