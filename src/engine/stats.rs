//! Dashboard statistics computed from a document snapshot.
//!
//! All functions are pure; callers pass `now` so results are reproducible.
//! Hours and days are UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::models::{Department, Document, Ticket, TicketStatus};

/// First hour shown on the hourly chart.
pub const FIRST_HOUR: u32 = 8;
/// Last hour shown on the hourly chart.
pub const LAST_HOUR: u32 = 16;
/// Days covered by the daily series.
pub const DAILY_WINDOW: u32 = 7;

const UNASSIGNED_WORKER: &str = "Nao definido";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub waiting: usize,
    pub in_service: usize,
    pub done: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PerformanceBadge {
    Excelente,
    Bom,
    Regular,
}

impl PerformanceBadge {
    /// Badge for the percentage of a worker's tickets that were rated.
    pub fn for_rated_percent(percent: u32) -> Self {
        match percent {
            90.. => PerformanceBadge::Excelente,
            70..=89 => PerformanceBadge::Bom,
            _ => PerformanceBadge::Regular,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPerformance {
    pub worker: String,
    pub served: usize,
    pub average_duration_sec: u64,
    pub rated_percent: u32,
    pub badge: PerformanceBadge,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HourlyCount {
    /// `08h` style label
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub status: StatusCounts,
    pub completed_today: usize,
    pub average_wait_min: u64,
    pub average_duration_sec: u64,
    pub satisfaction_percent: u32,
    pub workers: Vec<WorkerPerformance>,
    pub waiting_by_service: BTreeMap<String, usize>,
    pub hourly: Vec<HourlyCount>,
    pub daily: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    pub department: Department,
    pub waiting: usize,
    pub served: usize,
    pub average_duration_sec: u64,
}

pub fn dashboard_stats(doc: &Document, now: DateTime<Utc>) -> DashboardStats {
    let today = now.date_naive();

    let waiting_minutes: Vec<u64> = doc
        .queue
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting)
        .map(|t| (now - t.created_at).num_minutes().max(0) as u64)
        .collect();

    let scores: Vec<f64> = doc
        .history
        .iter()
        .filter_map(|t| t.rating.as_ref())
        .map(|r| r.score)
        .filter(|s| s.is_finite())
        .collect();
    let satisfaction = mean_f64(&scores).map(|avg| (avg / 5.0 * 100.0).round() as u32);

    let mut waiting_by_service = BTreeMap::new();
    for ticket in doc.queue.iter().filter(|t| t.status == TicketStatus::Waiting) {
        *waiting_by_service.entry(ticket.service.clone()).or_insert(0) += 1;
    }

    DashboardStats {
        status: StatusCounts {
            waiting: doc.count_by_status(TicketStatus::Waiting),
            in_service: doc.count_by_status(TicketStatus::InService),
            done: doc.count_by_status(TicketStatus::Done),
        },
        completed_today: doc
            .history
            .iter()
            .filter(|t| completed_on(t, today))
            .count(),
        average_wait_min: mean(&waiting_minutes),
        average_duration_sec: mean(&positive_durations(doc.history.iter())),
        satisfaction_percent: satisfaction.unwrap_or(0),
        workers: worker_performance(&doc.history),
        waiting_by_service,
        hourly: hourly_completions(&doc.history),
        daily: daily_completions(&doc.history, now, DAILY_WINDOW),
    }
}

/// Queue figures for a single department, as shown on a worker's dashboard.
pub fn department_stats(doc: &Document, department: Department) -> DepartmentStats {
    let served: Vec<&Ticket> = doc
        .history
        .iter()
        .filter(|t| t.department == department)
        .collect();

    DepartmentStats {
        department,
        waiting: doc.waiting_in(department),
        served: served.len(),
        average_duration_sec: mean(&positive_durations(served.into_iter())),
    }
}

/// Per-worker counts in order of first appearance in `history`.
pub fn worker_performance(history: &[Ticket]) -> Vec<WorkerPerformance> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, (usize, Vec<u64>, usize)> = BTreeMap::new();

    for ticket in history {
        let name = ticket
            .attended_by
            .clone()
            .unwrap_or_else(|| UNASSIGNED_WORKER.to_string());
        let entry = grouped.entry(name.clone()).or_insert_with(|| {
            order.push(name);
            (0, Vec::new(), 0)
        });
        entry.0 += 1;
        if let Some(duration) = ticket.service_duration_sec.filter(|d| *d > 0) {
            entry.1.push(duration);
        }
        if ticket.rating.is_some() {
            entry.2 += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|worker| {
            let (served, durations, rated) = grouped.remove(&worker)?;
            let rated_percent = ((rated as f64 / served as f64) * 100.0).round() as u32;
            Some(WorkerPerformance {
                worker,
                served,
                average_duration_sec: mean(&durations),
                rated_percent,
                badge: PerformanceBadge::for_rated_percent(rated_percent),
            })
        })
        .collect()
}

/// Completions per hour from `FIRST_HOUR` to `LAST_HOUR` inclusive.
pub fn hourly_completions(history: &[Ticket]) -> Vec<HourlyCount> {
    (FIRST_HOUR..=LAST_HOUR)
        .map(|hour| HourlyCount {
            label: format!("{:02}h", hour),
            count: history
                .iter()
                .filter_map(|t| t.completed_at)
                .filter(|at| at.hour() == hour)
                .count(),
        })
        .collect()
}

/// Completions per day for the `days` days ending today, oldest first.
pub fn daily_completions(history: &[Ticket], now: DateTime<Utc>, days: u32) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .map(|back| {
            let date = (now - Duration::days(i64::from(back))).date_naive();
            DailyCount {
                date,
                count: history.iter().filter(|t| completed_on(t, date)).count(),
            }
        })
        .collect()
}

fn completed_on(ticket: &Ticket, date: NaiveDate) -> bool {
    ticket.completed_at.is_some_and(|at| at.date_naive() == date)
}

fn positive_durations<'a>(tickets: impl Iterator<Item = &'a Ticket>) -> Vec<u64> {
    tickets
        .filter_map(|t| t.service_duration_sec)
        .filter(|d| *d > 0)
        .collect()
}

/// Rounded mean; zero for an empty slice.
fn mean(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().sum();
    (sum as f64 / values.len() as f64).round() as u64
}

fn mean_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
