//! Run-level metric aggregation.

use fleet_core::{round6, JobState};
use fleet_events::RunMetrics;

use crate::entities::{Job, Robot};

/// Compute the fleet metrics recorded once at run end.
///
/// `on_time_rate` is the fraction of *all* jobs that completed at or before
/// their deadline; `avg_completion_time` averages `completed − created` over
/// completed jobs only; `max_lateness` is over clamped lateness of completed
/// jobs.  Float metrics are rounded to 6 decimals.
pub fn compute_metrics(jobs: &[Job], robots: &[Robot]) -> RunMetrics {
    let total_jobs = jobs.len() as u64;
    let completed: Vec<&Job> = jobs.iter().filter(|j| j.state == JobState::Completed).collect();
    let completed_jobs = completed.len() as u64;
    let failed_jobs = jobs.iter().filter(|j| j.state == JobState::Failed).count() as u64;

    let on_time = completed
        .iter()
        .filter(|j| j.completed_sim_ts.unwrap_or(0) <= j.deadline_ts)
        .count() as f64;
    let on_time_rate = if total_jobs > 0 {
        on_time / total_jobs as f64
    } else {
        0.0
    };

    let avg_completion_time = if completed.is_empty() {
        0.0
    } else {
        let sum: f64 = completed
            .iter()
            .map(|j| (j.completed_sim_ts.unwrap_or(0) - j.created_sim_ts) as f64)
            .sum();
        sum / completed.len() as f64
    };

    let max_lateness = completed
        .iter()
        .map(|j| j.lateness_clamped())
        .fold(0.0_f64, f64::max);

    let total_distance: f64 = robots.iter().map(|r| r.distance_traveled).sum();

    RunMetrics {
        on_time_rate:        round6(on_time_rate),
        total_distance:      round6(total_distance),
        avg_completion_time: round6(avg_completion_time),
        max_lateness:        round6(max_lateness),
        completed_jobs,
        failed_jobs,
        total_jobs,
    }
}
