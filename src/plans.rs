//! Reading plans, per-day completion and the reading streak.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};

pub const PROGRESS_KEY: &str = "readingProgress";
pub const STREAK_KEY: &str = "readingStreak";

#[derive(Debug, PartialEq, Eq)]
pub struct ReadingPlan {
  pub id: &'static str,
  pub title: &'static str,
  pub description: &'static str,
  /// One entry per day
  pub passages: &'static [&'static str],
}

impl ReadingPlan {
  pub fn duration_days(&self) -> usize {
    self.passages.len()
  }
}

pub const READING_PLANS: &[ReadingPlan] = &[
  ReadingPlan {
    id: "gospels-30-days",
    title: "Gospels in 30 Days",
    description: "Read through Matthew, Mark, Luke, and John in one month.",
    passages: &[
      "Matthew 1-9",
      "Matthew 10-15",
      "Matthew 16-22",
      "Matthew 23-28",
      "Mark 1-4",
      "Mark 5-8",
      "Mark 9-12",
      "Mark 13-16",
      "Luke 1-3",
      "Luke 4-6",
      "Luke 7-9",
      "Luke 10-12",
      "Luke 13-15",
      "Luke 16-18",
      "Luke 19-21",
      "Luke 22-24",
      "John 1-3",
      "John 4-6",
      "John 7-8",
      "John 9-10",
      "John 11-12",
      "John 13-15",
      "John 16-18",
      "John 19-21",
      "Review: Matthew",
      "Review: Mark",
      "Review: Luke",
      "Review: John",
      "Reflect on Parables",
      "Reflect on Miracles",
    ],
  },
  ReadingPlan {
    id: "proverbs-by-theme",
    title: "Proverbs by Theme",
    description: "A 1-week study of key themes in the book of Proverbs.",
    passages: &[
      "Wisdom vs. Folly (Prov 1, 9)",
      "The Power of Words (Prov 12, 18)",
      "Diligence & Sloth (Prov 6, 26)",
      "Friendship (Prov 17, 27)",
      "Wealth & Poverty (Prov 10, 22)",
      "Humility & Pride (Prov 11, 16)",
      "Family & Children (Prov 4, 22:6)",
    ],
  },
  ReadingPlan {
    id: "psalms-of-praise",
    title: "Psalms of Praise",
    description: "Spend 10 days meditating on psalms of praise and worship.",
    passages: &[
      "Psalm 8",
      "Psalm 19",
      "Psalm 29",
      "Psalm 33",
      "Psalm 66",
      "Psalm 95",
      "Psalm 100",
      "Psalm 103",
      "Psalm 148",
      "Psalm 150",
    ],
  },
];

pub fn plan(id: &str) -> Option<&'static ReadingPlan> {
  READING_PLANS.iter().find(|p| p.id == id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanProgress {
  /// 0-based day index -> completion time
  completed_days: BTreeMap<usize, DateTime<Utc>>,
}

/// Consecutive days with at least one completed plan day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
  pub streak: u32,
  pub last_read_date: Option<NaiveDate>,
}

impl Streak {
  /// The streak after a completion on `today`.
  ///
  /// A second completion on the same day changes nothing, a completion the day
  /// after the last one extends the streak, anything else starts over at 1.
  pub fn record(self, today: NaiveDate) -> Self {
    let streak = match self.last_read_date {
      Some(last) if last == today => return self,
      Some(last) if last.succ_opt() == Some(today) => self.streak + 1,
      _ => 1,
    };
    Self {
      streak,
      last_read_date: Some(today),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOverview {
  pub plan: &'static ReadingPlan,
  /// 0-based indices of completed days
  pub completed: BTreeSet<usize>,
}

impl PlanOverview {
  /// Completed share of the plan, rounded to a whole percent
  pub fn percentage(&self) -> u8 {
    let total = self.plan.duration_days();
    if total == 0 {
      return 0;
    }
    ((200 * self.completed.len() + total) / (2 * total)).min(100) as u8
  }
}

/// Plan progress and streak in the app-state database
pub struct ReadingPlans {
  db: Arc<Database>,
}

impl ReadingPlans {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  pub fn overview(&self) -> Result<Vec<PlanOverview>> {
    let progress = self.progress()?;
    Ok(
      READING_PLANS
        .iter()
        .map(|plan| overview_of(plan, &progress))
        .collect(),
    )
  }

  pub fn plan_overview(&self, plan_id: &str) -> Result<PlanOverview> {
    Ok(overview_of(find(plan_id)?, &self.progress()?))
  }

  /// Current streak. A streak whose last day is before yesterday is still
  /// reported as stored; it resets on the next completion.
  pub fn streak(&self) -> Result<Streak> {
    Ok(self.db.get_json(STREAK_KEY)?.unwrap_or_default())
  }

  /// Mark a day (0-based) done or not done.
  ///
  /// Only a transition to done advances the streak; undoing a day never lowers it.
  pub fn set_day(
    &self,
    plan_id: &str,
    day: usize,
    done: bool,
    now: DateTime<Local>,
  ) -> Result<PlanOverview> {
    let plan = find(plan_id)?;
    if day >= plan.duration_days() {
      return Err(Error::Invalid(format!(
        "{} has {} days",
        plan.title,
        plan.duration_days()
      )));
    }

    let (progress, newly_done) = self.db.update_json(
      PROGRESS_KEY,
      |progress: &mut BTreeMap<String, PlanProgress>| {
        let entry = progress.entry(plan.id.to_string()).or_default();
        let newly_done = match (done, entry.completed_days.contains_key(&day)) {
          (true, false) => {
            entry.completed_days.insert(day, now.with_timezone(&Utc));
            true
          }
          (false, true) => {
            entry.completed_days.remove(&day);
            false
          }
          _ => false,
        };
        Ok((progress.clone(), newly_done))
      },
    )?;

    if newly_done {
      let streak = self
        .db
        .update_json(STREAK_KEY, |streak: &mut Streak| {
          *streak = streak.record(now.date_naive());
          Ok(*streak)
        })?;
      info!(plan = plan.id, day, streak = streak.streak, "plan day completed");
    }
    Ok(overview_of(plan, &progress))
  }

  /// Flip a day's completion
  pub fn toggle_day(&self, plan_id: &str, day: usize, now: DateTime<Local>) -> Result<PlanOverview> {
    let done = self.plan_overview(plan_id)?.completed.contains(&day);
    self.set_day(plan_id, day, !done, now)
  }

  fn progress(&self) -> Result<BTreeMap<String, PlanProgress>> {
    Ok(self.db.get_json(PROGRESS_KEY)?.unwrap_or_default())
  }
}

fn find(plan_id: &str) -> Result<&'static ReadingPlan> {
  plan(plan_id).ok_or_else(|| {
    let known: Vec<&str> = READING_PLANS.iter().map(|p| p.id).collect();
    Error::NotFound(format!(
      "Unknown reading plan '{}'. Available: {}",
      plan_id,
      known.join(", ")
    ))
  })
}

fn overview_of(plan: &'static ReadingPlan, progress: &BTreeMap<String, PlanProgress>) -> PlanOverview {
  PlanOverview {
    plan,
    completed: progress
      .get(plan.id)
      .map(|p| p.completed_days.keys().copied().collect())
      .unwrap_or_default(),
  }
}
