//! Accuracy improvement over fixed calendar windows.
//!
//! Every window pair compares a period with the one right before it:
//! today vs yesterday, this week vs last week (weeks start on Monday) and
//! this month vs last month. Boundaries are local midnights in the offset of
//! the `now` instant the caller passes in.

use sea_orm::sea_query::Expr;
use serde::Serialize;

use crate::{
  entity::{performance, user},
  prelude::*,
};

/// Upper bound of a [`Window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
  /// Exclusive
  Before(DateTime<Utc>),
  /// Inclusive
  Through(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub start: DateTime<Utc>,
  pub end: End,
}

impl Window {
  fn before(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end: End::Before(end) }
  }

  fn through(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end: End::Through(end) }
  }

  #[cfg(test)]
  fn contains(&self, at: DateTime<Utc>) -> bool {
    at >= self.start
      && match self.end {
        End::Before(end) => at < end,
        End::Through(end) => at <= end,
      }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<T> {
  pub current: T,
  pub previous: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
  pub day: Pair<Window>,
  pub week: Pair<Window>,
  pub month: Pair<Window>,
}

/// Wall clock time in `offset` as an UTC instant
pub fn local_to_utc(
  offset: FixedOffset,
  local: NaiveDateTime,
) -> DateTime<Utc> {
  let shift = TimeDelta::seconds(offset.local_minus_utc().into());
  Utc.from_utc_datetime(&(local - shift))
}

fn midnight(offset: FixedOffset, date: NaiveDate) -> DateTime<Utc> {
  local_to_utc(offset, date.and_time(NaiveTime::MIN))
}

impl Windows {
  pub fn at(now: DateTime<FixedOffset>) -> Self {
    let offset = *now.offset();
    let today = now.date_naive();
    let now = now.with_timezone(&Utc);

    let start_of_today = midnight(offset, today);
    let day = Pair {
      current: Window::before(
        start_of_today,
        midnight(offset, today + Days::new(1)),
      ),
      previous: Window::before(
        midnight(offset, today - Days::new(1)),
        start_of_today,
      ),
    };

    let monday =
      today - Days::new(today.weekday().num_days_from_monday().into());
    let start_of_week = midnight(offset, monday);
    let week = Pair {
      current: Window::through(start_of_week, now),
      previous: Window::before(
        midnight(offset, monday - Days::new(7)),
        start_of_week,
      ),
    };

    let first = today - Days::new(today.day0().into());
    let last_of_previous = first - Days::new(1);
    let previous_first =
      last_of_previous - Days::new(last_of_previous.day0().into());
    let start_of_month = midnight(offset, first);
    let month = Pair {
      current: Window::through(start_of_month, now),
      previous: Window::through(
        midnight(offset, previous_first),
        start_of_month - TimeDelta::milliseconds(1),
      ),
    };

    Self { day, week, month }
  }
}

/// Summed shots of one user over one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodAggregate {
  pub made: i64,
  pub attempted: i64,
}

impl PeriodAggregate {
  pub fn new(made: i64, attempted: i64) -> Self {
    Self { made, attempted }
  }

  pub fn accuracy(&self) -> Option<f64> {
    (self.attempted > 0).then(|| self.made as f64 / self.attempted as f64)
  }
}

/// Signed percentage change of accuracy from `previous` to `current`.
///
/// `None` when either period has no attempts, or when previous accuracy is
/// zero and the ratio has no finite value.
pub fn improvement(
  current: PeriodAggregate,
  previous: PeriodAggregate,
) -> Option<f64> {
  let current = current.accuracy()?;
  let previous = previous.accuracy()?;
  if previous == 0.0 {
    return None;
  }
  Some((current - previous) / previous * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
  pub improvement_daily: Option<f64>,
  pub improvement_weekly: Option<f64>,
  pub improvement_monthly: Option<f64>,
}

impl Improvement {
  pub fn from_aggregates(
    day: Pair<PeriodAggregate>,
    week: Pair<PeriodAggregate>,
    month: Pair<PeriodAggregate>,
  ) -> Self {
    Self {
      improvement_daily: improvement(day.current, day.previous),
      improvement_weekly: improvement(week.current, week.previous),
      improvement_monthly: improvement(month.current, month.previous),
    }
  }
}

pub struct Stats<'a> {
  db: &'a DatabaseConnection,
  timeout: Duration,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection, timeout: Duration) -> Self {
    Self { db, timeout }
  }

  pub async fn aggregate(
    &self,
    user_id: Uuid,
    window: Window,
  ) -> Result<PeriodAggregate> {
    let query = performance::Entity::find()
      .select_only()
      .column_as(Expr::col(performance::Column::ShotsMade).sum(), "made")
      .column_as(
        Expr::col(performance::Column::ShotsAttempted).sum(),
        "attempted",
      )
      .filter(performance::Column::UserId.eq(user_id))
      .filter(performance::Column::Date.gte(window.start));

    let query = match window.end {
      End::Before(end) => query.filter(performance::Column::Date.lt(end)),
      End::Through(end) => query.filter(performance::Column::Date.lte(end)),
    };

    let sums: Option<(Option<i64>, Option<i64>)> =
      query.into_tuple().one(self.db).await?;
    let (made, attempted) = sums.unwrap_or_default();

    Ok(PeriodAggregate::new(made.unwrap_or(0), attempted.unwrap_or(0)))
  }

  async fn pair(
    &self,
    user_id: Uuid,
    windows: Pair<Window>,
  ) -> Result<Pair<PeriodAggregate>> {
    let (current, previous) = tokio::try_join!(
      self.aggregate(user_id, windows.current),
      self.aggregate(user_id, windows.previous),
    )?;
    Ok(Pair { current, previous })
  }

  pub async fn improvement(
    &self,
    user_id: Uuid,
    now: DateTime<FixedOffset>,
  ) -> Result<Improvement> {
    let compute = async {
      user::Entity::find_by_id(user_id)
        .one(self.db)
        .await?
        .ok_or(Error::UserNotFound)?;

      let windows = Windows::at(now);
      let (day, week, month) = tokio::try_join!(
        self.pair(user_id, windows.day),
        self.pair(user_id, windows.week),
        self.pair(user_id, windows.month),
      )?;

      debug!(%user_id, ?day, ?week, ?month, "Aggregated shot windows");
      Ok::<_, Error>(Improvement::from_aggregates(day, week, month))
    };

    time::timeout(self.timeout, compute)
      .await
      .map_err(|_| Error::Timeout(self.timeout))?
  }
}
