use serde::{Deserialize, Deserializer, de};

use crate::{
  entity::{performance, user},
  prelude::*,
  sv::stats,
};

/// Session time as sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDate {
  At(DateTime<Utc>),
  /// Wall clock time without an offset, read in the stats offset
  Local(NaiveDateTime),
}

impl SessionDate {
  const LOCAL_FORMATS: [&'static str; 3] =
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

  /// RFC 3339, a datetime without offset, or a bare `YYYY-MM-DD` date
  pub fn parse(text: &str) -> Option<Self> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
      return Some(Self::At(at.with_timezone(&Utc)));
    }
    for format in Self::LOCAL_FORMATS {
      if let Ok(local) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Self::Local(local));
      }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
      .ok()
      .map(|date| Self::Local(date.and_time(NaiveTime::MIN)))
  }

  pub fn resolve(self, offset: FixedOffset) -> DateTime<Utc> {
    match self {
      Self::At(at) => at,
      Self::Local(local) => stats::local_to_utc(offset, local),
    }
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
  Millis(i64),
  Text(String),
}

/// `null` and `""` mean now, integers are epoch milliseconds
fn lenient_date<'de, D>(
  deserializer: D,
) -> Result<Option<SessionDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let text = match Option::<RawDate>::deserialize(deserializer)? {
    None => return Ok(None),
    Some(RawDate::Millis(ms)) => {
      let at = DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        de::Error::custom(format!("timestamp out of range: {ms}"))
      })?;
      return Ok(Some(SessionDate::At(at)));
    }
    Some(RawDate::Text(text)) => text,
  };

  let text = text.trim();
  if text.is_empty() {
    return Ok(None);
  }
  SessionDate::parse(text)
    .map(Some)
    .ok_or_else(|| de::Error::custom(format!("invalid date: {text:?}")))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
  pub user_id: Uuid,
  pub shots_made: i32,
  pub shots_attempted: i32,
  /// Session time, now when absent
  #[serde(default, deserialize_with = "lenient_date")]
  pub date: Option<SessionDate>,
}

impl NewRecord {
  fn validate(&self) -> Result<()> {
    if self.shots_made < 0 || self.shots_attempted < 0 {
      return Err(Error::invalid("Shot counts must not be negative."));
    }
    if self.shots_made > self.shots_attempted {
      return Err(Error::invalid(
        "shotsMade must not exceed shotsAttempted.",
      ));
    }
    Ok(())
  }
}

pub struct Performance<'a> {
  db: &'a DatabaseConnection,
  offset: FixedOffset,
}

impl<'a> Performance<'a> {
  pub fn new(db: &'a DatabaseConnection, offset: FixedOffset) -> Self {
    Self { db, offset }
  }

  pub async fn add(&self, record: NewRecord) -> Result<performance::Model> {
    record.validate()?;

    user::Entity::find_by_id(record.user_id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    let date =
      record.date.map_or_else(Utc::now, |date| date.resolve(self.offset));
    let model = performance::ActiveModel {
      id: Set(Uuid::new_v4()),
      user_id: Set(record.user_id),
      shots_made: Set(record.shots_made),
      shots_attempted: Set(record.shots_attempted),
      date: Set(date),
    }
    .insert(self.db)
    .await?;

    debug!(
      user_id = %model.user_id,
      made = model.shots_made,
      attempted = model.shots_attempted,
      "Session logged"
    );
    Ok(model)
  }

  /// Newest first
  pub async fn by_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<performance::Model>> {
    let sessions = performance::Entity::find()
      .filter(performance::Column::UserId.eq(user_id))
      .order_by_desc(performance::Column::Date)
      .all(self.db)
      .await?;
    Ok(sessions)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing;

  fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
  }

  fn instant(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
  }

  /// Deserializes `date` and resolves it in UTC+02:00
  fn date_of(raw: &str) -> Option<DateTime<Utc>> {
    let body = format!(
      r#"{{"userId":"{}","shotsMade":1,"shotsAttempted":2,"date":{raw}}}"#,
      Uuid::nil()
    );
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    json::from_str::<NewRecord>(&body)
      .unwrap()
      .date
      .map(|date| date.resolve(offset))
  }

  fn record(user_id: Uuid, made: i32, attempted: i32) -> NewRecord {
    NewRecord {
      user_id,
      shots_made: made,
      shots_attempted: attempted,
      date: None,
    }
  }

  #[test]
  fn test_lenient_dates() {
    assert_eq!(
      date_of(r#""2026-10-14T10:00:00Z""#),
      Some(instant("2026-10-14T10:00:00Z"))
    );
    assert_eq!(
      date_of(r#""2026-10-14T10:00:00.250+05:00""#),
      Some(instant("2026-10-14T05:00:00.250Z"))
    );
    assert_eq!(
      date_of(r#""2026-10-14T10:00:00""#),
      Some(instant("2026-10-14T08:00:00Z"))
    );
    assert_eq!(
      date_of(r#""2026-10-14 10:00:00""#),
      Some(instant("2026-10-14T08:00:00Z"))
    );
    assert_eq!(
      date_of(r#""2026-10-14""#),
      Some(instant("2026-10-13T22:00:00Z"))
    );
    assert_eq!(
      date_of("1760400000000"),
      Some(instant("2025-10-14T00:00:00Z"))
    );
    assert_eq!(date_of(r#""""#), None);
    assert_eq!(date_of("null"), None);
  }

  #[test]
  fn test_garbage_date_rejected() {
    let body = format!(
      r#"{{"userId":"{}","shotsMade":1,"shotsAttempted":2,"date":"soon"}}"#,
      Uuid::nil()
    );

    assert!(json::from_str::<NewRecord>(&body).is_err());
  }

  #[tokio::test]
  async fn test_add_defaults_date_to_now() {
    let db = testing::db().await;
    let user = testing::user(&db, "ann@example.com").await;

    let before = Utc::now();
    let model =
      Performance::new(&db, utc()).add(record(user, 4, 10)).await.unwrap();
    let after = Utc::now();

    assert_eq!(model.user_id, user);
    assert_eq!((model.shots_made, model.shots_attempted), (4, 10));
    assert!(model.date >= before && model.date <= after);
  }

  #[tokio::test]
  async fn test_add_keeps_given_date() {
    let db = testing::db().await;
    let user = testing::user(&db, "ann@example.com").await;
    let date = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let model = Performance::new(&db, utc())
      .add(NewRecord {
        date: Some(SessionDate::At(date)),
        ..record(user, 1, 1)
      })
      .await
      .unwrap();

    assert_eq!(model.date, date);
  }

  #[tokio::test]
  async fn test_add_reads_local_date_in_offset() {
    let db = testing::db().await;
    let user = testing::user(&db, "ann@example.com").await;
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();

    let model = Performance::new(&db, offset)
      .add(NewRecord {
        date: Some(SessionDate::Local(day.and_time(NaiveTime::MIN))),
        ..record(user, 1, 1)
      })
      .await
      .unwrap();

    assert_eq!(model.date, instant("2026-10-13T22:00:00Z"));
  }

  #[tokio::test]
  async fn test_add_rejects_impossible_counts() {
    let db = testing::db().await;
    let user = testing::user(&db, "ann@example.com").await;
    let sv = Performance::new(&db, utc());

    assert!(matches!(
      sv.add(record(user, 11, 10)).await,
      Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
      sv.add(record(user, -1, 10)).await,
      Err(Error::InvalidInput(_))
    ));
    assert!(sv.by_user(user).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_add_unknown_user() {
    let db = testing::db().await;

    let result =
      Performance::new(&db, utc()).add(record(Uuid::new_v4(), 1, 2)).await;

    assert!(matches!(result, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn test_by_user_newest_first() {
    let db = testing::db().await;
    let user = testing::user(&db, "ann@example.com").await;
    let other = testing::user(&db, "bob@example.com").await;
    let sv = Performance::new(&db, utc());

    for day in [3, 1, 2] {
      let date = Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap();
      sv.add(NewRecord {
        date: Some(SessionDate::At(date)),
        ..record(user, 1, 2)
      })
      .await
      .unwrap();
    }
    sv.add(record(other, 1, 1)).await.unwrap();

    let days: Vec<u32> = sv
      .by_user(user)
      .await
      .unwrap()
      .iter()
      .map(|session| session.date.day())
      .collect();

    assert_eq!(days, vec![3, 2, 1]);
  }
}
