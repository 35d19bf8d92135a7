pub use std::{sync::Arc, time::Duration};

pub use anyhow::Context;
pub use chrono::{
  DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
  TimeDelta, TimeZone, Utc,
};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait,
  QueryFilter, QueryOrder, QuerySelect, Set,
};
pub use tokio::time;
pub use tracing::{debug, error, info, warn};
pub use uuid::Uuid;

pub use crate::error::{Credentials, Error, Result};
