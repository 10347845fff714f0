// backend/src/db/mod.rs

use sqlx::{FromRow, Pool, Postgres};
use tracing::info;

use crate::engine::InMemoryStaffDirectory;
use crate::models::StaffMember;

pub async fn connect(database_url: &str) -> anyhow::Result<Pool<Postgres>> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("connected to PostgreSQL");
    Ok(pool)
}

#[derive(Debug, FromRow)]
struct StaffRow {
    staff_id: i64,
    full_name: String,
    department: String,
    max_weekly_hours: Option<i32>,
}

impl From<StaffRow> for StaffMember {
    fn from(r: StaffRow) -> Self {
        StaffMember {
            staff_id: r.staff_id,
            full_name: r.full_name,
            department: r.department,
            contracted_weekly_hours: r.max_weekly_hours.map(f64::from),
        }
    }
}

/// Loads enabled staff into `directory`, using the unit name as the home
/// department. Returns how many entries were upserted.
pub async fn load_staff_directory(
    pool: &Pool<Postgres>,
    directory: &InMemoryStaffDirectory,
) -> anyhow::Result<usize> {
    let rows = sqlx::query_as::<_, StaffRow>(
        r#"
        SELECT s.staff_id, s.full_name, u.name AS department, s.max_weekly_hours
          FROM public.staffs s
          JOIN public.units u ON u.unit_id = s.unit_id
         WHERE s.enabled
         ORDER BY s.staff_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let n = directory.upsert_many(rows.into_iter().map(StaffMember::from));
    info!(staff = n, "staff directory loaded");
    Ok(n)
}
