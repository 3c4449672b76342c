// PostgreSQL repository implementation
use crate::application::monitoring_repository::{MonitoringRepository, RepoError, StationFilter};
use crate::domain::category::CategoryBand;
use crate::domain::reading::{NewReading, Pollutants, Reading};
use crate::domain::station::{NewStation, Station, StationPatch, StationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const UNIQUE_VIOLATION: &str = "23505";

const STATION_COLUMNS: &str = "id, name, code, station_type, latitude, longitude, province, city, \
     address, is_active, created_at, updated_at";

const READING_COLUMNS: &str = "id, station_id, ispu, pm25, pm10, co, no2, o3, so2, hc, timestamp, created_at";

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    /// Create the schema and seed the default category bands.
    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }
}

fn map_sqlx_error(error: sqlx::Error) -> RepoError {
    match error {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepoError::Duplicate(db.message().to_string())
        }
        other => RepoError::store(other.to_string()),
    }
}

#[derive(sqlx::FromRow)]
struct StationRow {
    id: i64,
    name: String,
    code: String,
    station_type: String,
    latitude: f64,
    longitude: f64,
    province: String,
    city: String,
    address: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
            station_type: row.station_type,
            latitude: row.latitude,
            longitude: row.longitude,
            province: row.province,
            city: row.city,
            address: row.address,
            status: StationStatus::from_active(row.is_active),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    station_id: i64,
    ispu: i32,
    pm25: Option<f64>,
    pm10: Option<f64>,
    co: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
    so2: Option<f64>,
    hc: Option<f64>,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            id: row.id,
            station_id: row.station_id,
            ispu: row.ispu,
            pollutants: Pollutants {
                pm25: row.pm25,
                pm10: row.pm10,
                co: row.co,
                no2: row.no2,
                o3: row.o3,
                so2: row.so2,
                hc: row.hc,
            },
            timestamp: row.timestamp,
            created_at: row.created_at,
            station: None,
            category: None,
            color: None,
        }
    }
}

/// A reading joined with its station; station columns carry an `s_` prefix.
#[derive(sqlx::FromRow)]
struct ReadingWithStationRow {
    #[sqlx(flatten)]
    reading: ReadingRow,
    s_name: String,
    s_code: String,
    s_station_type: String,
    s_latitude: f64,
    s_longitude: f64,
    s_province: String,
    s_city: String,
    s_address: String,
    s_is_active: bool,
    s_created_at: DateTime<Utc>,
    s_updated_at: DateTime<Utc>,
}

impl From<ReadingWithStationRow> for Reading {
    fn from(row: ReadingWithStationRow) -> Self {
        let station = Station {
            id: row.reading.station_id,
            name: row.s_name,
            code: row.s_code,
            station_type: row.s_station_type,
            latitude: row.s_latitude,
            longitude: row.s_longitude,
            province: row.s_province,
            city: row.s_city,
            address: row.s_address,
            status: StationStatus::from_active(row.s_is_active),
            created_at: row.s_created_at,
            updated_at: row.s_updated_at,
        };
        let mut reading = Reading::from(row.reading);
        reading.station = Some(station);
        reading
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    min_value: i32,
    max_value: Option<i32>,
    category: String,
    description: String,
    color: String,
}

impl From<CategoryRow> for CategoryBand {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            min_value: row.min_value,
            max_value: row.max_value,
            category: row.category,
            description: row.description,
            color: row.color,
        }
    }
}

#[async_trait]
impl MonitoringRepository for PostgresRepository {
    async fn list_active_stations(&self) -> Result<Vec<Station>, RepoError> {
        let sql = format!("SELECT {STATION_COLUMNS} FROM stations WHERE is_active ORDER BY name ASC");
        let rows = sqlx::query_as::<_, StationRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Station::from).collect())
    }

    async fn get_station(&self, id: i64) -> Result<Station, RepoError> {
        let sql = format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = $1");
        let row = sqlx::query_as::<_, StationRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_stations_by_province(&self, province: &str) -> Result<Vec<Station>, RepoError> {
        let sql = format!(
            "SELECT {STATION_COLUMNS} FROM stations WHERE province = $1 AND is_active ORDER BY name ASC"
        );
        let rows = sqlx::query_as::<_, StationRow>(&sql)
            .bind(province)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Station::from).collect())
    }

    async fn create_station(&self, station: &NewStation) -> Result<Station, RepoError> {
        let sql = format!(
            "INSERT INTO stations (name, code, station_type, latitude, longitude, province, city, address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {STATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StationRow>(&sql)
            .bind(&station.name)
            .bind(&station.code)
            .bind(&station.station_type)
            .bind(station.latitude)
            .bind(station.longitude)
            .bind(&station.province)
            .bind(&station.city)
            .bind(&station.address)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_station(&self, id: i64, patch: &StationPatch) -> Result<Station, RepoError> {
        let sql = format!(
            "UPDATE stations SET \
                name = COALESCE($2, name), \
                code = COALESCE($3, code), \
                station_type = COALESCE($4, station_type), \
                latitude = COALESCE($5, latitude), \
                longitude = COALESCE($6, longitude), \
                province = COALESCE($7, province), \
                city = COALESCE($8, city), \
                address = COALESCE($9, address), \
                is_active = COALESCE($10, is_active), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {STATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StationRow>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.code.as_deref())
            .bind(patch.station_type.as_deref())
            .bind(patch.latitude)
            .bind(patch.longitude)
            .bind(patch.province.as_deref())
            .bind(patch.city.as_deref())
            .bind(patch.address.as_deref())
            .bind(patch.status.map(StationStatus::is_active))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn soft_delete_station(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE stations SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_stations(&self, filter: StationFilter) -> Result<i64, RepoError> {
        let sql = match filter {
            StationFilter::All => "SELECT COUNT(*) FROM stations",
            StationFilter::Active => "SELECT COUNT(*) FROM stations WHERE is_active",
        };
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_active_provinces(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT province FROM stations \
             WHERE is_active AND province <> '' \
             ORDER BY province",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn latest_reading_per_station(&self) -> Result<Vec<Reading>, RepoError> {
        let rows = sqlx::query_as::<_, ReadingWithStationRow>(
            "SELECT latest.*, \
                s.name AS s_name, s.code AS s_code, s.station_type AS s_station_type, \
                s.latitude AS s_latitude, s.longitude AS s_longitude, \
                s.province AS s_province, s.city AS s_city, s.address AS s_address, \
                s.is_active AS s_is_active, s.created_at AS s_created_at, s.updated_at AS s_updated_at \
             FROM ( \
                SELECT DISTINCT ON (station_id) \
                    id, station_id, ispu, pm25, pm10, co, no2, o3, so2, hc, timestamp, created_at \
                FROM air_qualities \
                ORDER BY station_id, timestamp DESC, id DESC \
             ) AS latest \
             INNER JOIN stations s ON s.id = latest.station_id \
             ORDER BY latest.timestamp DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn latest_reading_for_station(&self, station_id: i64) -> Result<Reading, RepoError> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM air_qualities \
             WHERE station_id = $1 \
             ORDER BY timestamp DESC, id DESC \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(station_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn readings_in_range(
        &self,
        station_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, RepoError> {
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM air_qualities \
             WHERE station_id = $1 AND timestamp BETWEEN $2 AND $3 \
             ORDER BY timestamp DESC"
        );
        let rows = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(station_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn insert_reading(
        &self,
        reading: &NewReading,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading, RepoError> {
        let sql = format!(
            "INSERT INTO air_qualities (station_id, ispu, pm25, pm10, co, no2, o3, so2, hc, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {READING_COLUMNS}"
        );
        let p = &reading.pollutants;
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(reading.station_id)
            .bind(reading.ispu)
            .bind(p.pm25)
            .bind(p.pm10)
            .bind(p.co)
            .bind(p.no2)
            .bind(p.o3)
            .bind(p.so2)
            .bind(p.hc)
            .bind(timestamp)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn average_index(&self) -> Result<f64, RepoError> {
        sqlx::query_scalar::<_, f64>("SELECT COALESCE(AVG(ispu), 0)::DOUBLE PRECISION FROM air_qualities")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn max_timestamp(&self) -> Result<Option<DateTime<Utc>>, RepoError> {
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(timestamp) FROM air_qualities")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_category_bands(&self) -> Result<Vec<CategoryBand>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, min_value, max_value, category, description, color \
             FROM ispu_categories \
             ORDER BY min_value ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CategoryBand::from).collect())
    }
}
