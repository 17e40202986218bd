//! Reference layers stored in PostGIS.

use std::time::Duration;

use aoi::AreaOfInterest;
use async_trait::async_trait;
use ecohub_common::{EcohubError, EcohubResult, ReferenceLayer};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, instrument};

use crate::store::{ReferenceStore, TieBreakPolicy};

/// Table and columns holding one reference layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTable {
    pub table: String,
    pub label_column: String,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}

impl LayerTable {
    pub fn new(table: &str, label_column: &str) -> Self {
        Self {
            table: table.to_string(),
            label_column: label_column.to_string(),
            geometry_column: default_geometry_column(),
        }
    }

    /// Check every identifier before it is interpolated into SQL.
    pub fn validate(&self) -> EcohubResult<()> {
        for ident in [&self.table, &self.label_column, &self.geometry_column] {
            if !is_valid_identifier(ident) {
                return Err(EcohubError::InvalidInput(format!(
                    "Invalid SQL identifier in reference table config: {:?}",
                    ident
                )));
            }
        }
        Ok(())
    }
}

/// Tables for all three reference layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub country: LayerTable,
    pub ecological_zone: LayerTable,
    pub protected_area: LayerTable,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self {
            country: LayerTable::new("country_name", "name"),
            ecological_zone: LayerTable::new("ecological_zone", "gez_name"),
            protected_area: LayerTable::new("protected_areas", "desig_eng"),
        }
    }
}

impl ReferenceTables {
    pub fn for_layer(&self, layer: ReferenceLayer) -> &LayerTable {
        match layer {
            ReferenceLayer::Country => &self.country,
            ReferenceLayer::EcologicalZone => &self.ecological_zone,
            ReferenceLayer::ProtectedArea => &self.protected_area,
        }
    }

    pub fn validate(&self) -> EcohubResult<()> {
        self.country.validate()?;
        self.ecological_zone.validate()?;
        self.protected_area.validate()
    }
}

/// Pool and timeout settings.
#[derive(Debug, Clone)]
pub struct PostgisOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for PostgisOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// PostGIS-backed reference store.
pub struct PostgisReferenceStore {
    pool: PgPool,
    tables: ReferenceTables,
    query_timeout: Duration,
}

impl PostgisReferenceStore {
    /// Connect to the database, failing if it cannot be reached now.
    pub async fn connect(
        database_url: &str,
        tables: ReferenceTables,
        options: PostgisOptions,
    ) -> EcohubResult<Self> {
        tables.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| {
                EcohubError::ReferenceStoreUnavailable(format!("Connection failed: {}", e))
            })?;

        Ok(Self::from_pool(pool, tables, options.query_timeout))
    }

    /// Create a store whose connections are opened on first use.
    pub fn connect_lazy(
        database_url: &str,
        tables: ReferenceTables,
        options: PostgisOptions,
    ) -> EcohubResult<Self> {
        tables.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_lazy(database_url)
            .map_err(|e| {
                EcohubError::ReferenceStoreUnavailable(format!("Invalid database URL: {}", e))
            })?;

        Ok(Self::from_pool(pool, tables, options.query_timeout))
    }

    pub fn from_pool(pool: PgPool, tables: ReferenceTables, query_timeout: Duration) -> Self {
        Self {
            pool,
            tables,
            query_timeout,
        }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }
}

#[async_trait]
impl ReferenceStore for PostgisReferenceStore {
    #[instrument(skip(self, aoi), fields(table = %self.tables.for_layer(layer).table))]
    async fn intersecting_labels(
        &self,
        layer: ReferenceLayer,
        aoi: &AreaOfInterest,
        limit: usize,
        order: TieBreakPolicy,
    ) -> EcohubResult<Vec<String>> {
        let sql = intersects_sql(self.tables.for_layer(layer), order);
        let wkt = aoi.to_wkt();

        let query = sqlx::query_scalar::<_, Option<String>>(&sql)
            .bind(&wkt)
            .bind(limit as i64)
            .fetch_all(&self.pool);

        let rows = tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| {
                EcohubError::TransientIo(format!(
                    "Reference query on {} timed out after {:?}",
                    layer, self.query_timeout
                ))
            })?
            .map_err(map_sqlx_error)?;

        let labels: Vec<String> = rows.into_iter().flatten().collect();
        debug!(layer = %layer, matches = labels.len(), "Reference query complete");
        Ok(labels)
    }

    async fn ping(&self) -> EcohubResult<()> {
        let query = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);
        tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| EcohubError::TransientIo("Reference store ping timed out".into()))?
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Build the intersects query for one layer. `$1` is the AOI as WKT in
/// EPSG:4326, `$2` the row limit.
pub fn intersects_sql(table: &LayerTable, order: TieBreakPolicy) -> String {
    let mut sql = format!(
        "SELECT {label}::text FROM {table} \
         WHERE ST_Intersects(ST_GeomFromText($1, 4326), {geom})",
        label = table.label_column,
        table = table.table,
        geom = table.geometry_column,
    );
    if order == TieBreakPolicy::LargestOverlap {
        sql.push_str(&format!(
            " ORDER BY ST_Area(ST_Intersection(ST_GeomFromText($1, 4326), {geom})) DESC",
            geom = table.geometry_column,
        ));
    }
    sql.push_str(" LIMIT $2");
    sql
}

fn map_sqlx_error(err: sqlx::Error) -> EcohubError {
    match &err {
        sqlx::Error::PoolTimedOut => {
            EcohubError::TransientIo("Timed out acquiring a reference store connection".into())
        }
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            EcohubError::TransientIo(format!("Reference store I/O timeout: {}", err))
        }
        _ => EcohubError::ReferenceStoreUnavailable(format!("Query failed: {}", err)),
    }
}

/// Plain or schema-qualified SQL identifier: `name` or `schema.name`.
fn is_valid_identifier(ident: &str) -> bool {
    let parts: Vec<&str> = ident.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
