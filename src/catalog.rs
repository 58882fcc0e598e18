use std::fmt;

use tracing::debug;

use crate::domain::{BoundingBox, Instant, TemporalWindow};
use crate::error::CoregError;
use crate::naming::granule_to_timestamp;

/// Provider session precondition, checked before any catalog request.
pub trait Session: Send + Sync {
    fn authenticated(&self) -> bool;
}

pub trait CatalogClient: Send + Sync {
    /// Granule identifiers for `short_name` intersecting `bbox` within `[start, end]`,
    /// in the order the catalog returned them.
    fn search(
        &self,
        short_name: &str,
        bbox: &BoundingBox,
        start: Instant,
        end: Instant,
    ) -> Result<Vec<String>, CoregError>;
}

/// Opaque catalog identifier of one granule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GranuleId(String);

impl GranuleId {
    pub fn timestamp(&self) -> Result<Instant, CoregError> {
        granule_to_timestamp(&self.0)
    }
}

impl fmt::Display for GranuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct CatalogQuery<'a, S: Session, C: CatalogClient> {
    session: &'a S,
    client: &'a C,
}

impl<'a, S: Session, C: CatalogClient> CatalogQuery<'a, S, C> {
    pub fn new(session: &'a S, client: &'a C) -> Self {
        Self { session, client }
    }

    pub fn ensure_authenticated(&self) -> Result<(), CoregError> {
        if self.session.authenticated() {
            Ok(())
        } else {
            Err(CoregError::Authentication)
        }
    }

    /// Searches over the continuous interval from `start_date start_time` to
    /// `end_date end_time`; see [`TemporalWindow::catalog_interval`].
    pub fn query(
        &self,
        short_name: &str,
        bbox: &BoundingBox,
        window: &TemporalWindow,
    ) -> Result<Vec<GranuleId>, CoregError> {
        self.ensure_authenticated()?;
        let (start, end) = window.catalog_interval();
        debug!(short_name, %bbox, %start, %end, "catalog search");
        let ids = self.client.search(short_name, bbox, start, end)?;
        Ok(ids.into_iter().map(GranuleId).collect())
    }
}

/// Converts every granule to its acquisition instant, keeping catalog order.
/// The first unparseable identifier fails the whole conversion.
pub fn overpass_timestamps(granules: &[GranuleId]) -> Result<Vec<Instant>, CoregError> {
    granules.iter().map(GranuleId::timestamp).collect()
}
