//! Read-only share links.
//!
//! A link lists record ids per family:
//! `{origin}/shared?trips=a,b&accommodations=c&budgets=d`. Whoever opens it
//! sees those records without signing in.

use futures::future::try_join_all;
use livebus_core::{DocumentStore, Filter, PlannerResult};
use tracing::debug;

use crate::kind::Record;
use crate::repository::{decode, Saved};
use crate::{Accommodation, Budget, Trip};

/// Most ids one membership query may carry.
pub const IDS_PER_QUERY: usize = 10;

const SHARED_PATH: &str = "/shared";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareSelection {
    pub trips: Vec<String>,
    pub accommodations: Vec<String>,
    pub budgets: Vec<String>,
}

impl ShareSelection {
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.accommodations.is_empty() && self.budgets.is_empty()
    }

    fn groups(&self) -> [(&'static str, &[String]); 3] {
        [
            ("trips", self.trips.as_slice()),
            ("accommodations", self.accommodations.as_slice()),
            ("budgets", self.budgets.as_slice()),
        ]
    }

    /// Build the share url. Empty groups are left out.
    pub fn to_url(&self, origin: &str) -> String {
        let query: Vec<String> = self
            .groups()
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, ids)| {
                let encoded: Vec<String> = ids.iter().map(|id| urlencoding::encode(id).into_owned()).collect();
                format!("{}={}", name, encoded.join(","))
            })
            .collect();

        let base = format!("{}{}", origin.trim_end_matches('/'), SHARED_PATH);
        if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query.join("&"))
        }
    }

    /// Parse a share url or bare query string. Unknown parameters and
    /// undecodable ids are ignored.
    pub fn parse(url: &str) -> Self {
        let query = match url.split_once('?') {
            Some((_, query)) => query,
            None => url,
        };
        let query = query.split('#').next().unwrap_or_default();

        let mut selection = Self::default();
        for pair in query.split('&') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let target = match name {
                "trips" => &mut selection.trips,
                "accommodations" => &mut selection.accommodations,
                "budgets" => &mut selection.budgets,
                _ => continue,
            };
            target.extend(
                value
                    .split(',')
                    .filter_map(|id| urlencoding::decode(id).ok())
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty()),
            );
        }
        selection
    }
}

/// Records a share link points at, in link order.
#[derive(Debug, Clone, Default)]
pub struct SharedView {
    pub trips: Vec<Saved<Trip>>,
    pub accommodations: Vec<Saved<Accommodation>>,
    pub budgets: Vec<Saved<Budget>>,
}

/// Fetch every record in `selection`. Ids that no longer exist are skipped.
pub async fn load_shared(store: &dyn DocumentStore, selection: &ShareSelection) -> PlannerResult<SharedView> {
    let (trips, accommodations, budgets) = futures::try_join!(
        fetch::<Trip>(store, &selection.trips),
        fetch::<Accommodation>(store, &selection.accommodations),
        fetch::<Budget>(store, &selection.budgets),
    )?;
    Ok(SharedView {
        trips,
        accommodations,
        budgets,
    })
}

async fn fetch<R: Record>(store: &dyn DocumentStore, ids: &[String]) -> PlannerResult<Vec<Saved<R>>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let collection = R::KIND.collection();

    let batches = try_join_all(ids.chunks(IDS_PER_QUERY).map(|chunk| async move {
        let filter = Filter::ids(chunk.iter().cloned());
        store.query(collection, &filter).await
    }))
    .await?;

    let mut found: Vec<Saved<R>> = batches.into_iter().flatten().map(decode).collect();
    found.sort_by_key(|saved| ids.iter().position(|id| *id == saved.id).unwrap_or(usize::MAX));
    found.dedup_by(|a, b| a.id == b.id);
    debug!(collection, requested = ids.len(), found = found.len(), "shared records loaded");
    Ok(found)
}
