//! Screening enrichment.
//!
//! A screening id only names a slot; the mail needs the cinema, the hall name
//! and the movie, each owned by a different upstream. [`ScreeningAggregator`]
//! resolves the slot, fans out the three lookups concurrently and either
//! returns a fully populated [`Screening`] or a single error.

mod grpc;

pub use grpc::{GrpcScreeningUpstream, MOVIE_FIELDS, SCREENING_FIELDS};

use crate::models::{Cinema, Coordinates, MovieInfo, Screening, ScreeningSlot};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use stream_worker::{Context, ServiceError, classify};
use tokio::task::JoinSet;
use tracing::{debug, instrument};
use tzf_rs::DefaultFinder;

/// The upstream services a screening is assembled from.
///
/// Every call is governed by `ctx`; implementations should derive their
/// transport timeouts from its remaining time.
#[async_trait]
pub trait ScreeningUpstream: Send + Sync {
    async fn screening(&self, ctx: &Context, screening_id: i64) -> Result<ScreeningSlot, ServiceError>;

    async fn cinema(&self, ctx: &Context, cinema_id: i32) -> Result<Cinema, ServiceError>;

    /// Must resolve to exactly one hall, otherwise `NotFound`.
    async fn hall_name(&self, ctx: &Context, hall_id: i32) -> Result<String, ServiceError>;

    async fn movie(&self, ctx: &Context, movie_id: i32) -> Result<MovieInfo, ServiceError>;
}

/// What the mail service needs from enrichment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreeningLookup: Send + Sync {
    async fn screening_info(&self, ctx: &Context, screening_id: i64) -> Result<Screening, ServiceError>;
}

/// Maps cinema coordinates to the zone its screenings are announced in.
pub trait TimezoneLookup: Send + Sync {
    fn timezone(&self, coordinates: Coordinates) -> Result<Tz, ServiceError>;
}

/// Offline coordinate to IANA zone lookup.
pub struct TzfTimezoneLookup {
    finder: DefaultFinder,
}

impl TzfTimezoneLookup {
    /// Loads the bundled boundary data; build once and share.
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfTimezoneLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneLookup for TzfTimezoneLookup {
    fn timezone(&self, coordinates: Coordinates) -> Result<Tz, ServiceError> {
        resolve_zone(self.finder.get_tz_name(coordinates.longitude, coordinates.latitude))
    }
}

/// An empty or unknown zone name is an internal error.
pub fn resolve_zone(name: &str) -> Result<Tz, ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::internal("no timezone found for cinema coordinates"));
    }
    name.parse::<Tz>()
        .map_err(|e| ServiceError::internal(format!("unknown timezone '{name}': {e}")))
}

/// Run `fut` under `ctx` and classify whatever comes out of it.
async fn governed<F, T>(ctx: &Context, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match ctx.run(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(classify(ctx, err)),
        Err(ctx_err) => Err(ctx_err.into()),
    }
}

enum Part {
    Cinema(Cinema),
    Hall(String),
    Movie(MovieInfo),
}

/// Wait for every lookup. The first error to complete wins; later results
/// are discarded.
async fn collect(
    mut lookups: JoinSet<Result<Part, ServiceError>>,
) -> Result<(Cinema, String, MovieInfo), ServiceError> {
    let mut first_error = None;
    let (mut cinema, mut hall_name, mut movie) = (None, None, None);

    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok(Ok(Part::Cinema(part))) => cinema = Some(part),
            Ok(Ok(Part::Hall(part))) => hall_name = Some(part),
            Ok(Ok(Part::Movie(part))) => movie = Some(part),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                first_error.get_or_insert(ServiceError::internal(format!("lookup task failed: {join_err}")));
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    match (cinema, hall_name, movie) {
        (Some(cinema), Some(hall_name), Some(movie)) => Ok((cinema, hall_name, movie)),
        _ => Err(ServiceError::internal("screening lookup finished incomplete")),
    }
}

pub struct ScreeningAggregator<U, T = TzfTimezoneLookup> {
    upstream: Arc<U>,
    timezones: T,
}

impl<U, T> ScreeningAggregator<U, T>
where
    U: ScreeningUpstream + 'static,
    T: TimezoneLookup,
{
    pub fn new(upstream: Arc<U>, timezones: T) -> Self {
        Self { upstream, timezones }
    }

    /// Build the enriched screening for `screening_id`.
    ///
    /// The slot is resolved first since it carries the ids of everything else.
    /// If `ctx` is cancelled or expires while lookups are outstanding, this
    /// returns at once and the lookups are aborted.
    #[instrument(skip(self, ctx))]
    pub async fn aggregate(&self, ctx: &Context, screening_id: i64) -> Result<Screening, ServiceError> {
        let slot = governed(ctx, self.upstream.screening(ctx, screening_id)).await?;
        debug!(
            cinema_id = slot.cinema_id,
            hall_id = slot.hall_id,
            movie_id = slot.movie_id,
            "Resolved screening slot"
        );

        let mut lookups = JoinSet::new();
        {
            let (upstream, ctx) = (Arc::clone(&self.upstream), ctx.clone());
            let cinema_id = slot.cinema_id;
            lookups.spawn(async move { upstream.cinema(&ctx, cinema_id).await.map(Part::Cinema) });
        }
        {
            let (upstream, ctx) = (Arc::clone(&self.upstream), ctx.clone());
            let hall_id = slot.hall_id;
            lookups.spawn(async move { upstream.hall_name(&ctx, hall_id).await.map(Part::Hall) });
        }
        {
            let (upstream, ctx) = (Arc::clone(&self.upstream), ctx.clone());
            let movie_id = slot.movie_id;
            lookups.spawn(async move { upstream.movie(&ctx, movie_id).await.map(Part::Movie) });
        }

        // dropping the set on cancellation aborts whatever is still running
        let (cinema, hall_name, movie) = governed(ctx, collect(lookups)).await?;

        let zone = self.timezones.timezone(cinema.coordinates)?;
        let start = DateTime::parse_from_rfc3339(&slot.start_time)
            .map_err(|e| {
                ServiceError::internal(format!("invalid screening start time '{}': {e}", slot.start_time))
            })?
            .with_timezone(&zone);

        Ok(Screening {
            start_time: start.format("%H:%M").to_string(),
            start_date: start.format("%d.%m").to_string(),
            movie_name: movie.title,
            movie_poster_url: movie.poster_url,
            cinema,
            hall_name,
        })
    }
}

#[async_trait]
impl<U, T> ScreeningLookup for ScreeningAggregator<U, T>
where
    U: ScreeningUpstream + 'static,
    T: TimezoneLookup,
{
    async fn screening_info(&self, ctx: &Context, screening_id: i64) -> Result<Screening, ServiceError> {
        self.aggregate(ctx, screening_id).await
    }
}
