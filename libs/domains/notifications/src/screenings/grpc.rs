use super::ScreeningUpstream;
use crate::config::UpstreamConfig;
use crate::models::{Cinema, Coordinates, MovieInfo, ScreeningSlot};
use async_trait::async_trait;
use grpc_client::{ChannelConfig, GrpcResult, create_channel_lazy};
use prost_types::FieldMask;
use protos::cinema_service::cinema_service_v1_client::CinemaServiceV1Client;
use protos::cinema_service::{GetCinemaRequest, GetHallsRequest, GetScreeningRequest, Hall};
use protos::movies_service::GetMovieRequest;
use protos::movies_service::movies_service_v1_client::MoviesServiceV1Client;
use stream_worker::{Context, ErrorKind, ServiceError};
use tonic::transport::Channel;
use tracing::{debug, error};

/// Screening fields requested from the cinema service.
pub const SCREENING_FIELDS: &[&str] = &["cinema_id", "movie_id", "screening_type", "hall_id", "start_time"];

/// Movie fields requested from the movies service.
pub const MOVIE_FIELDS: &[&str] = &["title_ru", "poster_url"];

fn field_mask(paths: &[&str]) -> Option<FieldMask> {
    Some(FieldMask {
        paths: paths.iter().map(|path| path.to_string()).collect(),
    })
}

/// Wrap `message` with a gRPC timeout taken from the context's remaining time.
fn governed_request<T>(ctx: &Context, message: T) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    if let Some(remaining) = ctx.remaining() {
        request.set_timeout(remaining);
    }
    request
}

fn upstream_error(function: &'static str, status: tonic::Status) -> ServiceError {
    let err = ServiceError::from(status);
    if err.kind == ErrorKind::Canceled {
        debug!(error.function.name = function, "Upstream call cancelled");
    } else {
        error!(
            error.function.name = function,
            error.msg = %err.message,
            code = %err.kind,
            "Upstream call failed"
        );
    }
    err
}

/// [`ScreeningUpstream`] over the cinema and movies gRPC services.
#[derive(Clone)]
pub struct GrpcScreeningUpstream {
    cinema: CinemaServiceV1Client<Channel>,
    movies: MoviesServiceV1Client<Channel>,
}

impl GrpcScreeningUpstream {
    pub fn new(cinema_channel: Channel, movies_channel: Channel) -> Self {
        Self {
            cinema: CinemaServiceV1Client::new(cinema_channel),
            movies: MoviesServiceV1Client::new(movies_channel),
        }
    }

    /// Create lazy channels for both upstreams; nothing is dialled until the first call.
    pub fn connect(cinema: &UpstreamConfig, movies: &UpstreamConfig) -> GrpcResult<Self> {
        let cinema_channel = create_channel_lazy(
            cinema.addr.clone(),
            &ChannelConfig::new().with_security(cinema.security.clone()),
        )?;
        let movies_channel = create_channel_lazy(
            movies.addr.clone(),
            &ChannelConfig::new().with_security(movies.security.clone()),
        )?;
        Ok(Self::new(cinema_channel, movies_channel))
    }
}

#[async_trait]
impl ScreeningUpstream for GrpcScreeningUpstream {
    async fn screening(&self, ctx: &Context, screening_id: i64) -> Result<ScreeningSlot, ServiceError> {
        let request = GetScreeningRequest {
            screening_id,
            mask: field_mask(SCREENING_FIELDS),
        };
        let screening = self
            .cinema
            .clone()
            .get_screening(governed_request(ctx, request))
            .await
            .map_err(|status| upstream_error("GetScreening", status))?
            .into_inner();

        Ok(ScreeningSlot {
            cinema_id: screening.cinema_id,
            hall_id: screening.hall_id,
            movie_id: screening.movie_id,
            start_time: screening
                .start_time
                .map(|start| start.formatted_timestamp)
                .unwrap_or_default(),
        })
    }

    async fn cinema(&self, ctx: &Context, cinema_id: i32) -> Result<Cinema, ServiceError> {
        let cinema = self
            .cinema
            .clone()
            .get_cinema(governed_request(ctx, GetCinemaRequest { cinema_id }))
            .await
            .map_err(|status| upstream_error("GetCinema", status))?
            .into_inner();

        let coordinates = cinema
            .coordinates
            .ok_or_else(|| ServiceError::internal(format!("cinema {cinema_id} has no coordinates")))?;

        Ok(Cinema {
            address: cinema.address,
            name: cinema.name,
            coordinates: Coordinates {
                longitude: coordinates.longitude,
                latitude: coordinates.latitude,
            },
        })
    }

    async fn hall_name(&self, ctx: &Context, hall_id: i32) -> Result<String, ServiceError> {
        let request = GetHallsRequest {
            halls_ids: hall_id.to_string(),
        };
        let halls = self
            .cinema
            .clone()
            .get_halls(governed_request(ctx, request))
            .await
            .map_err(|status| upstream_error("GetHalls", status))?
            .into_inner()
            .halls;

        let [hall]: [Hall; 1] = halls
            .try_into()
            .map_err(|_| ServiceError::not_found("hall not found"))?;
        Ok(hall.name)
    }

    async fn movie(&self, ctx: &Context, movie_id: i32) -> Result<MovieInfo, ServiceError> {
        let request = GetMovieRequest {
            movie_id,
            mask: field_mask(MOVIE_FIELDS),
        };
        let movie = self
            .movies
            .clone()
            .get_movie(governed_request(ctx, request))
            .await
            .map_err(|status| upstream_error("GetMovie", status))?
            .into_inner();

        Ok(MovieInfo {
            title: movie.title_ru,
            poster_url: movie.poster_url,
        })
    }
}
