// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetScreeningRequest {
    #[prost(int64, tag="1")]
    pub screening_id: i64,
    #[prost(message, optional, tag="2")]
    pub mask: ::core::option::Option<::prost_types::FieldMask>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timestamp {
    /// RFC 3339
    #[prost(string, tag="1")]
    pub formatted_timestamp: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Screening {
    #[prost(int32, tag="1")]
    pub cinema_id: i32,
    #[prost(int32, tag="2")]
    pub movie_id: i32,
    #[prost(string, tag="3")]
    pub screening_type: ::prost::alloc::string::String,
    #[prost(int32, tag="4")]
    pub hall_id: i32,
    #[prost(message, optional, tag="5")]
    pub start_time: ::core::option::Option<Timestamp>,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetCinemaRequest {
    #[prost(int32, tag="1")]
    pub cinema_id: i32,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Coordinates {
    #[prost(double, tag="1")]
    pub latitude: f64,
    #[prost(double, tag="2")]
    pub longitude: f64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cinema {
    #[prost(int32, tag="1")]
    pub cinema_id: i32,
    #[prost(string, tag="2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag="3")]
    pub address: ::prost::alloc::string::String,
    #[prost(message, optional, tag="4")]
    pub coordinates: ::core::option::Option<Coordinates>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHallsRequest {
    /// comma separated hall ids
    #[prost(string, tag="1")]
    pub halls_ids: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Hall {
    #[prost(int32, tag="1")]
    pub hall_id: i32,
    #[prost(string, tag="2")]
    pub name: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Halls {
    #[prost(message, repeated, tag="1")]
    pub halls: ::prost::alloc::vec::Vec<Hall>,
}
include!("cinema_service.tonic.rs");
// @@protoc_insertion_point(module)
