// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMovieRequest {
    #[prost(int32, tag="1")]
    pub movie_id: i32,
    #[prost(message, optional, tag="2")]
    pub mask: ::core::option::Option<::prost_types::FieldMask>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Movie {
    #[prost(int32, tag="1")]
    pub movie_id: i32,
    #[prost(string, tag="2")]
    pub title_ru: ::prost::alloc::string::String,
    #[prost(string, tag="3")]
    pub title_en: ::prost::alloc::string::String,
    #[prost(string, tag="4")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, tag="5")]
    pub poster_url: ::prost::alloc::string::String,
    #[prost(int32, tag="6")]
    pub duration: i32,
}
include!("movies_service.tonic.rs");
// @@protoc_insertion_point(module)
