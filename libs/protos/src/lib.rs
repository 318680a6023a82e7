//! Generated clients for the upstream services the notification pipeline
//! reads from. Regenerate with `buf generate` from this directory.

pub mod cinema_service {
  include!("generated/cinema_service/cinema_service.rs");
}

pub mod movies_service {
  include!("generated/movies_service/movies_service.rs");
}
