//! HTTP clients for the external collaborators

pub mod http;
pub mod linear;
pub mod sheets;
pub mod tinify;

pub use http::{Auth, HttpClient};
pub use linear::LinearClient;
pub use sheets::{ServiceAccountKey, SheetsClient};
pub use tinify::TinifyClient;
