pub mod capture;
pub mod error;
pub mod frame;
pub mod graph;
pub mod media;
pub mod output;
pub mod router;
