pub mod dashboard;
pub mod metrics;
pub mod model;
pub mod service;
pub mod source;

pub use dashboard::DashboardData;
pub use model::{BoundaryRecord, CropProduction, FarmerOverview, LinkRecord, LinkStatus};
pub use service::Linker;
pub use source::{LinkSource, SqliteLinkSource};
