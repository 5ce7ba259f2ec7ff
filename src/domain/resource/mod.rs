pub mod model;
pub mod repository;

pub use model::{Device, ResourceStatus, Room};
pub use repository::ResourceRepository;
