pub mod model;
pub mod repository;

pub use model::CommissionAccount;
pub use repository::CommissionRepository;
