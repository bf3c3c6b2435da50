pub mod order;
pub mod product;
pub mod review;
pub mod user;
