mod audit;
mod image;
mod recipe;
mod relation;
mod user;

pub use audit::*;
pub use image::*;
pub use recipe::*;
pub use relation::*;
pub use user::*;
