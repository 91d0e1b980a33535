pub mod card;
pub mod image;
pub mod report;

pub use card::*;
pub use image::*;
pub use report::*;
