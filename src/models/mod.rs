pub mod beer;
pub mod bottle;
pub mod brewery;
pub mod picture;
pub mod rating;
pub mod user;
pub mod validation;

pub use beer::Beer;
pub use bottle::Bottle;
pub use brewery::Brewery;
pub use picture::Picture;
pub use rating::Rating;
pub use user::User;
pub use validation::{FieldErrors, Raw};
