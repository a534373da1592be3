//! CLI command implementations

mod delete;
mod import;
mod info;
mod list;
mod reset;
mod tag;

pub use delete::delete;
pub use import::import;
pub use info::info;
pub use list::list;
pub use reset::reset;
pub use tag::tag;
