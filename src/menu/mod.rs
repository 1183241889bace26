pub mod builder;
pub mod router;

pub use builder::build_menu;
pub use router::ActionRouter;
