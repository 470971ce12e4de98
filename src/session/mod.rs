pub mod alert;
pub mod context_menu;
pub mod controller;
pub mod mutation;
pub mod selection;
pub mod summaries;
pub mod viewport;
