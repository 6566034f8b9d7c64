pub mod convert;
pub mod event;
