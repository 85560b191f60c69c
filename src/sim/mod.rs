pub mod connect;
pub mod event;
pub mod level;
pub mod save;
pub mod session;
pub mod step;
pub mod world;
