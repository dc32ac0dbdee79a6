mod dispatch;
pub mod init;
pub mod pack;
pub mod verify;

pub use dispatch::dispatch;
