pub mod discover;
pub mod install;
pub mod installed;
pub mod platform;
pub mod source;
pub mod uninstall;
pub mod update;
