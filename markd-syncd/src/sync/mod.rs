pub mod debounce;
pub mod header;
pub mod local_watcher;
pub mod paths;
pub mod pull;
pub mod push;
