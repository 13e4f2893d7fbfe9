pub mod address;
pub mod api;
pub mod coin;
pub mod datastore;
pub mod role;
pub mod server_info;
