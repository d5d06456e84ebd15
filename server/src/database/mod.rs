pub mod codes;
pub mod create;
pub mod users;
pub mod utils;
