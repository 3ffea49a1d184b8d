// Sol TWAP Engine
//
//   vault    passphrase-encrypted wallet storage
//   swap     route resolution, transaction building, signing, submission
//   config   TOML configuration

pub mod config;
pub mod swap;
pub mod vault;
