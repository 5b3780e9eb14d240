mod pool;

pub use pool::create_pool;
#[cfg(test)]
pub use pool::create_test_pool;

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
