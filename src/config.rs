use lazy_static::lazy_static;

pub struct Config {
    pub database_url: String,
    pub pg_schema: String,
    pub pool_size: usize,
    pub sweep_interval_secs: u64,
}

lazy_static! {
    pub static ref CONFIG: Config = {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pg_schema = std::env::var("PG_SCHEMA").unwrap_or_else(|_| "public".to_string());
        let pool_size = std::env::var("DB_POOL_SIZE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(5);
        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(60);
        Config {
            database_url,
            pg_schema,
            pool_size,
            sweep_interval_secs,
        }
    };
}
