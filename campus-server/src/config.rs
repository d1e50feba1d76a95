use campus_core::{load_env_config, CampusConfig};

pub const ENV_PREFIX: &str = "CAMPUS__";

/// Build the configuration from defaults and the given environment.
///
/// Later sources win: defaults, then `HTTP_HOST` / `HTTP_PORT` /
/// `DATABASE_URL`, then `CAMPUS__…` variables.
pub fn campus_config<I>(vars: I) -> CampusConfig
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = CampusConfig::new();
    configure_defaults(&mut config);

    let vars: Vec<(String, String)> = vars.into_iter().collect();
    configure_plain_env(&mut config, &vars);
    load_env_config(&mut config, ENV_PREFIX, vars);

    config
}

fn configure_defaults(config: &mut CampusConfig) {
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "3001");
    config.set("http.body_limit_bytes", (50 * 1024 * 1024).to_string());
    config.set("database.url", "sqlite://campus.db");
    config.set("database.max_connections", "5");
    config.set("auth.hash_cost", "12");
    config.set("auth.blocked_statuses", "bloqueado,blocked");
}

fn configure_plain_env(config: &mut CampusConfig, vars: &[(String, String)]) {
    for (key, value) in vars {
        let target = match key.as_str() {
            "HTTP_HOST" => "http.host",
            "HTTP_PORT" => "http.port",
            "DATABASE_URL" => "database.url",
            _ => continue,
        };
        config.set(target, value.clone());
    }
}
