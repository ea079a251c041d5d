use serde::Deserialize;

/// Well-known fallback for local development. Startup refuses to use it in
/// production.
const DEV_SECRET: &str = "shiftlog-dev-secret-do-not-use";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                if environment == "production" {
                    anyhow::bail!("JWT_SECRET must be set when APP_ENV=production");
                }
                tracing::warn!("JWT_SECRET is not set; using the insecure development default");
                DEV_SECRET.to_string()
            }
        };

        let jwt = JwtConfig {
            secret,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };

        Ok(Self { environment, jwt })
    }
}
