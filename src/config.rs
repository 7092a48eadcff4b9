use serde::Deserialize;

/// Controls cookie security attributes and how much error detail leaves
/// the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub endpoint: String,
    pub api_token: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    /// Reads the whole configuration once at startup. Nothing re-reads the
    /// environment after this point.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = match std::env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "trailhead".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "trailhead-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(90),
            cookie_ttl_days: std::env::var("JWT_COOKIE_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(90),
        };
        let mail = MailConfig {
            endpoint: std::env::var("MAIL_API_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:1080/api/messages".into()),
            api_token: std::env::var("MAIL_API_TOKEN").unwrap_or_default(),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Trailhead <hello@trailhead.dev>".into()),
        };
        Ok(Self {
            database_url,
            environment,
            public_base_url,
            jwt,
            mail,
        })
    }
}
