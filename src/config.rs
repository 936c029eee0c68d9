use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Public origin of the web front end, used to build rating links.
    pub app_origin: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Where `new_reservation_admin` emails go.
    pub admin_notification_email: String,
    pub mail: MailConfig,
    pub cache_ttl_secs: u64,
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub from: String,
    /// Remote mail endpoint; takes precedence over SMTP when set.
    pub relay_url: Option<String>,
    pub max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_email = env::var("ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@transfers.local".to_string());

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            app_origin: env::var("APP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .trim_end_matches('/')
                .to_string(),
            admin_notification_email: env::var("ADMIN_NOTIFICATION_EMAIL")
                .unwrap_or_else(|_| admin_email.clone()),
            admin_email,
            admin_password: env::var("ADMIN_PASSWORD")
                .expect("ADMIN_PASSWORD must be set"),
            mail: MailConfig::from_env(),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("CACHE_TTL_SECS must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn rating_link(&self, reservation_id: uuid::Uuid) -> String {
        format!("{}/rating/{}", self.app_origin, reservation_id)
    }
}

impl MailConfig {
    fn from_env() -> Self {
        let smtp_secure = env::var("SMTP_SECURE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Self {
            smtp_host: env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| if smtp_secure { "465" } else { "587" }.to_string())
                .parse()
                .expect("SMTP_PORT must be a number"),
            smtp_secure,
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Transfers <no-reply@transfers.local>".to_string()),
            relay_url: env::var("MAIL_RELAY_URL").ok().filter(|u| !u.is_empty()),
            max_attempts: env::var("MAIL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("MAIL_MAX_ATTEMPTS must be a number"),
        }
    }
}
