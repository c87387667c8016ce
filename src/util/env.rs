//! Process configuration sourced from the environment (with `.env` support
//! via [`dotenvy`]), resolved once and cached for the process lifetime.

use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);
pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    let vars = ENV_VARS.get_or_try_init(|| async { Env::new() }).await?;
    Ok(match var {
        Var::DatabaseUrl => &vars.database_url,
        Var::JwtAccessSecret => &vars.jwt_access_secret,
        Var::JwtRefreshSecret => &vars.jwt_refresh_secret,
        Var::ServerApiPort => &vars.server_api_port,
        Var::CorsAllowOrigins => &vars.cors_allow_origins,
    })
}

#[derive(Debug, Clone)]
pub struct Env {
    pub database_url: String,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub server_api_port: String,
    pub cors_allow_origins: String,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        // Missing `.env` is fine in deployment; real env vars win either way.
        _ = dotenvy::dotenv();

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            jwt_access_secret: require("JWT_ACCESS_SECRET")?,
            jwt_refresh_secret: require("JWT_REFRESH_SECRET")?,
            server_api_port: std::env::var("SERVER_API_PORT").unwrap_or_else(|_| "3000".into()),
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".into()),
        })
    }
}

fn require(name: &'static str) -> EnvResult<String> {
    std::env::var(name).map_err(|_| EnvErr::MissingVar(name))
}

#[derive(Debug)]
pub enum Var {
    DatabaseUrl,
    JwtAccessSecret,
    JwtRefreshSecret,
    ServerApiPort,
    CorsAllowOrigins,
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing required environment variable '{0}'")]
    MissingVar(&'static str),

    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),
}
