// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, net::SocketAddr, time::Duration};

use crate::{
    db::{ClinicalRepository, InventoryRepository},
    services::{
        auth::AuthService,
        dispensing_service::DispensingService,
        inventory_service::InventoryService,
        lot_ledger::LotLedger,
        lot_selector::LotSelector,
        movement_recorder::MovementRecorder,
    },
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub app_addr: SocketAddr,
    pub prescription_validity_days: u32,
}

impl Config {
    /// Carrega o `.env` (se existir) e lê as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} deve ser definida"));

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let db_acquire_timeout = Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3u64)?);
        let app_addr = parse_or(&lookup, "APP_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let prescription_validity_days = parse_or(&lookup, "PRESCRIPTION_VALIDITY_DAYS", 30u32)?;

        Ok(Self {
            database_url,
            jwt_secret,
            db_max_connections,
            db_acquire_timeout,
            app_addr,
            prescription_validity_days,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválida: '{raw}'")),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub auth_service: AuthService,
    pub inventory_service: InventoryService,
    pub dispensing_service: DispensingService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: Config) -> Self {
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let clinical_repo = ClinicalRepository::new(db_pool.clone());

        let ledger = LotLedger::new(inventory_repo.clone());
        let recorder = MovementRecorder::new(inventory_repo.clone(), ledger);
        let selector = LotSelector::new(inventory_repo.clone());

        let auth_service = AuthService::new(config.jwt_secret.clone());
        let inventory_service =
            InventoryService::new(inventory_repo.clone(), recorder.clone(), selector.clone());
        let dispensing_service = DispensingService::new(
            inventory_repo,
            clinical_repo,
            recorder,
            selector,
            config.prescription_validity_days,
        );

        Self {
            db_pool,
            config,
            auth_service,
            inventory_service,
            dispensing_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/vet"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.db_acquire_timeout, Duration::from_secs(3));
        assert_eq!(config.app_addr.port(), 3000);
        assert_eq!(config.prescription_validity_days, 30);
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "segredo")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/vet"),
            ("JWT_SECRET", "segredo"),
            ("PRESCRIPTION_VALIDITY_DAYS", "trinta"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/vet"),
            ("JWT_SECRET", "segredo"),
            ("APP_ADDR", "127.0.0.1:8080"),
            ("PRESCRIPTION_VALIDITY_DAYS", "15"),
        ]))
        .unwrap();

        assert_eq!(config.app_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.prescription_validity_days, 15);
    }
}
