//! Test harness with testcontainers for integration testing.
//!
//! One shared pgvector container for the whole test run; each test gets
//! its own database with migrations applied, so tests can mutate state
//! (including full resets) without fighting each other.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::sync::OnceCell;
use uuid::Uuid;

struct SharedTestInfra {
    base_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<GenericImage>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        // pgvector/pgvector ships the vector extension the schema needs.
        let postgres = GenericImage::new("pgvector/pgvector", "pg16")
            .with_wait_for(testcontainers::core::WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_exposed_port(testcontainers::core::ContainerPort::Tcp(5432))
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_DB", "postgres")
            .start()
            .await
            .expect("failed to start pgvector container");

        let host = postgres.get_host().await.expect("container host");
        let port = postgres
            .get_host_port_ipv4(5432)
            .await
            .expect("container port");

        Self {
            base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
            _postgres: postgres,
        }
    }
}

pub struct TestHarness {
    pub db_pool: PgPool,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        let infra = SHARED_INFRA.get_or_init(SharedTestInfra::init).await;

        // Fresh database per test.
        let db_name = format!("test_{}", Uuid::new_v4().simple());
        let admin = PgPool::connect(&format!("{}/postgres", infra.base_url))
            .await
            .expect("connect to admin database");
        sqlx::query(&format!("CREATE DATABASE {db_name}"))
            .execute(&admin)
            .await
            .expect("create test database");
        admin.close().await;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&format!("{}/{db_name}", infra.base_url))
            .await
            .expect("connect to test database");

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .expect("run migrations");

        Self { db_pool }
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}
