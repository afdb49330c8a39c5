//! Bootstrap: builds every collaborator once and wires them together.

use crate::auth::{AuthMiddleware, PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::controllers::{
    CatalogueController, CommentsController, LogController, PostsController, UsersController,
};
use crate::formatter::EnvelopeFormatter;
use crate::models::{Category, Interest};
use crate::routes::routes;
use flipmeet_core::{Database, Dispatcher, LoggingMiddleware, Result, Server};
use std::sync::Arc;
use tracing::info;

/// Middleware id of the token guard
pub const AUTH: &str = "auth";

/// The assembled application
pub struct App {
    /// HTTP host
    pub server: Server,
    /// Shared database handle
    pub database: Database,
}

impl App {
    /// Build the dispatcher, controllers and server from configuration
    ///
    /// Nothing connects yet; the database opens on first use.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an unsupported database URL or a
    /// route that does not resolve.
    pub fn build(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let database = Database::new(config.database.clone())?;
        let tokens = Arc::new(TokenService::new(&config.auth));
        let hasher = PasswordHasher::new(config.auth.password_cost);

        let dispatcher = Dispatcher::new(routes()?)
            .with_controller(LogController::new(&database, tokens.clone(), hasher))
            .with_controller(UsersController::new(&database, hasher))
            .with_controller(PostsController::new(&database))
            .with_controller(CommentsController::new(&database))
            .with_controller(CatalogueController::<Interest>::new(
                "InterestsController",
                &database,
            ))
            .with_controller(CatalogueController::<Category>::new(
                "CategoriesController",
                &database,
            ))
            .with_middleware(AUTH, AuthMiddleware::new(tokens))
            .with_global(LoggingMiddleware::new());
        dispatcher.validate()?;

        info!(
            routes = dispatcher.routes().len(),
            dialect = ?database.dialect(),
            "Application assembled"
        );

        let server = Server::new(config.server.clone(), dispatcher, EnvelopeFormatter);
        Ok(Self { server, database })
    }

    /// Serve until shutdown, then close the database
    ///
    /// # Errors
    ///
    /// Returns the server's bind or accept error.
    pub async fn run(self) -> Result<()> {
        let result = self.server.serve().await;
        self.database.close().await;
        result
    }
}
