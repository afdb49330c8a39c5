use super::list;
use flipmeet_core::{BoxFuture, Context, Controller, Database, Entity, Model, Params, Reply, Result};

/// Read-only listing of a lookup table
pub struct CatalogueController<E: Entity> {
    name: &'static str,
    model: Model<E>,
}

impl<E: Entity> CatalogueController<E> {
    /// Controller registered under `name`
    #[must_use]
    pub fn new(name: &'static str, db: &Database) -> Self {
        Self {
            name,
            model: Model::new(db.clone()),
        }
    }

    async fn get_all(&self) -> Result<Reply> {
        let items = self.model.get_all().await?;
        Ok(Reply::data(list(&items)))
    }
}

impl<E: Entity> Controller for CatalogueController<E> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn actions(&self) -> &'static [&'static str] {
        &["getAll"]
    }

    fn call<'a>(
        &'a self,
        action: &'a str,
        _params: Params,
        _context: Option<Context>,
    ) -> Option<BoxFuture<'a, Result<Reply>>> {
        match action {
            "getAll" => Some(Box::pin(self.get_all())),
            _ => None,
        }
    }
}
