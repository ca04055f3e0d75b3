use std::sync::Arc;

use communal_collab::Collab;
use communal_core::DocumentStore;

pub type SharedCollab = Arc<Collab<dyn DocumentStore>>;

#[derive(Clone)]
pub struct ServerContext {
    pub collab: SharedCollab,
}
