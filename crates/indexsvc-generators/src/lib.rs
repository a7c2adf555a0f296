//! Concrete [`indexsvc_core::DocumentGenerator`] implementations backed by
//! the relational store.
//!
//! Each generator owns a [`sqlx::PgPool`] and reassembles one row's related
//! tables into the JSON shape its index expects, using explicit queries
//! rather than an ORM's lazy-loaded attributes.

mod locations;
mod technologies;
mod topics;
mod users;

pub use locations::LocationDocumentGenerator;
pub use technologies::TechnologyDocumentGenerator;
pub use topics::TopicDocumentGenerator;
pub use users::UserDocumentGenerator;

use indexsvc_core::GeneratorRegistry;
use sqlx::PgPool;
use std::sync::Arc;

/// Registers the four known (index name, document type) generators against
/// one pool. The service binary calls this once at startup; tests can build
/// a narrower registry by hand.
pub fn register_all(registry: &mut GeneratorRegistry, pool: PgPool) {
    tracing::debug!("registering document generators: users, technologies, topics, locations");

    let users_pool = pool.clone();
    registry.register("users", "user", move || {
        Arc::new(UserDocumentGenerator::new(users_pool.clone())) as Arc<dyn indexsvc_core::DocumentGenerator>
    });

    let technologies_pool = pool.clone();
    registry.register("technologies", "technology", move || {
        Arc::new(TechnologyDocumentGenerator::new(technologies_pool.clone()))
            as Arc<dyn indexsvc_core::DocumentGenerator>
    });

    let topics_pool = pool.clone();
    registry.register("topics", "topic", move || {
        Arc::new(TopicDocumentGenerator::new(topics_pool.clone())) as Arc<dyn indexsvc_core::DocumentGenerator>
    });

    registry.register("locations", "location", move || {
        Arc::new(LocationDocumentGenerator::new(pool.clone())) as Arc<dyn indexsvc_core::DocumentGenerator>
    });
}
